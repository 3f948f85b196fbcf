//! Gateway configuration.
//!
//! Options come from the `[WEBDAV]` section of the file named by the
//! `SEAFDAV_CONF` environment variable; the store location comes from
//! `SEAFILE_CONF_DIR` (with `SEAFILE_CENTRAL_CONF_DIR` taking precedence
//! for `seafile.conf` itself, mirroring clustered deployments).

use crate::error::GatewayError;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

/// Per-provider switches the filesystem consults on every request.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Reject every mutating verb.
    pub readonly: bool,
    /// Expose every repo as `name-<id6>` even without collisions.
    pub show_repo_id: bool,
    /// Where upload spools live. Created at startup.
    pub tmpdir: PathBuf,
}

/// Everything the gateway recognizes from `seafdav.conf`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Mount point the DAV tree is served under.
    pub share_name: String,
    pub readonly: bool,
    pub show_repo_id: bool,
    pub ssl_certificate: Option<PathBuf>,
    pub ssl_private_key: Option<PathBuf>,
    pub ssl_certificate_chain: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
    pub tmpdir: PathBuf,
}

impl GatewayConfig {
    /// Defaults matching a stock deployment; `tmpdir` must still be set.
    pub fn with_tmpdir(tmpdir: PathBuf) -> Self {
        GatewayConfig {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            share_name: "/".to_owned(),
            readonly: false,
            show_repo_id: false,
            ssl_certificate: None,
            ssl_private_key: None,
            ssl_certificate_chain: None,
            log_path: None,
            pid_file: None,
            tmpdir,
        }
    }

    /// Load from the environment: `SEAFDAV_CONF` for the option file,
    /// `SEAFILE_CONF_DIR` for the spool directory.
    pub fn load() -> Result<Self, GatewayError> {
        let conf_dir = seafile_conf_dir()?;
        let tmpdir = conf_dir.join("webdavtmp");
        std::fs::create_dir_all(&tmpdir)?;

        let mut cfg = GatewayConfig::with_tmpdir(tmpdir);
        if let Some(path) = std::env::var_os("SEAFDAV_CONF") {
            cfg.merge_conf_file(Path::new(&path))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply the `[WEBDAV]` section of `path` over the defaults.
    pub fn merge_conf_file(&mut self, path: &Path) -> Result<(), GatewayError> {
        let settings = config::Config::builder()
            .add_source(config::File::new(
                path.to_string_lossy().as_ref(),
                config::FileFormat::Ini,
            ))
            .build()
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;

        if let Ok(port) = settings.get_int("webdav.port") {
            self.port = u16::try_from(port)
                .map_err(|_| GatewayError::Config(format!("port {port} out of range")))?;
        }
        if let Ok(host) = settings.get_string("webdav.host") {
            self.host = host;
        }
        if let Ok(share) = settings.get_string("webdav.share_name") {
            self.share_name = normalize_share_name(&share);
        }
        if let Ok(readonly) = settings.get_bool("webdav.readonly") {
            self.readonly = readonly;
        }
        if let Ok(show) = settings.get_bool("webdav.show_repo_id") {
            self.show_repo_id = show;
        }
        for (key, slot) in [
            ("webdav.ssl_certificate", &mut self.ssl_certificate),
            ("webdav.ssl_private_key", &mut self.ssl_private_key),
            ("webdav.ssl_certificate_chain", &mut self.ssl_certificate_chain),
            ("webdav.log_path", &mut self.log_path),
            ("webdav.pid_file", &mut self.pid_file),
        ] {
            if let Ok(value) = settings.get_string(key) {
                *slot = Some(PathBuf::from(value));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), GatewayError> {
        for (label, path) in [
            ("ssl_certificate", &self.ssl_certificate),
            ("ssl_private_key", &self.ssl_private_key),
            ("ssl_certificate_chain", &self.ssl_certificate_chain),
        ] {
            if let Some(p) = path
                && !p.is_file()
            {
                return Err(GatewayError::Config(format!(
                    "{label} {} does not exist",
                    p.display()
                )));
            }
        }
        Ok(())
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            readonly: self.readonly,
            show_repo_id: self.show_repo_id,
            tmpdir: self.tmpdir.clone(),
        }
    }
}

/// Mount points always start with a slash and never end with one
/// (except the bare root).
fn normalize_share_name(share: &str) -> String {
    let trimmed = share.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn required_env_dir(key: &str) -> Result<PathBuf, GatewayError> {
    std::env::var_os(key)
        .map(PathBuf::from)
        .ok_or_else(|| GatewayError::Config(format!("{key} is not set")))
}

/// The seafile data directory (`SEAFILE_CONF_DIR`).
pub fn seafile_conf_dir() -> Result<PathBuf, GatewayError> {
    required_env_dir("SEAFILE_CONF_DIR")
}

/// The ccnet configuration directory (`CCNET_CONF_DIR`).
pub fn ccnet_conf_dir() -> Result<PathBuf, GatewayError> {
    required_env_dir("CCNET_CONF_DIR")
}

/// Directory holding `seafile.conf`: the central conf dir when configured,
/// the data directory otherwise.
pub fn seafile_central_conf_dir() -> Result<PathBuf, GatewayError> {
    match std::env::var_os("SEAFILE_CENTRAL_CONF_DIR") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => seafile_conf_dir(),
    }
}

static MULTI_TENANCY: OnceLock<bool> = OnceLock::new();

/// Whether the deployment is multi-tenant (`[general] multi_tenancy` in
/// `seafile.conf`). Read once per process; defaults to false on any error.
pub fn multi_tenancy_enabled() -> bool {
    *MULTI_TENANCY.get_or_init(|| {
        let Ok(conf_dir) = seafile_central_conf_dir() else {
            return false;
        };
        let conf = conf_dir.join("seafile.conf");
        if !conf.is_file() {
            return false;
        }
        config::Config::builder()
            .add_source(config::File::new(
                conf.to_string_lossy().as_ref(),
                config::FileFormat::Ini,
            ))
            .build()
            .and_then(|s| s.get_bool("general.multi_tenancy"))
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to read multi_tenancy flag");
                false
            })
    })
}
