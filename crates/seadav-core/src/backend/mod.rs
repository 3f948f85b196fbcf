//! Byte-blob backends for commits, fs metadata and blocks.
//!
//! A backend only reads. Selection is driven by `seafile.conf`: each of the
//! three object kinds has its own section (`commit_object_backend`,
//! `fs_object_backend`, `block_backend`) naming either the `filesystem` or
//! the `s3` variant. A missing section falls back to the filesystem layout
//! rooted at the seafile data directory.

pub mod fs;
pub mod s3;

use crate::error::StoreError;
use crate::obj::{ObjectId, ObjectKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

pub use fs::FsBackend;
pub use s3::{S3Backend, S3Config};

/// Read access to one object namespace.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Fetch the raw bytes of `obj_id` from the store named `store_id`.
    ///
    /// The zero id is handled by the object managers and never reaches a
    /// backend.
    async fn read(
        &self,
        store_id: &str,
        version: u32,
        obj_id: &ObjectId,
    ) -> Result<Bytes, StoreError>;
}

/// The three per-kind backends a deployment is wired with.
#[derive(Clone)]
pub struct Backends {
    pub commits: Arc<dyn BlobBackend>,
    pub fs: Arc<dyn BlobBackend>,
    pub blocks: Arc<dyn BlobBackend>,
}

impl Backends {
    pub fn for_kind(&self, kind: ObjectKind) -> &Arc<dyn BlobBackend> {
        match kind {
            ObjectKind::Commits => &self.commits,
            ObjectKind::Fs => &self.fs,
            ObjectKind::Blocks => &self.blocks,
        }
    }
}

/// Load the three backends from `<seafile_conf_dir>/seafile.conf`.
///
/// A missing config file (or missing sections) selects filesystem backends
/// rooted at the conf dir, which is the layout a stock deployment uses.
pub fn load_backends(seafile_conf_dir: &Path) -> Result<Backends, StoreError> {
    let conf_path = seafile_conf_dir.join("seafile.conf");
    let settings = if conf_path.is_file() {
        config::Config::builder()
            .add_source(config::File::new(
                conf_path.to_string_lossy().as_ref(),
                config::FileFormat::Ini,
            ))
            .build()
            .map_err(|e| StoreError::Config(format!("{}: {e}", conf_path.display())))?
    } else {
        config::Config::default()
    };

    Ok(Backends {
        commits: object_backend(&settings, seafile_conf_dir, ObjectKind::Commits)?,
        fs: object_backend(&settings, seafile_conf_dir, ObjectKind::Fs)?,
        blocks: object_backend(&settings, seafile_conf_dir, ObjectKind::Blocks)?,
    })
}

fn section_for(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Commits => "commit_object_backend",
        ObjectKind::Fs => "fs_object_backend",
        ObjectKind::Blocks => "block_backend",
    }
}

fn object_backend(
    settings: &config::Config,
    conf_dir: &Path,
    kind: ObjectKind,
) -> Result<Arc<dyn BlobBackend>, StoreError> {
    let section = section_for(kind);
    let name = settings.get_string(&format!("{section}.name")).ok();

    match name.as_deref() {
        None => {
            // Stock layout: objects live directly under the conf dir.
            Ok(Arc::new(FsBackend::new(conf_dir.to_path_buf(), kind)))
        }
        Some("filesystem") => {
            // The block backend historically names its root `block_dir`,
            // the object backends use `object_dir`.
            let dir_key = if kind == ObjectKind::Blocks {
                format!("{section}.block_dir")
            } else {
                format!("{section}.object_dir")
            };
            let dir = settings
                .get_string(&dir_key)
                .map_err(|e| StoreError::Config(format!("{dir_key}: {e}")))?;
            Ok(Arc::new(FsBackend::with_object_dir(dir.into(), kind)))
        }
        Some("s3") => {
            let get = |key: &str| {
                settings
                    .get_string(&format!("{section}.{key}"))
                    .map_err(|e| StoreError::Config(format!("{section}.{key}: {e}")))
            };
            let cfg = S3Config {
                key_id: get("key_id")?,
                key: get("key")?,
                bucket: get("bucket")?,
                endpoint: settings.get_string(&format!("{section}.host")).ok(),
            };
            Ok(Arc::new(S3Backend::new(cfg, kind)))
        }
        Some(other) => Err(StoreError::Config(format!(
            "unknown {section} backend {other:?}"
        ))),
    }
}
