//! The authentication boundary.
//!
//! The gateway does not own any credentials. It hands the Basic credentials
//! of each request to an injected domain controller (backed by the account
//! database, LDAP, SSO, ... in a real deployment) and receives back a
//! [`Principal`] or a rejection.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// The authenticated identity a request runs under.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Canonical user identity (the controller may map login aliases).
    pub username: String,
    /// Organization id in multi-tenant deployments.
    pub org_id: Option<i64>,
    /// Guests do not see organization-wide public repositories.
    pub is_guest: bool,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Principal {
            username: username.into(),
            org_id: None,
            is_guest: false,
        }
    }
}

/// Pluggable credential verifier.
#[async_trait]
pub trait DomainController: Send + Sync {
    /// Realm advertised in the `WWW-Authenticate` challenge.
    fn realm(&self) -> &str {
        "Seafile Authentication"
    }

    /// Whether anonymous requests are rejected. Always true for the stock
    /// controller; overridable for test rigs.
    fn require_authentication(&self) -> bool {
        true
    }

    /// Verify a username/password pair and produce the canonical principal.
    ///
    /// Implementations must reject usernames they consider malformed (the
    /// stock controller refuses names containing single quotes before they
    /// reach any query).
    async fn authenticate(&self, username: &str, password: &str) -> Option<Principal>;
}

/// Parse a `Basic` authorization header value into `(username, password)`.
///
/// Returns `None` for other schemes or undecodable payloads. The password
/// may legally contain colons; only the first colon splits.
pub fn parse_basic_credentials(header: &str) -> Option<(String, String)> {
    let payload = header.strip_prefix("Basic ").or_else(|| header.strip_prefix("basic "))?;
    let decoded = BASE64.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_owned(), pass.to_owned()))
}
