//! Error taxonomy and the single mapping to `dav-server` status codes.

use dav_server::fs::FsError;
use seadav_core::StoreError;
use thiserror::Error;

use crate::service::RpcError;

/// Gateway-level errors, one variant per HTTP class the adapter can emit.
///
/// `dav-server`'s `FsError` set has no 400-class variant, so request-shape
/// errors (invalid filename, repo-root mutation, malformed destination)
/// degrade to `Forbidden` at the boundary; the distinction is kept here for
/// logging.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed DAV path, empty MOVE/COPY destination, repo-root delete.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The server-side filename check rejected the candidate name.
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    /// Provider is read-only, or the principal's permission is not "rw".
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The repository owner's quota would be exceeded.
    #[error("quota exceeded for repository owner {owner}")]
    QuotaExceeded { owner: String },

    /// Unknown repo name, missing path segment, file in the middle of a
    /// path.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("repository service error: {0}")]
    Rpc(RpcError),

    /// Invalid or missing gateway configuration (startup only).
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RpcError> for GatewayError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::InvalidFileName(name) => GatewayError::InvalidFileName(name),
            other => GatewayError::Rpc(other),
        }
    }
}

impl GatewayError {
    /// Collapse to the `dav-server` error set at the outermost handler.
    pub fn to_fs_error(&self) -> FsError {
        match self {
            GatewayError::NotFound(_) | GatewayError::Store(StoreError::NotFound { .. }) => {
                FsError::NotFound
            }
            GatewayError::BadRequest(_)
            | GatewayError::InvalidFileName(_)
            | GatewayError::Forbidden(_)
            | GatewayError::QuotaExceeded { .. } => FsError::Forbidden,
            GatewayError::Store(_)
            | GatewayError::Rpc(_)
            | GatewayError::Config(_)
            | GatewayError::Io(_) => FsError::GeneralFailure,
        }
    }
}

impl From<GatewayError> for FsError {
    fn from(e: GatewayError) -> Self {
        let fs = e.to_fs_error();
        match fs {
            FsError::GeneralFailure => tracing::error!(error = %e, "request failed"),
            _ => tracing::debug!(error = %e, "request rejected"),
        }
        fs
    }
}
