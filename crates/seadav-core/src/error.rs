//! Error types for the object store.

use crate::obj::ObjectKind;
use thiserror::Error;

/// Errors raised while loading objects from the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist in the backend.
    #[error("{kind} object {id} not found")]
    NotFound { kind: ObjectKind, id: String },

    /// The backend could not be reached (network, permissions, ...).
    #[error("object backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The object was fetched but its bytes do not parse as the expected
    /// encoding for its kind and version.
    #[error("{kind} object {id} format error: {reason}")]
    CorruptObject {
        kind: ObjectKind,
        id: String,
        reason: String,
    },

    /// An object id that is not 40 hex characters.
    #[error("malformed object id {0:?}")]
    MalformedId(String),

    /// Invalid `seafile.conf` backend configuration.
    #[error("invalid object backend configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn corrupt(kind: ObjectKind, id: &crate::obj::ObjectId, reason: impl Into<String>) -> Self {
        StoreError::CorruptObject {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
