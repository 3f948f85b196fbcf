//! Commit objects.

use crate::error::StoreError;
use crate::obj::{ObjectId, ObjectKind};
use serde::Deserialize;

/// A commit snapshot. Plain JSON on disk; the gateway only consumes
/// `root_id`, the directory object the repository rooted at this commit.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub root_id: ObjectId,
    #[serde(default)]
    pub ctime: i64,
}

impl Commit {
    pub fn decode(commit_id: &ObjectId, buf: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(buf)
            .map_err(|e| StoreError::corrupt(ObjectKind::Commits, commit_id, e.to_string()))
    }
}
