//! Live properties for projected resources.

use dav_server::fs::{DavMetaData, FsError, FsResult};
use seadav_core::ObjectId;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Metadata for the three resource shapes the gateway serves.
///
/// Etags are object ids: a directory's etag is its directory object id, a
/// file's etag is its file object id. Both change exactly when content
/// changes, which is what an etag promises.
#[derive(Debug, Clone)]
pub enum SeafMetaData {
    /// The mount point itself.
    Root,
    /// A repository root or any directory below it.
    Dir { id: ObjectId, mtime: i64 },
    /// A regular file.
    File {
        id: ObjectId,
        size: u64,
        mtime: i64,
    },
}

impl SeafMetaData {
    pub fn dir(id: ObjectId, mtime: i64) -> Self {
        SeafMetaData::Dir { id, mtime }
    }

    pub fn file(id: ObjectId, size: u64, mtime: i64) -> Self {
        SeafMetaData::File { id, size, mtime }
    }

    fn mtime(&self) -> i64 {
        match self {
            SeafMetaData::Root => 0,
            SeafMetaData::Dir { mtime, .. } | SeafMetaData::File { mtime, .. } => *mtime,
        }
    }
}

impl DavMetaData for SeafMetaData {
    fn len(&self) -> u64 {
        match self {
            SeafMetaData::File { size, .. } => *size,
            _ => 0,
        }
    }

    fn modified(&self) -> FsResult<SystemTime> {
        let secs = self.mtime();
        if secs > 0 {
            #[allow(clippy::cast_sign_loss)]
            Ok(UNIX_EPOCH + Duration::from_secs(secs as u64))
        } else {
            // Unknown mtimes (v0 dirents that were not batch-resolved)
            // surface as the epoch rather than an error.
            Ok(UNIX_EPOCH)
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, SeafMetaData::Root | SeafMetaData::Dir { .. })
    }

    fn is_file(&self) -> bool {
        matches!(self, SeafMetaData::File { .. })
    }

    fn etag(&self) -> Option<String> {
        match self {
            SeafMetaData::Root => None,
            SeafMetaData::Dir { id, .. } | SeafMetaData::File { id, .. } => {
                if id.is_zero() {
                    None
                } else {
                    Some(id.to_string())
                }
            }
        }
    }

    fn created(&self) -> FsResult<SystemTime> {
        // The object graph stores no creation dates.
        Err(FsError::NotImplemented)
    }
}
