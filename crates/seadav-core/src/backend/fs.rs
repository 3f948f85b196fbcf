//! Filesystem blob backend.

use crate::error::StoreError;
use crate::obj::{ObjectId, ObjectKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads objects from an on-disk store.
///
/// Two layouts exist. The current one namespaces objects per store:
/// `<root>/storage/<kind>/<store_id>/<id[..2]>/<id[2..]>`. Version-0 stores
/// may still use the legacy flat layout `<obj_dir>/<id[..2]>/<id[2..]>`,
/// which is tried as a fallback when the primary path is absent.
pub struct FsBackend {
    root: PathBuf,
    /// Legacy per-kind object dir. Defaults to `<root>/<kind>`; overridable
    /// through the `object_dir` / `block_dir` config keys.
    obj_dir: PathBuf,
    kind: ObjectKind,
}

impl FsBackend {
    pub fn new(root: PathBuf, kind: ObjectKind) -> Self {
        let obj_dir = root.join(kind.dir_name());
        FsBackend {
            root,
            obj_dir,
            kind,
        }
    }

    /// Legacy configuration pointing straight at a per-kind object dir.
    pub fn with_object_dir(obj_dir: PathBuf, kind: ObjectKind) -> Self {
        // The storage layout lives beside the per-kind dirs.
        let root = obj_dir
            .parent()
            .map_or_else(|| obj_dir.clone(), Path::to_path_buf);
        FsBackend {
            root,
            obj_dir,
            kind,
        }
    }

    fn storage_path(&self, store_id: &str, obj_id: &ObjectId) -> PathBuf {
        self.root
            .join("storage")
            .join(self.kind.dir_name())
            .join(store_id)
            .join(obj_id.prefix(2))
            .join(&obj_id.as_str()[2..])
    }

    fn legacy_path(&self, obj_id: &ObjectId) -> PathBuf {
        self.obj_dir
            .join(obj_id.prefix(2))
            .join(&obj_id.as_str()[2..])
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes, std::io::Error> {
        tokio::fs::read(path).await.map(Bytes::from)
    }
}

#[async_trait]
impl super::BlobBackend for FsBackend {
    async fn read(
        &self,
        store_id: &str,
        version: u32,
        obj_id: &ObjectId,
    ) -> Result<Bytes, StoreError> {
        let primary = self.storage_path(store_id, obj_id);
        match self.read_file(&primary).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::BackendUnavailable(e.to_string())),
        }

        // Version-0 stores predate the storage/ layout.
        if version == 0 {
            match self.read_file(&self.legacy_path(obj_id)).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::BackendUnavailable(e.to_string())),
            }
        }

        Err(StoreError::NotFound {
            kind: self.kind,
            id: obj_id.to_string(),
        })
    }
}
