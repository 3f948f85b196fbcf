//! Load-by-id facades over the blob backends.
//!
//! One manager per object kind. All of them special-case the zero id to an
//! empty object so traversal never issues a backend read for it.

use crate::backend::{Backends, BlobBackend};
use crate::commit::Commit;
use crate::error::StoreError;
use crate::fs::{SeafDir, SeafFile};
use crate::obj::ObjectId;
use bytes::Bytes;
use std::sync::Arc;

/// Loads commit objects.
#[derive(Clone)]
pub struct CommitManager {
    backend: Arc<dyn BlobBackend>,
}

impl CommitManager {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        CommitManager { backend }
    }

    pub async fn load_commit(
        &self,
        repo_id: &str,
        version: u32,
        commit_id: &ObjectId,
    ) -> Result<Commit, StoreError> {
        if commit_id.is_zero() {
            return Ok(Commit {
                root_id: ObjectId::zero(),
                ctime: 0,
            });
        }
        let buf = self.backend.read(repo_id, version, commit_id).await?;
        Commit::decode(commit_id, &buf)
    }

    /// The id of the directory rooting the repository at `commit_id`.
    pub async fn get_root_id(
        &self,
        repo_id: &str,
        version: u32,
        commit_id: &ObjectId,
    ) -> Result<ObjectId, StoreError> {
        Ok(self.load_commit(repo_id, version, commit_id).await?.root_id)
    }
}

/// Loads directory and file metadata objects.
#[derive(Clone)]
pub struct FsManager {
    backend: Arc<dyn BlobBackend>,
}

impl FsManager {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        FsManager { backend }
    }

    pub async fn load_seafdir(
        &self,
        store_id: &str,
        version: u32,
        id: &ObjectId,
    ) -> Result<SeafDir, StoreError> {
        if id.is_zero() {
            return Ok(SeafDir::empty(id.clone(), version));
        }
        let buf = self.backend.read(store_id, version, id).await?;
        SeafDir::decode(id.clone(), version, &buf)
    }

    pub async fn load_seafile(
        &self,
        store_id: &str,
        version: u32,
        id: &ObjectId,
    ) -> Result<SeafFile, StoreError> {
        if id.is_zero() {
            return Ok(SeafFile::empty(id.clone(), version));
        }
        let buf = self.backend.read(store_id, version, id).await?;
        SeafFile::decode(id.clone(), version, &buf)
    }
}

/// Loads raw block data.
#[derive(Clone)]
pub struct BlockManager {
    backend: Arc<dyn BlobBackend>,
}

impl BlockManager {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        BlockManager { backend }
    }

    pub async fn read(
        &self,
        store_id: &str,
        version: u32,
        block_id: &ObjectId,
    ) -> Result<Bytes, StoreError> {
        if block_id.is_zero() {
            return Ok(Bytes::new());
        }
        self.backend.read(store_id, version, block_id).await
    }
}

/// The three managers a gateway instance is wired with.
#[derive(Clone)]
pub struct ObjectStore {
    pub commits: CommitManager,
    pub fs: FsManager,
    pub blocks: BlockManager,
}

impl ObjectStore {
    pub fn new(backends: &Backends) -> Self {
        ObjectStore {
            commits: CommitManager::new(backends.commits.clone()),
            fs: FsManager::new(backends.fs.clone()),
            blocks: BlockManager::new(backends.blocks.clone()),
        }
    }
}
