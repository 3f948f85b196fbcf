//! Directory-listing entries.

use crate::error::GatewayError;
use crate::filesystem::GatewayContext;
use crate::metadata::SeafMetaData;
use crate::resolve;
use dav_server::fs::{DavDirEntry, DavMetaData, FsError, FsFuture};
use seadav_core::{DirentKind, ObjectId, RepoInfo, SeafDirent};
use std::sync::Arc;

/// A repository exposed as a child of the mount point.
pub struct RepoDirEntry {
    exposed_name: String,
    repo: RepoInfo,
    ctx: Arc<GatewayContext>,
}

impl RepoDirEntry {
    pub fn new(exposed_name: String, repo: RepoInfo, ctx: Arc<GatewayContext>) -> Self {
        RepoDirEntry {
            exposed_name,
            repo,
            ctx,
        }
    }
}

impl DavDirEntry for RepoDirEntry {
    fn name(&self) -> Vec<u8> {
        self.exposed_name.clone().into_bytes()
    }

    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        Box::pin(async move {
            // The etag of a repository collection is its root directory
            // object id at HEAD.
            let root = resolve::load_repo_root(&self.ctx, &self.repo)
                .await
                .map_err(FsError::from)?;
            Ok(Box::new(SeafMetaData::dir(root.id, self.repo.last_modify))
                as Box<dyn DavMetaData>)
        })
    }
}

/// A dirent of a directory object.
pub struct ObjectDirEntry {
    dirent: SeafDirent,
    /// Mtime resolved out of band for v0 repos; overrides the dirent's.
    resolved_mtime: Option<i64>,
    store_id: String,
    version: u32,
    ctx: Arc<GatewayContext>,
}

impl ObjectDirEntry {
    pub fn new(
        dirent: SeafDirent,
        resolved_mtime: Option<i64>,
        repo: &RepoInfo,
        ctx: Arc<GatewayContext>,
    ) -> Self {
        ObjectDirEntry {
            dirent,
            resolved_mtime,
            store_id: repo.store_id().to_owned(),
            version: repo.version,
            ctx,
        }
    }

    fn mtime(&self) -> i64 {
        self.resolved_mtime.unwrap_or(self.dirent.mtime)
    }

    async fn file_size(&self) -> Result<u64, GatewayError> {
        if self.dirent.size >= 0 {
            #[allow(clippy::cast_sign_loss)]
            return Ok(self.dirent.size as u64);
        }
        // v0 dirents carry no size; the file object does.
        let file = self
            .ctx
            .store
            .fs
            .load_seafile(&self.store_id, self.version, &self.dirent.id)
            .await?;
        Ok(file.size)
    }
}

impl DavDirEntry for ObjectDirEntry {
    fn name(&self) -> Vec<u8> {
        self.dirent.name.clone().into_bytes()
    }

    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let id: ObjectId = self.dirent.id.clone();
            let meta = match self.dirent.kind {
                DirentKind::Dir => SeafMetaData::dir(id, self.mtime()),
                DirentKind::File => {
                    let size = self.file_size().await.map_err(FsError::from)?;
                    SeafMetaData::file(id, size, self.mtime())
                }
            };
            Ok(Box::new(meta) as Box<dyn DavMetaData>)
        })
    }
}
