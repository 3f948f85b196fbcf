//! The `DavFileSystem` implementation projecting repositories.
//!
//! One instance is built per request, carrying the authenticated principal.
//! Reads walk the immutable object graph; every mutating verb runs the same
//! gate sequence (provider read-only, then path-scoped "rw" permission,
//! then quota for writes and filename validity for creates) before
//! delegating to the repository service.

use crate::access;
use crate::config::ProviderOptions;
use crate::dc::Principal;
use crate::dir_entry::{ObjectDirEntry, RepoDirEntry};
use crate::error::GatewayError;
use crate::file::{BlockReader, SeafDavFile, SpoolWriter};
use crate::metadata::SeafMetaData;
use crate::resolve::{self, Resolved, Target, dav_segments};
use crate::service::RepoService;
use dav_server::davpath::DavPath;
use dav_server::fs::{
    DavDirEntry, DavFile, DavFileSystem, DavMetaData, FsError, FsFuture, FsStream, OpenOptions,
    ReadDirMeta,
};
use futures::stream;
use seadav_core::{ObjectStore, RepoInfo, SeafDirent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Everything the per-request filesystems share.
pub struct GatewayContext {
    pub store: ObjectStore,
    pub service: Arc<dyn RepoService>,
    pub options: ProviderOptions,
}

impl GatewayContext {
    pub fn new(
        store: ObjectStore,
        service: Arc<dyn RepoService>,
        options: ProviderOptions,
    ) -> Self {
        GatewayContext {
            store,
            service,
            options,
        }
    }
}

/// The filesystem `dav-server` dispatches one request against.
#[derive(Clone)]
pub struct SeafDavFs {
    ctx: Arc<GatewayContext>,
    principal: Principal,
}

impl SeafDavFs {
    pub fn new(ctx: Arc<GatewayContext>, principal: Principal) -> Self {
        SeafDavFs { ctx, principal }
    }

    fn username(&self) -> &str {
        &self.principal.username
    }

    /// Gate 1: the provider-level read-only switch.
    fn ensure_writable(&self) -> Result<(), GatewayError> {
        if self.ctx.options.readonly {
            Err(GatewayError::Forbidden("provider is read-only".into()))
        } else {
            Ok(())
        }
    }

    /// Gate 2: the principal needs "rw" on the target path.
    async fn ensure_rw(&self, repo: &RepoInfo, rel_path: &str) -> Result<(), GatewayError> {
        let perm = self
            .ctx
            .service
            .check_permission_by_path(&repo.id, &Resolved::abs(rel_path), self.username())
            .await?;
        if perm.as_deref() == Some("rw") {
            Ok(())
        } else {
            Err(GatewayError::Forbidden(format!(
                "no write permission on {:?} in repo {}",
                rel_path, repo.id
            )))
        }
    }

    /// Gate 4: server-side filename validity.
    async fn ensure_valid_name(&self, repo: &RepoInfo, name: &str) -> Result<(), GatewayError> {
        if self.ctx.service.is_valid_filename(&repo.id, name).await? {
            Ok(())
        } else {
            Err(GatewayError::InvalidFileName(name.to_owned()))
        }
    }

    /// Mtime for a single entry: the dirent's own mtime when positive,
    /// otherwise the batch "files last modified" query against the parent.
    async fn entry_mtime(
        &self,
        repo: &RepoInfo,
        parent_rel: &str,
        name: &str,
        dirent_mtime: i64,
    ) -> i64 {
        if dirent_mtime > 0 {
            return dirent_mtime;
        }
        match self
            .ctx
            .service
            .get_files_last_modified(&repo.id, &Resolved::abs(parent_rel))
            .await
        {
            Ok(list) => list
                .into_iter()
                .find(|e| e.file_name == name)
                .map_or(0, |e| e.last_modified),
            Err(e) => {
                debug!(error = %e, "files-last-modified query failed");
                0
            }
        }
    }

    async fn resolve(&self, segments: &[String]) -> Result<Resolved, GatewayError> {
        resolve::resolve_segments(&self.ctx, &self.principal, segments).await
    }

    /// Size of the file currently at `name` under the parent, if any.
    /// Fails when the name is taken by a collection.
    async fn existing_file_size(
        &self,
        repo: &RepoInfo,
        parent: &Resolved,
        name: &str,
    ) -> Result<Option<u64>, GatewayError> {
        let Some(dir) = parent.as_dir() else {
            return Err(GatewayError::NotFound("parent is not a directory".into()));
        };
        let Some(dirent) = dir.lookup(name) else {
            return Ok(None);
        };
        if dirent.is_dir() {
            return Err(GatewayError::Forbidden(format!(
                "{name:?} is a collection"
            )));
        }
        if dirent.size >= 0 {
            #[allow(clippy::cast_sign_loss)]
            return Ok(Some(dirent.size as u64));
        }
        // v0 dirents don't embed sizes.
        let file = self
            .ctx
            .store
            .fs
            .load_seafile(repo.store_id(), repo.version, &dirent.id)
            .await?;
        Ok(Some(file.size))
    }

    async fn open_read(&self, segments: &[String]) -> Result<Box<dyn DavFile>, FsError> {
        if segments.len() < 2 {
            // Neither the mount point nor a repository is a file.
            return Err(FsError::Forbidden);
        }
        let resolved = self.resolve(segments).await.map_err(FsError::from)?;
        match resolved.target {
            Target::Dir { .. } => Err(FsError::Forbidden),
            Target::File { file, mtime } => {
                let mtime = self
                    .entry_mtime(&resolved.repo, &resolved.parent_rel, &resolved.name, mtime)
                    .await;
                Ok(Box::new(SeafDavFile::Reader(BlockReader::new(
                    self.ctx.clone(),
                    resolved.repo.store_id().to_owned(),
                    resolved.repo.version,
                    file,
                    mtime,
                ))))
            }
        }
    }

    async fn open_write(
        &self,
        segments: &[String],
        options: &OpenOptions,
    ) -> Result<Box<dyn DavFile>, FsError> {
        self.ensure_writable().map_err(FsError::from)?;
        if segments.len() < 2 {
            return Err(FsError::Forbidden);
        }

        let (parent, name) = resolve::resolve_parent(&self.ctx, &self.principal, segments)
            .await
            .map_err(FsError::from)?;
        let repo = parent.repo.clone();
        let rel_path = if parent.rel_path.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", parent.rel_path, name)
        };

        self.ensure_rw(&repo, &rel_path).await.map_err(FsError::from)?;

        let existing = self
            .existing_file_size(&repo, &parent, &name)
            .await
            .map_err(FsError::from)?;

        if options.create_new && existing.is_some() {
            return Err(FsError::Exists);
        }
        if existing.is_none() && !(options.create || options.create_new) {
            return Err(FsError::NotFound);
        }

        if existing.is_none() {
            // Gate 3 for a new file: is there any room at all? The delta
            // check with the real length runs again at commit time.
            if self
                .ctx
                .service
                .check_quota(&repo.id, 0)
                .await
                .map_err(GatewayError::from)
                .map_err(FsError::from)?
                < 0
            {
                return Err(FsError::from(GatewayError::QuotaExceeded {
                    owner: repo.owner.clone(),
                }));
            }
            self.ensure_valid_name(&repo, &name)
                .await
                .map_err(FsError::from)?;
            self.ctx
                .service
                .post_empty_file(
                    &repo.id,
                    &Resolved::abs(&parent.rel_path),
                    &name,
                    self.username(),
                )
                .await
                .map_err(GatewayError::from)
                .map_err(FsError::from)?;
        }

        let writer = SpoolWriter::begin(
            self.ctx.clone(),
            self.username().to_owned(),
            repo.id.clone(),
            repo.owner.clone(),
            Resolved::abs(&parent.rel_path),
            name,
            existing.unwrap_or(0),
        )
        .map_err(FsError::from)?;
        Ok(Box::new(SeafDavFile::Writer(writer)))
    }

    /// Shared by `remove_file` and `remove_dir`: the repository service
    /// deletes files and directories through the same call.
    async fn remove(&self, segments: &[String]) -> Result<(), FsError> {
        self.ensure_writable().map_err(FsError::from)?;
        match segments.len() {
            0 => return Err(FsError::Forbidden),
            1 => {
                // Repositories are not deleted through DAV.
                return Err(FsError::from(GatewayError::BadRequest(
                    "refusing to delete a repository root".into(),
                )));
            }
            _ => {}
        }

        let resolved = self.resolve(segments).await.map_err(FsError::from)?;
        self.ensure_rw(&resolved.repo, &resolved.rel_path)
            .await
            .map_err(FsError::from)?;
        self.ctx
            .service
            .del_file(
                &resolved.repo.id,
                &Resolved::abs(&resolved.parent_rel),
                &resolved.name,
                self.username(),
            )
            .await
            .map_err(GatewayError::from)
            .map_err(FsError::from)
    }

    /// Resolve both ends of a MOVE/COPY. The destination repository may
    /// differ from the source; its parent collection must exist.
    async fn resolve_transfer(
        &self,
        from: &[String],
        to: &[String],
    ) -> Result<(Resolved, Resolved, String), FsError> {
        self.ensure_writable().map_err(FsError::from)?;
        if from.len() < 2 {
            return Err(FsError::from(GatewayError::BadRequest(
                "source is a repository root".into(),
            )));
        }
        if to.len() < 2 {
            return Err(FsError::from(GatewayError::BadRequest(
                "destination outside a repository".into(),
            )));
        }

        let src = self.resolve(from).await.map_err(FsError::from)?;
        self.ensure_rw(&src.repo, &src.rel_path)
            .await
            .map_err(FsError::from)?;

        let (dst_parent, dst_name) = resolve::resolve_parent(&self.ctx, &self.principal, to)
            .await
            .map_err(FsError::from)?;
        let dst_rel = if dst_parent.rel_path.is_empty() {
            dst_name.clone()
        } else {
            format!("{}/{}", dst_parent.rel_path, dst_name)
        };
        self.ensure_rw(&dst_parent.repo, &dst_rel)
            .await
            .map_err(FsError::from)?;
        self.ensure_valid_name(&dst_parent.repo, &dst_name)
            .await
            .map_err(FsError::from)?;

        Ok((src, dst_parent, dst_name))
    }
}

impl DavFileSystem for SeafDavFs {
    #[instrument(level = "debug", skip(self, options), fields(path = %path.as_url_string()))]
    fn open<'a>(
        &'a self,
        path: &'a DavPath,
        options: OpenOptions,
    ) -> FsFuture<'a, Box<dyn DavFile>> {
        Box::pin(async move {
            let segments = dav_segments(path);
            if options.append {
                // Partial PUT is out of scope; uploads replace the file.
                return Err(FsError::NotImplemented);
            }
            if options.write || options.create || options.create_new || options.truncate {
                self.open_write(&segments, &options).await
            } else {
                self.open_read(&segments).await
            }
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn read_dir<'a>(
        &'a self,
        path: &'a DavPath,
        _meta: ReadDirMeta,
    ) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        Box::pin(async move {
            let segments = dav_segments(path);

            if segments.is_empty() {
                // The mount point lists the projected repository names.
                let repos = access::visible_repos(self.ctx.service.as_ref(), &self.principal)
                    .await
                    .map_err(FsError::from)?;
                let entries: Vec<Box<dyn DavDirEntry>> =
                    access::project_names(repos, self.ctx.options.show_repo_id)
                        .into_iter()
                        .map(|entry| {
                            Box::new(RepoDirEntry::new(
                                entry.exposed_name,
                                entry.repo,
                                self.ctx.clone(),
                            )) as Box<dyn DavDirEntry>
                        })
                        .collect();
                debug!(count = entries.len(), "listed repositories");
                return Ok(
                    Box::pin(stream::iter(entries.into_iter().map(Ok))) as FsStream<_>
                );
            }

            let resolved = self.resolve(&segments).await.map_err(FsError::from)?;
            let repo = resolved.repo.clone();
            let Some(dir) = resolved.as_dir() else {
                return Err(FsError::Forbidden);
            };

            // v0 dirents carry no mtimes; batch-resolve them for the whole
            // listing in one query.
            let resolved_mtimes: Option<HashMap<String, i64>> = if repo.version == 0 {
                match self
                    .ctx
                    .service
                    .get_files_last_modified(&repo.id, &Resolved::abs(&resolved.rel_path))
                    .await
                {
                    Ok(list) => Some(
                        list.into_iter()
                            .map(|e| (e.file_name, e.last_modified))
                            .collect(),
                    ),
                    Err(e) => {
                        debug!(error = %e, "files-last-modified query failed");
                        None
                    }
                }
            } else {
                None
            };

            let entries: Vec<Box<dyn DavDirEntry>> = dir
                .dirents
                .iter()
                .map(|dirent: &SeafDirent| {
                    let mtime = resolved_mtimes
                        .as_ref()
                        .and_then(|m| m.get(&dirent.name).copied());
                    Box::new(ObjectDirEntry::new(
                        dirent.clone(),
                        mtime,
                        &repo,
                        self.ctx.clone(),
                    )) as Box<dyn DavDirEntry>
                })
                .collect();
            Ok(Box::pin(stream::iter(entries.into_iter().map(Ok))) as FsStream<_>)
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let segments = dav_segments(path);
            if segments.is_empty() {
                return Ok(Box::new(SeafMetaData::Root) as Box<dyn DavMetaData>);
            }

            let resolved = self.resolve(&segments).await.map_err(FsError::from)?;
            let meta = match &resolved.target {
                Target::Dir { dir, mtime } => SeafMetaData::dir(dir.id.clone(), *mtime),
                Target::File { file, mtime } => {
                    let mtime = self
                        .entry_mtime(&resolved.repo, &resolved.parent_rel, &resolved.name, *mtime)
                        .await;
                    SeafMetaData::file(file.id.clone(), file.size, mtime)
                }
            };
            Ok(Box::new(meta) as Box<dyn DavMetaData>)
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            let segments = dav_segments(path);
            self.ensure_writable().map_err(FsError::from)?;
            if segments.len() < 2 {
                // Repositories are not created through MKCOL.
                return Err(FsError::Forbidden);
            }

            let (parent, name) = resolve::resolve_parent(&self.ctx, &self.principal, &segments)
                .await
                .map_err(FsError::from)?;
            if parent.as_dir().is_some_and(|d| d.lookup(&name).is_some()) {
                return Err(FsError::Exists);
            }

            let rel_path = if parent.rel_path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", parent.rel_path, name)
            };
            self.ensure_rw(&parent.repo, &rel_path)
                .await
                .map_err(FsError::from)?;
            self.ensure_valid_name(&parent.repo, &name)
                .await
                .map_err(FsError::from)?;

            self.ctx
                .service
                .post_dir(
                    &parent.repo.id,
                    &Resolved::abs(&parent.rel_path),
                    &name,
                    self.username(),
                )
                .await
                .map_err(GatewayError::from)
                .map_err(FsError::from)
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move { self.remove(&dav_segments(path)).await })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move { self.remove(&dav_segments(path)).await })
    }

    #[instrument(level = "debug", skip(self), fields(from = %from.as_url_string(), to = %to.as_url_string()))]
    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            let from_segments = dav_segments(from);
            let to_segments = dav_segments(to);
            let (src, dst_parent, dst_name) =
                self.resolve_transfer(&from_segments, &to_segments).await?;

            // POSIX-rename convenience: a file already at the destination
            // is deleted first. (The framework only clears destination
            // collections.)
            let dst_rel = if dst_parent.rel_path.is_empty() {
                dst_name.clone()
            } else {
                format!("{}/{}", dst_parent.rel_path, dst_name)
            };
            let existing = self
                .ctx
                .service
                .get_file_id_by_path(&dst_parent.repo.id, &Resolved::abs(&dst_rel))
                .await
                .map_err(GatewayError::from)
                .map_err(FsError::from)?;
            if existing.is_some() {
                debug!(dst = %dst_rel, "deleting destination before move");
                self.ctx
                    .service
                    .del_file(
                        &dst_parent.repo.id,
                        &Resolved::abs(&dst_parent.rel_path),
                        &dst_name,
                        self.username(),
                    )
                    .await
                    .map_err(GatewayError::from)
                    .map_err(FsError::from)?;
            }

            self.ctx
                .service
                .move_file(
                    &src.repo.id,
                    &Resolved::abs(&src.parent_rel),
                    &src.name,
                    &dst_parent.repo.id,
                    &Resolved::abs(&dst_parent.rel_path),
                    &dst_name,
                    self.username(),
                )
                .await
                .map_err(GatewayError::from)
                .map_err(FsError::from)
        })
    }

    #[instrument(level = "debug", skip(self), fields(from = %from.as_url_string(), to = %to.as_url_string()))]
    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            let from_segments = dav_segments(from);
            let to_segments = dav_segments(to);
            let (src, dst_parent, dst_name) =
                self.resolve_transfer(&from_segments, &to_segments).await?;

            self.ctx
                .service
                .copy_file(
                    &src.repo.id,
                    &Resolved::abs(&src.parent_rel),
                    &src.name,
                    &dst_parent.repo.id,
                    &Resolved::abs(&dst_parent.rel_path),
                    &dst_name,
                    self.username(),
                )
                .await
                .map_err(GatewayError::from)
                .map_err(FsError::from)
        })
    }

    fn have_props<'a>(
        &'a self,
        _path: &'a DavPath,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>> {
        // Only live properties are served.
        Box::pin(async { false })
    }
}
