//! File handles: the block-walking reader and the spooling writer.

use crate::error::GatewayError;
use crate::filesystem::GatewayContext;
use crate::metadata::SeafMetaData;
use bytes::{Buf, Bytes, BytesMut};
use dav_server::fs::{DavFile, DavMetaData, FsError, FsFuture};
use seadav_core::{ObjectId, SeafFile};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// A file resource opened for reading or writing.
pub enum SeafDavFile {
    Reader(BlockReader),
    Writer(SpoolWriter),
}

impl std::fmt::Debug for SeafDavFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeafDavFile::Reader(r) => f
                .debug_struct("SeafDavFile::Reader")
                .field("file", &r.file.id)
                .field("position", &r.position)
                .finish(),
            SeafDavFile::Writer(w) => f
                .debug_struct("SeafDavFile::Writer")
                .field("name", &w.name)
                .field("written", &w.written)
                .finish(),
        }
    }
}

/// Lazy block-by-block reader over a file object.
///
/// State is the index of the next block to load, the consumed offset inside
/// the currently loaded block, and the block bytes themselves. Blocks may
/// have arbitrary, differing sizes; a read shorter than requested with no
/// blocks left signals EOF.
pub struct BlockReader {
    ctx: Arc<GatewayContext>,
    store_id: String,
    version: u32,
    file: SeafFile,
    mtime: i64,
    /// Logical read position requested through `seek`.
    position: u64,
    /// Bytes of the block sequence consumed so far by the cursor below.
    streamed: u64,
    block_index: usize,
    block_offset: usize,
    current: Option<Bytes>,
}

impl BlockReader {
    pub fn new(
        ctx: Arc<GatewayContext>,
        store_id: String,
        version: u32,
        file: SeafFile,
        mtime: i64,
    ) -> Self {
        BlockReader {
            ctx,
            store_id,
            version,
            file,
            mtime,
            position: 0,
            streamed: 0,
            block_index: 0,
            block_offset: 0,
            current: None,
        }
    }

    fn rewind(&mut self) {
        self.streamed = 0;
        self.block_index = 0;
        self.block_offset = 0;
        self.current = None;
    }

    /// Load blocks until the cursor sits at `self.position`, then copy up to
    /// `count` bytes.
    async fn read_at_cursor(&mut self, count: usize) -> Result<Bytes, GatewayError> {
        if self.position < self.streamed {
            // A backwards seek restarts the walk; block sizes are unknown
            // until loaded, so there is nothing better to resume from.
            self.rewind();
        }

        let mut out = BytesMut::with_capacity(count.min(64 * 1024));
        loop {
            let skip = self.position - self.streamed;
            let done = skip == 0 && out.len() >= count;
            if done {
                break;
            }

            let current = match &self.current {
                Some(b) if self.block_offset < b.len() => b,
                _ => {
                    let Some(block_id) = self.file.block_ids.get(self.block_index) else {
                        break; // EOF
                    };
                    let block = self
                        .ctx
                        .store
                        .blocks
                        .read(&self.store_id, self.version, block_id)
                        .await?;
                    self.block_index += 1;
                    self.block_offset = 0;
                    self.current = Some(block);
                    continue;
                }
            };

            let remaining_in_block = current.len() - self.block_offset;
            if skip > 0 {
                // Discard bytes below the logical position.
                let discard = usize::try_from(skip.min(remaining_in_block as u64))
                    .unwrap_or(remaining_in_block);
                self.block_offset += discard;
                self.streamed += discard as u64;
            } else {
                let take = remaining_in_block.min(count - out.len());
                out.extend_from_slice(
                    &current.slice(self.block_offset..self.block_offset + take),
                );
                self.block_offset += take;
                self.streamed += take as u64;
                self.position += take as u64;
            }
        }

        Ok(out.freeze())
    }
}

/// Spooling writer: request bytes land in a uniquely named temp file; the
/// final flush re-checks quota against the spooled length and hands the
/// file to the repository service.
///
/// The temp file is removed on every exit path: on success explicitly, on
/// abort (drop without flush, client disconnect, any error) by
/// `NamedTempFile`'s drop.
pub struct SpoolWriter {
    ctx: Arc<GatewayContext>,
    username: String,
    repo_id: String,
    owner: String,
    /// Absolute parent dir inside the repo ("/" rooted).
    parent_dir: String,
    name: String,
    /// Size of the file being overwritten; 0 for a new file.
    current_size: u64,
    spool: Option<NamedTempFile>,
    spool_path: PathBuf,
    handle: Option<tokio::fs::File>,
    written: u64,
    committed: bool,
}

impl SpoolWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        ctx: Arc<GatewayContext>,
        username: String,
        repo_id: String,
        owner: String,
        parent_dir: String,
        name: String,
        current_size: u64,
    ) -> Result<Self, GatewayError> {
        let spool = NamedTempFile::new_in(&ctx.options.tmpdir)?;
        let handle = tokio::fs::File::from_std(spool.reopen()?);
        let spool_path = spool.path().to_path_buf();
        debug!(spool = %spool_path.display(), %name, "opened write spool");
        Ok(SpoolWriter {
            ctx,
            username,
            repo_id,
            owner,
            parent_dir,
            name,
            current_size,
            spool: Some(spool),
            spool_path,
            handle: Some(handle),
            written: 0,
            committed: false,
        })
    }

    async fn append(&mut self, buf: &[u8]) -> Result<(), FsError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(FsError::GeneralFailure);
        };
        handle.write_all(buf).await.map_err(|e| {
            warn!(error = %e, "spool write failed");
            FsError::GeneralFailure
        })?;
        self.written += buf.len() as u64;
        Ok(())
    }

    /// End of a successful upload: quota re-check with the true spooled
    /// length, then commit through the repository service.
    async fn commit(&mut self) -> Result<(), GatewayError> {
        if self.committed {
            return Ok(());
        }

        if let Some(handle) = self.handle.as_mut() {
            handle.flush().await?;
            handle.sync_all().await?;
        }
        self.handle = None;

        let spooled = tokio::fs::metadata(&self.spool_path).await?.len();

        // The open-time check only proved there was room for a new file;
        // now the length is known the delta check is authoritative. This
        // also covers chunked uploads that sent no Content-Length.
        #[allow(clippy::cast_possible_wrap)]
        let delta = spooled as i64 - self.current_size as i64;
        if self
            .ctx
            .service
            .check_quota(&self.repo_id, delta)
            .await
            .map_err(GatewayError::from)?
            < 0
        {
            return Err(GatewayError::QuotaExceeded {
                owner: self.owner.clone(),
            });
        }

        self.ctx
            .service
            .put_file(
                &self.repo_id,
                &self.spool_path,
                &self.parent_dir,
                &self.name,
                &self.username,
            )
            .await?;

        self.committed = true;

        // The commit advanced the repo head; re-read the record so the new
        // state is observable (and logged) before the response goes out.
        match self.ctx.service.get_repo(&self.repo_id).await {
            Ok(Some(repo)) => {
                debug!(name = %self.name, bytes = spooled, head = %repo.head_commit_id, "upload committed");
            }
            Ok(None) => warn!(repo = %self.repo_id, "repository vanished after commit"),
            Err(e) => debug!(error = %e, "could not re-read repo record after commit"),
        }

        if let Some(spool) = self.spool.take() {
            // Unlink eagerly rather than waiting for drop.
            let _ = spool.close();
        }
        Ok(())
    }
}

impl DavFile for SeafDavFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let meta = match self {
                SeafDavFile::Reader(r) => {
                    SeafMetaData::file(r.file.id.clone(), r.file.size, r.mtime)
                }
                SeafDavFile::Writer(w) => SeafMetaData::file(ObjectId::zero(), w.written, 0),
            };
            Ok(Box::new(meta) as Box<dyn DavMetaData>)
        })
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        Box::pin(async move {
            match self {
                SeafDavFile::Reader(r) => {
                    r.read_at_cursor(count).await.map_err(FsError::from)
                }
                SeafDavFile::Writer(_) => Err(FsError::Forbidden),
            }
        })
    }

    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()> {
        Box::pin(async move {
            match self {
                SeafDavFile::Reader(_) => Err(FsError::Forbidden),
                SeafDavFile::Writer(w) => w.append(&buf).await,
            }
        })
    }

    fn write_buf(&mut self, mut buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()> {
        Box::pin(async move {
            let bytes = buf.copy_to_bytes(buf.remaining());
            match self {
                SeafDavFile::Reader(_) => Err(FsError::Forbidden),
                SeafDavFile::Writer(w) => w.append(&bytes).await,
            }
        })
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        Box::pin(async move {
            match self {
                SeafDavFile::Reader(r) => {
                    let base = match pos {
                        SeekFrom::Start(n) => i128::from(n),
                        SeekFrom::End(n) => i128::from(r.file.size) + i128::from(n),
                        SeekFrom::Current(n) => i128::from(r.position) + i128::from(n),
                    };
                    let new_pos = u64::try_from(base.max(0)).unwrap_or(0);
                    r.position = new_pos;
                    Ok(new_pos)
                }
                SeafDavFile::Writer(w) => {
                    // Uploads are strictly sequential; only no-op seeks to
                    // the current tail are honoured.
                    match pos {
                        SeekFrom::Start(n) if n == w.written => Ok(n),
                        SeekFrom::Current(0) => Ok(w.written),
                        SeekFrom::End(0) => Ok(w.written),
                        _ => Err(FsError::NotImplemented),
                    }
                }
            }
        })
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        Box::pin(async move {
            match self {
                SeafDavFile::Reader(_) => Ok(()),
                SeafDavFile::Writer(w) => w.commit().await.map_err(FsError::from),
            }
        })
    }
}

impl Drop for SeafDavFile {
    fn drop(&mut self) {
        if let SeafDavFile::Writer(w) = self
            && !w.committed
            && w.spool.is_some()
        {
            // Aborted upload (error or client disconnect): the NamedTempFile
            // drop below unlinks the spool.
            debug!(name = %w.name, written = w.written, "discarding aborted upload spool");
        }
    }
}
