//! The repository service boundary.
//!
//! Everything that mutates a repository, and every query that depends on
//! sharing, groups, quota or permissions, lives behind this trait. The
//! implementation is external (a searpc binding in a stock deployment, an
//! in-memory double in tests); the gateway only assumes the operations are
//! transactional at commit granularity.

use async_trait::async_trait;
use seadav_core::RepoInfo;
use std::path::Path;
use thiserror::Error;

/// Quota value meaning "unlimited".
pub const INFINITE_QUOTA: i64 = -2;

/// Errors surfaced by the repository service.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The service rejected a file or directory name.
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    /// The call reached the service and failed.
    #[error("{0}")]
    Failed(String),

    /// The service could not be reached.
    #[error("repository service unavailable: {0}")]
    Unavailable(String),
}

/// Per-file mtime record returned by [`RepoService::get_files_last_modified`].
#[derive(Debug, Clone)]
pub struct FileLastModified {
    pub file_name: String,
    pub last_modified: i64,
}

/// External repository RPC consumed by the gateway.
///
/// Paths handed to this trait are absolute within the repository and
/// slash-normalized: the root is `"/"`, everything else has a leading and
/// no trailing slash.
#[async_trait]
pub trait RepoService: Send + Sync {
    // -- repo records -----------------------------------------------------

    /// Fetch one repo record. `None` when the repo disappeared.
    async fn get_repo(&self, repo_id: &str) -> Result<Option<RepoInfo>, RpcError>;

    // -- visibility listings ----------------------------------------------

    async fn get_owned_repo_list(&self, username: &str) -> Result<Vec<RepoInfo>, RpcError>;
    async fn get_org_owned_repo_list(
        &self,
        org_id: i64,
        username: &str,
    ) -> Result<Vec<RepoInfo>, RpcError>;

    async fn get_share_in_repo_list(&self, username: &str) -> Result<Vec<RepoInfo>, RpcError>;
    async fn get_org_share_in_repo_list(
        &self,
        org_id: i64,
        username: &str,
    ) -> Result<Vec<RepoInfo>, RpcError>;

    async fn get_group_repos_by_user(&self, username: &str) -> Result<Vec<RepoInfo>, RpcError>;
    async fn get_org_group_repos_by_user(
        &self,
        org_id: i64,
        username: &str,
    ) -> Result<Vec<RepoInfo>, RpcError>;

    async fn get_inner_pub_repo_list(&self) -> Result<Vec<RepoInfo>, RpcError>;
    async fn list_org_inner_pub_repos(&self, org_id: i64) -> Result<Vec<RepoInfo>, RpcError>;

    // -- metadata queries -------------------------------------------------

    /// Batch mtimes for the children of `parent_dir`; the store's v0 format
    /// does not embed them in dirents.
    async fn get_files_last_modified(
        &self,
        repo_id: &str,
        parent_dir: &str,
    ) -> Result<Vec<FileLastModified>, RpcError>;

    /// Path-scoped permission for the principal: `Some("rw")`, `Some("r")`
    /// or `None`.
    async fn check_permission_by_path(
        &self,
        repo_id: &str,
        path: &str,
        username: &str,
    ) -> Result<Option<String>, RpcError>;

    /// Negative return means the owner's quota cannot absorb `delta` more
    /// bytes; [`INFINITE_QUOTA`] owners always pass.
    async fn check_quota(&self, repo_id: &str, delta: i64) -> Result<i64, RpcError>;

    /// Server-side filename validity (empty names, path separators,
    /// reserved names...).
    async fn is_valid_filename(&self, repo_id: &str, name: &str) -> Result<bool, RpcError>;

    /// Id of the file at `path`, `None` when absent.
    async fn get_file_id_by_path(
        &self,
        repo_id: &str,
        path: &str,
    ) -> Result<Option<String>, RpcError>;

    // -- mutations (each produces a new commit) ---------------------------

    async fn post_empty_file(
        &self,
        repo_id: &str,
        parent_dir: &str,
        filename: &str,
        username: &str,
    ) -> Result<(), RpcError>;

    async fn post_dir(
        &self,
        repo_id: &str,
        parent_dir: &str,
        dirname: &str,
        username: &str,
    ) -> Result<(), RpcError>;

    /// Replace (or create) `filename` under `parent_dir` with the spooled
    /// bytes at `tmp_file`.
    async fn put_file(
        &self,
        repo_id: &str,
        tmp_file: &Path,
        parent_dir: &str,
        filename: &str,
        username: &str,
    ) -> Result<(), RpcError>;

    async fn del_file(
        &self,
        repo_id: &str,
        parent_dir: &str,
        filename: &str,
        username: &str,
    ) -> Result<(), RpcError>;

    #[allow(clippy::too_many_arguments)]
    async fn move_file(
        &self,
        src_repo_id: &str,
        src_dir: &str,
        src_filename: &str,
        dst_repo_id: &str,
        dst_dir: &str,
        dst_filename: &str,
        username: &str,
    ) -> Result<(), RpcError>;

    #[allow(clippy::too_many_arguments)]
    async fn copy_file(
        &self,
        src_repo_id: &str,
        src_dir: &str,
        src_filename: &str,
        dst_repo_id: &str,
        dst_dir: &str,
        dst_filename: &str,
        username: &str,
    ) -> Result<(), RpcError>;
}
