//! Repository records.

/// The gateway-side view of a repository, as returned by the external
/// repository service. Immutable for the lifetime of one request; re-fetched
/// after a write to pick up the new head commit.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Stable hex id; the access handle for every RPC.
    pub id: String,
    /// Display name. Not unique within a principal's visible set.
    pub name: String,
    /// On-disk encoding version (0 or 1).
    pub version: u32,
    pub head_commit_id: String,
    pub encrypted: bool,
    pub is_virtual: bool,
    /// For virtual repos, the id of the store actually holding the objects.
    virtual_store_id: Option<String>,
    /// Mtime of the last commit, unix seconds.
    pub last_modify: i64,
    /// Owner identity, used for quota accounting.
    pub owner: String,
}

impl RepoInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: u32,
        head_commit_id: impl Into<String>,
        encrypted: bool,
        virtual_store_id: Option<String>,
        last_modify: i64,
        owner: impl Into<String>,
    ) -> Self {
        RepoInfo {
            id: id.into(),
            name: name.into(),
            version,
            head_commit_id: head_commit_id.into(),
            encrypted,
            is_virtual: virtual_store_id.is_some(),
            virtual_store_id,
            last_modify,
            owner: owner.into(),
        }
    }

    /// The store the repo's objects live in. Equals the repo id except for
    /// virtual repos.
    pub fn store_id(&self) -> &str {
        self.virtual_store_id.as_deref().unwrap_or(&self.id)
    }
}
