//! Object model for a content-addressed, commit-versioned file repository.
//!
//! A repository is a chain of immutable commits; each commit names the id of
//! the directory object that is the repository root at that snapshot.
//! Directory and file objects are content-addressed blobs in one of two
//! on-disk encodings (a legacy binary "v0" format and a zlib-compressed JSON
//! "v1" format), fetched through a pluggable [`backend::BlobBackend`].
//!
//! Nothing in this crate ever writes to the store: all mutation happens in
//! the external repository service, after which callers re-read the repo
//! record to pick up the new head commit.

pub mod backend;
pub mod commit;
pub mod error;
pub mod fs;
pub mod obj;
pub mod repo;
pub mod store;

pub use commit::Commit;
pub use error::StoreError;
pub use fs::{DirentKind, SeafDir, SeafDirent, SeafFile};
pub use obj::{ObjectId, ObjectKind, ZERO_OBJ_ID};
pub use repo::RepoInfo;
pub use store::{BlockManager, CommitManager, FsManager, ObjectStore};
