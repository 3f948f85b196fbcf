//! Mapping DAV paths onto the object graph.
//!
//! The leading path segment names a repository (through the projection
//! rules in [`crate::access`]); the remaining segments are walked through
//! directory objects starting at the HEAD commit's root.

use crate::access;
use crate::dc::Principal;
use crate::error::GatewayError;
use crate::filesystem::GatewayContext;
use dav_server::davpath::DavPath;
use seadav_core::{ObjectId, RepoInfo, SeafDir, SeafFile};

/// Path segments of a DAV url, slashes stripped.
pub fn dav_segments(path: &DavPath) -> Vec<String> {
    path.as_url_string()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// What a path resolved to.
pub enum Target {
    Dir {
        dir: SeafDir,
        /// Mtime from the parent's dirent (repo last-modify for the repo
        /// root); -1 for v0 repos.
        mtime: i64,
    },
    File {
        file: SeafFile,
        /// Mtime from the parent's dirent; -1 for v0 repos.
        mtime: i64,
    },
}

/// A fully resolved repository path.
pub struct Resolved {
    pub repo: RepoInfo,
    /// Path inside the repo, no leading or trailing slash. Empty for the
    /// repo root.
    pub rel_path: String,
    /// Parent path of the terminal entry, same normalization.
    pub parent_rel: String,
    /// Terminal entry name; empty for the repo root.
    pub name: String,
    pub target: Target,
}

impl Resolved {
    pub fn is_dir(&self) -> bool {
        matches!(self.target, Target::Dir { .. })
    }

    /// The directory object, when the path resolved to one.
    pub fn as_dir(&self) -> Option<&SeafDir> {
        match &self.target {
            Target::Dir { dir, .. } => Some(dir),
            Target::File { .. } => None,
        }
    }

    /// Absolute form of a rel path, as the repository service expects it.
    pub fn abs(rel: &str) -> String {
        if rel.is_empty() {
            "/".to_owned()
        } else {
            format!("/{rel}")
        }
    }
}

/// Split `segments` into `(repo segment, rest)`; error on the bare root.
pub fn split_repo_segment(segments: &[String]) -> Result<(&str, &[String]), GatewayError> {
    match segments.split_first() {
        Some((first, rest)) => Ok((first.as_str(), rest)),
        None => Err(GatewayError::BadRequest("empty DAV path".into())),
    }
}

/// Load the root directory of `repo` at its current HEAD.
pub async fn load_repo_root(
    ctx: &GatewayContext,
    repo: &RepoInfo,
) -> Result<SeafDir, GatewayError> {
    let head = ObjectId::parse(&repo.head_commit_id)?;
    let root_id = ctx
        .store
        .commits
        .get_root_id(&repo.id, repo.version, &head)
        .await?;
    Ok(ctx
        .store
        .fs
        .load_seafdir(repo.store_id(), repo.version, &root_id)
        .await?)
}

/// Walk `segments` (repo segment first) down to an object.
pub async fn resolve_segments(
    ctx: &GatewayContext,
    principal: &Principal,
    segments: &[String],
) -> Result<Resolved, GatewayError> {
    let (repo_segment, rest) = split_repo_segment(segments)?;
    let repo = access::resolve_repo_segment(ctx.service.as_ref(), principal, repo_segment).await?;
    let mut dir = load_repo_root(ctx, &repo).await?;

    if rest.is_empty() {
        let mtime = repo.last_modify;
        return Ok(Resolved {
            repo,
            rel_path: String::new(),
            parent_rel: String::new(),
            name: String::new(),
            target: Target::Dir { dir, mtime },
        });
    }

    let mut walked: Vec<&str> = Vec::with_capacity(rest.len());
    for (i, segment) in rest.iter().enumerate() {
        let last = i + 1 == rest.len();
        let dirent = dir
            .lookup(segment)
            .ok_or_else(|| GatewayError::NotFound(format!("no entry {segment:?}")))?
            .clone();
        walked.push(segment);

        if dirent.is_dir() {
            dir = ctx
                .store
                .fs
                .load_seafdir(repo.store_id(), repo.version, &dirent.id)
                .await?;
            if last {
                return Ok(Resolved {
                    rel_path: walked.join("/"),
                    parent_rel: walked[..walked.len() - 1].join("/"),
                    name: segment.clone(),
                    target: Target::Dir {
                        dir,
                        mtime: dirent.mtime,
                    },
                    repo,
                });
            }
        } else {
            if !last {
                // A file in the middle of the path: nothing below it exists.
                return Err(GatewayError::NotFound(format!(
                    "{segment:?} is not a directory"
                )));
            }
            let file = ctx
                .store
                .fs
                .load_seafile(repo.store_id(), repo.version, &dirent.id)
                .await?;
            return Ok(Resolved {
                rel_path: walked.join("/"),
                parent_rel: walked[..walked.len() - 1].join("/"),
                name: segment.clone(),
                target: Target::File {
                    file,
                    mtime: dirent.mtime,
                },
                repo,
            });
        }
    }

    unreachable!("loop returns on the last segment")
}

/// Resolve the *parent* collection of a path plus the terminal name,
/// without requiring the terminal entry to exist. Used by the write verbs.
pub async fn resolve_parent(
    ctx: &GatewayContext,
    principal: &Principal,
    segments: &[String],
) -> Result<(Resolved, String), GatewayError> {
    match segments.split_last() {
        None => Err(GatewayError::BadRequest("empty DAV path".into())),
        Some((name, parents)) if parents.is_empty() => Err(GatewayError::Forbidden(format!(
            "cannot create {name:?} outside a repository"
        ))),
        Some((name, parents)) => {
            let parent = resolve_segments(ctx, principal, parents).await?;
            if !parent.is_dir() {
                return Err(GatewayError::NotFound(format!(
                    "parent of {name:?} is not a directory"
                )));
            }
            Ok((parent, name.clone()))
        }
    }
}
