//! Repository visibility and name projection.
//!
//! A principal sees the union of owned, shared-in, group and
//! organization-public repositories. Encrypted repositories are filtered
//! out entirely. Within one principal's view, colliding names are
//! disambiguated by suffixing the first six hex digits of the repo id.

use crate::dc::Principal;
use crate::error::GatewayError;
use crate::service::RepoService;
use seadav_core::RepoInfo;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A repository with the name it is exposed under.
#[derive(Debug, Clone)]
pub struct RepoEntry {
    pub exposed_name: String,
    pub repo: RepoInfo,
}

/// Enumerate the repositories `principal` can see.
///
/// The owned listing is authoritative: its failure fails the request. The
/// auxiliary listings (shares, groups, public) are best effort: a failing
/// source is logged and skipped so one broken share does not take the whole
/// namespace down.
pub async fn visible_repos(
    service: &dyn RepoService,
    principal: &Principal,
) -> Result<Vec<RepoInfo>, GatewayError> {
    let username = &principal.username;

    let owned = match principal.org_id {
        Some(org) => service.get_org_owned_repo_list(org, username).await?,
        None => service.get_owned_repo_list(username).await?,
    };

    let mut repos = owned;

    let shared = match principal.org_id {
        Some(org) => service.get_org_share_in_repo_list(org, username).await,
        None => service.get_share_in_repo_list(username).await,
    };
    match shared {
        Ok(list) => repos.extend(list),
        Err(e) => warn!(%username, error = %e, "skipping share-in repo listing"),
    }

    let grouped = match principal.org_id {
        Some(org) => service.get_org_group_repos_by_user(org, username).await,
        None => service.get_group_repos_by_user(username).await,
    };
    match grouped {
        Ok(list) => repos.extend(list),
        Err(e) => warn!(%username, error = %e, "skipping group repo listing"),
    }

    if !principal.is_guest {
        let public = match principal.org_id {
            Some(org) => service.list_org_inner_pub_repos(org).await,
            None => service.get_inner_pub_repo_list().await,
        };
        match public {
            Ok(list) => repos.extend(list),
            Err(e) => warn!(%username, error = %e, "skipping public repo listing"),
        }
    }

    let mut seen = HashSet::new();
    repos.retain(|r| !r.encrypted && seen.insert(r.id.clone()));
    repos.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(repos)
}

/// Exposed name for `repo` given how many visible repos share its name.
fn exposed_name(repo: &RepoInfo, collisions: usize, show_repo_id: bool) -> String {
    if show_repo_id || collisions > 1 {
        format!("{}-{}", repo.name, &repo.id[..6.min(repo.id.len())])
    } else {
        repo.name.clone()
    }
}

/// Project a visible set into unique DAV child names.
///
/// Output is ordered by exposed name, which keeps colliding entries in
/// ascending repo-id order (the suffix is derived from the id and the
/// input is id-sorted).
pub fn project_names(repos: Vec<RepoInfo>, show_repo_id: bool) -> Vec<RepoEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for repo in &repos {
        *counts.entry(repo.name.as_str()).or_default() += 1;
    }

    let mut entries: Vec<RepoEntry> = repos
        .iter()
        .map(|repo| RepoEntry {
            exposed_name: exposed_name(repo, counts[repo.name.as_str()], show_repo_id),
            repo: repo.clone(),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.exposed_name
            .cmp(&b.exposed_name)
            .then_with(|| a.repo.id.cmp(&b.repo.id))
    });
    entries
}

/// Resolve an incoming path segment to a repository.
///
/// A bare-name match wins over the suffixed interpretation; only when no
/// visible repo carries the segment as its plain name is `name-<hex6>`
/// tried. Bare-name ties resolve to the lowest repo id (the input is
/// id-sorted).
pub async fn resolve_repo_segment(
    service: &dyn RepoService,
    principal: &Principal,
    segment: &str,
) -> Result<RepoInfo, GatewayError> {
    let repos = visible_repos(service, principal).await?;

    if let Some(repo) = repos.iter().find(|r| r.name == segment) {
        return Ok(repo.clone());
    }

    if let Some((name, hex6)) = segment.rsplit_once('-')
        && hex6.len() == 6
        && hex6.bytes().all(|b| b.is_ascii_hexdigit())
        && let Some(repo) = repos
            .iter()
            .find(|r| r.name == name && r.id.starts_with(hex6))
    {
        return Ok(repo.clone());
    }

    Err(GatewayError::NotFound(format!("no repository {segment:?}")))
}
