//! Shared test harness: an in-memory object store and repository service
//! behind a live gateway on an ephemeral port.
//!
//! The repository service keeps a native directory tree per repo and
//! re-serializes it into real v1 objects (zlib+JSON, content-addressed)
//! after every mutation, so reads exercise the production codecs end to
//! end.

#![allow(dead_code)] // each integration test binary uses a subset

use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use seadav_core::backend::{Backends, BlobBackend};
use seadav_core::{ObjectId, ObjectKind, ObjectStore, RepoInfo, StoreError};
use seadav_webdav::config::{GatewayConfig, ProviderOptions};
use seadav_webdav::dc::{DomainController, Principal};
use seadav_webdav::server::GatewayServer;
use seadav_webdav::service::{
    FileLastModified, INFINITE_QUOTA, RepoService, RpcError,
};
use seadav_webdav::filesystem::GatewayContext;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub const USER: &str = "test@example.com";
pub const PASSWORD: &str = "secret";

/// Number of `response` elements in a multistatus body, whatever namespace
/// prefix the server picked.
pub fn count_responses(body: &str) -> usize {
    let prefixed = body.matches("<D:response>").count();
    if prefixed > 0 {
        prefixed
    } else {
        body.matches("<response>").count()
    }
}

// ---------------------------------------------------------------------------
// In-memory blob store
// ---------------------------------------------------------------------------

type StoreMap = Arc<Mutex<HashMap<(ObjectKind, String), Vec<u8>>>>;

#[derive(Clone)]
pub struct MemStore {
    objects: StoreMap,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            objects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn insert(&self, kind: ObjectKind, id: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((kind, id.to_owned()), data);
    }

    fn get(&self, kind: ObjectKind, id: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(&(kind, id.to_owned())).cloned()
    }

    pub fn backends(&self) -> Backends {
        Backends {
            commits: Arc::new(MemBackend {
                kind: ObjectKind::Commits,
                store: self.clone(),
            }),
            fs: Arc::new(MemBackend {
                kind: ObjectKind::Fs,
                store: self.clone(),
            }),
            blocks: Arc::new(MemBackend {
                kind: ObjectKind::Blocks,
                store: self.clone(),
            }),
        }
    }
}

struct MemBackend {
    kind: ObjectKind,
    store: MemStore,
}

#[async_trait]
impl BlobBackend for MemBackend {
    async fn read(
        &self,
        _store_id: &str,
        _version: u32,
        obj_id: &ObjectId,
    ) -> Result<Bytes, StoreError> {
        self.store
            .get(self.kind, obj_id.as_str())
            .map(Bytes::from)
            .ok_or_else(|| StoreError::NotFound {
                kind: self.kind,
                id: obj_id.to_string(),
            })
    }
}

fn object_id_of(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)[..40].to_owned()
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

// ---------------------------------------------------------------------------
// In-memory repository service
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Node {
    Dir(BTreeMap<String, Node>),
    File { chunks: Vec<Vec<u8>>, mtime: i64 },
}

impl Node {
    fn empty_dir() -> Node {
        Node::Dir(BTreeMap::new())
    }

    fn size(&self) -> u64 {
        match self {
            Node::Dir(children) => children.values().map(Node::size).sum(),
            Node::File { chunks, .. } => chunks.iter().map(|c| c.len() as u64).sum(),
        }
    }
}

struct RepoState {
    name: String,
    owner: String,
    tree: Node,
    head: String,
    last_modify: i64,
    /// Absolute path -> file object id, refreshed on every sync.
    file_ids: HashMap<String, String>,
}

pub struct MemRepoService {
    store: MemStore,
    repos: Mutex<HashMap<String, RepoState>>,
    permissions: Mutex<HashMap<String, String>>,
    quotas: Mutex<HashMap<String, i64>>,
    share_in: Mutex<HashMap<String, Vec<String>>>,
    group_repos: Mutex<HashMap<String, Vec<String>>>,
    inner_pub: Mutex<Vec<String>>,
    clock: AtomicI64,
}

impl MemRepoService {
    pub fn new(store: MemStore) -> Arc<Self> {
        Arc::new(MemRepoService {
            store,
            repos: Mutex::new(HashMap::new()),
            permissions: Mutex::new(HashMap::new()),
            quotas: Mutex::new(HashMap::new()),
            share_in: Mutex::new(HashMap::new()),
            group_repos: Mutex::new(HashMap::new()),
            inner_pub: Mutex::new(Vec::new()),
            clock: AtomicI64::new(1_700_000_000),
        })
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    pub fn create_repo(&self, name: &str, owner: &str) -> String {
        let id = object_id_of(format!("repo:{name}:{owner}:{}", self.tick()).as_bytes());
        self.create_repo_with_id(&id, name, owner);
        id
    }

    pub fn create_repo_with_id(&self, id: &str, name: &str, owner: &str) {
        let mut state = RepoState {
            name: name.to_owned(),
            owner: owner.to_owned(),
            tree: Node::empty_dir(),
            head: String::new(),
            last_modify: self.tick(),
            file_ids: HashMap::new(),
        };
        self.sync(&mut state);
        self.repos.lock().unwrap().insert(id.to_owned(), state);
    }

    pub fn remove_repo(&self, id: &str) {
        self.repos.lock().unwrap().remove(id);
    }

    pub fn set_permission(&self, repo_id: &str, perm: &str) {
        self.permissions
            .lock()
            .unwrap()
            .insert(repo_id.to_owned(), perm.to_owned());
    }

    /// Owner quota in bytes; [`INFINITE_QUOTA`] for unlimited.
    pub fn set_quota(&self, owner: &str, quota: i64) {
        self.quotas.lock().unwrap().insert(owner.to_owned(), quota);
    }

    pub fn share_repo_with(&self, repo_id: &str, username: &str) {
        self.share_in
            .lock()
            .unwrap()
            .entry(username.to_owned())
            .or_default()
            .push(repo_id.to_owned());
    }

    pub fn add_group_repo(&self, repo_id: &str, username: &str) {
        self.group_repos
            .lock()
            .unwrap()
            .entry(username.to_owned())
            .or_default()
            .push(repo_id.to_owned());
    }

    pub fn set_inner_pub(&self, repo_id: &str) {
        self.inner_pub.lock().unwrap().push(repo_id.to_owned());
    }

    /// Plant a file with explicit block boundaries, bypassing the RPC
    /// surface. Used by streaming tests.
    pub fn insert_chunked_file(&self, repo_id: &str, path: &str, chunks: Vec<Vec<u8>>) {
        let mtime = self.tick();
        let mut repos = self.repos.lock().unwrap();
        let state = repos.get_mut(repo_id).expect("repo exists");
        let (parent, name) = split_abs(path);
        let dir = walk_mut(&mut state.tree, &parent).expect("parent exists");
        let Node::Dir(children) = dir else {
            panic!("parent is not a directory")
        };
        children.insert(name, Node::File { chunks, mtime });
        state.last_modify = mtime;
        self.sync(state);
    }

    /// Serialize the native tree into content-addressed v1 objects and a
    /// fresh commit.
    fn sync(&self, state: &mut RepoState) {
        let mut file_ids = HashMap::new();
        let root_id = self.write_node(&state.tree, "", state.last_modify, &mut file_ids);
        let commit = format!(
            r#"{{"root_id": "{root_id}", "ctime": {}, "creator_name": "{}"}}"#,
            state.last_modify, state.owner
        );
        let commit_bytes = commit.into_bytes();
        let commit_id = object_id_of(&commit_bytes);
        self.store.insert(ObjectKind::Commits, &commit_id, commit_bytes);
        state.head = commit_id;
        state.file_ids = file_ids;
    }

    fn write_node(
        &self,
        node: &Node,
        abs_path: &str,
        mtime: i64,
        file_ids: &mut HashMap<String, String>,
    ) -> String {
        match node {
            Node::File { chunks, mtime: _ } => {
                let mut block_ids = Vec::new();
                for chunk in chunks {
                    let block_id = object_id_of(chunk);
                    self.store.insert(ObjectKind::Blocks, &block_id, chunk.clone());
                    block_ids.push(format!("\"{block_id}\""));
                }
                let size: u64 = chunks.iter().map(|c| c.len() as u64).sum();
                let json = format!(
                    r#"{{"block_ids": [{}], "size": {size}, "type": 1, "version": 1}}"#,
                    block_ids.join(", ")
                );
                let bytes = zlib(json.as_bytes());
                let id = object_id_of(&bytes);
                self.store.insert(ObjectKind::Fs, &id, bytes);
                file_ids.insert(
                    if abs_path.is_empty() {
                        "/".to_owned()
                    } else {
                        abs_path.to_owned()
                    },
                    id.clone(),
                );
                id
            }
            Node::Dir(children) => {
                if children.is_empty() {
                    return seadav_core::ZERO_OBJ_ID.to_owned();
                }
                let mut dirents = Vec::new();
                for (name, child) in children {
                    let child_path = format!("{abs_path}/{name}");
                    let child_id = self.write_node(child, &child_path, mtime, file_ids);
                    let (mode, child_mtime, size) = match child {
                        Node::Dir(_) => (0o040_755, mtime, 0),
                        Node::File { chunks, mtime } => (
                            0o100_644,
                            *mtime,
                            chunks.iter().map(|c| c.len() as i64).sum(),
                        ),
                    };
                    dirents.push(format!(
                        r#"{{"name": {}, "id": "{child_id}", "mode": {mode}, "mtime": {child_mtime}, "size": {size}}}"#,
                        serde_json::to_string(name).unwrap()
                    ));
                }
                let json = format!(
                    r#"{{"dirents": [{}], "type": 3, "version": 1}}"#,
                    dirents.join(", ")
                );
                let bytes = zlib(json.as_bytes());
                let id = object_id_of(&bytes);
                self.store.insert(ObjectKind::Fs, &id, bytes);
                id
            }
        }
    }

    fn repo_info(&self, id: &str, state: &RepoState) -> RepoInfo {
        RepoInfo::new(
            id,
            state.name.clone(),
            1,
            state.head.clone(),
            false,
            None,
            state.last_modify,
            state.owner.clone(),
        )
    }

    fn list_by_ids(&self, ids: &[String]) -> Vec<RepoInfo> {
        let repos = self.repos.lock().unwrap();
        ids.iter()
            .filter_map(|id| repos.get(id).map(|s| self.repo_info(id, s)))
            .collect()
    }

    fn usage_of_owner(&self, owner: &str) -> u64 {
        let repos = self.repos.lock().unwrap();
        repos
            .values()
            .filter(|s| s.owner == owner)
            .map(|s| s.tree.size())
            .sum()
    }

    fn mutate<R>(
        &self,
        repo_id: &str,
        f: impl FnOnce(&mut Node) -> Result<R, RpcError>,
    ) -> Result<R, RpcError> {
        let mut repos = self.repos.lock().unwrap();
        let state = repos
            .get_mut(repo_id)
            .ok_or_else(|| RpcError::Failed(format!("no repo {repo_id}")))?;
        let out = f(&mut state.tree)?;
        state.last_modify = self.tick();
        self.sync(state);
        Ok(out)
    }
}

fn split_abs(path: &str) -> (Vec<String>, String) {
    let mut parts: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    let name = parts.pop().unwrap_or_default();
    (parts, name)
}

fn walk_mut<'a>(node: &'a mut Node, parts: &[String]) -> Option<&'a mut Node> {
    let mut current = node;
    for part in parts {
        match current {
            Node::Dir(children) => current = children.get_mut(part)?,
            Node::File { .. } => return None,
        }
    }
    Some(current)
}

fn dir_children<'a>(node: &'a mut Node, parent: &str) -> Result<&'a mut BTreeMap<String, Node>, RpcError> {
    let (parts, name) = split_abs(parent);
    let mut full = parts;
    if !name.is_empty() {
        full.push(name);
    }
    match walk_mut(node, &full) {
        Some(Node::Dir(children)) => Ok(children),
        _ => Err(RpcError::Failed(format!("no directory {parent}"))),
    }
}

#[async_trait]
impl RepoService for MemRepoService {
    async fn get_repo(&self, repo_id: &str) -> Result<Option<RepoInfo>, RpcError> {
        let repos = self.repos.lock().unwrap();
        Ok(repos.get(repo_id).map(|s| self.repo_info(repo_id, s)))
    }

    async fn get_owned_repo_list(&self, username: &str) -> Result<Vec<RepoInfo>, RpcError> {
        let repos = self.repos.lock().unwrap();
        Ok(repos
            .iter()
            .filter(|(_, s)| s.owner == username)
            .map(|(id, s)| self.repo_info(id, s))
            .collect())
    }

    async fn get_org_owned_repo_list(
        &self,
        _org_id: i64,
        username: &str,
    ) -> Result<Vec<RepoInfo>, RpcError> {
        self.get_owned_repo_list(username).await
    }

    async fn get_share_in_repo_list(&self, username: &str) -> Result<Vec<RepoInfo>, RpcError> {
        let ids = self
            .share_in
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .unwrap_or_default();
        Ok(self.list_by_ids(&ids))
    }

    async fn get_org_share_in_repo_list(
        &self,
        _org_id: i64,
        username: &str,
    ) -> Result<Vec<RepoInfo>, RpcError> {
        self.get_share_in_repo_list(username).await
    }

    async fn get_group_repos_by_user(&self, username: &str) -> Result<Vec<RepoInfo>, RpcError> {
        let ids = self
            .group_repos
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .unwrap_or_default();
        Ok(self.list_by_ids(&ids))
    }

    async fn get_org_group_repos_by_user(
        &self,
        _org_id: i64,
        username: &str,
    ) -> Result<Vec<RepoInfo>, RpcError> {
        self.get_group_repos_by_user(username).await
    }

    async fn get_inner_pub_repo_list(&self) -> Result<Vec<RepoInfo>, RpcError> {
        let ids = self.inner_pub.lock().unwrap().clone();
        Ok(self.list_by_ids(&ids))
    }

    async fn list_org_inner_pub_repos(&self, _org_id: i64) -> Result<Vec<RepoInfo>, RpcError> {
        self.get_inner_pub_repo_list().await
    }

    async fn get_files_last_modified(
        &self,
        repo_id: &str,
        parent_dir: &str,
    ) -> Result<Vec<FileLastModified>, RpcError> {
        let mut repos = self.repos.lock().unwrap();
        let state = repos
            .get_mut(repo_id)
            .ok_or_else(|| RpcError::Failed(format!("no repo {repo_id}")))?;
        let children = dir_children(&mut state.tree, parent_dir)?;
        Ok(children
            .iter()
            .filter_map(|(name, node)| match node {
                Node::File { mtime, .. } => Some(FileLastModified {
                    file_name: name.clone(),
                    last_modified: *mtime,
                }),
                Node::Dir(_) => None,
            })
            .collect())
    }

    async fn check_permission_by_path(
        &self,
        repo_id: &str,
        _path: &str,
        _username: &str,
    ) -> Result<Option<String>, RpcError> {
        let perms = self.permissions.lock().unwrap();
        Ok(Some(
            perms.get(repo_id).cloned().unwrap_or_else(|| "rw".to_owned()),
        ))
    }

    async fn check_quota(&self, repo_id: &str, delta: i64) -> Result<i64, RpcError> {
        let owner = {
            let repos = self.repos.lock().unwrap();
            repos
                .get(repo_id)
                .ok_or_else(|| RpcError::Failed(format!("no repo {repo_id}")))?
                .owner
                .clone()
        };
        let quota = self
            .quotas
            .lock()
            .unwrap()
            .get(&owner)
            .copied()
            .unwrap_or(INFINITE_QUOTA);
        if quota == INFINITE_QUOTA {
            return Ok(0);
        }
        #[allow(clippy::cast_possible_wrap)]
        let usage = self.usage_of_owner(&owner) as i64;
        if usage + delta >= quota { Ok(-1) } else { Ok(0) }
    }

    async fn is_valid_filename(&self, _repo_id: &str, name: &str) -> Result<bool, RpcError> {
        Ok(!name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\'))
    }

    async fn get_file_id_by_path(
        &self,
        repo_id: &str,
        path: &str,
    ) -> Result<Option<String>, RpcError> {
        let repos = self.repos.lock().unwrap();
        let state = repos
            .get(repo_id)
            .ok_or_else(|| RpcError::Failed(format!("no repo {repo_id}")))?;
        Ok(state.file_ids.get(path).cloned())
    }

    async fn post_empty_file(
        &self,
        repo_id: &str,
        parent_dir: &str,
        filename: &str,
        _username: &str,
    ) -> Result<(), RpcError> {
        let mtime = self.tick();
        self.mutate(repo_id, |tree| {
            let children = dir_children(tree, parent_dir)?;
            children
                .entry(filename.to_owned())
                .or_insert(Node::File {
                    chunks: Vec::new(),
                    mtime,
                });
            Ok(())
        })
    }

    async fn post_dir(
        &self,
        repo_id: &str,
        parent_dir: &str,
        dirname: &str,
        _username: &str,
    ) -> Result<(), RpcError> {
        self.mutate(repo_id, |tree| {
            let children = dir_children(tree, parent_dir)?;
            if children.contains_key(dirname) {
                return Err(RpcError::Failed(format!("{dirname} exists")));
            }
            children.insert(dirname.to_owned(), Node::empty_dir());
            Ok(())
        })
    }

    async fn put_file(
        &self,
        repo_id: &str,
        tmp_file: &Path,
        parent_dir: &str,
        filename: &str,
        _username: &str,
    ) -> Result<(), RpcError> {
        let content =
            std::fs::read(tmp_file).map_err(|e| RpcError::Failed(format!("spool read: {e}")))?;
        let mtime = self.tick();
        self.mutate(repo_id, |tree| {
            let children = dir_children(tree, parent_dir)?;
            children.insert(
                filename.to_owned(),
                Node::File {
                    chunks: if content.is_empty() {
                        Vec::new()
                    } else {
                        vec![content]
                    },
                    mtime,
                },
            );
            Ok(())
        })
    }

    async fn del_file(
        &self,
        repo_id: &str,
        parent_dir: &str,
        filename: &str,
        _username: &str,
    ) -> Result<(), RpcError> {
        self.mutate(repo_id, |tree| {
            if let Ok(children) = dir_children(tree, parent_dir) {
                children.remove(filename);
            }
            Ok(())
        })
    }

    async fn move_file(
        &self,
        src_repo_id: &str,
        src_dir: &str,
        src_filename: &str,
        dst_repo_id: &str,
        dst_dir: &str,
        dst_filename: &str,
        username: &str,
    ) -> Result<(), RpcError> {
        let node = self.mutate(src_repo_id, |tree| {
            let children = dir_children(tree, src_dir)?;
            children
                .remove(src_filename)
                .ok_or_else(|| RpcError::Failed(format!("no source {src_filename}")))
        })?;
        self.insert_node(dst_repo_id, dst_dir, dst_filename, node, username)
    }

    async fn copy_file(
        &self,
        src_repo_id: &str,
        src_dir: &str,
        src_filename: &str,
        dst_repo_id: &str,
        dst_dir: &str,
        dst_filename: &str,
        username: &str,
    ) -> Result<(), RpcError> {
        let node = {
            let mut repos = self.repos.lock().unwrap();
            let state = repos
                .get_mut(src_repo_id)
                .ok_or_else(|| RpcError::Failed(format!("no repo {src_repo_id}")))?;
            let children = dir_children(&mut state.tree, src_dir)?;
            children
                .get(src_filename)
                .cloned()
                .ok_or_else(|| RpcError::Failed(format!("no source {src_filename}")))?
        };
        self.insert_node(dst_repo_id, dst_dir, dst_filename, node, username)
    }
}

impl MemRepoService {
    fn insert_node(
        &self,
        repo_id: &str,
        parent_dir: &str,
        name: &str,
        node: Node,
        _username: &str,
    ) -> Result<(), RpcError> {
        self.mutate(repo_id, |tree| {
            let children = dir_children(tree, parent_dir)?;
            children.insert(name.to_owned(), node);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Domain controller
// ---------------------------------------------------------------------------

pub struct StaticDc {
    pub username: String,
    pub password: String,
    pub guest: bool,
}

impl StaticDc {
    pub fn new() -> Self {
        StaticDc {
            username: USER.to_owned(),
            password: PASSWORD.to_owned(),
            guest: false,
        }
    }
}

#[async_trait]
impl DomainController for StaticDc {
    async fn authenticate(&self, username: &str, password: &str) -> Option<Principal> {
        if username == self.username && password == self.password {
            let mut principal = Principal::new(username);
            principal.is_guest = self.guest;
            Some(principal)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Live server harness
// ---------------------------------------------------------------------------

/// Honour `RUST_LOG` in test runs; safe to call from every test.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestServer {
    pub base_url: String,
    pub svc: Arc<MemRepoService>,
    pub store: MemStore,
    pub tmpdir: tempfile::TempDir,
    client: reqwest::Client,
    server: Option<GatewayServer>,
}

impl TestServer {
    pub async fn start() -> TestServer {
        Self::with_options(false, false).await
    }

    pub async fn with_options(readonly: bool, show_repo_id: bool) -> TestServer {
        init_tracing();
        let store = MemStore::new();
        let svc = MemRepoService::new(store.clone());
        let tmpdir = tempfile::tempdir().unwrap();

        let mut config = GatewayConfig::with_tmpdir(tmpdir.path().to_path_buf());
        config.host = "127.0.0.1".to_owned();
        config.port = 0;
        config.readonly = readonly;
        config.show_repo_id = show_repo_id;

        let ctx = GatewayContext::new(
            ObjectStore::new(&store.backends()),
            svc.clone(),
            config.provider_options(),
        );
        let server = GatewayServer::start(ctx, Arc::new(StaticDc::new()), &config)
            .await
            .unwrap();

        TestServer {
            base_url: server.url(),
            svc,
            store,
            tmpdir,
            client: reqwest::Client::new(),
            server: Some(server),
        }
    }

    /// A fresh context sharing this server's store and service, for
    /// driving gateway internals directly.
    pub fn context(&self) -> GatewayContext {
        GatewayContext::new(
            ObjectStore::new(&self.store.backends()),
            self.svc.clone(),
            ProviderOptions {
                readonly: false,
                show_repo_id: false,
                tmpdir: self.tmpdir.path().to_path_buf(),
            },
        )
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(reqwest::Method::from_bytes(method.as_bytes()).unwrap(), self.url(path))
            .basic_auth(USER, Some(PASSWORD))
    }

    pub async fn propfind(&self, path: &str, depth: &str) -> reqwest::Response {
        self.request("PROPFIND", path)
            .header("Depth", depth)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request("GET", path).send().await.unwrap()
    }

    pub async fn put(&self, path: &str, body: Vec<u8>) -> reqwest::Response {
        self.request("PUT", path).body(body).send().await.unwrap()
    }

    pub async fn put_ok(&self, path: &str, body: Vec<u8>) {
        let resp = self.put(path, body).await;
        assert!(
            resp.status().is_success(),
            "PUT {path} failed: {}",
            resp.status()
        );
    }

    pub async fn mkcol(&self, path: &str) -> reqwest::Response {
        self.request("MKCOL", path).send().await.unwrap()
    }

    pub async fn mkcol_ok(&self, path: &str) {
        let resp = self.mkcol(path).await;
        assert!(
            resp.status().is_success(),
            "MKCOL {path} failed: {}",
            resp.status()
        );
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.request("DELETE", path).send().await.unwrap()
    }

    pub async fn move_(&self, from: &str, to: &str, overwrite: bool) -> reqwest::Response {
        self.request("MOVE", from)
            .header("Destination", self.url(to))
            .header("Overwrite", if overwrite { "T" } else { "F" })
            .send()
            .await
            .unwrap()
    }

    pub async fn copy(&self, from: &str, to: &str, overwrite: bool) -> reqwest::Response {
        self.request("COPY", from)
            .header("Destination", self.url(to))
            .header("Overwrite", if overwrite { "T" } else { "F" })
            .send()
            .await
            .unwrap()
    }

    pub async fn anonymous_get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// Names of entries left in the spool directory.
    pub fn spool_entries(&self) -> Vec<String> {
        std::fs::read_dir(self.tmpdir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    pub async fn stop(mut self) {
        if let Some(server) = self.server.take() {
            server.stop().await;
        }
    }
}
