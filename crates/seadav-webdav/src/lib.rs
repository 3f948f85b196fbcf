//! WebDAV projection of a content-addressed repository store.
//!
//! This crate turns the immutable object graph served by `seadav-core` into
//! a class-1 WebDAV tree: the root collection lists the repositories a
//! principal can see, each repository is a collection rooted at its HEAD
//! commit, and files stream block by block out of the blob backend.
//!
//! Reads never touch the repository service; every mutation (PUT, MKCOL,
//! DELETE, MOVE, COPY) is delegated to the external [`RepoService`] RPC,
//! which owns the commit log. The WebDAV protocol machinery itself
//! (PROPFIND XML, verb dispatch, preconditions) is `dav-server`'s job; this
//! crate implements its filesystem traits.
//!
//! # Embedding
//!
//! ```ignore
//! let backends = seadav_core::backend::load_backends(&conf_dir)?;
//! let ctx = GatewayContext::new(ObjectStore::new(&backends), repo_service, options);
//! let server = GatewayServer::start(ctx, domain_controller, config).await?;
//! println!("serving on {}", server.url());
//! ```

pub mod access;
pub mod config;
pub mod dc;
pub mod dir_entry;
pub mod error;
pub mod file;
pub mod filesystem;
pub mod metadata;
pub mod resolve;
pub mod server;
pub mod service;

pub use config::{GatewayConfig, ProviderOptions};
pub use dc::{DomainController, Principal};
pub use error::GatewayError;
pub use filesystem::{GatewayContext, SeafDavFs};
pub use server::GatewayServer;
pub use service::{INFINITE_QUOTA, RepoService, RpcError};
