//! HTTP server lifecycle.
//!
//! One task per connection; each request is authenticated through the
//! injected [`DomainController`] and then dispatched against a
//! per-request [`SeafDavFs`] carrying the principal. The DAV protocol
//! handler itself comes from `dav-server`.

use crate::config::GatewayConfig;
use crate::dc::{DomainController, Principal, parse_basic_credentials};
use crate::filesystem::{GatewayContext, SeafDavFs};
use dav_server::fakels::FakeLs;
use dav_server::{DavHandler, body::Body};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, header};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

struct ServerState {
    ctx: Arc<GatewayContext>,
    dc: Arc<dyn DomainController>,
    share_name: String,
}

/// A running gateway instance.
pub struct GatewayServer {
    /// The actual bound address.
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl GatewayServer {
    /// Bind and start serving. `config.port` may be 0 for an ephemeral
    /// port (tests).
    pub async fn start(
        ctx: GatewayContext,
        dc: Arc<dyn DomainController>,
        config: &GatewayConfig,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;

        if let Some(pid_file) = &config.pid_file {
            std::fs::write(pid_file, format!("{}\n", std::process::id()))?;
        }

        info!(%addr, share = %config.share_name, readonly = config.readonly, "starting WebDAV gateway");

        let state = Arc::new(ServerState {
            ctx: Arc::new(ctx),
            dc,
            share_name: config.share_name.clone(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            tokio::select! {
                () = accept_loop(listener, state) => {
                    debug!("accept loop ended");
                }
                _ = shutdown_rx => {
                    info!("received shutdown signal");
                }
            }
        });

        Ok(GatewayServer {
            addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!("WebDAV gateway stopped");
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<ServerState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(handle_request(req, &state).await) }
                    });

                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        warn!(peer = %peer_addr, error = %e, "HTTP connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
            }
        }
    }
}

async fn handle_request(req: Request<Incoming>, state: &ServerState) -> Response<Body> {
    let principal = match authenticate(&req, state).await {
        Ok(principal) => principal,
        Err(challenge) => return challenge,
    };

    let fs = SeafDavFs::new(state.ctx.clone(), principal);
    let mut builder = DavHandler::builder()
        .filesystem(Box::new(fs))
        .locksystem(FakeLs::new());
    if state.share_name != "/" {
        builder = builder.strip_prefix(state.share_name.clone());
    }
    builder.build_handler().handle(req).await
}

/// Verify Basic credentials against the domain controller. Failures get
/// the 401 challenge.
async fn authenticate(
    req: &Request<Incoming>,
    state: &ServerState,
) -> Result<Principal, Response<Body>> {
    if !state.dc.require_authentication() {
        return Ok(Principal::new("anonymous"));
    }

    let credentials = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_credentials);

    match credentials {
        Some((username, password)) => {
            match state.dc.authenticate(&username, &password).await {
                Some(principal) => Ok(principal),
                None => {
                    debug!(%username, "authentication rejected");
                    Err(unauthorized(state.dc.realm()))
                }
            }
        }
        None => Err(unauthorized(state.dc.realm())),
    }
}

fn unauthorized(realm: &str) -> Response<Body> {
    let mut resp = Response::new(Body::from("authentication required".to_owned()));
    *resp.status_mut() = StatusCode::UNAUTHORIZED;
    if let Ok(value) = header::HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")) {
        resp.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    resp
}
