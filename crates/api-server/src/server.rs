use crate::error::{Error, Result};
use crate::{AppState, handlers};
use axum::extract::DefaultBodyLimit;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use common::config::Config;
use providers::ModelMultiplexer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where the server listens; a TCP address and a socket path are mutually
/// exclusive by construction.
#[derive(Debug, Clone)]
pub enum ServerTransport {
    Tcp(SocketAddr),
    Socket(PathBuf),
}

enum BoundListener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

struct Inner {
    started:    bool,
    bound_addr: Option<SocketAddr>,
    serve_task: Option<JoinHandle<()>>,
}

/// HTTP server shell over TCP or a Unix domain socket.
///
/// Starts at most once; `stop` is idempotent and removes the socket file
/// when one was bound.
pub struct Server {
    state:            AppState,
    transport:        ServerTransport,
    max_request_size: usize,
    inner:            Mutex<Inner>,
    ready_tx:         watch::Sender<bool>,
    ready_rx:         watch::Receiver<bool>,
}

impl Server {
    pub fn new(config: &Config, transport: ServerTransport) -> Result<Self> {
        let mux = ModelMultiplexer::new(&config.providers)?;
        let (ready_tx, ready_rx) = watch::channel(false);

        Ok(Self {
            state: AppState {
                mux:      Arc::new(mux),
                shutdown: CancellationToken::new(),
            },
            transport,
            max_request_size: config.server.max_request_size,
            inner: Mutex::new(Inner {
                started:    false,
                bound_addr: None,
                serve_task: None,
            }),
            ready_tx,
            ready_rx,
        })
    }

    pub fn with_socket(config: &Config, path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(config, ServerTransport::Socket(path.into()))
    }

    pub fn with_tcp_addr(config: &Config, addr: SocketAddr) -> Result<Self> {
        Self::new(config, ServerTransport::Tcp(addr))
    }

    /// Binds the transport and begins serving. The returned channel delivers
    /// the eventual serve error, if any.
    pub async fn start(&self) -> Result<oneshot::Receiver<std::io::Error>> {
        let mut inner = self.inner.lock().await;
        if inner.started {
            return Err(Error::AlreadyRunning);
        }

        let listener = match &self.transport {
            ServerTransport::Tcp(addr) => {
                let listener = TcpListener::bind(addr).await?;
                let bound = listener.local_addr()?;
                inner.bound_addr = Some(bound);
                info!(addr = %bound, "modelplex server listening");
                BoundListener::Tcp(listener)
            }
            ServerTransport::Socket(path) => {
                // Never take over an existing socket file.
                if path.exists() {
                    return Err(Error::SocketExists(path.clone()));
                }
                let listener = UnixListener::bind(path)?;
                info!(socket = %path.display(), "modelplex server listening");
                BoundListener::Unix(listener)
            }
        };

        let app = self.router();
        let shutdown = self.state.shutdown.clone();
        let (error_tx, error_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let served = match listener {
                BoundListener::Tcp(listener) => {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(shutdown.cancelled_owned())
                        .await
                }
                BoundListener::Unix(listener) => {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(shutdown.cancelled_owned())
                        .await
                }
            };
            if let Err(err) = served {
                let _ = error_tx.send(err);
            }
        });

        inner.started = true;
        inner.serve_task = Some(task);
        let _ = self.ready_tx.send(true);
        Ok(error_rx)
    }

    /// Gracefully shuts the server down, bounding the wait by `deadline`.
    /// Safe to call any number of times.
    pub async fn stop(&self, deadline: Duration) {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            warn!("server not started, nothing to stop");
            return;
        }

        self.state.shutdown.cancel();
        if let Some(mut task) = inner.serve_task.take() {
            if tokio::time::timeout(deadline, &mut task).await.is_err() {
                warn!("graceful shutdown deadline elapsed, aborting serve task");
                task.abort();
            }
        }

        if let ServerTransport::Socket(path) = &self.transport {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    error!(path = %path.display(), "failed to remove socket file: {err}");
                }
            }
        }
    }

    /// One-shot readiness observable; the value flips to `true` exactly once.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    /// Awaits readiness, failing once the deadline elapses.
    pub async fn wait_ready(&self, deadline: Duration) -> Result<()> {
        let mut ready = self.ready_rx.clone();
        match tokio::time::timeout(deadline, ready.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(Error::ReadyTimeout),
        }
    }

    /// The bound TCP address; `None` before start or in socket mode. Useful
    /// when binding to port 0.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().await.bound_addr
    }

    fn router(&self) -> Router {
        let api = Router::new()
            .merge(handlers::chat_completions_router())
            .merge(handlers::completions_router())
            .merge(handlers::models_router());

        // OpenAI SDKs append /v1 themselves, so the surface is mounted both
        // bare and under the prefix.
        Router::new()
            .merge(api.clone())
            .nest("/v1", api)
            .route("/health", get(health_handler))
            .layer(Extension(self.state.clone()))
            .layer(DefaultBodyLimit::max(self.max_request_size))
    }
}

async fn health_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"status":"ok","service":"modelplex"}"#,
    )
}
