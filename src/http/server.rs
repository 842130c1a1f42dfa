//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health endpoint and application routes
//! - Wire up middleware (tracing)
//! - Bind server to listener and run it on a background task
//! - Expose the server's graceful stop as a closeable resource

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::future::BoxFuture;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::lifecycle::{CloseError, Closeable};

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/healthz";

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    shutting_down: Arc<AtomicBool>,
    started: Instant,
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    shutting_down: Arc<AtomicBool>,
}

impl HttpServer {
    /// Create a server that only answers the health endpoint.
    pub fn new() -> Self {
        Self::with_routes(Router::new())
    }

    /// Create a server serving `routes` alongside the health endpoint.
    pub fn with_routes(routes: Router) -> Self {
        let shutting_down = Arc::new(AtomicBool::new(false));
        let state = AppState {
            shutting_down: shutting_down.clone(),
            started: Instant::now(),
        };

        let router = Self::build_router(routes, state);
        Self {
            router,
            shutting_down,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(routes: Router, state: AppState) -> Router {
        Router::new()
            .route(HEALTH_PATH, get(health_handler))
            .with_state(state)
            .merge(routes)
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving on `listener` in a background task.
    pub fn spawn(self, listener: TcpListener) -> Result<RunningServer, io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(None);

        let router = self.router;
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.wait_for(|stop| *stop).await;
                    tracing::info!("HTTP server draining connections");
                })
                .await;

            match &result {
                Ok(()) => tracing::info!("HTTP server stopped"),
                Err(e) => tracing::error!(error = %e, "HTTP server failed"),
            }
            let _ = done_tx.send(Some(result.as_ref().map(|_| ()).map_err(|e| e.to_string())));
            result
        });

        Ok(RunningServer {
            addr,
            stop: Arc::new(ServerStop {
                addr,
                stop_tx,
                done_rx,
                shutting_down: self.shutting_down,
            }),
            task,
        })
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// A server running on a background task.
pub struct RunningServer {
    addr: SocketAddr,
    stop: Arc<ServerStop>,
    task: JoinHandle<Result<(), io::Error>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The server's stop operation, for registration with the coordinator.
    pub fn stopper(&self) -> Arc<ServerStop> {
        Arc::clone(&self.stop)
    }

    /// Wait for the server to exit, either after a stop or on its own.
    pub async fn join(self) -> Result<(), io::Error> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

/// Graceful stop of a [`RunningServer`].
///
/// Closing stops accepting connections and waits for in-flight requests.
pub struct ServerStop {
    addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<Option<Result<(), String>>>,
    shutting_down: Arc<AtomicBool>,
}

impl ServerStop {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Closeable for ServerStop {
    fn name(&self) -> &str {
        "http-server"
    }

    fn close(self: Arc<Self>) -> BoxFuture<'static, Result<(), CloseError>> {
        Box::pin(async move {
            self.shutting_down.store(true, Ordering::SeqCst);
            self.stop_tx.send_replace(true);

            let mut done = self.done_rx.clone();
            let finished = done.wait_for(Option::is_some).await.map(|d| (*d).clone());
            match finished {
                Ok(Some(Err(reason))) => Err(CloseError::new(reason)),
                Ok(_) => Ok(()),
                Err(_) => Err(CloseError::new("server task exited without reporting")),
            }
        })
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let shutting_down = state.shutting_down.load(Ordering::SeqCst);
    let status = if shutting_down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(json!({
            "status": if shutting_down { "shutting_down" } else { "ok" },
            "uptime_secs": state.started.elapsed().as_secs(),
        })),
    )
}
