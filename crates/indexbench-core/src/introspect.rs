//! Live counter endpoint
//!
//! While a pipeline runs, `GET /debug/vars` returns the current counter
//! snapshot and elapsed time as JSON, and `GET /health` answers liveness
//! checks. The server runs on its own single-threaded tokio runtime so the
//! pipeline threads stay synchronous.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::Result;
use crate::metrics::{CounterSnapshot, Counters};

/// Shared state for the introspection handlers
#[derive(Clone)]
pub struct IntrospectState {
    counters: Arc<Counters>,
    started: Instant,
}

impl IntrospectState {
    pub fn new(counters: Arc<Counters>, started: Instant) -> Self {
        Self { counters, started }
    }
}

/// Body of `GET /debug/vars`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarsResponse {
    #[serde(flatten)]
    pub counters: CounterSnapshot,
    pub elapsed_secs: f64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Handler: GET /debug/vars
async fn handle_vars(State(state): State<IntrospectState>) -> Json<VarsResponse> {
    Json(VarsResponse {
        counters: state.counters.snapshot(),
        elapsed_secs: state.started.elapsed().as_secs_f64(),
    })
}

/// Handler: GET /health
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn router(state: IntrospectState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/debug/vars", get(handle_vars))
        .with_state(state)
}

/// Running introspection server; stops when shut down or dropped
pub struct IntrospectServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl IntrospectServer {
    /// Bind `addr` and serve on a background thread.
    ///
    /// Binding happens before this returns, so an address in use is reported
    /// here rather than lost on the server thread.
    pub fn start(addr: &str, state: IntrospectState) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let listener = runtime.block_on(tokio::net::TcpListener::bind(addr))?;
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = router(state);

        let thread = thread::Builder::new()
            .name("introspect".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let signal = async {
                        let _ = shutdown_rx.await;
                    };
                    if let Err(e) = axum::serve(listener, app)
                        .with_graceful_shutdown(signal)
                        .await
                    {
                        warn!("Introspection server failed: {}", e);
                    }
                })
            })?;

        info!("Serving live counters on http://{}/debug/vars", local_addr);
        Ok(Self {
            addr: local_addr,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Introspection server thread panicked");
            }
        }
    }
}

impl Drop for IntrospectServer {
    fn drop(&mut self) {
        self.stop();
    }
}
