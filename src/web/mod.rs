//! HTTP surface: router, shared state and server startup.
//!
//! | Route | Method | Handler |
//! |-------|--------|---------|
//! | `/` | GET | [`handlers::index`] |
//! | `/upload` | POST | [`handlers::upload`] (multipart field `pdf`) |
//! | `/ask` | POST | [`handlers::ask`] (form field `question`) |
//! | `/chart/weights` | GET | [`handlers::chart_weights`] |
//! | `/chart/assignments` | GET | [`handlers::chart_assignments`] |
//! | `/healthz` | GET | [`handlers::healthz`] |
//!
//! Uploads larger than `max_upload_bytes` are answered with 413 by the
//! body-limit layers before any handler runs.

pub mod handlers;
pub mod page;

use crate::analyze::SyllabusAnalyzer;
use crate::blob::BlobStore;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::session::SessionStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub analyzer: SyllabusAnalyzer,
    pub blobs: BlobStore,
    pub sessions: SessionStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Probe capabilities (unless mocking) and open the stores.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            analyzer: SyllabusAnalyzer::from_config(config),
            blobs: BlobStore::new(&config.blob_dir),
            sessions: SessionStore::new(&config.session_dir),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/ask", post(handlers::ask))
        .route("/chart/weights", get(handlers::chart_weights))
        .route("/chart/assignments", get(handlers::chart_assignments))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind_addr()` and serve until Ctrl-C.
pub async fn serve(config: &DashboardConfig) -> Result<(), DashboardError> {
    let addr = config.bind_addr();
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| DashboardError::Server { addr, source })?;
    info!(
        "Listening on http://{} (mock mode: {})",
        addr, config.mock
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| DashboardError::Server { addr, source })?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolve when `signal` fires. If the signal cannot be listened for, the
/// server keeps running instead of stopping at once.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            error!("Cannot listen for Ctrl-C, graceful shutdown disabled: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
