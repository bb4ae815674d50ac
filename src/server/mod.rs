//! HTTP server implementation using Axum.

pub mod error;
pub mod routes;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cli::config::Config;
use crate::service::DocumentAnalyzer;

/// Shared state for request handlers.
pub struct AppState {
    pub analyzer: Arc<DocumentAnalyzer>,
    pub started: Instant,
}

impl AppState {
    pub fn new(analyzer: Arc<DocumentAnalyzer>) -> Self {
        Self {
            analyzer,
            started: Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/upload", post(routes::upload))
        .route("/api/ask", post(routes::ask))
        .route("/api/documents", get(routes::list_documents))
        .route(
            "/api/documents/{id}",
            get(routes::get_document).delete(routes::delete_document),
        )
        .route("/api/conversations", get(routes::list_conversations))
        .route("/api/conversations/{id}", get(routes::get_conversation))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let analyzer = DocumentAnalyzer::from_config(config)
        .await
        .context("Failed to initialise document service")?;
    if !analyzer.synthesizer().is_ready() {
        tracing::warn!("starting without a language model; /api/ask will return 503");
    }

    let app = build_router(AppState::new(Arc::new(analyzer)), config.server.max_upload_bytes);
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
