//! # Markstage HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /summary` - Dataset summary
//! - `POST /stages` - Per-stage metric rows
//! - `POST /best` - Best stage per group
//! - `POST /aggregate` - Grouped totals and means
//! - `GET /products/{id}` - Single-product report
//! - `POST /reload` - Re-read the dataset file
//!
//! ## Configuration (Environment Variables)
//!
//! - `MARKSTAGE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `markstage::api::*`)
pub use handlers::{
    aggregate_handler, best_handler, health_handler, product_handler, reload_handler,
    stages_handler, summary_handler,
};
pub use types::{
    AggregateRequest, AggregateResponse, BestRequest, BestResponse, HealthResponse,
    ProductResponse, ReloadResponse, StagesRequest, StagesResponse, SummaryResponse,
};

use crate::loader::DatasetCache;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use markstage_core::MarkstageError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the dataset cache and the file it serves.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RwLock<DatasetCache>>,
    pub source: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(cache: DatasetCache, source: PathBuf) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            source,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `MARKSTAGE_CORS_ORIGINS`:
/// - If "*": allows all origins
/// - If not set: localhost only
/// - Otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("MARKSTAGE_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (MARKSTAGE_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in MARKSTAGE_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => build_localhost_cors(),
    }
}

/// Restrictive CORS layer for local dashboards.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/summary", get(handlers::summary_handler))
        .route("/stages", post(handlers::stages_handler))
        .route("/best", post(handlers::best_handler))
        .route("/aggregate", post(handlers::aggregate_handler))
        .route("/products/{id}", get(handlers::product_handler))
        .route("/reload", post(handlers::reload_handler))
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), MarkstageError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MarkstageError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Markstage HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MarkstageError::IoError(format!("Server error: {}", e)))
}
