//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Handlers read the cached dataset snapshot under the read lock. The
//! write lock is taken on first use and by `/reload`.

use super::{
    AppState,
    types::{
        AggregateRequest, AggregateResponse, BestRequest, BestResponse, HealthResponse,
        ProductResponse, ReloadResponse, StagesRequest, StagesResponse, SummaryResponse,
    },
};
use crate::loader::Dataset;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use markstage_core::{BestStage, MarkstageError, ProductReport, StageSelector, aggregate};
use std::sync::Arc;

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// The cached snapshot, loading the file on first use.
async fn current_dataset(state: &AppState) -> Result<Arc<Dataset>, MarkstageError> {
    if let Some(dataset) = state.cache.read().await.get(&state.source) {
        return Ok(dataset);
    }
    state.cache.write().await.load(&state.source)
}

/// HTTP status for an engine or loader error.
///
/// Bad input and empty selections are the caller's problem; a missing
/// product is 404; everything else is a server fault.
fn error_status(error: &MarkstageError) -> StatusCode {
    match error {
        MarkstageError::Schema(_)
        | MarkstageError::EmptyInput(_)
        | MarkstageError::EmptyGroup(_) => StatusCode::BAD_REQUEST,
        MarkstageError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        MarkstageError::IoError(_)
        | MarkstageError::SerializationError(_)
        | MarkstageError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// SUMMARY HANDLER
// =============================================================================

/// Dataset summary.
pub async fn summary_handler(State(state): State<AppState>) -> impl IntoResponse {
    match current_dataset(&state).await {
        Ok(dataset) => (StatusCode::OK, Json(SummaryResponse::success(dataset.summary()))),
        Err(e) => (error_status(&e), Json(SummaryResponse::error(e.to_string()))),
    }
}

// =============================================================================
// STAGES HANDLER
// =============================================================================

/// Per-stage metric rows for the filtered products.
pub async fn stages_handler(
    State(state): State<AppState>,
    Json(request): Json<StagesRequest>,
) -> impl IntoResponse {
    let result = match current_dataset(&state).await {
        Ok(dataset) => dataset.metrics(&request.filter),
        Err(e) => Err(e),
    };

    match result {
        Ok(rows) => (StatusCode::OK, Json(StagesResponse::success(rows))),
        Err(e) => (error_status(&e), Json(StagesResponse::error(e.to_string()))),
    }
}

// =============================================================================
// BEST HANDLER
// =============================================================================

/// Best stage per group, or for one requested group.
pub async fn best_handler(
    State(state): State<AppState>,
    Json(request): Json<BestRequest>,
) -> impl IntoResponse {
    let result = match current_dataset(&state).await {
        Ok(dataset) => execute_best(&dataset, &request),
        Err(e) => Err(e),
    };

    match result {
        Ok(results) => (StatusCode::OK, Json(BestResponse::success(results))),
        Err(e) => (error_status(&e), Json(BestResponse::error(e.to_string()))),
    }
}

fn execute_best(
    dataset: &Dataset,
    request: &BestRequest,
) -> Result<Vec<BestStage>, MarkstageError> {
    let rows = dataset.metrics(&request.filter)?;
    let selector = StageSelector::new(request.objective).with_mode(request.mode);
    match &request.group {
        Some(group) => Ok(vec![selector.best_in_group(&rows, request.key, group)?]),
        None => selector.select(&rows, request.key),
    }
}

// =============================================================================
// AGGREGATE HANDLER
// =============================================================================

/// Grouped totals and means.
pub async fn aggregate_handler(
    State(state): State<AppState>,
    Json(request): Json<AggregateRequest>,
) -> impl IntoResponse {
    let result = match current_dataset(&state).await {
        Ok(dataset) => dataset
            .metrics(&request.filter)
            .and_then(|rows| aggregate(&rows, request.key)),
        Err(e) => Err(e),
    };

    match result {
        Ok(groups) => (StatusCode::OK, Json(AggregateResponse::success(groups))),
        Err(e) => (error_status(&e), Json(AggregateResponse::error(e.to_string()))),
    }
}

// =============================================================================
// PRODUCT HANDLER
// =============================================================================

/// Stage-by-stage report of one product.
pub async fn product_handler(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> impl IntoResponse {
    let result = match current_dataset(&state).await {
        Ok(dataset) => ProductReport::for_product(&dataset.records, &product_id),
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => (StatusCode::OK, Json(ProductResponse::success(report))),
        Err(e) => (error_status(&e), Json(ProductResponse::error(e.to_string()))),
    }
}

// =============================================================================
// RELOAD HANDLER
// =============================================================================

/// Re-read the dataset file and replace the snapshot.
///
/// A file that no longer parses leaves the previous snapshot in place.
pub async fn reload_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut cache = state.cache.write().await;
    let previous = cache.get(&state.source).map(|d| d.fingerprint.clone());

    match cache.load(&state.source) {
        Ok(dataset) => {
            let changed = previous.as_deref() != Some(dataset.fingerprint.as_str());
            tracing::info!(
                products = dataset.records.len(),
                changed,
                "dataset reloaded"
            );
            (
                StatusCode::OK,
                Json(ReloadResponse::success(
                    dataset.fingerprint.clone(),
                    dataset.records.len(),
                    changed,
                )),
            )
        }
        Err(e) => {
            tracing::warn!("Reload failed: {}", e);
            (error_status(&e), Json(ReloadResponse::error(e.to_string())))
        }
    }
}
