//! Health check handler

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State};

use super::super::state::AppState;
use super::super::types::ApiResponse;

/// Health check response data
#[derive(serde::Serialize)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: u64,
    pub accounts: usize,
    pub ledger_entries: usize,
}

/// GET /health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<HealthResponse>> {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Json(ApiResponse::success(HealthResponse {
        timestamp_ms: now_ms,
        accounts: state.accounts.len(),
        ledger_entries: state.ledger.len(),
    }))
}
