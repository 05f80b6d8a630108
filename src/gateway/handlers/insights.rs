//! Spending insights handler

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;

use crate::core_types::UserId;
use crate::insights::{InsightsReport, build_insights};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};

/// GET /api/v1/users/{user_id}/insights
pub async fn get_insights(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> ApiResult<InsightsReport> {
    let snapshots = state.accounts.accounts_for_user(user_id).await;
    if snapshots.is_empty() {
        return ApiError::not_found(format!("No accounts for user {}", user_id)).into_err();
    }
    let total_balance: u64 = snapshots.iter().map(|s| s.balance).sum();

    let transfers = state.orchestrator.completed_outgoing(user_id);
    ok(build_insights(
        user_id,
        total_balance,
        &transfers,
        Utc::now(),
        state.amount_decimals,
    ))
}
