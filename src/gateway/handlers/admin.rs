//! Admin handlers: fraud review, user suspension

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use crate::core_types::UserId;
use crate::directory::UserProfile;
use crate::fraud::{FraudFlag, ReviewDecision};
use crate::transfer::{TransferId, TransferRecord};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, FraudDecisionRequest, UserStatusRequest, ok};

/// GET /api/v1/admin/fraud/flags
pub async fn list_fraud_flags(State(state): State<Arc<AppState>>) -> ApiResult<Vec<FraudFlag>> {
    ok(state.orchestrator.flags().pending())
}

/// POST /api/v1/admin/fraud/{transfer_id}/decision
pub async fn decide_fraud_flag(
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<String>,
    Json(req): Json<FraudDecisionRequest>,
) -> ApiResult<TransferRecord> {
    let id: TransferId = transfer_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid transfer id"))?;

    let decision = match req.decision.as_str() {
        "cleared" => ReviewDecision::Cleared,
        "confirmed" => ReviewDecision::Confirmed,
        other => {
            return ApiError::bad_request(format!(
                "Decision must be cleared or confirmed, got {}",
                other
            ))
            .into_err();
        }
    };

    info!(%transfer_id, decision = req.decision, reviewer = req.reviewer_id, "fraud decision");
    match state
        .orchestrator
        .apply_fraud_decision(id, decision, req.reviewer_id)
    {
        Ok(record) => ok(record),
        Err(e) => ApiError::from(&e).into_err(),
    }
}

/// POST /api/v1/admin/users/{user_id}/status
///
/// Suspends or reactivates a user and all of their accounts. Suspended
/// accounts still receive credits.
pub async fn set_user_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Json(req): Json<UserStatusRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .directory
        .set_active(user_id, req.active)
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", user_id)))?;

    for snapshot in state.accounts.accounts_for_user(user_id).await {
        if let Err(e) = state.accounts.set_active(snapshot.id, req.active).await {
            return ApiError::internal(format!("Failed to update account {}: {}", snapshot.id, e))
                .into_err();
        }
    }

    info!(user_id, active = req.active, "user status changed");
    ok(profile)
}
