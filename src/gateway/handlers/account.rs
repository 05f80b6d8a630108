//! Account handlers: open, balance, simulate-credit

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use crate::account::AccountSnapshot;
use crate::core_types::{AccountId, UserId};
use crate::money::format_amount;
use crate::transfer::{TransferError, TransferRequest};

use super::super::state::AppState;
use super::super::types::{
    AccountApiView, ApiError, ApiResult, BalanceResponse, CreditApiResponse, CreditRequest,
    OpenAccountRequest, ok,
};

fn view(snapshot: &AccountSnapshot, decimals: u32) -> AccountApiView {
    AccountApiView {
        account_id: snapshot.id,
        user_id: snapshot.owner,
        balance: format_amount(snapshot.balance, decimals),
        active: snapshot.active,
    }
}

/// POST /api/v1/accounts
pub async fn open_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OpenAccountRequest>,
) -> ApiResult<AccountApiView> {
    let opening = match req.opening_balance {
        Some(amount) => amount
            .to_minor(state.amount_decimals)
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => 0,
    };

    let snapshot = state.accounts.open_account(req.user_id, opening);
    info!(account_id = snapshot.id, user_id = req.user_id, "account opened");
    ok(view(&snapshot, state.amount_decimals))
}

/// GET /api/v1/users/{user_id}/balance
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> ApiResult<BalanceResponse> {
    let snapshots = state.accounts.accounts_for_user(user_id).await;
    if snapshots.is_empty() {
        return ApiError::not_found(format!("No accounts for user {}", user_id)).into_err();
    }

    let total: u64 = snapshots.iter().map(|s| s.balance).sum();
    ok(BalanceResponse {
        user_id,
        total_balance: format_amount(total, state.amount_decimals),
        accounts: snapshots
            .iter()
            .map(|s| view(s, state.amount_decimals))
            .collect(),
    })
}

/// POST /api/v1/accounts/{account_id}/credit
///
/// Demo deposit. Runs as a real transfer from the treasury account so
/// the double-entry invariant holds for simulated credits too.
pub async fn credit_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<AccountId>,
    Json(req): Json<CreditRequest>,
) -> ApiResult<CreditApiResponse> {
    let amount = req
        .amount
        .to_minor(state.amount_decimals)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let result = state
        .orchestrator
        .execute(TransferRequest {
            sender_account_id: state.treasury_account,
            recipient_account_id: account_id,
            amount,
            category: "Income".to_string(),
            description: req.description.or_else(|| Some("Simulated credit".to_string())),
            idempotency_key: None,
        })
        .await
        .map_err(|e| ApiError::from(&e))?;

    let credited = state
        .accounts
        .snapshot(account_id)
        .await
        .map_err(|e| ApiError::from(&TransferError::from(e)))?;

    ok(CreditApiResponse {
        transfer_id: result.transfer_id.to_string(),
        account_id,
        balance: format_amount(credited.balance, state.amount_decimals),
    })
}
