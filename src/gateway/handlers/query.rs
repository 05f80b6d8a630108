//! Read-side handlers: transfer lookup, history, ledger entries

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
};

use crate::core_types::{AccountId, UserId};
use crate::ledger::LedgerEntry;
use crate::transfer::{TransferError, TransferId, TransferRecord};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, PageQuery, TransactionPage, ok};

/// GET /api/v1/transfer/{transfer_id}
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<String>,
) -> ApiResult<TransferRecord> {
    let id: TransferId = transfer_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid transfer id"))?;

    match state.orchestrator.get(id) {
        Some(record) => ok(record),
        None => ApiError::from(&TransferError::TransferNotFound(transfer_id)).into_err(),
    }
}

/// GET /api/v1/users/{user_id}/transactions?page=&limit=
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<TransactionPage<TransferRecord>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let (items, total) = state.orchestrator.history_for_user(user_id, page, limit);
    ok(TransactionPage {
        items,
        page,
        limit,
        total,
        pages: total.div_ceil(limit),
    })
}

/// GET /api/v1/accounts/{account_id}/ledger
pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<AccountId>,
) -> ApiResult<Vec<LedgerEntry>> {
    if !state.accounts.contains(account_id) {
        return ApiError::not_found(format!("Account not found: {}", account_id)).into_err();
    }
    ok(state.ledger.entries_for_account(account_id))
}
