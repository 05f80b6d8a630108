//! Transfer handler

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::info;

use crate::money::format_amount;
use crate::transfer::{TransferError, TransferRequest};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, TransferApiRequest, TransferApiResponse, ok,
};

/// POST /api/v1/transfer
///
/// Resolves the recipient identifier, verifies the sender's PIN, then
/// hands the validated request to the orchestrator.
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferApiRequest>,
) -> ApiResult<TransferApiResponse> {
    // 1. Amount to minor units (format already validated at serde layer)
    let amount = req
        .amount
        .to_minor(state.amount_decimals)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    // 2. Authorize the sender
    if !state.verifier.verify_pin(req.sender_user_id, &req.pin).await {
        return ApiError::from(&TransferError::InvalidPin).into_err();
    }

    // 3. Sender must own the source account
    let sender = state
        .accounts
        .snapshot(req.sender_account_id)
        .await
        .map_err(|e| ApiError::from(&TransferError::from(e)))?;
    if sender.owner != req.sender_user_id {
        return ApiError::unauthorized("Account does not belong to sender").into_err();
    }

    // 4. Resolve the recipient
    let recipient = state
        .resolver
        .resolve(&req.recipient_identifier)
        .await
        .ok_or_else(|| ApiError::from(&TransferError::RecipientNotFound))?;

    info!(
        sender_account = req.sender_account_id,
        recipient_account = recipient.account_id,
        amount,
        "transfer request accepted"
    );

    // 5. Execute
    let result = state
        .orchestrator
        .execute(TransferRequest {
            sender_account_id: req.sender_account_id,
            recipient_account_id: recipient.account_id,
            amount,
            category: req.category,
            description: req.description,
            idempotency_key: req.idempotency_key,
        })
        .await
        .map_err(|e| ApiError::from(&e))?;

    ok(TransferApiResponse {
        transfer_id: result.transfer_id.to_string(),
        status: result.status.to_string(),
        fraud_status: result.fraud_status.as_str().to_string(),
        sender_balance: format_amount(result.sender_balance, state.amount_decimals),
        ledger_entry_ids: result.ledger_entry_ids,
    })
}
