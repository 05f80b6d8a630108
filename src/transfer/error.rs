//! Transfer error taxonomy
//!
//! Error codes are stable strings for API responses; the HTTP mapping
//! lives next to them so handlers never invent status codes ad hoc.

use thiserror::Error;

use crate::account::AccountError;
use crate::account_store::StoreError;
use crate::core_types::AccountId;
use crate::ledger::LedgerError;

/// Transfer errors surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Validation (not retried) ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Sender and recipient account cannot be the same")]
    SameAccount,

    #[error("Cannot transfer to yourself")]
    SelfTransfer,

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    // === Auth ===
    #[error("Invalid PIN")]
    InvalidPin,

    // === Lookup (not retried) ===
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Recipient not found")]
    RecipientNotFound,

    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    // === Business rejection (not retried) ===
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Account is inactive")]
    AccountInactive,

    // === Transient (retried internally, then surfaced) ===
    #[error("Version conflict, retry the request")]
    VersionConflict,

    #[error("Accounts busy, try again")]
    Busy,

    #[error("A request with this idempotency key is still in flight")]
    DuplicateInFlight,

    // === System ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::SelfTransfer => "SELF_TRANSFER",
            TransferError::InvalidCategory(_) => "INVALID_CATEGORY",
            TransferError::InvalidPin => "INVALID_PIN",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            TransferError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::AccountInactive => "ACCOUNT_INACTIVE",
            TransferError::VersionConflict => "VERSION_CONFLICT",
            TransferError::Busy => "BUSY",
            TransferError::DuplicateInFlight => "DUPLICATE_IN_FLIGHT",
            TransferError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for the API layer.
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount
            | TransferError::SameAccount
            | TransferError::SelfTransfer
            | TransferError::InvalidCategory(_) => 400,
            TransferError::InvalidPin => 401,
            TransferError::AccountNotFound(_)
            | TransferError::RecipientNotFound
            | TransferError::TransferNotFound(_) => 404,
            TransferError::InsufficientFunds | TransferError::AccountInactive => 422,
            TransferError::VersionConflict | TransferError::DuplicateInFlight => 409,
            TransferError::Busy => 503,
            TransferError::Internal(_) => 500,
        }
    }

    /// Whether a client may safely retry with the same idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::VersionConflict | TransferError::Busy | TransferError::DuplicateInFlight
        )
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => TransferError::AccountNotFound(id),
            StoreError::Busy => TransferError::Busy,
            StoreError::Account(e) => e.into(),
        }
    }
}

impl From<AccountError> for TransferError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::InsufficientFunds => TransferError::InsufficientFunds,
            AccountError::Inactive => TransferError::AccountInactive,
            AccountError::VersionConflict { .. } => TransferError::VersionConflict,
            AccountError::Overflow => TransferError::Internal("balance overflow".to_string()),
        }
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        TransferError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameAccount.code(), "SAME_ACCOUNT");
        assert_eq!(TransferError::SelfTransfer.code(), "SELF_TRANSFER");
        assert_eq!(TransferError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(TransferError::InvalidPin.code(), "INVALID_PIN");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::SelfTransfer.http_status(), 400);
        assert_eq!(TransferError::InvalidPin.http_status(), 401);
        assert_eq!(TransferError::InsufficientFunds.http_status(), 422);
        assert_eq!(TransferError::Busy.http_status(), 503);
        assert_eq!(TransferError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn test_retryable() {
        assert!(TransferError::Busy.is_retryable());
        assert!(TransferError::VersionConflict.is_retryable());
        assert!(!TransferError::InsufficientFunds.is_retryable());
    }

    #[test]
    fn test_store_error_conversion() {
        assert_eq!(
            TransferError::from(StoreError::NotFound(9)),
            TransferError::AccountNotFound(9)
        );
        assert_eq!(TransferError::from(StoreError::Busy), TransferError::Busy);
        assert_eq!(
            TransferError::from(StoreError::Account(AccountError::InsufficientFunds)),
            TransferError::InsufficientFunds
        );
    }
}
