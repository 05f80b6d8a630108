//! API boundary types
//!
//! - `StrictAmount`: format-validated money amount for API input
//! - `ApiResponse<T>`: unified response wrapper
//! - `ApiError`: error with HTTP status and stable code
//! - Request/response DTOs (camelCase on the wire)

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core_types::{AccountId, MinorUnits, UserId};
use crate::money::{self, MoneyError};
use crate::transfer::TransferError;

// ============================================================================
// StrictAmount: Format-Validated Amount at Serde Layer
// ============================================================================

/// Strict format amount - validates format during deserialization
///
/// - Rejects `.5` (must be `0.5`)
/// - Rejects `5.` (must be `5.0` or `5`)
/// - Rejects negative numbers
/// - Rejects empty strings
///
/// Precision validation (max decimals) happens in `to_minor`.
#[derive(Debug, Clone, Copy)]
pub struct StrictAmount(Decimal);

impl StrictAmount {
    /// Convert to minor units with the configured precision.
    pub fn to_minor(self, decimals: u32) -> Result<MinorUnits, MoneyError> {
        money::parse_decimal(self.0, decimals)
    }
}

impl<'de> Deserialize<'de> for StrictAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // Support both JSON number and JSON string
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DecimalOrString {
            String(String),
            Number(Decimal),
        }

        let value = DecimalOrString::deserialize(deserializer)?;

        match value {
            DecimalOrString::String(s) => {
                if s.is_empty() {
                    return Err(D::Error::custom("Amount cannot be empty"));
                }
                if s.starts_with('.') {
                    return Err(D::Error::custom("Invalid format: use 0.5 not .5"));
                }
                if s.ends_with('.') {
                    return Err(D::Error::custom("Invalid format: use 5.0 not 5."));
                }

                let d = Decimal::from_str(&s)
                    .map_err(|e| D::Error::custom(format!("Invalid amount: {}", e)))?;

                if d.is_sign_negative() {
                    return Err(D::Error::custom("Amount cannot be negative"));
                }

                Ok(StrictAmount(d))
            }
            DecimalOrString::Number(d) => {
                if d.is_sign_negative() {
                    return Err(D::Error::custom("Amount cannot be negative"));
                }
                Ok(StrictAmount(d))
            }
        }
    }
}

impl Serialize for StrictAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize as string to preserve precision
        serializer.serialize_str(&self.0.to_string())
    }
}

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const ACCOUNT_INACTIVE: i32 = 1003;

    // Auth errors (2xxx)
    pub const AUTH_FAILED: i32 = 2002;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4091;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}

/// API error carrying HTTP status, numeric code and message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: error_codes::INVALID_PARAMETER,
            msg: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: error_codes::AUTH_FAILED,
            msg: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: error_codes::NOT_FOUND,
            msg: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: error_codes::INTERNAL_ERROR,
            msg: msg.into(),
        }
    }

    /// Convenience for handlers returning `ApiResult<T>`.
    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

impl From<&TransferError> for ApiError {
    fn from(e: &TransferError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match e {
            TransferError::InsufficientFunds => error_codes::INSUFFICIENT_FUNDS,
            TransferError::AccountInactive => error_codes::ACCOUNT_INACTIVE,
            TransferError::InvalidPin => error_codes::AUTH_FAILED,
            TransferError::AccountNotFound(_)
            | TransferError::RecipientNotFound
            | TransferError::TransferNotFound(_) => error_codes::NOT_FOUND,
            TransferError::VersionConflict | TransferError::DuplicateInFlight => {
                error_codes::CONFLICT
            }
            TransferError::Busy => error_codes::SERVICE_UNAVAILABLE,
            TransferError::Internal(_) => error_codes::INTERNAL_ERROR,
            _ => error_codes::INVALID_PARAMETER,
        };
        Self {
            status,
            code,
            msg: format!("{} ({})", e, e.code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            code: self.code,
            msg: self.msg,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Success helper for handlers.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferApiRequest {
    pub sender_user_id: UserId,
    pub sender_account_id: AccountId,
    /// Email, NB account number, customer id, profile URL or mobile
    pub recipient_identifier: String,
    pub amount: StrictAmount,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub pin: String,
}

fn default_category() -> String {
    "Other".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferApiResponse {
    pub transfer_id: String,
    pub status: String,
    pub fraud_status: String,
    /// Sender balance after the transfer, display units
    pub sender_balance: String,
    pub ledger_entry_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditApiResponse {
    pub transfer_id: String,
    pub account_id: AccountId,
    /// Credited account balance after the deposit, display units
    pub balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub opening_balance: Option<StrictAmount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRequest {
    pub amount: StrictAmount,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountApiView {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub balance: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: UserId,
    pub total_balance: String,
    pub accounts: Vec<AccountApiView>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudDecisionRequest {
    /// "cleared" or "confirmed"
    pub decision: String,
    pub reviewer_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusRequest {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        amount: StrictAmount,
    }

    #[test]
    fn test_strict_amount_accepts_string_and_number() {
        let w: Wrapper = serde_json::from_str(r#"{"amount": "12.50"}"#).unwrap();
        assert_eq!(w.amount.to_minor(2).unwrap(), 1_250);

        let w: Wrapper = serde_json::from_str(r#"{"amount": 3}"#).unwrap();
        assert_eq!(w.amount.to_minor(2).unwrap(), 300);
    }

    #[test]
    fn test_strict_amount_rejects_bad_formats() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": ".5"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": "5."}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": ""}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": "-1"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": -1}"#).is_err());
    }

    #[test]
    fn test_strict_amount_precision_checked_late() {
        let w: Wrapper = serde_json::from_str(r#"{"amount": "1.005"}"#).unwrap();
        assert!(w.amount.to_minor(2).is_err());
    }

    #[test]
    fn test_api_response_shape() {
        let body = serde_json::to_string(&ApiResponse::success(42)).unwrap();
        assert_eq!(body, r#"{"code":0,"msg":"ok","data":42}"#);
    }

    #[test]
    fn test_transfer_error_mapping() {
        let api: ApiError = (&TransferError::InsufficientFunds).into();
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.code, error_codes::INSUFFICIENT_FUNDS);

        let api: ApiError = (&TransferError::Busy).into();
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
