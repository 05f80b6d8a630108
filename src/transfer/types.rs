//! Transfer core types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, MinorUnits, UserId};

/// Transfer identifier, ULID-based.
///
/// ULIDs are monotonic and sortable and need no coordination, so every
/// orchestrator invocation can mint its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Transfer lifecycle status. The orchestrator is the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraud screening state of a transfer. A flagged transfer still
/// completes; the flag is advisory pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudStatus {
    None,
    Pending,
    Cleared,
    Confirmed,
}

impl FraudStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudStatus::None => "NONE",
            FraudStatus::Pending => "PENDING",
            FraudStatus::Cleared => "CLEARED",
            FraudStatus::Confirmed => "CONFIRMED",
        }
    }
}

/// Spending categories accepted on the transfer API.
pub const CATEGORIES: &[&str] = &[
    "Food",
    "Travel",
    "Bills",
    "Shopping",
    "Entertainment",
    "Health",
    "Transfers",
    "Education",
    "Grocery",
    "Rent",
    "EMI",
    "Utilities",
    "Income",
    "Other",
];

pub fn is_valid_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

/// Validated transfer request handed to the orchestrator. The recipient
/// identifier has already been resolved to an account by the recipient
/// resolver, and the caller's PIN verified, before this is built.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    /// Amount in minor units, must be positive
    pub amount: MinorUnits,
    pub category: String,
    pub description: Option<String>,
    /// Client-supplied idempotency key
    pub idempotency_key: Option<String>,
}

/// Stored transfer record.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    pub idempotency_key: Option<String>,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    pub sender_user_id: UserId,
    pub recipient_user_id: UserId,
    pub amount: MinorUnits,
    pub category: String,
    pub description: Option<String>,
    pub status: TransferStatus,
    pub fraud_status: FraudStatus,
    /// Error code for failed transfers
    pub error: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl TransferRecord {
    pub fn pending(
        transfer_id: TransferId,
        req: &TransferRequest,
        sender_user_id: UserId,
        recipient_user_id: UserId,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            transfer_id,
            idempotency_key: req.idempotency_key.clone(),
            sender_account_id: req.sender_account_id,
            recipient_account_id: req.recipient_account_id,
            sender_user_id,
            recipient_user_id,
            amount: req.amount,
            category: req.category.clone(),
            description: req.description.clone(),
            status: TransferStatus::Pending,
            fraud_status: FraudStatus::None,
            error: None,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    /// Category as seen by `user`. The sender keeps the category they
    /// chose; the recipient's side of the movement renders as
    /// `Transfers` (incoming money is not their spending).
    pub fn category_for(&self, user: UserId) -> &str {
        if user == self.recipient_user_id && user != self.sender_user_id {
            "Transfers"
        } else {
            &self.category
        }
    }
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} -> {} amount={} status={}",
            self.transfer_id,
            self.sender_account_id,
            self.recipient_account_id,
            self.amount,
            self.status
        )
    }
}

/// Result returned to the caller (and replayed verbatim for idempotent
/// retries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer_id: TransferId,
    pub status: TransferStatus,
    pub fraud_status: FraudStatus,
    /// Sender balance after the transfer, minor units
    pub sender_balance: MinorUnits,
    /// Entry ids of the debit/credit ledger pair
    pub ledger_entry_ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_roundtrip() {
        let id = TransferId::new();
        let parsed: TransferId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_transfer_ids_unique_and_sortable() {
        let a = TransferId::new();
        let b = TransferId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
    }

    #[test]
    fn test_category_validation() {
        assert!(is_valid_category("Food"));
        assert!(is_valid_category("Other"));
        assert!(!is_valid_category("Yachts"));
    }

    #[test]
    fn test_category_depends_on_viewer() {
        let req = TransferRequest {
            sender_account_id: 1,
            recipient_account_id: 2,
            amount: 100,
            category: "Food".to_string(),
            description: None,
            idempotency_key: None,
        };
        let record = TransferRecord::pending(TransferId::new(), &req, 10, 20);

        assert_eq!(record.category_for(10), "Food");
        assert_eq!(record.category_for(20), "Transfers");
        // Uninvolved viewers see the stored category.
        assert_eq!(record.category_for(99), "Food");
    }

    #[test]
    fn test_fraud_status_serializes_screaming() {
        let s = serde_json::to_string(&FraudStatus::Pending).unwrap();
        assert_eq!(s, "\"PENDING\"");
    }
}
