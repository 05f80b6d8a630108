//! Idempotency Guard
//!
//! Deduplicates retried transfer requests by client-supplied key. A key
//! is reserved before the transfer runs and resolved with the final
//! outcome (success or failure) once it terminates, so a retry replays
//! the stored outcome instead of moving money twice.
//!
//! A crash between reserve and resolve leaves the reservation in flight;
//! `find_stuck` surfaces those for a reconciliation pass instead of
//! letting the key wedge forever.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::transfer::error::TransferError;
use crate::transfer::types::TransferResult;

/// Final outcome stored under a key. Failed outcomes are replayed too:
/// a retried insufficient-funds request gets the same rejection, not a
/// second evaluation.
pub type StoredOutcome = Result<TransferResult, TransferError>;

/// Outcome of a reservation attempt.
#[derive(Debug, Clone)]
pub enum Reservation {
    /// Key is new; caller owns it and must resolve it.
    Fresh,
    /// Key already resolved; replay this outcome verbatim.
    Duplicate(StoredOutcome),
    /// Another request with this key is still running.
    InFlight,
}

#[derive(Debug, Clone)]
enum Slot {
    InFlight { since_ms: i64 },
    Resolved(StoredOutcome),
}

/// In-process idempotency table keyed by client key.
#[derive(Default)]
pub struct IdempotencyGuard {
    slots: DashMap<String, Slot>,
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically reserve a key. The entry API makes the check-and-insert
    /// a single operation, the in-process equivalent of a unique
    /// constraint.
    pub fn reserve(&self, key: &str) -> Reservation {
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::Resolved(outcome) => Reservation::Duplicate(outcome.clone()),
                Slot::InFlight { .. } => Reservation::InFlight,
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight {
                    since_ms: chrono::Utc::now().timestamp_millis(),
                });
                Reservation::Fresh
            }
        }
    }

    /// Resolve a reservation with the transfer's final outcome.
    pub fn resolve(&self, key: &str, outcome: StoredOutcome) {
        self.slots.insert(key.to_string(), Slot::Resolved(outcome));
    }

    /// Release a reservation without storing an outcome. Used for
    /// transient failures (Busy, version conflicts): the key becomes
    /// fresh again so a client retry can actually re-attempt the
    /// transfer instead of replaying the stale error.
    pub fn release(&self, key: &str) {
        self.slots.remove(key);
    }

    /// Keys reserved longer than `max_age_ms` ago and never resolved.
    /// A reconciliation job decides whether to complete or fail them.
    pub fn find_stuck(&self, max_age_ms: i64) -> Vec<String> {
        let now = chrono::Utc::now().timestamp_millis();
        self.slots
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::InFlight { since_ms } if now - since_ms > max_age_ms => {
                    Some(entry.key().clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::types::{FraudStatus, TransferId, TransferStatus};

    fn sample_result() -> TransferResult {
        TransferResult {
            transfer_id: TransferId::new(),
            status: TransferStatus::Completed,
            fraud_status: FraudStatus::None,
            sender_balance: 900,
            ledger_entry_ids: vec![1, 2],
        }
    }

    #[test]
    fn test_fresh_then_duplicate() {
        let guard = IdempotencyGuard::new();
        assert!(matches!(guard.reserve("k1"), Reservation::Fresh));

        let result = sample_result();
        guard.resolve("k1", Ok(result.clone()));

        match guard.reserve("k1") {
            Reservation::Duplicate(Ok(stored)) => assert_eq!(stored, result),
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn test_in_flight_reported() {
        let guard = IdempotencyGuard::new();
        assert!(matches!(guard.reserve("k1"), Reservation::Fresh));
        assert!(matches!(guard.reserve("k1"), Reservation::InFlight));
    }

    #[test]
    fn test_failed_outcome_replayed() {
        let guard = IdempotencyGuard::new();
        assert!(matches!(guard.reserve("k1"), Reservation::Fresh));
        guard.resolve("k1", Err(TransferError::InsufficientFunds));

        match guard.reserve("k1") {
            Reservation::Duplicate(Err(e)) => assert_eq!(e, TransferError::InsufficientFunds),
            other => panic!("expected stored failure, got {:?}", other),
        }
    }

    #[test]
    fn test_release_makes_key_fresh_again() {
        let guard = IdempotencyGuard::new();
        assert!(matches!(guard.reserve("k1"), Reservation::Fresh));
        guard.release("k1");
        assert!(matches!(guard.reserve("k1"), Reservation::Fresh));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_find_stuck() {
        let guard = IdempotencyGuard::new();
        guard.reserve("stuck");
        guard.reserve("resolved");
        guard.resolve("resolved", Ok(sample_result()));

        // Everything in flight is "stuck" with a zero age threshold once
        // a millisecond has passed.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let stuck = guard.find_stuck(1);
        assert_eq!(stuck, vec!["stuck".to_string()]);
    }
}
