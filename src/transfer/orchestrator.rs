//! Transfer Orchestrator
//!
//! The single entry point for moving money between accounts. It owns
//! the commit unit: debit, credit and the ledger pair either all take
//! effect or none do. Both account locks are held for the whole unit,
//! and any inner failure is compensated in place before the locks drop,
//! so no observer ever sees a half-applied transfer.
//!
//! Fraud screening runs after the commit on an immutable snapshot. A
//! flag never blocks or reverses the movement; it marks the transfer
//! for review.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::account_store::AccountStore;
use crate::audit::{AuditEvent, AuditSink};
use crate::fraud::{FlagError, FlagStore, FraudContext, FraudDecision, FraudPolicy, ReviewDecision};
use crate::idempotency::{IdempotencyGuard, Reservation};
use crate::ledger::Ledger;
use crate::transfer::error::TransferError;
use crate::transfer::types::{
    FraudStatus, TransferId, TransferRecord, TransferRequest, TransferResult, TransferStatus,
    is_valid_category,
};
use crate::core_types::UserId;

pub struct TransferOrchestrator {
    accounts: Arc<AccountStore>,
    ledger: Arc<Ledger>,
    idempotency: Arc<IdempotencyGuard>,
    fraud: FraudPolicy,
    flags: Arc<FlagStore>,
    transfers: DashMap<TransferId, TransferRecord>,
    audit: Arc<dyn AuditSink>,
}

impl TransferOrchestrator {
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<Ledger>,
        fraud: FraudPolicy,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            idempotency: Arc::new(IdempotencyGuard::new()),
            fraud,
            flags: Arc::new(FlagStore::new()),
            transfers: DashMap::new(),
            audit,
        }
    }

    pub fn flags(&self) -> &Arc<FlagStore> {
        &self.flags
    }

    pub fn idempotency(&self) -> &Arc<IdempotencyGuard> {
        &self.idempotency
    }

    /// Execute one transfer request end to end.
    ///
    /// With an idempotency key, a retried request replays the stored
    /// outcome (success or failure) without touching any balance; a
    /// concurrent duplicate is rejected with `DuplicateInFlight`.
    pub async fn execute(&self, req: TransferRequest) -> Result<TransferResult, TransferError> {
        let key = req.idempotency_key.clone();

        if let Some(key) = &key {
            match self.idempotency.reserve(key) {
                Reservation::Fresh => {}
                Reservation::Duplicate(outcome) => {
                    debug!(key, "replaying stored outcome for duplicate request");
                    return outcome;
                }
                Reservation::InFlight => return Err(TransferError::DuplicateInFlight),
            }
        }

        let outcome = self.execute_inner(&req).await;

        if let Some(key) = &key {
            // Transient failures release the key so a retry re-executes;
            // terminal outcomes (success or business rejection) are
            // stored and replayed verbatim.
            match &outcome {
                Err(e) if e.is_retryable() => self.idempotency.release(key),
                _ => self.idempotency.resolve(key, outcome.clone()),
            }
        }
        self.publish_outcome(&req, &outcome);
        outcome
    }

    async fn execute_inner(&self, req: &TransferRequest) -> Result<TransferResult, TransferError> {
        if req.amount == 0 {
            return Err(TransferError::InvalidAmount);
        }
        if req.sender_account_id == req.recipient_account_id {
            return Err(TransferError::SameAccount);
        }
        if !is_valid_category(&req.category) {
            return Err(TransferError::InvalidCategory(req.category.clone()));
        }

        let transfer_id = TransferId::new();

        // Both locks are held until the commit unit is done.
        let mut pair = self
            .accounts
            .lock_pair(req.sender_account_id, req.recipient_account_id)
            .await?;

        let (expected_version, sender_user_id) = {
            let sender = pair
                .account(req.sender_account_id)
                .ok_or(TransferError::AccountNotFound(req.sender_account_id))?;
            if !sender.is_active() {
                return Err(TransferError::AccountInactive);
            }
            (sender.version(), sender.owner())
        };
        let recipient_user_id = pair
            .account(req.recipient_account_id)
            .ok_or(TransferError::AccountNotFound(req.recipient_account_id))?
            .owner();

        // User-level check: both accounts belonging to the same person
        // is still a self-transfer, whichever identifier was used.
        if sender_user_id == recipient_user_id {
            return Err(TransferError::SelfTransfer);
        }

        let record = TransferRecord::pending(transfer_id, req, sender_user_id, recipient_user_id);
        self.transfers.insert(transfer_id, record);

        // Debit first. Nothing to compensate if it fails.
        let debit_result = pair
            .account_mut(req.sender_account_id)
            .ok_or(TransferError::AccountNotFound(req.sender_account_id))?
            .debit(req.amount, expected_version);
        if let Err(e) = debit_result {
            let err = TransferError::from(e);
            self.mark_failed(transfer_id, &err);
            return Err(err);
        }

        // Credit. On failure, compensate the debit before the locks drop.
        let credit_result = pair
            .account_mut(req.recipient_account_id)
            .ok_or(TransferError::AccountNotFound(req.recipient_account_id))?
            .credit(req.amount);
        if let Err(e) = credit_result {
            self.compensate_debit(&mut pair, req, transfer_id);
            let err = TransferError::from(e);
            self.mark_failed(transfer_id, &err);
            return Err(err);
        }

        let sender_balance_after = pair
            .account(req.sender_account_id)
            .map(|a| a.balance())
            .unwrap_or_default();
        let recipient_balance_after = pair
            .account(req.recipient_account_id)
            .map(|a| a.balance())
            .unwrap_or_default();

        // Ledger pair. A journal failure compensates both sides so the
        // unit leaves no trace.
        let (debit_entry, credit_entry) = match self.ledger.append_pair(
            transfer_id,
            req.sender_account_id,
            sender_balance_after,
            req.recipient_account_id,
            recipient_balance_after,
            req.amount,
        ) {
            Ok(pair_entries) => pair_entries,
            Err(e) => {
                self.compensate_credit(&mut pair, req, transfer_id);
                self.compensate_debit(&mut pair, req, transfer_id);
                let err = TransferError::from(e);
                self.mark_failed(transfer_id, &err);
                return Err(err);
            }
        };

        let sender_snapshot = pair
            .account(req.sender_account_id)
            .map(|a| a.snapshot())
            .ok_or(TransferError::AccountNotFound(req.sender_account_id))?;

        drop(pair);

        // Post-commit screening on the snapshot taken inside the unit.
        let fraud_status = match self.fraud.evaluate(&FraudContext {
            amount: req.amount,
            sender: &sender_snapshot,
            recipient_account_id: req.recipient_account_id,
            category: &req.category,
        }) {
            FraudDecision::Clear => FraudStatus::None,
            FraudDecision::Flagged {
                rule,
                reason,
                severity,
            } => {
                warn!(%transfer_id, rule, %reason, "transfer flagged for review");
                self.flags.raise(transfer_id, rule, reason, severity);
                FraudStatus::Pending
            }
        };

        if let Some(mut record) = self.transfers.get_mut(&transfer_id) {
            record.status = TransferStatus::Completed;
            record.fraud_status = fraud_status;
            record.updated_at_ms = chrono::Utc::now().timestamp_millis();
        }

        info!(
            %transfer_id,
            sender = req.sender_account_id,
            recipient = req.recipient_account_id,
            amount = req.amount,
            fraud_status = fraud_status.as_str(),
            "transfer completed"
        );

        Ok(TransferResult {
            transfer_id,
            status: TransferStatus::Completed,
            fraud_status,
            sender_balance: sender_snapshot.balance,
            ledger_entry_ids: vec![debit_entry.entry_id, credit_entry.entry_id],
        })
    }

    /// Undo a debit inside the still-locked pair. Credit cannot fail
    /// here: the balance just held this amount.
    fn compensate_debit(
        &self,
        pair: &mut crate::account_store::LockedPair,
        req: &TransferRequest,
        transfer_id: TransferId,
    ) {
        if let Some(sender) = pair.account_mut(req.sender_account_id) {
            if sender.credit(req.amount).is_err() {
                warn!(%transfer_id, "debit compensation failed, balance invariant broken");
            }
        }
    }

    /// Undo a credit inside the still-locked pair.
    fn compensate_credit(
        &self,
        pair: &mut crate::account_store::LockedPair,
        req: &TransferRequest,
        transfer_id: TransferId,
    ) {
        if let Some(recipient) = pair.account_mut(req.recipient_account_id) {
            let version = recipient.version();
            if recipient.debit(req.amount, version).is_err() {
                warn!(%transfer_id, "credit compensation failed, balance invariant broken");
            }
        }
    }

    fn mark_failed(&self, transfer_id: TransferId, err: &TransferError) {
        if let Some(mut record) = self.transfers.get_mut(&transfer_id) {
            record.status = TransferStatus::Failed;
            record.error = Some(err.code().to_string());
            record.updated_at_ms = chrono::Utc::now().timestamp_millis();
        }
    }

    fn publish_outcome(&self, req: &TransferRequest, outcome: &Result<TransferResult, TransferError>) {
        let (transfer_id, outcome_str) = match outcome {
            Ok(result) => (result.transfer_id.to_string(), result.status.to_string()),
            Err(e) => (String::new(), e.code().to_string()),
        };
        self.audit.publish(AuditEvent {
            transfer_id,
            outcome: outcome_str,
            amount: req.amount,
            sender_account_id: req.sender_account_id,
            recipient_account_id: req.recipient_account_id,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        });
    }

    pub fn get(&self, transfer_id: TransferId) -> Option<TransferRecord> {
        self.transfers.get(&transfer_id).map(|r| r.clone())
    }

    /// Page of transfers involving any of `user`'s accounts, newest
    /// first, with the category rendered from `user`'s side. Returns
    /// the page plus the total match count.
    pub fn history_for_user(
        &self,
        user: UserId,
        page: usize,
        limit: usize,
    ) -> (Vec<TransferRecord>, usize) {
        let mut records: Vec<TransferRecord> = self
            .transfers
            .iter()
            .filter(|r| r.sender_user_id == user || r.recipient_user_id == user)
            .map(|r| r.clone())
            .collect();
        records.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));

        for record in &mut records {
            let viewed = record.category_for(user).to_string();
            record.category = viewed;
        }

        let total = records.len();
        let start = page.saturating_sub(1).saturating_mul(limit);
        let page = records.into_iter().skip(start).take(limit).collect();
        (page, total)
    }

    /// Completed outgoing transfers for a user, used by the insights
    /// builder.
    pub fn completed_outgoing(&self, user: UserId) -> Vec<TransferRecord> {
        self.transfers
            .iter()
            .filter(|r| r.sender_user_id == user && r.status == TransferStatus::Completed)
            .map(|r| r.clone())
            .collect()
    }

    /// Apply an administrator's verdict on a flagged transfer. Updates
    /// both the flag and the transfer record's fraud status.
    pub fn apply_fraud_decision(
        &self,
        transfer_id: TransferId,
        decision: ReviewDecision,
        reviewer: UserId,
    ) -> Result<TransferRecord, TransferError> {
        self.flags
            .decide(transfer_id, decision, reviewer)
            .map_err(|e| match e {
                FlagError::NotFound(id) => TransferError::TransferNotFound(id),
                FlagError::AlreadyDecided | FlagError::InvalidDecision => {
                    TransferError::Internal(e.to_string())
                }
            })?;

        let mut record = self
            .transfers
            .get_mut(&transfer_id)
            .ok_or_else(|| TransferError::TransferNotFound(transfer_id.to_string()))?;
        record.fraud_status = match decision {
            ReviewDecision::Cleared => FraudStatus::Cleared,
            ReviewDecision::Confirmed => FraudStatus::Confirmed,
            ReviewDecision::Pending => FraudStatus::Pending,
        };
        record.updated_at_ms = chrono::Utc::now().timestamp_millis();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_store::LockSettings;
    use crate::audit::NullAuditSink;
    use crate::fraud::HighAmountRule;

    fn orchestrator(threshold: u64) -> (TransferOrchestrator, Arc<AccountStore>) {
        let accounts = Arc::new(AccountStore::new(LockSettings::default()));
        let ledger = Arc::new(Ledger::new());
        let fraud = FraudPolicy::new().with_rule(HighAmountRule::new(threshold, 2));
        let orch = TransferOrchestrator::new(
            accounts.clone(),
            ledger,
            fraud,
            Arc::new(NullAuditSink),
        );
        (orch, accounts)
    }

    fn request(sender: u64, recipient: u64, amount: u64) -> TransferRequest {
        TransferRequest {
            sender_account_id: sender,
            recipient_account_id: recipient,
            amount,
            category: "Other".to_string(),
            description: None,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_happy_path_moves_money() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(2, 500);

        let result = orch.execute(request(a.id, b.id, 300)).await.unwrap();
        assert_eq!(result.status, TransferStatus::Completed);
        assert_eq!(result.fraud_status, FraudStatus::None);
        assert_eq!(result.sender_balance, 700);
        assert_eq!(result.ledger_entry_ids.len(), 2);

        assert_eq!(accounts.snapshot(a.id).await.unwrap().balance, 700);
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 800);

        let record = orch.get(result.transfer_id).unwrap();
        assert_eq!(record.status, TransferStatus::Completed);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances_untouched() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 100);
        let b = accounts.open_account(2, 0);

        let err = orch.execute(request(a.id, b.id, 101)).await.unwrap_err();
        assert_eq!(err, TransferError::InsufficientFunds);
        assert_eq!(accounts.snapshot(a.id).await.unwrap().balance, 100);
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 100);
        let b = accounts.open_account(2, 0);

        assert_eq!(
            orch.execute(request(a.id, b.id, 0)).await.unwrap_err(),
            TransferError::InvalidAmount
        );
        assert_eq!(
            orch.execute(request(a.id, a.id, 10)).await.unwrap_err(),
            TransferError::SameAccount
        );

        let mut req = request(a.id, b.id, 10);
        req.category = "Yachts".to_string();
        assert_eq!(
            orch.execute(req).await.unwrap_err(),
            TransferError::InvalidCategory("Yachts".to_string())
        );
    }

    #[tokio::test]
    async fn test_transfer_between_own_accounts_rejected() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(1, 0);

        assert_eq!(
            orch.execute(request(a.id, b.id, 100)).await.unwrap_err(),
            TransferError::SelfTransfer
        );
        assert_eq!(accounts.snapshot(a.id).await.unwrap().balance, 1_000);
    }

    #[tokio::test]
    async fn test_inactive_sender_rejected() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 100);
        let b = accounts.open_account(2, 0);
        accounts.set_active(a.id, false).await.unwrap();

        assert_eq!(
            orch.execute(request(a.id, b.id, 10)).await.unwrap_err(),
            TransferError::AccountInactive
        );
    }

    #[tokio::test]
    async fn test_inactive_recipient_accepts_credit() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 100);
        let b = accounts.open_account(2, 0);
        accounts.set_active(b.id, false).await.unwrap();

        orch.execute(request(a.id, b.id, 10)).await.unwrap();
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 10);
    }

    #[tokio::test]
    async fn test_idempotent_retry_replays_outcome() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(2, 0);

        let mut req = request(a.id, b.id, 100);
        req.idempotency_key = Some("key-1".to_string());

        let first = orch.execute(req.clone()).await.unwrap();
        let second = orch.execute(req).await.unwrap();
        assert_eq!(first, second);

        // Only one movement happened.
        assert_eq!(accounts.snapshot(a.id).await.unwrap().balance, 900);
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_idempotent_retry_replays_failure() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 50);
        let b = accounts.open_account(2, 0);

        let mut req = request(a.id, b.id, 100);
        req.idempotency_key = Some("key-fail".to_string());

        assert_eq!(
            orch.execute(req.clone()).await.unwrap_err(),
            TransferError::InsufficientFunds
        );
        assert_eq!(
            orch.execute(req).await.unwrap_err(),
            TransferError::InsufficientFunds
        );
    }

    #[tokio::test]
    async fn test_busy_failure_does_not_pin_idempotency_key() {
        let accounts = Arc::new(AccountStore::new(LockSettings {
            acquire_timeout_ms: 10,
            max_retries: 1,
            backoff_ms: 1,
        }));
        let orch = TransferOrchestrator::new(
            accounts.clone(),
            Arc::new(Ledger::new()),
            FraudPolicy::new(),
            Arc::new(NullAuditSink),
        );
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(2, 0);

        let mut req = request(a.id, b.id, 100);
        req.idempotency_key = Some("retry-after-busy".to_string());

        let held = accounts.lock_pair(a.id, b.id).await.unwrap();
        assert_eq!(
            orch.execute(req.clone()).await.unwrap_err(),
            TransferError::Busy
        );
        drop(held);

        // The transient failure was not stored; the retry re-executes.
        let result = orch.execute(req).await.unwrap();
        assert_eq!(result.status, TransferStatus::Completed);
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_flagged_transfer_completes_and_raises_flag() {
        let (orch, accounts) = orchestrator(500_000);
        let a = accounts.open_account(1, 600_000);
        let b = accounts.open_account(2, 0);

        let result = orch.execute(request(a.id, b.id, 500_100)).await.unwrap();
        assert_eq!(result.status, TransferStatus::Completed);
        assert_eq!(result.fraud_status, FraudStatus::Pending);

        // Money moved despite the flag.
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 500_100);
        assert_eq!(orch.flags().pending().len(), 1);
    }

    #[tokio::test]
    async fn test_fraud_decision_updates_record() {
        let (orch, accounts) = orchestrator(500_000);
        let a = accounts.open_account(1, 600_000);
        let b = accounts.open_account(2, 0);

        let result = orch.execute(request(a.id, b.id, 500_100)).await.unwrap();
        let record = orch
            .apply_fraud_decision(result.transfer_id, ReviewDecision::Cleared, 42)
            .unwrap();
        assert_eq!(record.fraud_status, FraudStatus::Cleared);
        assert!(orch.flags().pending().is_empty());
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(2, 0);

        for _ in 0..5 {
            orch.execute(request(a.id, b.id, 10)).await.unwrap();
        }

        let (page, total) = orch.history_for_user(1, 1, 2);
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);

        let (page, _) = orch.history_for_user(1, 3, 2);
        assert_eq!(page.len(), 1);

        // Recipient sees the same transfers.
        let (_, total) = orch.history_for_user(2, 1, 10);
        assert_eq!(total, 5);

        // An absurd page index is an empty page, not a panic.
        let (page, total) = orch.history_for_user(1, usize::MAX, 50);
        assert!(page.is_empty());
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_history_category_by_side() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(2, 0);

        let mut req = request(a.id, b.id, 100);
        req.category = "Food".to_string();
        orch.execute(req).await.unwrap();

        let (sender_view, _) = orch.history_for_user(1, 1, 10);
        assert_eq!(sender_view[0].category, "Food");

        let (recipient_view, _) = orch.history_for_user(2, 1, 10);
        assert_eq!(recipient_view[0].category, "Transfers");
    }

    #[tokio::test]
    async fn test_concurrent_opposite_transfers() {
        let (orch, accounts) = orchestrator(u64::MAX);
        let a = accounts.open_account(1, 1_000);
        let b = accounts.open_account(2, 1_000);
        let orch = Arc::new(orch);

        let o1 = orch.clone();
        let o2 = orch.clone();
        let t1 = tokio::spawn(async move { o1.execute(request(a.id, b.id, 100)).await });
        let t2 = tokio::spawn(async move { o2.execute(request(b.id, a.id, 40)).await });

        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();

        assert_eq!(accounts.snapshot(a.id).await.unwrap().balance, 940);
        assert_eq!(accounts.snapshot(b.id).await.unwrap().balance, 1_060);
    }
}
