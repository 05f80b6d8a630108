//! Ledger - append-only double-entry record of money movements
//!
//! Every committed transfer produces exactly one debit/credit pair whose
//! deltas sum to zero. Entries are immutable once appended and carry a
//! per-account sequence number, so a single account's history is totally
//! ordered for replay and audit.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_types::{AccountId, EntryId, LedgerSeq, MinorUnits};
use crate::journal::Journal;
use crate::transfer::types::TransferId;

/// Immutable ledger entry. One side of a double-entry pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub transfer_id: TransferId,
    pub account_id: AccountId,
    /// Monotonic per-account sequence
    pub seq: LedgerSeq,
    /// Signed movement in minor units (negative = debit)
    pub delta: i64,
    /// Account balance immediately after this entry
    pub balance_after: MinorUnits,
    pub timestamp_ms: i64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Amount does not fit a signed delta")]
    DeltaOverflow,

    #[error("Journal append failed: {0}")]
    Journal(String),
}

#[derive(Default)]
struct LedgerInner {
    entries: Vec<LedgerEntry>,
    account_seq: HashMap<AccountId, LedgerSeq>,
    next_entry_id: EntryId,
}

/// Append-only ledger. The pair append is all-or-nothing: the journal
/// record (when a journal is attached) is written before the in-memory
/// entries become visible, and a journal failure leaves the ledger
/// untouched.
pub struct Ledger {
    inner: Mutex<LedgerInner>,
    journal: Option<Mutex<Journal>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                next_entry_id: 1,
                ..LedgerInner::default()
            }),
            journal: None,
        }
    }

    pub fn with_journal(journal: Journal) -> Self {
        let mut ledger = Self::new();
        ledger.journal = Some(Mutex::new(journal));
        ledger
    }

    /// Rebuild ledger state from previously journaled entries. Used at
    /// startup before any new appends.
    pub fn restore(&self, entries: Vec<LedgerEntry>) {
        let mut inner = self.lock_inner();
        for entry in entries {
            inner.next_entry_id = inner.next_entry_id.max(entry.entry_id + 1);
            let seq = inner.account_seq.entry(entry.account_id).or_insert(0);
            *seq = (*seq).max(entry.seq);
            inner.entries.push(entry);
        }
    }

    /// Append the debit/credit pair for a committed transfer.
    ///
    /// Called while both account locks are held, which is what makes the
    /// per-account sequence totally ordered with balance mutations.
    pub fn append_pair(
        &self,
        transfer_id: TransferId,
        debit_account: AccountId,
        debit_balance_after: MinorUnits,
        credit_account: AccountId,
        credit_balance_after: MinorUnits,
        amount: MinorUnits,
    ) -> Result<(LedgerEntry, LedgerEntry), LedgerError> {
        let delta = i64::try_from(amount).map_err(|_| LedgerError::DeltaOverflow)?;
        let now = chrono::Utc::now().timestamp_millis();

        let mut inner = self.lock_inner();

        let debit_seq = inner.account_seq.get(&debit_account).copied().unwrap_or(0) + 1;
        let credit_seq = inner.account_seq.get(&credit_account).copied().unwrap_or(0) + 1;

        let debit_entry = LedgerEntry {
            entry_id: inner.next_entry_id,
            transfer_id,
            account_id: debit_account,
            seq: debit_seq,
            delta: -delta,
            balance_after: debit_balance_after,
            timestamp_ms: now,
        };
        let credit_entry = LedgerEntry {
            entry_id: inner.next_entry_id + 1,
            transfer_id,
            account_id: credit_account,
            seq: credit_seq,
            delta,
            balance_after: credit_balance_after,
            timestamp_ms: now,
        };

        // Durability first: the pair record either lands whole or not at
        // all, and a failed journal write leaves no in-memory trace.
        if let Some(journal) = &self.journal {
            let mut journal = match journal.lock() {
                Ok(j) => j,
                Err(poisoned) => poisoned.into_inner(),
            };
            journal
                .append_pair(&debit_entry, &credit_entry)
                .map_err(|e| LedgerError::Journal(e.to_string()))?;
        }

        inner.account_seq.insert(debit_account, debit_seq);
        inner.account_seq.insert(credit_account, credit_seq);
        inner.next_entry_id += 2;
        inner.entries.push(debit_entry.clone());
        inner.entries.push(credit_entry.clone());

        Ok((debit_entry, credit_entry))
    }

    pub fn len(&self) -> usize {
        self.lock_inner().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries_for_account(&self, account: AccountId) -> Vec<LedgerEntry> {
        self.lock_inner()
            .entries
            .iter()
            .filter(|e| e.account_id == account)
            .cloned()
            .collect()
    }

    pub fn entries_for_transfer(&self, transfer_id: TransferId) -> Vec<LedgerEntry> {
        self.lock_inner()
            .entries
            .iter()
            .filter(|e| e.transfer_id == transfer_id)
            .cloned()
            .collect()
    }

    /// Net delta across all entries of a transfer. Zero for every
    /// committed double-entry pair.
    pub fn transfer_net_delta(&self, transfer_id: TransferId) -> i64 {
        self.lock_inner()
            .entries
            .iter()
            .filter(|e| e.transfer_id == transfer_id)
            .map(|e| e.delta)
            .sum()
    }

    /// Replay an account's entries over its opening balance. `None` if
    /// replay would go negative or overflow, which indicates corruption.
    pub fn replay_balance(
        &self,
        account: AccountId,
        opening_balance: MinorUnits,
    ) -> Option<MinorUnits> {
        let mut balance = i128::from(opening_balance);
        let inner = self.lock_inner();
        for entry in inner.entries.iter().filter(|e| e.account_id == account) {
            balance += i128::from(entry.delta);
            if balance < 0 {
                return None;
            }
        }
        u64::try_from(balance).ok()
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_pair_balances_to_zero() {
        let ledger = Ledger::new();
        let tid = TransferId::new();
        let (debit, credit) = ledger.append_pair(tid, 1, 900, 2, 1_100, 100).unwrap();

        assert_eq!(debit.delta, -100);
        assert_eq!(credit.delta, 100);
        assert_eq!(debit.delta + credit.delta, 0);
        assert_eq!(ledger.transfer_net_delta(tid), 0);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_per_account_sequence_is_monotonic() {
        let ledger = Ledger::new();
        ledger.append_pair(TransferId::new(), 1, 900, 2, 1_100, 100).unwrap();
        ledger.append_pair(TransferId::new(), 1, 800, 3, 100, 100).unwrap();
        ledger.append_pair(TransferId::new(), 2, 1_050, 1, 850, 50).unwrap();

        let seqs: Vec<LedgerSeq> = ledger
            .entries_for_account(1)
            .iter()
            .map(|e| e.seq)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_entry_ids_are_global_and_unique() {
        let ledger = Ledger::new();
        let (d1, c1) = ledger.append_pair(TransferId::new(), 1, 0, 2, 10, 10).unwrap();
        let (d2, c2) = ledger.append_pair(TransferId::new(), 2, 0, 1, 10, 10).unwrap();

        let ids = [d1.entry_id, c1.entry_id, d2.entry_id, c2.entry_id];
        assert_eq!(ids, [1, 2, 3, 4]);
    }

    #[test]
    fn test_replay_balance() {
        let ledger = Ledger::new();
        ledger.append_pair(TransferId::new(), 1, 700, 2, 1_300, 300).unwrap();
        ledger.append_pair(TransferId::new(), 2, 1_250, 1, 750, 50).unwrap();

        assert_eq!(ledger.replay_balance(1, 1_000), Some(750));
        assert_eq!(ledger.replay_balance(2, 1_000), Some(1_250));
        // Unknown account replays to its opening balance.
        assert_eq!(ledger.replay_balance(99, 500), Some(500));
    }

    #[test]
    fn test_restore_continues_sequences() {
        let ledger = Ledger::new();
        let tid = TransferId::new();
        let (d, c) = ledger.append_pair(tid, 1, 900, 2, 1_100, 100).unwrap();

        let restored = Ledger::new();
        restored.restore(vec![d, c]);
        let (d2, _) = restored.append_pair(TransferId::new(), 1, 800, 2, 1_200, 100).unwrap();
        assert_eq!(d2.entry_id, 3);
        assert_eq!(d2.seq, 2);
    }
}
