//! Account Store
//!
//! Concurrent owner of all account rows. Every balance mutation funnels
//! through this store's lock discipline; nothing else holds a mutable
//! reference to an `Account`.
//!
//! Pair locking always acquires the lower account id first, so two
//! concurrent transfers touching the same pair in opposite directions
//! cannot deadlock. Acquisition is bounded by a timeout and retried with
//! backoff before surfacing `Busy`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::warn;

use crate::account::{Account, AccountError, AccountSnapshot};
use crate::core_types::{AccountId, MinorUnits, UserId};

/// Lock acquisition tuning
#[derive(Debug, Clone)]
pub struct LockSettings {
    /// Per-attempt acquisition timeout
    pub acquire_timeout_ms: u64,
    /// Retries after the first attempt before surfacing `Busy`
    pub max_retries: u32,
    /// Initial backoff between attempts (doubles each retry)
    pub backoff_ms: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 200,
            max_retries: 3,
            backoff_ms: 20,
        }
    }
}

/// Store-level errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Account pair busy, try again")]
    Busy,

    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Concurrent account store with per-account async locks.
pub struct AccountStore {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    id_gen: AtomicU64,
    locks: LockSettings,
}

/// Both accounts of a transfer, locked for the duration of the commit
/// unit. Dropping the pair releases both locks.
#[derive(Debug)]
pub struct LockedPair {
    first: OwnedMutexGuard<Account>,
    second: OwnedMutexGuard<Account>,
}

impl LockedPair {
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        if self.first.id() == id {
            Some(&self.first)
        } else if self.second.id() == id {
            Some(&self.second)
        } else {
            None
        }
    }

    pub fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        if self.first.id() == id {
            Some(&mut self.first)
        } else if self.second.id() == id {
            Some(&mut self.second)
        } else {
            None
        }
    }
}

impl AccountStore {
    pub fn new(locks: LockSettings) -> Self {
        Self {
            accounts: DashMap::new(),
            id_gen: AtomicU64::new(1),
            locks,
        }
    }

    /// Open a new account for `owner` with an opening balance and return
    /// its snapshot.
    pub fn open_account(&self, owner: UserId, opening_balance: MinorUnits) -> AccountSnapshot {
        let id = self.id_gen.fetch_add(1, Ordering::SeqCst);
        let account = Account::open(id, owner, opening_balance);
        let snapshot = account.snapshot();
        self.accounts.insert(id, Arc::new(Mutex::new(account)));
        snapshot
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Ensure newly opened accounts get ids at or above `next`. Called
    /// after journal replay so fresh accounts never collide with ids in
    /// restored ledger history. Never moves the generator backwards.
    pub fn advance_ids(&self, next: AccountId) {
        self.id_gen.fetch_max(next, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn cell(&self, id: AccountId) -> Result<Arc<Mutex<Account>>, StoreError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    /// Read-only snapshot of a single account.
    pub async fn snapshot(&self, id: AccountId) -> Result<AccountSnapshot, StoreError> {
        let cell = self.cell(id)?;
        let account = cell.lock().await;
        Ok(account.snapshot())
    }

    /// Snapshots of all accounts owned by `user`, ordered by account id.
    pub async fn accounts_for_user(&self, user: UserId) -> Vec<AccountSnapshot> {
        let cells: Vec<Arc<Mutex<Account>>> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut snapshots = Vec::new();
        for cell in cells {
            let account = cell.lock().await;
            if account.owner() == user {
                snapshots.push(account.snapshot());
            }
        }
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    /// Credit a single account (deposit path).
    pub async fn credit(
        &self,
        id: AccountId,
        amount: MinorUnits,
    ) -> Result<AccountSnapshot, StoreError> {
        let cell = self.cell(id)?;
        let mut account = self.lock_one(&cell).await?;
        account.credit(amount)?;
        Ok(account.snapshot())
    }

    /// Debit a single account with optimistic version check.
    pub async fn debit(
        &self,
        id: AccountId,
        amount: MinorUnits,
        expected_version: u64,
    ) -> Result<AccountSnapshot, StoreError> {
        let cell = self.cell(id)?;
        let mut account = self.lock_one(&cell).await?;
        account.debit(amount, expected_version)?;
        Ok(account.snapshot())
    }

    /// Activate or suspend an account.
    pub async fn set_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<AccountSnapshot, StoreError> {
        let cell = self.cell(id)?;
        let mut account = self.lock_one(&cell).await?;
        account.set_active(active);
        Ok(account.snapshot())
    }

    async fn lock_one(
        &self,
        cell: &Arc<Mutex<Account>>,
    ) -> Result<OwnedMutexGuard<Account>, StoreError> {
        let per_attempt = Duration::from_millis(self.locks.acquire_timeout_ms);
        let mut backoff = Duration::from_millis(self.locks.backoff_ms);

        for attempt in 0..=self.locks.max_retries {
            if let Ok(guard) = timeout(per_attempt, cell.clone().lock_owned()).await {
                return Ok(guard);
            }
            if attempt < self.locks.max_retries {
                warn!(attempt, "account lock timed out, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        Err(StoreError::Busy)
    }

    /// Lock both accounts of a transfer in ascending id order.
    ///
    /// Each acquisition is bounded; on timeout both guards are released
    /// and the whole pair is retried with backoff, so a slow holder never
    /// wedges half a pair.
    pub async fn lock_pair(&self, a: AccountId, b: AccountId) -> Result<LockedPair, StoreError> {
        let (lower, upper) = if a < b { (a, b) } else { (b, a) };
        let lower_cell = self.cell(lower)?;
        let upper_cell = self.cell(upper)?;

        let per_attempt = Duration::from_millis(self.locks.acquire_timeout_ms);
        let mut backoff = Duration::from_millis(self.locks.backoff_ms);

        for attempt in 0..=self.locks.max_retries {
            if let Ok(first) = timeout(per_attempt, lower_cell.clone().lock_owned()).await {
                match timeout(per_attempt, upper_cell.clone().lock_owned()).await {
                    Ok(second) => return Ok(LockedPair { first, second }),
                    Err(_) => drop(first),
                }
            }
            if attempt < self.locks.max_retries {
                warn!(lower, upper, attempt, "pair lock timed out, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        Err(StoreError::Busy)
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new(LockSettings::default())
    }
}
