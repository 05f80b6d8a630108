//! Account value type
//!
//! The single source of truth for balance state. All mutations go through
//! these methods.
//!
//! # Invariants (enforced by private fields)
//! - Balance never goes negative (debit checks funds first)
//! - No overflow/underflow (checked arithmetic)
//! - Every successful mutation increments the version token
//! - Debit verifies the caller-supplied expected version, so stale reads
//!   are rejected even on paths that do not hold the account lock for the
//!   whole read-modify-write

use serde::Serialize;
use thiserror::Error;

use crate::core_types::{AccountId, MinorUnits, UserId};

/// Account mutation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Account is inactive")]
    Inactive,

    #[error("Balance overflow")]
    Overflow,
}

/// A single bank account. Fields are private; mutation is only possible
/// through `credit`/`debit`/`set_active`.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    owner: UserId,
    balance: MinorUnits,
    version: u64,
    active: bool,
}

/// Read-only copy of account state, safe to hand out across lock
/// boundaries and serialize to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub owner: UserId,
    pub balance: MinorUnits,
    pub version: u64,
    pub active: bool,
}

impl Account {
    /// Open a new active account with an opening balance.
    pub fn open(id: AccountId, owner: UserId, opening_balance: MinorUnits) -> Self {
        Self {
            id,
            owner,
            balance: opening_balance,
            version: 0,
            active: true,
        }
    }

    #[inline(always)]
    pub const fn id(&self) -> AccountId {
        self.id
    }

    #[inline(always)]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    #[inline(always)]
    pub const fn balance(&self) -> MinorUnits {
        self.balance
    }

    #[inline(always)]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[inline(always)]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            owner: self.owner,
            balance: self.balance,
            version: self.version,
            active: self.active,
        }
    }

    /// Credit funds into the account.
    ///
    /// Incoming funds are accepted even when the account is inactive; a
    /// suspension stops money leaving, not arriving.
    pub fn credit(&mut self, amount: MinorUnits) -> Result<(), AccountError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Debit funds from the account.
    ///
    /// Fails with `VersionConflict` when `expected_version` does not match
    /// the stored version, `Inactive` when the account is suspended, and
    /// `InsufficientFunds` when the balance cannot cover the amount. On
    /// any error the account is unchanged.
    pub fn debit(&mut self, amount: MinorUnits, expected_version: u64) -> Result<(), AccountError> {
        if expected_version != self.version {
            return Err(AccountError::VersionConflict {
                expected: expected_version,
                actual: self.version,
            });
        }
        if !self.active {
            return Err(AccountError::Inactive);
        }
        if self.balance < amount {
            return Err(AccountError::InsufficientFunds);
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(AccountError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Activate or suspend the account. Bumps the version so in-flight
    /// optimistic debits observe the change.
    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            self.active = active;
            self.version = self.version.wrapping_add(1);
        }
    }
}
