//! NeoLedger - Hardened P2P Money Transfer Engine
//!
//! An in-process transfer engine with double-entry bookkeeping, built
//! around one rule: money moves atomically or not at all.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (AccountId, MinorUnits, etc.)
//! - [`money`] - Minor-unit conversion and formatting
//! - [`account`] - Enforced account balance type
//! - [`account_store`] - Concurrent account store with pair locking
//! - [`ledger`] - Append-only double-entry ledger
//! - [`journal`] - Durable ledger journal (CRC-framed pairs)
//! - [`transfer`] - Transfer orchestrator, types and errors
//! - [`idempotency`] - Retry deduplication by client key
//! - [`fraud`] - Post-commit fraud screening and flag review
//! - [`directory`] - User directory and recipient resolution
//! - [`insights`] - Spending insight reports
//! - [`audit`] - Fire-and-forget outcome events
//! - [`gateway`] - HTTP API (axum)

// Core types - must be first!
pub mod core_types;

// Engine components
pub mod account;
pub mod account_store;
pub mod audit;
pub mod directory;
pub mod fraud;
pub mod idempotency;
pub mod insights;
pub mod journal;
pub mod ledger;
pub mod money;
pub mod transfer;

// Service surface
pub mod config;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use account::{Account, AccountError, AccountSnapshot};
pub use account_store::{AccountStore, LockSettings, StoreError};
pub use core_types::{AccountId, EntryId, LedgerSeq, MinorUnits, UserId};
pub use fraud::{FlagStore, FraudPolicy, HighAmountRule};
pub use idempotency::IdempotencyGuard;
pub use journal::{Journal, JournalConfig};
pub use ledger::{Ledger, LedgerEntry, LedgerError};
pub use transfer::{
    TransferError, TransferId, TransferOrchestrator, TransferRecord, TransferRequest,
    TransferResult, TransferStatus,
};
