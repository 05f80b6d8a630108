//! Core type aliases shared across the engine.
//!
//! All monetary amounts are integer minor units (cents). Floating point
//! never touches balance arithmetic.

/// User identifier
pub type UserId = u64;

/// Bank account identifier
pub type AccountId = u64;

/// Monetary amount in minor units (e.g. cents)
pub type MinorUnits = u64;

/// Per-account ledger sequence number
pub type LedgerSeq = u64;

/// Ledger entry identifier (global, monotonic)
pub type EntryId = u64;

/// Default display/input scale for the demo currency (2 = cents)
pub const AMOUNT_DECIMALS: u32 = 2;
