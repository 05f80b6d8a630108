//! Money Conversion Module
//!
//! Unified conversion between the internal minor-unit representation and
//! client-facing string/Decimal amounts. All conversions go through this
//! module.
//!
//! ## Internal Representation
//! - Amounts are stored as `u64` minor units
//! - The scale factor is `10^decimals` (10^2 for a cent-scaled currency)
//!
//! No silent truncation: input with more decimal places than the currency
//! supports is rejected, not rounded.

use crate::core_types::MinorUnits;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Convert a client-provided amount string to minor units.
///
/// Strict format: rejects empty strings, explicit signs, `.5`, `5.` and
/// multiple decimal points.
pub fn parse_amount(amount_str: &str, decimals: u32) -> Result<MinorUnits, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    if amount_str.starts_with('-') {
        return Err(MoneyError::Negative);
    }
    if amount_str.starts_with('+') {
        return Err(MoneyError::InvalidFormat("explicit sign not allowed".into()));
    }
    if amount_str.starts_with('.') {
        return Err(MoneyError::InvalidFormat(
            "missing leading zero (use 0.5 instead of .5)".into(),
        ));
    }
    if amount_str.ends_with('.') {
        return Err(MoneyError::InvalidFormat(
            "missing fractional part (use 5.0 instead of 5.)".into(),
        ));
    }

    let decimal = Decimal::from_str_exact(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
    parse_decimal(decimal, decimals)
}

/// Convert a parsed `Decimal` to minor units.
pub fn parse_decimal(amount: Decimal, decimals: u32) -> Result<MinorUnits, MoneyError> {
    if amount.is_sign_negative() {
        return Err(MoneyError::Negative);
    }
    if amount.scale() > decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: amount.scale(),
            max: decimals,
        });
    }

    let factor = Decimal::from(10u64.pow(decimals));
    let scaled = amount.checked_mul(factor).ok_or(MoneyError::Overflow)?;
    scaled.to_u64().ok_or(MoneyError::Overflow)
}

/// Format minor units back to a fixed-point string ("123.45").
pub fn format_amount(value: MinorUnits, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let base = 10u64.pow(decimals);
    format!(
        "{}.{:0width$}",
        value / base,
        value % base,
        width = decimals as usize
    )
}
