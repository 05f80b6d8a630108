//! Fraud Screen
//!
//! Pure, pluggable policy evaluated by the orchestrator after the
//! movement commits. A flag never reverses a committed transfer; it is
//! advisory until an administrator decides it.
//!
//! Rules are an ordered list; the first rule that flags wins.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::account::AccountSnapshot;
use crate::core_types::{AccountId, MinorUnits, UserId};
use crate::money::format_amount;
use crate::transfer::types::TransferId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Result of screening one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FraudDecision {
    Clear,
    Flagged {
        rule: &'static str,
        reason: String,
        severity: Severity,
    },
}

/// Everything a rule may look at. Rules are pure functions over this.
pub struct FraudContext<'a> {
    pub amount: MinorUnits,
    pub sender: &'a AccountSnapshot,
    pub recipient_account_id: AccountId,
    pub category: &'a str,
}

pub trait FraudRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &FraudContext<'_>) -> FraudDecision;
}

/// Amounts strictly above the configured threshold are flagged for
/// review.
pub struct HighAmountRule {
    threshold: MinorUnits,
    decimals: u32,
}

impl HighAmountRule {
    pub fn new(threshold: MinorUnits, decimals: u32) -> Self {
        Self { threshold, decimals }
    }
}

impl FraudRule for HighAmountRule {
    fn name(&self) -> &'static str {
        "high_amount"
    }

    fn evaluate(&self, ctx: &FraudContext<'_>) -> FraudDecision {
        if ctx.amount > self.threshold {
            FraudDecision::Flagged {
                rule: self.name(),
                reason: format!(
                    "High transaction amount (> {})",
                    format_amount(self.threshold, self.decimals)
                ),
                severity: Severity::High,
            }
        } else {
            FraudDecision::Clear
        }
    }
}

/// Ordered rule list, first match wins.
#[derive(Default)]
pub struct FraudPolicy {
    rules: Vec<Box<dyn FraudRule>>,
}

impl FraudPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl FraudRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn evaluate(&self, ctx: &FraudContext<'_>) -> FraudDecision {
        for rule in &self.rules {
            let decision = rule.evaluate(ctx);
            if matches!(decision, FraudDecision::Flagged { .. }) {
                return decision;
            }
        }
        FraudDecision::Clear
    }
}

/// Reviewer verdict on a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Pending,
    Cleared,
    Confirmed,
}

/// A flag raised at screening time. Created by the transfer path,
/// mutated only through `FlagStore::decide`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudFlag {
    pub transfer_id: TransferId,
    pub rule: String,
    pub reason: String,
    pub severity: Severity,
    pub decision: ReviewDecision,
    pub reviewed_by: Option<UserId>,
    pub created_at_ms: i64,
    pub decided_at_ms: Option<i64>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("No flag for transfer {0}")]
    NotFound(String),

    #[error("Flag already decided")]
    AlreadyDecided,

    #[error("Decision must be cleared or confirmed")]
    InvalidDecision,
}

/// Store of raised flags, keyed by transfer.
#[derive(Default)]
pub struct FlagStore {
    flags: DashMap<TransferId, FraudFlag>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flag raised by the screening step.
    pub fn raise(
        &self,
        transfer_id: TransferId,
        rule: &str,
        reason: String,
        severity: Severity,
    ) -> FraudFlag {
        let flag = FraudFlag {
            transfer_id,
            rule: rule.to_string(),
            reason,
            severity,
            decision: ReviewDecision::Pending,
            reviewed_by: None,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
            decided_at_ms: None,
        };
        self.flags.insert(transfer_id, flag.clone());
        flag
    }

    pub fn get(&self, transfer_id: TransferId) -> Option<FraudFlag> {
        self.flags.get(&transfer_id).map(|f| f.clone())
    }

    /// All flags still awaiting review, oldest first.
    pub fn pending(&self) -> Vec<FraudFlag> {
        let mut flags: Vec<FraudFlag> = self
            .flags
            .iter()
            .filter(|f| f.decision == ReviewDecision::Pending)
            .map(|f| f.clone())
            .collect();
        flags.sort_by_key(|f| f.created_at_ms);
        flags
    }

    /// Apply a reviewer decision. The only mutation path for a flag.
    pub fn decide(
        &self,
        transfer_id: TransferId,
        decision: ReviewDecision,
        reviewer: UserId,
    ) -> Result<FraudFlag, FlagError> {
        if decision == ReviewDecision::Pending {
            return Err(FlagError::InvalidDecision);
        }
        let mut flag = self
            .flags
            .get_mut(&transfer_id)
            .ok_or_else(|| FlagError::NotFound(transfer_id.to_string()))?;
        if flag.decision != ReviewDecision::Pending {
            return Err(FlagError::AlreadyDecided);
        }
        flag.decision = decision;
        flag.reviewed_by = Some(reviewer);
        flag.decided_at_ms = Some(chrono::Utc::now().timestamp_millis());
        Ok(flag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> AccountSnapshot {
        AccountSnapshot {
            id: 1,
            owner: 100,
            balance: 1_000_000,
            version: 3,
            active: true,
        }
    }

    fn ctx(amount: MinorUnits, sender: &AccountSnapshot) -> FraudContext<'_> {
        FraudContext {
            amount,
            sender,
            recipient_account_id: 2,
            category: "Other",
        }
    }

    #[test]
    fn test_high_amount_rule_boundary() {
        let rule = HighAmountRule::new(500_000, 2);
        let s = sender();

        // Exactly at the threshold is clear; strictly above flags.
        assert_eq!(rule.evaluate(&ctx(500_000, &s)), FraudDecision::Clear);
        match rule.evaluate(&ctx(500_001, &s)) {
            FraudDecision::Flagged { reason, severity, .. } => {
                assert_eq!(reason, "High transaction amount (> 5000.00)");
                assert_eq!(severity, Severity::High);
            }
            FraudDecision::Clear => panic!("expected flag"),
        }
    }

    #[test]
    fn test_policy_first_match_wins() {
        struct AlwaysFlag(&'static str);
        impl FraudRule for AlwaysFlag {
            fn name(&self) -> &'static str {
                self.0
            }
            fn evaluate(&self, _: &FraudContext<'_>) -> FraudDecision {
                FraudDecision::Flagged {
                    rule: self.0,
                    reason: self.0.to_string(),
                    severity: Severity::Low,
                }
            }
        }

        let policy = FraudPolicy::new()
            .with_rule(HighAmountRule::new(u64::MAX, 2))
            .with_rule(AlwaysFlag("second"))
            .with_rule(AlwaysFlag("third"));

        let s = sender();
        match policy.evaluate(&ctx(10, &s)) {
            FraudDecision::Flagged { rule, .. } => assert_eq!(rule, "second"),
            FraudDecision::Clear => panic!("expected flag"),
        }
    }

    #[test]
    fn test_empty_policy_is_clear() {
        let s = sender();
        assert_eq!(FraudPolicy::new().evaluate(&ctx(u64::MAX, &s)), FraudDecision::Clear);
    }

    #[test]
    fn test_flag_store_decision_lifecycle() {
        let store = FlagStore::new();
        let tid = TransferId::new();
        store.raise(tid, "high_amount", "reason".into(), Severity::High);

        assert_eq!(store.pending().len(), 1);

        let decided = store.decide(tid, ReviewDecision::Cleared, 999).unwrap();
        assert_eq!(decided.decision, ReviewDecision::Cleared);
        assert_eq!(decided.reviewed_by, Some(999));
        assert!(store.pending().is_empty());

        // Second decision is rejected.
        assert_eq!(
            store.decide(tid, ReviewDecision::Confirmed, 999),
            Err(FlagError::AlreadyDecided)
        );
    }

    #[test]
    fn test_flag_store_rejects_pending_decision() {
        let store = FlagStore::new();
        let tid = TransferId::new();
        store.raise(tid, "high_amount", "reason".into(), Severity::High);
        assert_eq!(
            store.decide(tid, ReviewDecision::Pending, 1),
            Err(FlagError::InvalidDecision)
        );
    }
}
