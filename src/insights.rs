//! Spending insights
//!
//! Pure report builder over a user's completed outgoing transfers.
//! No state of its own; the gateway feeds it snapshots and records.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::core_types::{MinorUnits, UserId};
use crate::money::format_amount;
use crate::transfer::types::TransferRecord;

const SPEND_RATIO_WARNING: f64 = 0.70;
const SAVINGS_BALANCE_FLOOR: MinorUnits = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Warning,
    Info,
    Tip,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub total: MinorUnits,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport {
    pub user_id: UserId,
    pub month_spend: MinorUnits,
    /// Per-category totals for the current month, largest first
    pub categories: Vec<CategorySpend>,
    pub suggestions: Vec<Suggestion>,
}

/// Build the insights report for a user.
///
/// Only completed transfers sent in the current calendar month count
/// toward spend.
pub fn build_insights(
    user: UserId,
    total_balance: MinorUnits,
    transfers: &[TransferRecord],
    now: DateTime<Utc>,
    decimals: u32,
) -> InsightsReport {
    let mut by_category: HashMap<&str, MinorUnits> = HashMap::new();
    for record in transfers {
        if record.sender_user_id != user {
            continue;
        }
        let Some(created) = DateTime::from_timestamp_millis(record.created_at_ms) else {
            continue;
        };
        if created.year() != now.year() || created.month() != now.month() {
            continue;
        }
        *by_category.entry(record.category.as_str()).or_default() += record.amount;
    }

    let mut categories: Vec<CategorySpend> = by_category
        .into_iter()
        .map(|(category, total)| CategorySpend {
            category: category.to_string(),
            total,
        })
        .collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));

    let month_spend: MinorUnits = categories.iter().map(|c| c.total).sum();

    let mut suggestions = Vec::new();

    // Warn once spend exceeds 70% of the current balance.
    if month_spend as f64 > total_balance as f64 * SPEND_RATIO_WARNING {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Warning,
            message: format!(
                "You have spent {} this month, over 70% of your balance",
                format_amount(month_spend, decimals)
            ),
        });
    }

    if let Some(top) = categories.first() {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Info,
            message: format!(
                "Your top spending category this month is {} ({})",
                top.category,
                format_amount(top.total, decimals)
            ),
        });
    }

    if total_balance > SAVINGS_BALANCE_FLOOR {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Tip,
            message: "Your balance is healthy, consider moving some into savings".to_string(),
        });
    }

    InsightsReport {
        user_id: user,
        month_spend,
        categories,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::types::{FraudStatus, TransferId, TransferStatus};

    fn record(user: UserId, category: &str, amount: MinorUnits, at: DateTime<Utc>) -> TransferRecord {
        TransferRecord {
            transfer_id: TransferId::new(),
            idempotency_key: None,
            sender_account_id: 1,
            recipient_account_id: 2,
            sender_user_id: user,
            recipient_user_id: 99,
            amount,
            category: category.to_string(),
            description: None,
            status: TransferStatus::Completed,
            fraud_status: FraudStatus::None,
            error: None,
            created_at_ms: at.timestamp_millis(),
            updated_at_ms: at.timestamp_millis(),
        }
    }

    #[test]
    fn test_category_totals_current_month_only() {
        let now = Utc::now();
        let last_month = now - chrono::Duration::days(40);
        let records = vec![
            record(1, "Food", 300, now),
            record(1, "Food", 200, now),
            record(1, "Travel", 100, now),
            record(1, "Food", 9_999, last_month),
            record(2, "Food", 50, now),
        ];

        let report = build_insights(1, 10_000, &records, now, 2);
        assert_eq!(report.month_spend, 600);
        assert_eq!(report.categories[0].category, "Food");
        assert_eq!(report.categories[0].total, 500);
        assert_eq!(report.categories[1].category, "Travel");
    }

    #[test]
    fn test_heavy_spend_warning() {
        let now = Utc::now();
        // Spend above 70% of the remaining balance warns, even when the
        // spend exceeds the balance itself.
        let records = vec![record(1, "Shopping", 300, now)];
        let report = build_insights(1, 200, &records, now, 2);
        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.kind == SuggestionKind::Warning)
        );
    }

    #[test]
    fn test_no_warning_for_light_spend() {
        let now = Utc::now();
        let records = vec![record(1, "Food", 100, now)];
        let report = build_insights(1, 10_000, &records, now, 2);
        assert!(
            !report
                .suggestions
                .iter()
                .any(|s| s.kind == SuggestionKind::Warning)
        );
    }

    #[test]
    fn test_spend_warning_boundary() {
        let now = Utc::now();
        // Exactly 70% of balance is not over the line.
        let records = vec![record(1, "Food", 70, now)];
        let report = build_insights(1, 100, &records, now, 2);
        assert!(
            !report
                .suggestions
                .iter()
                .any(|s| s.kind == SuggestionKind::Warning)
        );

        let records = vec![record(1, "Food", 71, now)];
        let report = build_insights(1, 100, &records, now, 2);
        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.kind == SuggestionKind::Warning)
        );
    }

    #[test]
    fn test_savings_tip_above_floor() {
        let now = Utc::now();
        let report = build_insights(1, 1_000_001, &[], now, 2);
        assert!(report.suggestions.iter().any(|s| s.kind == SuggestionKind::Tip));

        let report = build_insights(1, 1_000_000, &[], now, 2);
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_empty_history() {
        let report = build_insights(1, 0, &[], Utc::now(), 2);
        assert_eq!(report.month_spend, 0);
        assert!(report.categories.is_empty());
        assert!(report.suggestions.is_empty());
    }
}
