pub mod account;
pub mod admin;
pub mod health;
pub mod insights;
pub mod query;
pub mod transfer;

pub use account::{credit_account, get_balance, open_account};
pub use admin::{decide_fraud_flag, list_fraud_flags, set_user_status};
pub use health::health_check;
pub use insights::get_insights;
pub use query::{get_ledger, get_transactions, get_transfer};
pub use transfer::create_transfer;
