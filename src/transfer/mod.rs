//! Transfer module: types, error taxonomy and the orchestrator.

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::TransferError;
pub use orchestrator::TransferOrchestrator;
pub use types::{
    CATEGORIES, FraudStatus, TransferId, TransferRecord, TransferRequest, TransferResult,
    TransferStatus, is_valid_category,
};
