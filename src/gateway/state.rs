use std::sync::Arc;

use crate::account_store::AccountStore;
use crate::directory::{SharedResolver, SharedVerifier, UserDirectory};
use crate::ledger::Ledger;
use crate::transfer::TransferOrchestrator;
use crate::core_types::AccountId;

/// Gateway shared state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountStore>,
    pub ledger: Arc<Ledger>,
    pub orchestrator: Arc<TransferOrchestrator>,
    /// Concrete directory for profile lookups and admin mutation
    pub directory: Arc<UserDirectory>,
    /// Trait handles used by the transfer path
    pub resolver: SharedResolver,
    pub verifier: SharedVerifier,
    /// Account debited by the simulate-credit endpoint
    pub treasury_account: AccountId,
    pub amount_decimals: u32,
}
