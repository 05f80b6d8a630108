//! NeoLedger service entry point
//!
//! Wires the engine together and serves the HTTP gateway:
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌─────────┐
//! │  Config  │───▶│  Journal  │───▶│ Orchestrator │───▶│ Gateway │
//! │  (YAML)  │    │ (replay)  │    │ (lock+ledger)│    │ (axum)  │
//! └──────────┘    └───────────┘    └──────────────┘    └─────────┘
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use neoledger::account_store::AccountStore;
use neoledger::audit::ChannelAuditSink;
use neoledger::config::AppConfig;
use neoledger::core_types::AMOUNT_DECIMALS;
use neoledger::directory::{UserDirectory, UserProfile};
use neoledger::fraud::{FraudPolicy, HighAmountRule};
use neoledger::gateway::{self, AppState};
use neoledger::journal::{Journal, JournalConfig};
use neoledger::ledger::Ledger;
use neoledger::logging::init_logging;
use neoledger::transfer::TransferOrchestrator;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config load failed ({}), using defaults", e);
            AppConfig::default()
        }
    };

    let _guard = init_logging(&config);
    info!(env, "starting neoledger");

    // Ledger, optionally journal-backed with replay of prior runs.
    let mut restored_entries = 0usize;
    let mut max_restored_account = 0u64;
    let ledger = if config.journal.enabled {
        let replayed = Journal::replay(&config.journal.path)?;
        if !replayed.is_empty() {
            restored_entries = replayed.len();
            max_restored_account = replayed.iter().map(|e| e.account_id).max().unwrap_or(0);
            info!(entries = restored_entries, "replayed ledger journal");
        }
        let journal = Journal::open(JournalConfig {
            path: config.journal.path.clone(),
            sync_on_append: config.journal.sync_on_append,
        })?;
        let ledger = Ledger::with_journal(journal);
        ledger.restore(replayed);
        Arc::new(ledger)
    } else {
        warn!("ledger journal disabled, entries will not survive restarts");
        Arc::new(Ledger::new())
    };

    let accounts = Arc::new(AccountStore::new(config.locks.to_settings()));
    // Fresh accounts must not reuse ids present in restored history.
    if max_restored_account > 0 {
        accounts.advance_ids(max_restored_account + 1);
    }
    let directory = Arc::new(UserDirectory::new());

    let fraud = FraudPolicy::new().with_rule(HighAmountRule::new(
        config.fraud.high_amount_threshold,
        AMOUNT_DECIMALS,
    ));

    let (audit, _audit_task) = ChannelAuditSink::spawn();
    let orchestrator = Arc::new(TransferOrchestrator::new(
        accounts.clone(),
        ledger.clone(),
        fraud,
        audit,
    ));

    // Treasury funds simulated credits so every deposit is still a
    // balanced double entry.
    let treasury = accounts.open_account(0, u64::MAX / 2);

    if config.seed_demo {
        if restored_entries == 0 {
            seed_demo_users(&accounts, &directory);
            info!(accounts = accounts.len(), "seeded demo users");
        } else {
            warn!("journal history present, skipping demo seed");
        }
    }

    let state = Arc::new(AppState {
        accounts,
        ledger,
        orchestrator,
        directory: directory.clone(),
        resolver: directory.clone(),
        verifier: directory,
        treasury_account: treasury.id,
        amount_decimals: AMOUNT_DECIMALS,
    });

    gateway::run_server(state, &config.gateway.host, config.gateway.port).await
}

fn seed_demo_users(accounts: &AccountStore, directory: &UserDirectory) {
    let demo = [
        ("Alice Hartman", "alice@neoledger.dev", "+447700900001"),
        ("Bob Okafor", "bob@neoledger.dev", "+447700900002"),
        ("Carol Reyes", "carol@neoledger.dev", "+447700900003"),
    ];

    for (i, (name, email, mobile)) in demo.iter().enumerate() {
        let user_id = (i + 1) as u64;
        let snapshot = accounts.open_account(user_id, 1_000_000);
        directory.register(UserProfile {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            account_number: format!("NB{:08}", snapshot.id),
            customer_id: format!("CUST{:04}", user_id),
            profile_url: format!("pay.neoledger.dev/{}", user_id),
            mobile_number: mobile.to_string(),
            pin: "1234".to_string(),
            default_account: snapshot.id,
            active: true,
        });
    }
}
