use serde::{Deserialize, Serialize};
use std::fs;

use anyhow::Context;

use crate::account_store::LockSettings;
use crate::core_types::MinorUnits;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub fraud: FraudConfig,
    #[serde(default)]
    pub journal: JournalFileConfig,
    #[serde(default)]
    pub locks: LockConfig,
    /// Seed demo users and accounts at startup
    #[serde(default)]
    pub seed_demo: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FraudConfig {
    /// Amounts strictly above this (minor units) are flagged for review
    pub high_amount_threshold: MinorUnits,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            high_amount_threshold: 500_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JournalFileConfig {
    pub enabled: bool,
    pub path: String,
    pub sync_on_append: bool,
}

impl Default for JournalFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "./data/ledger.journal".to_string(),
            sync_on_append: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockConfig {
    pub acquire_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        let defaults = LockSettings::default();
        Self {
            acquire_timeout_ms: defaults.acquire_timeout_ms,
            max_retries: defaults.max_retries,
            backoff_ms: defaults.backoff_ms,
        }
    }
}

impl LockConfig {
    pub fn to_settings(&self) -> LockSettings {
        LockSettings {
            acquire_timeout_ms: self.acquire_timeout_ms,
            max_retries: self.max_retries,
            backoff_ms: self.backoff_ms,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "neoledger.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            gateway: GatewayConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            fraud: FraudConfig::default(),
            journal: JournalFileConfig::default(),
            locks: LockConfig::default(),
            seed_demo: true,
        }
    }
}
