use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core_types::Amount;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Rotated log files to keep; unset keeps them all
    #[serde(default)]
    pub max_log_files: Option<usize>,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletConfig {
    /// Balance given to an account on first sight
    pub starting_balance: Amount,
    /// Balance restored by `wipe_debt`
    pub debt_reset_balance: Amount,
    /// Journal every balance change
    pub audit_enabled: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            starting_balance: 100,
            debt_reset_balance: 100,
            audit_enabled: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub snapshot_path: String,
    pub journal_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            snapshot_path: "./data/wallets.json".to_string(),
            journal_path: "./data/ledger.csv".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`.
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path}"))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {config_path}"))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config yaml")
    }
}
