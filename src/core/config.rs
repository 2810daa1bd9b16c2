use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::bip44::DEFAULT_COIN_TYPE;
use crate::core::errors::WalletError;
use crate::security::encryption::KdfConfig;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_database_url")]
    pub database_url: String,
}

impl StorageConfig {
    fn default_database_url() -> String { "sqlite://./wallets.db?mode=rwc".to_string() }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { database_url: Self::default_database_url() }
    }
}

/// Remote ledger endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "LedgerConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "LedgerConfig::default_api_version")]
    pub api_version: String,
    /// Request timeout (seconds)
    #[serde(default = "LedgerConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LedgerConfig {
    fn default_base_url() -> String { "https://network.hycon.io".to_string() }
    fn default_api_version() -> String { "v1".to_string() }
    fn default_timeout_secs() -> u64 { 30 }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_version: Self::default_api_version(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationConfig {
    #[serde(default = "DerivationConfig::default_coin_type")]
    pub coin_type: u32,
}

impl DerivationConfig {
    fn default_coin_type() -> u32 { DEFAULT_COIN_TYPE }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self { coin_type: Self::default_coin_type() }
    }
}

/// Hardware device bridges. Each bridge is an external program that reads
/// one JSON request on stdin and answers with one JSON reply on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub simple_bridge: Option<Vec<String>>,
    #[serde(default)]
    pub gated_bridge: Option<Vec<String>>,
    /// Per-request timeout (seconds); device prompts wait on a human.
    #[serde(default = "DeviceConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DeviceConfig {
    fn default_timeout_secs() -> u64 { 120 }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            simple_bridge: None,
            gated_bridge: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub kdf: KdfConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub derivation: DerivationConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl WalletConfig {
    /// Read `path` when it exists, fall back to defaults otherwise, then apply
    /// environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| WalletError::ConfigError(format!("reading {}: {}", path.display(), e)))?;
            info!(path = %path.display(), "loaded configuration");
            Self::from_toml(&raw)?
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, WalletError> {
        toml::from_str(raw).map_err(|e| WalletError::ConfigError(format!("invalid TOML: {}", e)))
    }

    /// Overrides: `WALLET_DATABASE_URL`, `WALLET_LEDGER_URL`,
    /// `WALLET_DEVICE_BRIDGE`, `WALLET_GATED_DEVICE_BRIDGE` (bridges are
    /// whitespace-separated command lines).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WALLET_DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(url) = lookup("WALLET_LEDGER_URL") {
            self.ledger.base_url = url;
        }
        if let Some(cmd) = lookup("WALLET_DEVICE_BRIDGE") {
            self.device.simple_bridge = split_command(&cmd);
        }
        if let Some(cmd) = lookup("WALLET_GATED_DEVICE_BRIDGE") {
            self.device.gated_bridge = split_command(&cmd);
        }
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        let db_url = &self.storage.database_url;
        if db_url.is_empty() {
            return Err(WalletError::ConfigError("Database URL cannot be empty".into()));
        }
        if !db_url.starts_with("sqlite:") {
            return Err(WalletError::ConfigError(format!(
                "Unsupported database protocol in URL: {}",
                db_url
            )));
        }
        if self.ledger.base_url.trim().is_empty() {
            return Err(WalletError::ConfigError("Ledger URL cannot be empty".into()));
        }
        if self.ledger.timeout_secs == 0 || self.device.timeout_secs == 0 {
            return Err(WalletError::ConfigError("timeouts must be positive".into()));
        }
        for bridge in [&self.device.simple_bridge, &self.device.gated_bridge].into_iter().flatten() {
            if bridge.is_empty() {
                return Err(WalletError::ConfigError("device bridge command is empty".into()));
            }
        }
        self.security.kdf.validate()
    }
}

fn split_command(cmd: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}
