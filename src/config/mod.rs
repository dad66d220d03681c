//! Configuration module for the PrepX client

mod template;

use crate::utils::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use template::{commented_config_template, generate_commented_config_template};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// API endpoints and request deadlines
    pub api: ApiConfig,

    /// Polling cadence and retry policy
    pub polling: PollingConfig,

    /// Trading session parameters
    pub trading: TradingConfig,

    /// Local state storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the PrepX app; all `/api/*` routes are resolved against it
    pub app_url: String,

    /// Avantis network (`base` or `base-sepolia`)
    pub avantis_network: String,

    /// Avantis service URL, used by the server-side routes
    pub avantis_api_url: Option<String>,

    /// Trading engine URL, used by the server-side routes
    pub trading_engine_url: Option<String>,

    /// Allow signing in without a Base Account / MetaMask
    #[serde(default)]
    pub enable_web_mode: bool,

    /// Default per-request deadline in seconds
    pub request_timeout_secs: u64,

    /// Deadline for bulk operations (close-all) in seconds
    pub bulk_timeout_secs: u64,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Position polling interval while positions are open
    pub active_interval_secs: u64,

    /// Position polling interval while nothing is open
    pub idle_interval_secs: u64,

    /// Session reconciliation interval while a session is running
    pub session_interval_secs: u64,

    /// Retries for network failures when fetching positions
    pub max_retries: u32,

    /// Linear backoff step between retries, in milliseconds
    pub retry_base_delay_ms: u64,

    /// How long fetched balances are considered fresh
    pub balance_ttl_secs: u64,
}

/// Trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Platform fee charged on session start, as a percentage of the budget
    pub platform_fee_pct: Decimal,

    /// ETH kept back for gas when depositing ETH
    pub eth_gas_reserve: Decimal,

    /// Chain used when creating wallets
    pub default_chain: String,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the local state file (token, active session, portfolio snapshot)
    pub state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            trading: TradingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            avantis_network: "base".to_string(),
            avantis_api_url: None,
            trading_engine_url: None,
            enable_web_mode: false,
            request_timeout_secs: 30,
            bulk_timeout_secs: 60,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            active_interval_secs: 20,
            idle_interval_secs: 45,
            session_interval_secs: 15,
            max_retries: 3,
            retry_base_delay_ms: 2_000,
            balance_ttl_secs: 30,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            platform_fee_pct: Decimal::ONE,
            eth_gas_reserve: Decimal::new(1, 4), // 0.0001 ETH
            default_chain: "base".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }
}

impl PollingConfig {
    pub fn active_interval(&self) -> Duration {
        Duration::from_secs(self.active_interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn session_interval(&self) -> Duration {
        Duration::from_secs(self.session_interval_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn balance_ttl(&self) -> Duration {
        Duration::from_secs(self.balance_ttl_secs)
    }
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::utils::ensure_dir(parent).map_err(|e| {
                Error::Config(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::Config("Config version must be set (e.g., '0.1.0')".to_string()));
        }
        url::Url::parse(&self.api.app_url)
            .map_err(|e| Error::Config(format!("api.app_url is not a valid URL: {}", e)))?;
        if crate::environment::Network::from_name(&self.api.avantis_network).is_none() {
            return Err(Error::Config(format!(
                "api.avantis_network must be 'base' or 'base-sepolia', got '{}'",
                self.api.avantis_network
            )));
        }
        if self.api.request_timeout_secs == 0 || self.api.bulk_timeout_secs == 0 {
            return Err(Error::Config("API timeouts must be > 0".to_string()));
        }
        if self.polling.active_interval_secs == 0
            || self.polling.idle_interval_secs == 0
            || self.polling.session_interval_secs == 0
            || self.polling.balance_ttl_secs == 0
        {
            return Err(Error::Config("Polling intervals must be > 0".to_string()));
        }
        if self.trading.platform_fee_pct < Decimal::ZERO || self.trading.platform_fee_pct > Decimal::from(100) {
            return Err(Error::Config("trading.platform_fee_pct must be within 0..=100".to_string()));
        }
        if self.trading.eth_gas_reserve < Decimal::ZERO {
            return Err(Error::Config("trading.eth_gas_reserve cannot be negative".to_string()));
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        if std::path::Path::new("prepx.toml").exists() {
            return Self::from_file("prepx.toml");
        }

        if let Ok(mut path) = crate::utils::app_config_dir() {
            path.push("config.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("NEXT_PUBLIC_APP_URL") {
            self.api.app_url = url;
        }

        if let Ok(network) = env::var("NEXT_PUBLIC_AVANTIS_NETWORK") {
            self.api.avantis_network = network;
        }

        if let Ok(url) = env::var("NEXT_PUBLIC_AVANTIS_API_URL") {
            self.api.avantis_api_url = Some(url);
        }

        if let Ok(url) = env::var("NEXT_PUBLIC_TRADING_ENGINE_URL") {
            self.api.trading_engine_url = Some(url);
        }

        if let Ok(flag) = env::var("NEXT_PUBLIC_ENABLE_WEB_MODE") {
            self.api.enable_web_mode = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(fee) = env::var("PREPX_PLATFORM_FEE_PCT") {
            self.trading.platform_fee_pct = Decimal::from_str(fee.trim())
                .map_err(|e| Error::Config(format!("PREPX_PLATFORM_FEE_PCT: {}", e)))?;
        }

        if let Ok(path) = env::var("PREPX_STATE_PATH") {
            self.storage.state_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Resolved location of the local state file
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.storage.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::utils::app_data_dir()?.join("state.json")),
        }
    }
}
