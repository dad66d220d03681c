//! Runtime environment, resolved once at startup.
//!
//! The dashboard probes for a mini-app host, a MetaMask provider or plain web
//! mode on every render. Here the answer is computed once from configuration
//! and handed to whoever needs it.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::utils::error::{Error, Result};

/// Network the Avantis contracts live on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Base,
    BaseSepolia,
}

impl Network {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "base" | "mainnet" | "base-mainnet" => Some(Network::Base),
            "base-sepolia" | "sepolia" | "testnet" => Some(Network::BaseSepolia),
            _ => None,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Base => 8453,
            Network::BaseSepolia => 84532,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Base => "Base Mainnet",
            Network::BaseSepolia => "Base Sepolia",
        }
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            Network::Base => "https://basescan.org",
            Network::BaseSepolia => "https://sepolia.basescan.org",
        }
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url(), tx_hash)
    }
}

/// How the user signs in and signs transactions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WalletProvider {
    /// Base / Farcaster mini-app host with a Base Account
    BaseAccount,
    /// Browser extension wallet
    MetaMask,
    /// Plain web session, no wallet signature
    Web,
}

impl WalletProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "base" | "base-account" | "baseaccount" => Some(WalletProvider::BaseAccount),
            "metamask" => Some(WalletProvider::MetaMask),
            "web" => Some(WalletProvider::Web),
            _ => None,
        }
    }

    /// Auth route used to exchange credentials for a bearer token
    pub fn auth_path(&self) -> &'static str {
        match self {
            WalletProvider::BaseAccount => "/api/auth/base-account",
            WalletProvider::MetaMask | WalletProvider::Web => "/api/auth/web",
        }
    }

    /// Whether sign-in requires a wallet signature over a challenge message
    pub fn requires_signature(&self) -> bool {
        !matches!(self, WalletProvider::Web)
    }
}

/// Capabilities of the current runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientEnvironment {
    pub network: Network,
    pub provider: WalletProvider,
    pub web_mode_enabled: bool,
}

impl ClientEnvironment {
    /// Resolve the environment for `provider`. Web sign-in is refused unless
    /// web mode is enabled in the configuration.
    pub fn resolve(config: &Config, provider: WalletProvider) -> Result<Self> {
        let network = Network::from_name(&config.api.avantis_network).ok_or_else(|| {
            Error::Config(format!("unknown avantis network '{}'", config.api.avantis_network))
        })?;
        if provider == WalletProvider::Web && !config.api.enable_web_mode {
            return Err(Error::Config(
                "web mode is disabled; set NEXT_PUBLIC_ENABLE_WEB_MODE=true".to_string(),
            ));
        }
        Ok(Self { network, provider, web_mode_enabled: config.api.enable_web_mode })
    }
}
