//! Configuration template generation

use std::fs;
use std::path::Path;

use crate::utils::ensure_dir;
use crate::utils::error::Result;

const COMMENTED_TEMPLATE: &str = r#"# PrepX client configuration
# Every value below is the built-in default. Environment variables
# (NEXT_PUBLIC_APP_URL, NEXT_PUBLIC_AVANTIS_NETWORK, ...) override the file.

version = "0.1.0"

[api]
# Base URL of the PrepX app; all /api/* routes are resolved against it
app_url = "http://localhost:3000"

# Avantis network: "base" or "base-sepolia"
avantis_network = "base"

# Service URLs used by the server-side routes (informational for the client)
# avantis_api_url = "http://localhost:8000"
# trading_engine_url = "http://localhost:3001"

# Allow plain web sign-in (no Base Account / MetaMask)
enable_web_mode = false

# Per-request deadline in seconds
request_timeout_secs = 30

# Deadline for close-all in seconds
bulk_timeout_secs = 60

[polling]
# Position polling interval while positions are open
active_interval_secs = 20

# Position polling interval while nothing is open
idle_interval_secs = 45

# Session reconciliation interval while a session is running
session_interval_secs = 15

# Retries for network failures when fetching positions (linear backoff)
max_retries = 3
retry_base_delay_ms = 2000

# How long fetched balances are considered fresh
balance_ttl_secs = 30

[trading]
# Platform fee charged when a session starts, in percent of the budget
platform_fee_pct = "1"

# ETH kept back for gas on ETH deposits
eth_gas_reserve = "0.0001"

# Chain used when creating wallets
default_chain = "base"

[storage]
# Local state file (auth token, active session, portfolio snapshot)
# state_path = "/home/me/.local/share/prepx/state.json"
"#;

/// Template text with comments explaining each field
pub fn commented_config_template() -> &'static str {
    COMMENTED_TEMPLATE
}

/// Write the commented configuration template to `path`
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(path, COMMENTED_TEMPLATE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(commented_config_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.api.app_url, defaults.api.app_url);
        assert_eq!(parsed.polling.idle_interval_secs, defaults.polling.idle_interval_secs);
        assert_eq!(parsed.trading.platform_fee_pct, defaults.trading.platform_fee_pct);
        assert_eq!(parsed.trading.eth_gas_reserve, defaults.trading.eth_gas_reserve);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_generate_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prepx.toml");
        generate_commented_config_template(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# PrepX client configuration"));
    }

    #[test]
    fn test_generate_template_under_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("prepx");
        fs::write(&blocker, "").unwrap();
        assert!(generate_commented_config_template(blocker.join("prepx.toml")).is_err());
        assert!(blocker.is_file());
    }
}
