//! `/api/wallet` routes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{ApiClient, Auth};
use super::{BalanceSource, WalletApi};
use crate::utils::error::Result;
use crate::utils::types::{Wallet, WalletBalances, WalletType};

#[derive(Debug, Deserialize)]
struct WalletsResponse {
    #[serde(default)]
    wallets: Vec<Wallet>,
}

#[derive(Debug, Deserialize)]
struct WalletResponse {
    wallet: Wallet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWalletRequest<'a> {
    chain: &'a str,
    wallet_type: WalletType,
}

#[async_trait]
impl WalletApi for ApiClient {
    async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let resp: WalletsResponse = self.get_json("/api/wallet", &[], Auth::Required).await?;
        Ok(resp.wallets)
    }

    async fn create_wallet(&self, chain: &str, wallet_type: WalletType) -> Result<Wallet> {
        let body = CreateWalletRequest { chain, wallet_type };
        let resp: WalletResponse =
            self.post_json("/api/wallet", &body, Auth::Required, self.request_timeout()).await?;
        Ok(resp.wallet)
    }
}

#[async_trait]
impl BalanceSource for ApiClient {
    async fn fetch_balances(&self, address: &str) -> Result<WalletBalances> {
        let mut balances: WalletBalances =
            self.get_json("/api/wallet/balances", &[("address", address)], Auth::Required).await?;
        if balances.address.is_empty() {
            balances.address = address.to_string();
        }
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_wallet_body() {
        let body = CreateWalletRequest { chain: "base", wallet_type: WalletType::Trading };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "chain": "base", "walletType": "trading" }));
    }

    #[test]
    fn test_wallets_response_tolerates_missing_list() {
        let resp: WalletsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.wallets.is_empty());
    }
}
