//! `/api/trading/*` routes

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{ApiClient, Auth};
use super::TradingApi;
use crate::utils::error::{Error, Result};
use crate::utils::types::{SessionStatus, TradingSession, Wallet};

/// Body of `POST /api/trading/start`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_budget: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub profit_goal: Decimal,
    pub max_positions: u32,
    pub leverage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    #[serde(alias = "id", alias = "session_id")]
    pub session_id: String,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StopSessionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopSessionRequest<'a> {
    session_id: &'a str,
}

/// Token the platform fee is paid in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeToken {
    Usdc,
    Eth,
}

impl std::fmt::Display for FeeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeToken::Usdc => f.write_str("USDC"),
            FeeToken::Eth => f.write_str("ETH"),
        }
    }
}

/// Body of `POST /api/trading/pay-fee`. `amount` is in USD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeePaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub token: FeeToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeePaymentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "tx_hash")]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /api/trading/prepare-transaction`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrepareTransactionRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

/// Unsigned transaction prepared by the server for the user's wallet to sign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
    pub to: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, alias = "chain_id")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Vec<TradingSession>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: Option<TradingSession>,
}

#[derive(Debug, Deserialize)]
struct PreparedTransactionResponse {
    transaction: PreparedTransaction,
}

#[derive(Debug, Deserialize)]
struct WalletResponse {
    wallet: Wallet,
}

fn session_path(session_id: &str) -> Result<String> {
    let id = session_id.trim();
    if id.is_empty() || id.contains('/') {
        return Err(Error::Validation(format!("invalid session id '{}'", session_id)));
    }
    Ok(format!("/api/trading/session/{}", id))
}

#[async_trait]
impl TradingApi for ApiClient {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<StartSessionResponse> {
        self.post_json("/api/trading/start", request, Auth::Required, self.request_timeout()).await
    }

    async fn stop_session(&self, session_id: &str) -> Result<StopSessionResponse> {
        let body = StopSessionRequest { session_id };
        self.post_json("/api/trading/stop", &body, Auth::Required, self.request_timeout()).await
    }

    async fn list_sessions(&self) -> Result<Vec<TradingSession>> {
        let resp: SessionsResponse = self.get_json("/api/trading/sessions", &[], Auth::Required).await?;
        Ok(resp.sessions)
    }

    async fn get_session(&self, session_id: &str) -> Result<TradingSession> {
        let path = session_path(session_id)?;
        let resp: SessionResponse = self.get_json(&path, &[], Auth::Required).await?;
        resp.session
            .ok_or_else(|| Error::Api { status: 404, message: format!("Session {} not found", session_id) })
    }

    async fn pay_fee(&self, request: &FeePaymentRequest) -> Result<FeePaymentResponse> {
        self.post_json("/api/trading/pay-fee", request, Auth::Required, self.request_timeout()).await
    }

    async fn prepare_transaction(&self, request: &PrepareTransactionRequest) -> Result<PreparedTransaction> {
        let resp: PreparedTransactionResponse = self
            .post_json("/api/trading/prepare-transaction", request, Auth::Required, self.request_timeout())
            .await?;
        Ok(resp.transaction)
    }

    async fn create_fallback_wallet(&self) -> Result<Wallet> {
        let resp: WalletResponse = self
            .post_json(
                "/api/trading/create-fallback-wallet",
                &serde_json::json!({}),
                Auth::Required,
                self.request_timeout(),
            )
            .await?;
        Ok(resp.wallet)
    }
}
