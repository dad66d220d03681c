//! REST clients for the PrepX `/api/*` routes.
//!
//! Every route is reached through [`ApiClient`]. State components do not hold
//! the client directly; they depend on the narrow traits below so tests can
//! drive them with fakes.

mod auth;
mod client;
mod positions;
mod trading;
mod wallet;

use async_trait::async_trait;

use crate::utils::error::Result;
use crate::utils::types::{TradingSession, Wallet, WalletBalances, WalletType};

pub use auth::{AuthRequest, AuthResponse, AuthUser, SessionInfo};
pub use client::{ApiClient, TokenStore};
pub use positions::{CloseAllResponse, ClosePositionResponse, PositionsResponse};
pub use trading::{
    FeePaymentRequest, FeePaymentResponse, FeeToken, PrepareTransactionRequest, PreparedTransaction,
    StartSessionRequest, StartSessionResponse, StopSessionResponse,
};

pub(crate) use client::extract_error_message;

/// Balance lookup for a single address
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balances(&self, address: &str) -> Result<WalletBalances>;
}

/// Wallet provisioning
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Wallets owned by the authenticated user
    async fn list_wallets(&self) -> Result<Vec<Wallet>>;

    async fn create_wallet(&self, chain: &str, wallet_type: WalletType) -> Result<Wallet>;
}

/// Open positions on the trading engine
#[async_trait]
pub trait PositionsApi: Send + Sync {
    async fn fetch_positions(&self) -> Result<PositionsResponse>;

    async fn close_position(&self, pair_index: u32) -> Result<ClosePositionResponse>;

    /// Close everything. Uses the bulk deadline.
    async fn close_all_positions(&self) -> Result<CloseAllResponse>;
}

/// Trading session lifecycle
#[async_trait]
pub trait TradingApi: Send + Sync {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<StartSessionResponse>;

    async fn stop_session(&self, session_id: &str) -> Result<StopSessionResponse>;

    async fn list_sessions(&self) -> Result<Vec<TradingSession>>;

    async fn get_session(&self, session_id: &str) -> Result<TradingSession>;

    async fn pay_fee(&self, request: &FeePaymentRequest) -> Result<FeePaymentResponse>;

    async fn prepare_transaction(&self, request: &PrepareTransactionRequest) -> Result<PreparedTransaction>;

    async fn create_fallback_wallet(&self) -> Result<Wallet>;
}

/// Token exchange for the configured sign-in provider
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn authenticate(&self, path: &str, request: &AuthRequest) -> Result<AuthResponse>;

    async fn session_info(&self, path: &str) -> Result<SessionInfo>;
}
