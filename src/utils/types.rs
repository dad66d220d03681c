//! Common types shared by the API client and the state components.
//!
//! Field names follow the PrepX API (camelCase). Positions come straight from
//! the trading engine, which uses snake_case and `is_long` flags, so they are
//! decoded through a permissive raw form.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of wallet provisioned for a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum WalletType {
    /// Secondary wallet holding collateral for automated trading
    Trading,
    /// Mini-app managed smart-contract wallet, the user's primary identity
    BaseAccount,
}

/// A wallet as returned by `/api/wallet`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub address: String,
    pub chain: String,
    #[serde(alias = "wallet_type")]
    pub wallet_type: WalletType,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// ERC-20 (or native) token metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u8,
}

impl Token {
    /// Case-insensitive identity used when merging holdings.
    pub fn key(&self) -> String {
        self.address.to_lowercase()
    }
}

/// Balance of one token held by one address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token: Token,
    /// Raw integer amount in the token's smallest unit, as a decimal string
    pub balance: String,
    /// `balance` scaled by `token.decimals`
    pub balance_formatted: String,
    #[serde(rename = "valueUSD", alias = "valueUsd", default)]
    pub value_usd: Decimal,
}

/// Result of one balance fetch for a single address
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalances {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub holdings: Vec<TokenBalance>,
    #[serde(default)]
    pub total_portfolio_value: Decimal,
}

impl WalletBalances {
    /// Holding for a token symbol, if any (case-insensitive).
    pub fn holding(&self, symbol: &str) -> Option<&TokenBalance> {
        self.holdings.iter().find(|h| h.token.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Direction of a perpetual position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// An open position on the trading engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawPosition")]
pub struct Position {
    pub symbol: Option<String>,
    pub pair_index: u32,
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub pnl: Decimal,
    pub leverage: Decimal,
    pub collateral: Decimal,
    pub take_profit: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
}

impl Position {
    /// Identifier used for close requests
    pub fn key(&self) -> u32 {
        self.pair_index
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }
}

/// Wire form accepted for positions: engine snake_case, API camelCase, or mixed.
#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(default, alias = "coin")]
    symbol: Option<String>,
    #[serde(alias = "pairIndex")]
    pair_index: u32,
    #[serde(default)]
    side: Option<PositionSide>,
    #[serde(default, alias = "isLong")]
    is_long: Option<bool>,
    #[serde(default, alias = "entryPrice")]
    entry_price: Decimal,
    #[serde(default, alias = "markPrice", alias = "current_price", alias = "currentPrice")]
    mark_price: Decimal,
    #[serde(default)]
    pnl: Decimal,
    #[serde(default = "one")]
    leverage: Decimal,
    #[serde(default)]
    collateral: Decimal,
    #[serde(default, alias = "takeProfit", alias = "tp")]
    take_profit: Option<Decimal>,
    #[serde(default, alias = "stopLoss", alias = "sl")]
    stop_loss: Option<Decimal>,
    #[serde(default, alias = "liquidationPrice")]
    liquidation_price: Option<Decimal>,
}

fn one() -> Decimal {
    Decimal::ONE
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        let side = match (raw.side, raw.is_long) {
            (Some(side), _) => side,
            (None, Some(false)) => PositionSide::Short,
            _ => PositionSide::Long,
        };
        Position {
            symbol: raw.symbol.filter(|s| !s.trim().is_empty()),
            pair_index: raw.pair_index,
            side,
            entry_price: raw.entry_price,
            mark_price: raw.mark_price,
            pnl: raw.pnl,
            leverage: raw.leverage,
            collateral: raw.collateral,
            take_profit: raw.take_profit,
            stop_loss: raw.stop_loss,
            liquidation_price: raw.liquidation_price,
        }
    }
}

/// Lifecycle of a server-tracked trading session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Starting,
    Running,
    Stopped,
    Completed,
    Error,
}

impl SessionStatus {
    /// Starting or running
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Starting | SessionStatus::Running)
    }

    /// Stopped, completed or error: the server no longer trades for this session
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Parameters a session was started with
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub total_budget: Decimal,
    #[serde(default)]
    pub profit_goal: Decimal,
    #[serde(default)]
    pub max_positions: u32,
    #[serde(default)]
    pub leverage: u32,
}

/// An automated trading run tracked by the trading engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradingSession {
    #[serde(alias = "sessionId", alias = "session_id")]
    pub id: String,
    pub status: SessionStatus,
    #[serde(rename = "totalPnL", alias = "totalPnl", alias = "total_pnl", default)]
    pub total_pnl: Decimal,
    /// Number of open positions in the session
    #[serde(default, alias = "openPositions")]
    pub positions: u32,
    #[serde(default)]
    pub config: SessionConfig,
}
