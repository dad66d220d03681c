//! Platform fee charged when a session starts.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use rust_decimal::Decimal;

use crate::api::{FeePaymentRequest, FeePaymentResponse, FeeToken, TradingApi};
use crate::utils::error::{Error, Result};
use crate::wallet::IntegratedWallet;

/// Something that can move the fee from the user's wallet to the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeePayer: Send + Sync {
    async fn pay(&self, amount_usd: Decimal, token: FeeToken) -> Result<FeePaymentResponse>;
}

/// Pays through `POST /api/trading/pay-fee`
pub struct ApiFeePayer {
    api: Arc<dyn TradingApi>,
    wallet: Option<Arc<IntegratedWallet>>,
}

impl ApiFeePayer {
    pub fn new(api: Arc<dyn TradingApi>) -> Self {
        Self { api, wallet: None }
    }

    /// Send the wallet's primary address (the base account) with each payment
    pub fn with_wallet(mut self, wallet: Arc<IntegratedWallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    fn request(&self, amount_usd: Decimal, token: FeeToken) -> FeePaymentRequest {
        let wallet_address =
            self.wallet.as_ref().and_then(|w| w.wallets().primary_address().map(str::to_string));
        FeePaymentRequest { amount: amount_usd, token, wallet_address }
    }
}

#[async_trait]
impl FeePayer for ApiFeePayer {
    async fn pay(&self, amount_usd: Decimal, token: FeeToken) -> Result<FeePaymentResponse> {
        let request = self.request(amount_usd, token);
        self.api.pay_fee(&request).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeReceipt {
    pub amount_usd: Decimal,
    pub token: FeeToken,
    pub tx_hash: Option<String>,
}

/// `budget × pct / 100`, rounded to cents
pub fn platform_fee(budget: Decimal, pct: Decimal) -> Decimal {
    (budget * pct / Decimal::ONE_HUNDRED).round_dp(2)
}

fn rejected(resp: FeePaymentResponse, token: FeeToken) -> Result<FeePaymentResponse> {
    if resp.success {
        Ok(resp)
    } else {
        let message = resp.message.unwrap_or_else(|| format!("{} fee payment was rejected", token));
        Err(Error::Api { status: 200, message })
    }
}

/// Pay in USDC; if the USDC payment is rejected (insufficient USDC, transfer
/// reverted) try ETH. Transport failures are not retried in ETH.
pub async fn pay_platform_fee(payer: &dyn FeePayer, amount_usd: Decimal) -> Result<FeeReceipt> {
    let usdc = payer.pay(amount_usd, FeeToken::Usdc).await.and_then(|r| rejected(r, FeeToken::Usdc));
    let (token, resp) = match usdc {
        Ok(resp) => (FeeToken::Usdc, resp),
        Err(Error::Api { message, .. }) => {
            warn!("USDC fee payment rejected ({}), falling back to ETH", message);
            let resp = payer.pay(amount_usd, FeeToken::Eth).await.and_then(|r| rejected(r, FeeToken::Eth))?;
            (FeeToken::Eth, resp)
        }
        Err(err) => return Err(err),
    };
    info!("paid ${} platform fee in {}", amount_usd, token);
    Ok(FeeReceipt { amount_usd, token, tx_hash: resp.tx_hash })
}
