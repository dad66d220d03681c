//! Integrated wallet state: one holdings view over the base account and the
//! trading vault.

mod aggregate;
mod selection;
pub mod validation;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::api::{BalanceSource, WalletApi};
use crate::sync::{FlightSet, StaleCache};
use crate::utils::error::{Error, Result};
use crate::utils::types::{Wallet, WalletBalances, WalletType};

pub use aggregate::{combine, format_units, merge_holdings, parse_raw};
pub use selection::WalletSet;
pub use validation::{check_deposit, check_withdraw, is_valid_address, FormCheck};

/// Balances as last fetched: per address and combined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletView {
    pub base: Option<WalletBalances>,
    pub trading: Option<WalletBalances>,
    pub combined: WalletBalances,
}

impl WalletView {
    pub fn total_value(&self) -> Decimal {
        self.combined.total_portfolio_value
    }
}

/// Result of a refresh request
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed(WalletView),
    /// Cached view is still within its TTL
    UpToDate,
    /// Another refresh was already running
    Skipped,
    /// Fetch failed; the last good view is kept
    Failed(String),
}

/// Balance aggregation over the user's wallets.
///
/// Refreshes are single-flight: a call made while another is running returns
/// [`RefreshOutcome::Skipped`] without touching the network. Failures never
/// clear the view.
pub struct IntegratedWallet {
    source: Arc<dyn BalanceSource>,
    wallets: Mutex<WalletSet>,
    balances: Mutex<StaleCache<WalletView>>,
    refreshing: FlightSet<()>,
}

impl IntegratedWallet {
    pub fn new(source: Arc<dyn BalanceSource>, ttl: Duration) -> Self {
        Self {
            source,
            wallets: Mutex::new(WalletSet::default()),
            balances: Mutex::new(StaleCache::new(ttl)),
            refreshing: FlightSet::new(),
        }
    }

    fn wallets_lock(&self) -> MutexGuard<'_, WalletSet> {
        self.wallets.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn balances_lock(&self) -> MutexGuard<'_, StaleCache<WalletView>> {
        self.balances.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_wallets(&self, wallets: WalletSet) {
        *self.wallets_lock() = wallets;
    }

    pub fn wallets(&self) -> WalletSet {
        self.wallets_lock().clone()
    }

    /// Fetch the user's wallets and adopt them
    pub async fn load_wallets(&self, api: &dyn WalletApi) -> Result<WalletSet> {
        let set = WalletSet::from_wallets(api.list_wallets().await?);
        debug!(
            "wallets: base={:?} trading={:?}",
            set.base_account.as_ref().map(|w| &w.address),
            set.trading.as_ref().map(|w| &w.address)
        );
        self.set_wallets(set.clone());
        Ok(set)
    }

    /// Create a trading vault on `chain` unless one exists
    pub async fn ensure_trading_wallet(&self, api: &dyn WalletApi, chain: &str) -> Result<Wallet> {
        if let Some(existing) = self.wallets_lock().trading.clone() {
            return Ok(existing);
        }
        let wallet = api.create_wallet(chain, WalletType::Trading).await?;
        info!("created trading wallet {}", wallet.address);
        self.wallets_lock().trading = Some(wallet.clone());
        Ok(wallet)
    }

    /// Last good view, however old
    pub fn view(&self) -> Option<WalletView> {
        self.balances_lock().last_good().cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.balances_lock().error().map(str::to_string)
    }

    pub fn is_refreshing(&self) -> bool {
        !self.refreshing.is_empty()
    }

    /// Combined USD value, zero before the first successful refresh
    pub fn total_value(&self) -> Decimal {
        self.balances_lock().last_good().map(WalletView::total_value).unwrap_or_default()
    }

    /// Refresh only if the cached view is older than the TTL
    pub async fn refresh_if_stale(&self) -> RefreshOutcome {
        if self.balances_lock().is_fresh() {
            return RefreshOutcome::UpToDate;
        }
        self.refresh_balances().await
    }

    /// Fetch balances for the base account and, if distinct, the trading
    /// vault, then merge them.
    pub async fn refresh_balances(&self) -> RefreshOutcome {
        let Some(_guard) = self.refreshing.try_begin(()) else {
            debug!("balance refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        match self.fetch_view().await {
            Ok(view) => {
                self.balances_lock().store(view.clone());
                RefreshOutcome::Refreshed(view)
            }
            Err(err) => {
                let message = err.user_message();
                warn!("balance refresh failed: {}", err);
                self.balances_lock().record_failure(message.clone());
                RefreshOutcome::Failed(message)
            }
        }
    }

    async fn fetch_view(&self) -> Result<WalletView> {
        let wallets = self.wallets();
        let base_addr = wallets.base_account.as_ref().map(|w| w.address.clone());
        let trading_addr = wallets.distinct_trading().map(|w| w.address.clone());

        let (base, trading) = match (base_addr, trading_addr) {
            (None, None) => return Err(Error::Validation("No wallet connected".to_string())),
            (Some(base), None) => (Some(self.source.fetch_balances(&base).await?), None),
            (None, Some(trading)) => (None, Some(self.source.fetch_balances(&trading).await?)),
            (Some(base), Some(trading)) => {
                let (b, t) = future::try_join(
                    self.source.fetch_balances(&base),
                    self.source.fetch_balances(&trading),
                )
                .await?;
                (Some(b), Some(t))
            }
        };

        let combined = match (&base, &trading) {
            (Some(b), t) => combine(b, t.as_ref())?,
            (None, Some(t)) => t.clone(),
            (None, None) => WalletBalances::default(),
        };
        Ok(WalletView { base, trading, combined })
    }

    /// Forget balances (sign-out)
    pub fn clear(&self) {
        self.balances_lock().clear();
        *self.wallets_lock() = WalletSet::default();
    }
}
