//! Dashboard composition: one place that owns the API client, the local
//! store and the three state components, and keeps them in sync.

use std::sync::Arc;

use log::{debug, info, warn};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, TokenStore};
use crate::auth::AuthClient;
use crate::config::Config;
use crate::environment::{ClientEnvironment, WalletProvider};
use crate::persistence::{LocalState, LocalStore, StateStore};
use crate::portfolio::{self, DailyChange};
use crate::positions::PositionTracker;
use crate::session::{ApiFeePayer, SessionManager};
use crate::utils::error::Result;
use crate::utils::types::TradingSession;
use crate::wallet::{IntegratedWallet, RefreshOutcome};

/// Point-in-time view for rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub total_value: Decimal,
    pub daily_change: Option<DailyChange>,
    pub open_positions: usize,
    pub positions_pnl: Decimal,
    pub session: Option<TradingSession>,
    pub wallet_error: Option<String>,
    pub positions_error: Option<String>,
}

pub struct Dashboard {
    config: Config,
    env: ClientEnvironment,
    client: ApiClient,
    store: Arc<dyn StateStore>,
    auth: AuthClient,
    wallet: Arc<IntegratedWallet>,
    positions: Arc<PositionTracker>,
    session: Arc<SessionManager>,
    visible: watch::Sender<bool>,
}

impl Dashboard {
    /// Build a dashboard persisting to the configured state file
    pub fn new(config: Config, provider: WalletProvider) -> Result<Self> {
        let store: Arc<dyn StateStore> = Arc::new(LocalStore::new(config.state_path()?));
        Self::with_store(config, provider, store)
    }

    pub fn with_store(config: Config, provider: WalletProvider, store: Arc<dyn StateStore>) -> Result<Self> {
        config.validate()?;
        let env = ClientEnvironment::resolve(&config, provider)?;
        let tokens = TokenStore::new();
        let client = ApiClient::from_config(&config.api, tokens.clone())?;
        let api = Arc::new(client.clone());

        let auth = AuthClient::new(api.clone(), tokens.clone(), store.clone(), provider);
        let wallet = Arc::new(IntegratedWallet::new(api.clone(), config.polling.balance_ttl()));
        let positions = Arc::new(PositionTracker::new(api.clone(), tokens, &config.polling));
        let session = Arc::new(SessionManager::new(
            api.clone(),
            Arc::new(ApiFeePayer::new(api).with_wallet(wallet.clone())),
            wallet.clone(),
            store.clone(),
            config.trading.platform_fee_pct,
        ));
        positions.follow_session(session.watch_running());
        let (visible, _) = watch::channel(true);

        Ok(Self { config, env, client, store, auth, wallet, positions, session, visible })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &ClientEnvironment {
        &self.env
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn wallet(&self) -> &Arc<IntegratedWallet> {
        &self.wallet
    }

    pub fn positions(&self) -> &Arc<PositionTracker> {
        &self.positions
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Restore the token and, if signed in, load wallets, balances, the
    /// running session and positions. Returns whether a token was found.
    pub async fn initialize(&self) -> Result<bool> {
        if !self.client.tokens().restore(self.store.as_ref()).await? {
            debug!("no stored token");
            return Ok(false);
        }

        self.wallet.load_wallets(&self.client).await?;
        if let RefreshOutcome::Failed(message) = self.wallet.refresh_balances().await {
            warn!("initial balance refresh failed: {}", message);
        }
        if let Err(err) = self.session.restore_active_session().await {
            warn!("could not restore trading session: {}", err);
        }
        self.sync_gate();
        self.positions.fetch_positions(false).await;
        Ok(true)
    }

    /// Feed the position gate with the current session and balance state
    pub fn sync_gate(&self) {
        sync_gate(&self.positions, &self.session, &self.wallet);
    }

    /// Pause or resume position polling
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    /// Record today's portfolio value and return the change since the day opened
    pub async fn track_portfolio(&self) -> Result<DailyChange> {
        track_portfolio(self.store.as_ref(), self.wallet.total_value()).await
    }

    pub async fn summary(&self) -> DashboardSummary {
        let daily_change = match self.store.load().await {
            Ok(state) => state.portfolio.map(|p| p.change()),
            Err(err) => {
                warn!("could not read portfolio snapshot: {}", err);
                None
            }
        };
        let snapshot = self.positions.snapshot().unwrap_or_default();
        DashboardSummary {
            total_value: self.wallet.total_value(),
            daily_change,
            open_positions: snapshot.open_positions,
            positions_pnl: snapshot.total_pnl,
            session: self.session.current(),
            wallet_error: self.wallet.error(),
            positions_error: self.positions.error(),
        }
    }

    /// Sign out locally and forget every cached view
    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await?;
        self.wallet.clear();
        self.positions.clear();
        self.session.clear();
        self.sync_gate();
        Ok(())
    }

    /// Spawn the position poller, session reconciler, balance refresher and a
    /// watcher that fetches positions as soon as a session starts. All of
    /// them stop when `cancel` fires.
    pub fn spawn_background(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let poller = tokio::spawn(self.positions.clone().run(self.visible.subscribe(), cancel.child_token()));
        let reconciler = tokio::spawn(
            self.session.clone().run(self.config.polling.session_interval(), cancel.child_token()),
        );
        let stop = cancel.child_token();

        let wallet = self.wallet.clone();
        let positions = self.positions.clone();
        let session = self.session.clone();
        let store = self.store.clone();
        let period = self.config.polling.balance_ttl();
        let balances = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let RefreshOutcome::Refreshed(view) = wallet.refresh_if_stale().await {
                            if let Err(err) = track_portfolio(store.as_ref(), view.total_value()).await {
                                warn!("portfolio snapshot not saved: {}", err);
                            }
                        }
                        sync_gate(&positions, &session, &wallet);
                    }
                }
            }
            debug!("balance refresher stopped");
        });

        let positions = self.positions.clone();
        let mut running = self.session.watch_running();
        let session_watch = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    changed = running.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let is_running = *running.borrow_and_update();
                        if is_running {
                            positions.fetch_positions(false).await;
                        }
                    }
                }
            }
        });

        info!("background refresh started");
        vec![poller, reconciler, balances, session_watch]
    }
}

fn sync_gate(positions: &PositionTracker, session: &SessionManager, wallet: &IntegratedWallet) {
    positions.set_gate(session.is_running(), wallet.total_value());
}

async fn track_portfolio(store: &dyn StateStore, value: Decimal) -> Result<DailyChange> {
    let previous = store.load().await?.portfolio;
    let (snapshot, change) = portfolio::track(previous, value);
    store.update(&move |s: &mut LocalState| s.portfolio = Some(snapshot.clone())).await?;
    Ok(change)
}
