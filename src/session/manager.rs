use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::fee::{pay_platform_fee, platform_fee, FeePayer, FeeReceipt};
use super::leverage::{compute_leverage, MAX_LEVERAGE, MIN_LEVERAGE};
use crate::api::{StartSessionRequest, TradingApi};
use crate::persistence::{LocalState, StateStore};
use crate::sync::FlightSet;
use crate::utils::error::{Error, Result};
use crate::utils::types::{SessionConfig, SessionStatus, TradingSession};
use crate::wallet::{IntegratedWallet, RefreshOutcome};

/// Named steps reported while a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    Fee,
    Balance,
    Session,
    Complete,
}

impl std::fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProgressStep::Fee => "fee",
            ProgressStep::Balance => "balance",
            ProgressStep::Session => "session",
            ProgressStep::Complete => "complete",
        };
        f.write_str(s)
    }
}

pub type Progress<'a> = &'a (dyn Fn(ProgressStep) + Send + Sync);

/// User input for a new session
#[derive(Debug, Clone, PartialEq)]
pub struct StartParams {
    pub max_budget: Decimal,
    pub profit_goal: Decimal,
    pub max_positions: u32,
    /// Picked from the budget when absent
    pub leverage: Option<u32>,
}

impl StartParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_budget <= Decimal::ZERO {
            return Err(Error::Validation("Budget must be greater than 0".to_string()));
        }
        if self.profit_goal <= Decimal::ZERO {
            return Err(Error::Validation("Profit goal must be greater than 0".to_string()));
        }
        if self.max_positions < 1 {
            return Err(Error::Validation("Max positions must be at least 1".to_string()));
        }
        if let Some(leverage) = self.leverage {
            if !(MIN_LEVERAGE..=MAX_LEVERAGE).contains(&leverage) {
                return Err(Error::Validation(format!(
                    "Leverage must be between {} and {}",
                    MIN_LEVERAGE, MAX_LEVERAGE
                )));
            }
        }
        Ok(())
    }

    pub fn effective_leverage(&self) -> u32 {
        self.leverage.unwrap_or_else(|| compute_leverage(self.max_budget))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartedSession {
    pub session_id: String,
    pub leverage: u32,
    pub fee: Option<FeeReceipt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started(StartedSession),
    /// Another start was already running
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Server still runs the session; totals refreshed
    Updated(TradingSession),
    /// Server ended the session; local state cleared
    Cleared(SessionStatus),
    /// Fetch failed or returned nothing usable; local state kept
    Preserved,
    /// Nothing to reconcile
    Idle,
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<TradingSession>,
    error: Option<String>,
}

/// Starts, stops and tracks the user's trading session
pub struct SessionManager {
    api: Arc<dyn TradingApi>,
    fees: Arc<dyn FeePayer>,
    wallet: Arc<IntegratedWallet>,
    store: Arc<dyn StateStore>,
    platform_fee_pct: Decimal,
    state: Mutex<SessionState>,
    running: watch::Sender<bool>,
    starting: FlightSet<()>,
    reconciling: FlightSet<()>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn TradingApi>,
        fees: Arc<dyn FeePayer>,
        wallet: Arc<IntegratedWallet>,
        store: Arc<dyn StateStore>,
        platform_fee_pct: Decimal,
    ) -> Self {
        Self {
            api,
            fees,
            wallet,
            store,
            platform_fee_pct,
            state: Mutex::new(SessionState::default()),
            running: watch::channel(false).0,
            starting: FlightSet::new(),
            reconciling: FlightSet::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Replace the local session and publish whether one is running
    fn set_session(&self, session: Option<TradingSession>) {
        let running = session.as_ref().map(|s| s.status.is_active()).unwrap_or(false);
        self.state().session = session;
        self.running.send_if_modified(|current| std::mem::replace(current, running) != running);
    }

    /// Follows [`SessionManager::is_running`]; updated on every start, stop,
    /// restore, reconcile and clear
    pub fn watch_running(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    pub fn current(&self) -> Option<TradingSession> {
        self.state().session.clone()
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.state().session.as_ref().map(|s| s.id.clone())
    }

    pub fn is_running(&self) -> bool {
        self.state().session.as_ref().map(|s| s.status.is_active()).unwrap_or(false)
    }

    pub fn is_starting(&self) -> bool {
        !self.starting.is_empty()
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    async fn adopt(&self, session: TradingSession) -> Result<()> {
        let id = session.id.clone();
        self.state().error = None;
        self.set_session(Some(session));
        self.store.update(&move |s: &mut LocalState| s.active_session_id = Some(id.clone())).await?;
        Ok(())
    }

    async fn forget(&self) -> Result<()> {
        self.set_session(None);
        self.store.update(&|s: &mut LocalState| s.active_session_id = None).await?;
        Ok(())
    }

    /// Pay the fee, refresh balances, then open the session on the server.
    ///
    /// The steps run strictly in order. A failed fee payment aborts the
    /// start; a failed balance refresh does not.
    pub async fn start_trading(&self, params: StartParams, progress: Option<Progress<'_>>) -> Result<StartOutcome> {
        params.validate()?;
        if self.is_running() {
            return Err(Error::Validation("A trading session is already running".to_string()));
        }
        let Some(_guard) = self.starting.try_begin(()) else {
            debug!("session start already in progress");
            return Ok(StartOutcome::Skipped);
        };
        let report = |step: ProgressStep| {
            debug!("start step: {}", step);
            if let Some(progress) = progress {
                progress(step);
            }
        };

        let result = self.run_start(&params, &report).await;
        if let Err(err) = &result {
            warn!("session start failed: {}", err);
            self.state().error = Some(err.user_message());
        }
        result
    }

    async fn run_start(&self, params: &StartParams, report: &(dyn Fn(ProgressStep) + Send + Sync)) -> Result<StartOutcome> {
        report(ProgressStep::Fee);
        let fee_amount = platform_fee(params.max_budget, self.platform_fee_pct);
        let fee = if fee_amount > Decimal::ZERO {
            Some(pay_platform_fee(self.fees.as_ref(), fee_amount).await?)
        } else {
            None
        };

        report(ProgressStep::Balance);
        if let RefreshOutcome::Failed(message) = self.wallet.refresh_balances().await {
            warn!("balance refresh after fee failed: {}", message);
        }

        let leverage = params.effective_leverage();
        report(ProgressStep::Session);
        let request = StartSessionRequest {
            total_budget: params.max_budget,
            profit_goal: params.profit_goal,
            max_positions: params.max_positions,
            leverage,
        };
        let resp = self.api.start_session(&request).await?;
        info!("trading session {} started ({}x)", resp.session_id, leverage);

        let session = TradingSession {
            id: resp.session_id.clone(),
            status: SessionStatus::Running,
            total_pnl: Decimal::ZERO,
            positions: 0,
            config: SessionConfig {
                total_budget: params.max_budget,
                profit_goal: params.profit_goal,
                max_positions: params.max_positions,
                leverage,
            },
        };
        self.adopt(session).await?;

        report(ProgressStep::Complete);
        Ok(StartOutcome::Started(StartedSession { session_id: resp.session_id, leverage, fee }))
    }

    /// Stop the active session and clear local state
    pub async fn stop_trading(&self) -> Result<()> {
        let id = self
            .active_session_id()
            .ok_or_else(|| Error::Validation("No active trading session".to_string()))?;
        let resp = self.api.stop_session(&id).await?;
        if let Some(message) = resp.message {
            debug!("stop {}: {}", id, message);
        }
        info!("trading session {} stopped", id);
        self.forget().await
    }

    /// Fetch one session. If it is the active one, local totals are updated.
    pub async fn get_trading_session(&self, session_id: &str) -> Result<TradingSession> {
        let session = self.api.get_session(session_id).await?;
        let mut state = self.state();
        if let Some(current) = state.session.as_mut() {
            if current.id == session.id && session.status.is_active() {
                *current = session.clone();
            }
        }
        Ok(session)
    }

    pub async fn list_sessions(&self) -> Result<Vec<TradingSession>> {
        self.api.list_sessions().await
    }

    /// Re-adopt a session that is still running on the server: the stored
    /// id first, then any active session the server lists.
    pub async fn restore_active_session(&self) -> Result<Option<TradingSession>> {
        if let Some(id) = self.store.load().await?.active_session_id {
            match self.api.get_session(&id).await {
                Ok(session) if session.status.is_active() => {
                    self.adopt(session.clone()).await?;
                    return Ok(Some(session));
                }
                Ok(session) => debug!("stored session {} is {}, forgetting it", id, session.status),
                Err(err @ (Error::Api { status: 404, .. } | Error::Data(_) | Error::Validation(_))) => {
                    warn!("stored session {} is gone ({}), forgetting it", id, err)
                }
                Err(err) => return Err(err),
            }
            self.forget().await?;
        }

        let sessions = self.api.list_sessions().await?;
        match sessions.into_iter().find(|s| s.status.is_active()) {
            Some(session) => {
                info!("resuming trading session {}", session.id);
                self.adopt(session.clone()).await?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Compare local state with the server. Terminal sessions are cleared;
    /// any failure leaves local state untouched.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let Some(id) = self.active_session_id() else {
            return ReconcileOutcome::Idle;
        };
        let Some(_guard) = self.reconciling.try_begin(()) else {
            return ReconcileOutcome::Preserved;
        };

        match self.api.get_session(&id).await {
            Ok(session) if session.id == id && session.status.is_active() => {
                self.set_session(Some(session.clone()));
                ReconcileOutcome::Updated(session)
            }
            Ok(session) if session.id == id => {
                info!("trading session {} is {}", id, session.status);
                if let Err(err) = self.forget().await {
                    warn!("failed to clear stored session: {}", err);
                }
                ReconcileOutcome::Cleared(session.status)
            }
            Ok(other) => {
                warn!("asked for session {}, server answered {}", id, other.id);
                ReconcileOutcome::Preserved
            }
            Err(err) => {
                debug!("session reconcile failed, keeping local state: {}", err);
                ReconcileOutcome::Preserved
            }
        }
    }

    /// Reconcile every `interval` while a session is running
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.is_running() {
                        self.reconcile().await;
                    }
                }
            }
        }
        debug!("session reconciler stopped");
    }

    /// Forget the session locally (sign-out)
    pub fn clear(&self) {
        self.state().error = None;
        self.set_session(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        BalanceSource, FeePaymentRequest, FeePaymentResponse, FeeToken, PrepareTransactionRequest,
        PreparedTransaction, StartSessionResponse, StopSessionResponse,
    };
    use crate::persistence::MemoryStore;
    use crate::utils::types::{Wallet, WalletBalances, WalletType};
    use crate::wallet::WalletSet;
    use async_trait::async_trait;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn record(log: &CallLog, entry: impl Into<String>) {
        log.lock().unwrap().push(entry.into());
    }

    struct FakeTrading {
        log: CallLog,
        sessions: Mutex<VecDeque<Result<TradingSession>>>,
        listed: Vec<TradingSession>,
    }

    impl FakeTrading {
        fn new(log: CallLog) -> Self {
            Self { log, sessions: Mutex::new(VecDeque::new()), listed: Vec::new() }
        }

        fn answer_sessions(self, answers: Vec<Result<TradingSession>>) -> Self {
            *self.sessions.lock().unwrap() = answers.into();
            self
        }
    }

    #[async_trait]
    impl TradingApi for FakeTrading {
        async fn start_session(&self, request: &StartSessionRequest) -> Result<StartSessionResponse> {
            record(&self.log, format!("start:{}x", request.leverage));
            Ok(StartSessionResponse { session_id: "sess-42".into(), status: Some(SessionStatus::Starting), message: None })
        }

        async fn stop_session(&self, session_id: &str) -> Result<StopSessionResponse> {
            record(&self.log, format!("stop:{}", session_id));
            Ok(StopSessionResponse { success: true, message: None })
        }

        async fn list_sessions(&self) -> Result<Vec<TradingSession>> {
            Ok(self.listed.clone())
        }

        async fn get_session(&self, session_id: &str) -> Result<TradingSession> {
            record(&self.log, format!("get:{}", session_id));
            let scripted = self.sessions.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| Ok(session(session_id, SessionStatus::Running, dec!(0))))
        }

        async fn pay_fee(&self, _request: &FeePaymentRequest) -> Result<FeePaymentResponse> {
            unreachable!("fees go through the FeePayer")
        }

        async fn prepare_transaction(&self, _request: &PrepareTransactionRequest) -> Result<PreparedTransaction> {
            unreachable!()
        }

        async fn create_fallback_wallet(&self) -> Result<Wallet> {
            unreachable!()
        }
    }

    struct FakeFees {
        log: CallLog,
        fail: bool,
    }

    #[async_trait]
    impl FeePayer for FakeFees {
        async fn pay(&self, amount_usd: Decimal, token: FeeToken) -> Result<FeePaymentResponse> {
            record(&self.log, format!("fee:{}:{}", token, amount_usd.normalize()));
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(Error::Network("rpc down".into()));
            }
            Ok(FeePaymentResponse { success: true, tx_hash: Some("0xfee".into()), message: None })
        }
    }

    struct FakeBalances {
        log: CallLog,
        fail: bool,
    }

    #[async_trait]
    impl BalanceSource for FakeBalances {
        async fn fetch_balances(&self, address: &str) -> Result<WalletBalances> {
            record(&self.log, "balances");
            if self.fail {
                return Err(Error::Api { status: 500, message: "rpc".into() });
            }
            Ok(WalletBalances { address: address.into(), ..Default::default() })
        }
    }

    fn session(id: &str, status: SessionStatus, pnl: Decimal) -> TradingSession {
        TradingSession { id: id.into(), status, total_pnl: pnl, positions: 1, config: SessionConfig::default() }
    }

    struct Harness {
        log: CallLog,
        store: Arc<MemoryStore>,
        manager: SessionManager,
    }

    fn harness_with(trading: impl FnOnce(CallLog) -> FakeTrading, fee_fails: bool, balance_fails: bool) -> Harness {
        let log: CallLog = Arc::default();
        let wallet = Arc::new(IntegratedWallet::new(
            Arc::new(FakeBalances { log: log.clone(), fail: balance_fails }),
            Duration::from_secs(30),
        ));
        wallet.set_wallets(WalletSet::from_wallets(vec![Wallet {
            id: "w".into(),
            address: "0xbase".into(),
            chain: "base".into(),
            wallet_type: WalletType::BaseAccount,
            created_at: chrono::Utc::now(),
        }]));
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(
            Arc::new(trading(log.clone())),
            Arc::new(FakeFees { log: log.clone(), fail: fee_fails }),
            wallet,
            store.clone(),
            dec!(1),
        );
        Harness { log, store, manager }
    }

    fn harness() -> Harness {
        harness_with(FakeTrading::new, false, false)
    }

    fn params() -> StartParams {
        StartParams { max_budget: dec!(100), profit_goal: dec!(20), max_positions: 3, leverage: None }
    }

    #[rstest]
    #[case(StartParams { max_budget: dec!(0), ..params() })]
    #[case(StartParams { profit_goal: dec!(-1), ..params() })]
    #[case(StartParams { max_positions: 0, ..params() })]
    #[case(StartParams { leverage: Some(0), ..params() })]
    #[case(StartParams { leverage: Some(51), ..params() })]
    fn test_invalid_params(#[case] params: StartParams) {
        assert!(matches!(params.validate(), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_start_runs_steps_in_order() {
        let h = harness();
        let steps: Arc<Mutex<Vec<ProgressStep>>> = Arc::default();
        let seen = steps.clone();
        let progress = move |step: ProgressStep| seen.lock().unwrap().push(step);

        let outcome = h.manager.start_trading(params(), Some(&progress)).await.unwrap();
        let StartOutcome::Started(started) = outcome else { panic!("expected a started session") };
        assert_eq!(started.session_id, "sess-42");
        assert_eq!(started.leverage, 5);
        assert_eq!(started.fee.unwrap().token, FeeToken::Usdc);

        assert_eq!(h.log.lock().unwrap().as_slice(), ["fee:USDC:1", "balances", "start:5x"]);
        assert_eq!(
            steps.lock().unwrap().as_slice(),
            [ProgressStep::Fee, ProgressStep::Balance, ProgressStep::Session, ProgressStep::Complete]
        );

        assert!(h.manager.is_running());
        assert_eq!(h.manager.active_session_id().as_deref(), Some("sess-42"));
        assert_eq!(h.store.load().await.unwrap().active_session_id.as_deref(), Some("sess-42"));

        let fetched = h.manager.get_trading_session("sess-42").await.unwrap();
        assert_eq!(fetched.id, "sess-42");
    }

    #[tokio::test]
    async fn test_fee_failure_aborts_start() {
        let h = harness_with(FakeTrading::new, true, false);
        let err = h.manager.start_trading(params(), None).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(h.log.lock().unwrap().as_slice(), ["fee:USDC:1"]);
        assert!(!h.manager.is_running());
        assert!(h.manager.error().is_some());
    }

    #[tokio::test]
    async fn test_balance_failure_does_not_abort() {
        let h = harness_with(FakeTrading::new, false, true);
        let outcome = h.manager.start_trading(params(), None).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Started(_)));
        assert!(h.manager.is_running());
    }

    #[tokio::test]
    async fn test_explicit_leverage_wins() {
        let h = harness();
        h.manager.start_trading(StartParams { leverage: Some(20), ..params() }, None).await.unwrap();
        assert!(h.log.lock().unwrap().contains(&"start:20x".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_start_is_skipped() {
        let h = harness();
        let (a, b) = tokio::join!(h.manager.start_trading(params(), None), h.manager.start_trading(params(), None));
        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(outcomes.iter().filter(|o| **o == StartOutcome::Skipped).count(), 1);
        assert_eq!(h.log.lock().unwrap().iter().filter(|e| e.starts_with("fee")).count(), 1);
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected() {
        let h = harness();
        h.manager.start_trading(params(), None).await.unwrap();
        assert!(matches!(h.manager.start_trading(params(), None).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_stop_clears_state() {
        let h = harness();
        assert!(matches!(h.manager.stop_trading().await, Err(Error::Validation(_))));

        h.manager.start_trading(params(), None).await.unwrap();
        h.manager.stop_trading().await.unwrap();
        assert!(!h.manager.is_running());
        assert!(h.store.load().await.unwrap().active_session_id.is_none());
        assert!(h.log.lock().unwrap().contains(&"stop:sess-42".to_string()));
    }

    #[tokio::test]
    async fn test_reconcile_failure_preserves_state() {
        let h = harness_with(
            |log| {
                FakeTrading::new(log).answer_sessions(vec![
                    Ok(session("sess-42", SessionStatus::Running, dec!(4.5))),
                    Err(Error::Timeout(Duration::from_secs(30))),
                    Err(Error::Api { status: 500, message: "boom".into() }),
                ])
            },
            false,
            false,
        );
        assert_eq!(h.manager.reconcile().await, ReconcileOutcome::Idle);

        h.manager.start_trading(params(), None).await.unwrap();
        assert!(matches!(h.manager.reconcile().await, ReconcileOutcome::Updated(_)));
        assert_eq!(h.manager.current().unwrap().total_pnl, dec!(4.5));

        assert_eq!(h.manager.reconcile().await, ReconcileOutcome::Preserved);
        assert_eq!(h.manager.reconcile().await, ReconcileOutcome::Preserved);
        assert!(h.manager.is_running());
        assert_eq!(h.manager.current().unwrap().total_pnl, dec!(4.5));
    }

    #[tokio::test]
    async fn test_reconcile_clears_terminal_session() {
        let h = harness_with(
            |log| FakeTrading::new(log).answer_sessions(vec![Ok(session("sess-42", SessionStatus::Completed, dec!(20)))]),
            false,
            false,
        );
        h.manager.start_trading(params(), None).await.unwrap();
        assert_eq!(h.manager.reconcile().await, ReconcileOutcome::Cleared(SessionStatus::Completed));
        assert!(h.manager.current().is_none());
        assert!(h.store.load().await.unwrap().active_session_id.is_none());
    }

    #[tokio::test]
    async fn test_restore_prefers_stored_session() {
        let h = harness();
        h.store.update(&|s: &mut LocalState| s.active_session_id = Some("sess-7".into())).await.unwrap();
        let restored = h.manager.restore_active_session().await.unwrap().unwrap();
        assert_eq!(restored.id, "sess-7");
        assert!(h.manager.is_running());
    }

    #[tokio::test]
    async fn test_restore_falls_back_to_listing() {
        let h = harness_with(
            |log| {
                let mut fake = FakeTrading::new(log)
                    .answer_sessions(vec![Ok(session("old", SessionStatus::Stopped, dec!(0)))]);
                fake.listed = vec![
                    session("done", SessionStatus::Completed, dec!(1)),
                    session("live", SessionStatus::Running, dec!(2)),
                ];
                fake
            },
            false,
            false,
        );
        h.store.update(&|s: &mut LocalState| s.active_session_id = Some("old".into())).await.unwrap();
        let restored = h.manager.restore_active_session().await.unwrap().unwrap();
        assert_eq!(restored.id, "live");
        assert_eq!(h.store.load().await.unwrap().active_session_id.as_deref(), Some("live"));
    }

    #[tokio::test]
    async fn test_restore_skips_missing_stored_session() {
        let h = harness_with(
            |log| {
                let mut fake = FakeTrading::new(log)
                    .answer_sessions(vec![Err(Error::Api { status: 404, message: "Session not found".into() })]);
                fake.listed = vec![session("live", SessionStatus::Running, dec!(0))];
                fake
            },
            false,
            false,
        );
        h.store.update(&|s: &mut LocalState| s.active_session_id = Some("gone".into())).await.unwrap();

        let restored = h.manager.restore_active_session().await.unwrap().unwrap();
        assert_eq!(restored.id, "live");
        assert!(h.manager.is_running());
        assert_eq!(h.store.load().await.unwrap().active_session_id.as_deref(), Some("live"));
    }

    #[tokio::test]
    async fn test_restore_propagates_transport_errors() {
        let h = harness_with(
            |log| FakeTrading::new(log).answer_sessions(vec![Err(Error::Network("down".into()))]),
            false,
            false,
        );
        h.store.update(&|s: &mut LocalState| s.active_session_id = Some("sess-7".into())).await.unwrap();

        assert!(matches!(h.manager.restore_active_session().await, Err(Error::Network(_))));
        assert_eq!(h.store.load().await.unwrap().active_session_id.as_deref(), Some("sess-7"));
    }

    #[tokio::test]
    async fn test_running_watch_follows_session_changes() {
        let h = harness_with(
            |log| {
                FakeTrading::new(log).answer_sessions(vec![
                    Ok(session("sess-42", SessionStatus::Running, dec!(1))),
                    Ok(session("sess-42", SessionStatus::Stopped, dec!(1))),
                ])
            },
            false,
            false,
        );
        let running = h.manager.watch_running();
        assert!(!*running.borrow());

        h.manager.start_trading(params(), None).await.unwrap();
        assert!(*running.borrow());
        assert!(matches!(h.manager.reconcile().await, ReconcileOutcome::Updated(_)));
        assert!(*running.borrow());
        assert_eq!(h.manager.reconcile().await, ReconcileOutcome::Cleared(SessionStatus::Stopped));
        assert!(!*running.borrow());

        h.manager.start_trading(params(), None).await.unwrap();
        h.manager.stop_trading().await.unwrap();
        assert!(!*running.borrow());

        h.manager.start_trading(params(), None).await.unwrap();
        h.manager.clear();
        assert!(!*running.borrow());
    }
}
