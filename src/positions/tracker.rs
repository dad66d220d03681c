use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::symbols;
use crate::api::{CloseAllResponse, ClosePositionResponse, PositionsApi, PositionsResponse, TokenStore};
use crate::config::PollingConfig;
use crate::sync::{retry, FlightSet, RetryPolicy, StaleCache};
use crate::utils::error::{Error, Result};
use crate::utils::types::Position;

/// Whether positions are worth fetching at all.
///
/// Never without a token. Otherwise only while a session is running or the
/// user holds a positive external balance.
pub fn should_fetch_positions(has_token: bool, session_running: bool, balance: Decimal) -> bool {
    has_token && (session_running || balance > Decimal::ZERO)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoToken,
    /// No running session and no balance
    Gated,
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(PositionsSnapshot),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome<T> {
    Closed(T),
    /// A close for the same target is already running; nothing was sent
    AlreadyInFlight,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionsSnapshot {
    pub positions: Vec<Position>,
    pub total_pnl: Decimal,
    pub open_positions: usize,
}

impl From<PositionsResponse> for PositionsSnapshot {
    fn from(resp: PositionsResponse) -> Self {
        let open_positions = resp.open_count();
        let mut positions = resp.positions;
        positions.iter_mut().for_each(symbols::enrich);
        Self { positions, total_pnl: resp.total_pnl, open_positions }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GateInputs {
    session_running: bool,
    balance: Decimal,
}

/// Polls open positions and serializes close requests
pub struct PositionTracker {
    api: Arc<dyn PositionsApi>,
    tokens: TokenStore,
    gate: Mutex<GateInputs>,
    session: Mutex<Option<watch::Receiver<bool>>>,
    cache: Mutex<StaleCache<PositionsSnapshot>>,
    state: Mutex<FetchState>,
    fetching: FlightSet<()>,
    closing: FlightSet<u32>,
    closing_all: FlightSet<()>,
    retry: RetryPolicy,
    active_interval: Duration,
    idle_interval: Duration,
}

impl PositionTracker {
    pub fn new(api: Arc<dyn PositionsApi>, tokens: TokenStore, polling: &PollingConfig) -> Self {
        Self {
            api,
            tokens,
            gate: Mutex::new(GateInputs::default()),
            session: Mutex::new(None),
            cache: Mutex::new(StaleCache::new(polling.active_interval())),
            state: Mutex::new(FetchState::Idle),
            fetching: FlightSet::new(),
            closing: FlightSet::new(),
            closing_all: FlightSet::new(),
            retry: RetryPolicy::linear(polling.max_retries, polling.retry_base_delay()),
            active_interval: polling.active_interval(),
            idle_interval: polling.idle_interval(),
        }
    }

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Update the inputs of the fetch gate
    pub fn set_gate(&self, session_running: bool, balance: Decimal) {
        *Self::lock(&self.gate) = GateInputs { session_running, balance };
    }

    /// Take the session flag from `running` instead of [`Self::set_gate`]
    pub fn follow_session(&self, running: watch::Receiver<bool>) {
        *Self::lock(&self.session) = Some(running);
    }

    pub fn should_fetch(&self) -> bool {
        let gate = *Self::lock(&self.gate);
        let session_running = match Self::lock(&self.session).as_ref() {
            Some(running) => *running.borrow(),
            None => gate.session_running,
        };
        should_fetch_positions(self.tokens.has_token(), session_running, gate.balance)
    }

    pub fn state(&self) -> FetchState {
        *Self::lock(&self.state)
    }

    fn set_state(&self, state: FetchState) {
        *Self::lock(&self.state) = state;
    }

    /// Last good snapshot
    pub fn snapshot(&self) -> Option<PositionsSnapshot> {
        Self::lock(&self.cache).last_good().cloned()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.snapshot().map(|s| s.positions).unwrap_or_default()
    }

    pub fn error(&self) -> Option<String> {
        Self::lock(&self.cache).error().map(str::to_string)
    }

    pub fn is_closing(&self, pair_index: u32) -> bool {
        self.closing.is_in_flight(&pair_index)
    }

    pub fn is_closing_all(&self) -> bool {
        !self.closing_all.is_empty()
    }

    /// Polling interval: short while something is open, long otherwise
    pub fn next_interval(&self) -> Duration {
        match self.snapshot() {
            Some(s) if s.open_positions > 0 => self.active_interval,
            _ => self.idle_interval,
        }
    }

    /// Fetch open positions. `force` bypasses the session/balance gate but
    /// never the token check.
    pub async fn fetch_positions(&self, force: bool) -> FetchOutcome {
        if !self.tokens.has_token() {
            return FetchOutcome::Skipped(SkipReason::NoToken);
        }
        if !force && !self.should_fetch() {
            return FetchOutcome::Skipped(SkipReason::Gated);
        }
        let Some(_guard) = self.fetching.try_begin(()) else {
            debug!("positions fetch already in flight");
            return FetchOutcome::Skipped(SkipReason::InFlight);
        };

        self.set_state(FetchState::Fetching);
        let api = Arc::clone(&self.api);
        let result = retry(&self.retry, "fetch positions", move |_| {
            let api = Arc::clone(&api);
            async move { api.fetch_positions().await }
        })
        .await;

        match result {
            Ok(resp) => {
                let snapshot = PositionsSnapshot::from(resp);
                debug!("{} open positions, pnl {}", snapshot.open_positions, snapshot.total_pnl);
                Self::lock(&self.cache).store(snapshot.clone());
                self.set_state(FetchState::Success);
                FetchOutcome::Fetched(snapshot)
            }
            Err(err) => {
                warn!("positions fetch failed: {}", err);
                let message = err.user_message();
                Self::lock(&self.cache).record_failure(message.clone());
                self.set_state(FetchState::Error);
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Close one position. A second close for the same pair while the first
    /// is running returns [`CloseOutcome::AlreadyInFlight`] without a request.
    pub async fn close_position(&self, pair_index: u32) -> Result<CloseOutcome<ClosePositionResponse>> {
        if !self.tokens.has_token() {
            return Err(Error::Unauthorized("Sign in to close positions".to_string()));
        }
        if self.is_closing_all() {
            return Ok(CloseOutcome::AlreadyInFlight);
        }
        let Some(_guard) = self.closing.try_begin(pair_index) else {
            return Ok(CloseOutcome::AlreadyInFlight);
        };

        let resp = self.api.close_position(pair_index).await?;
        if !resp.success {
            let message = resp.message.unwrap_or_else(|| format!("Failed to close position {}", pair_index));
            return Err(Error::Api { status: 200, message });
        }
        info!("closed position on pair {}", pair_index);
        self.fetch_positions(true).await;
        Ok(CloseOutcome::Closed(resp))
    }

    /// Close every open position (bulk deadline)
    pub async fn close_all(&self) -> Result<CloseOutcome<CloseAllResponse>> {
        if !self.tokens.has_token() {
            return Err(Error::Unauthorized("Sign in to close positions".to_string()));
        }
        let Some(_guard) = self.closing_all.try_begin(()) else {
            return Ok(CloseOutcome::AlreadyInFlight);
        };

        let resp = self.api.close_all_positions().await?;
        if !resp.success {
            let message = resp.message.unwrap_or_else(|| "Failed to close positions".to_string());
            return Err(Error::Api { status: 200, message });
        }
        info!("closed {} positions", resp.closed);
        self.fetch_positions(true).await;
        Ok(CloseOutcome::Closed(resp))
    }

    /// Forget positions (sign-out)
    pub fn clear(&self) {
        Self::lock(&self.cache).clear();
        self.set_state(FetchState::Idle);
    }

    /// Poll until `cancel` fires. Pauses while `visible` is false and forces
    /// a fetch as soon as it turns true again.
    pub async fn run(self: Arc<Self>, mut visible: watch::Receiver<bool>, cancel: CancellationToken) {
        if *visible.borrow() {
            self.fetch_positions(false).await;
        }

        loop {
            let is_visible = *visible.borrow();
            if !is_visible {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = visible.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *visible.borrow() {
                            debug!("visible again, refreshing positions");
                            self.fetch_positions(true).await;
                        }
                    }
                }
                continue;
            }

            let interval = self.next_interval();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    self.fetch_positions(false).await;
                }
                changed = visible.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("position poller stopped");
    }
}
