//! Local client state
//!
//! The dashboard keeps a handful of values across restarts: the bearer token,
//! the id of the running session and the daily portfolio snapshot. They live
//! in one small JSON file; tests and ephemeral runs use [`MemoryStore`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::portfolio::PortfolioSnapshot;
use crate::utils::error::{Error, Result};

/// Everything persisted between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub active_session_id: Option<String>,
    #[serde(default)]
    pub portfolio: Option<PortfolioSnapshot>,
}

pub type StateUpdate<'a> = &'a (dyn Fn(&mut LocalState) + Send + Sync);

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state; empty if nothing was saved yet
    async fn load(&self) -> Result<LocalState>;

    /// Apply `apply` to the stored state and persist the result
    async fn update(&self, apply: StateUpdate<'_>) -> Result<LocalState>;
}

/// JSON file store
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<LocalState> {
        match fs::read(&self.path).await {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(LocalState::default()),
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| Error::Data(format!("corrupt state file {}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LocalState::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, state: &LocalState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("saved local state to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStore {
    async fn load(&self) -> Result<LocalState> {
        let _lock = self.lock.lock().await;
        self.read().await
    }

    async fn update(&self, apply: StateUpdate<'_>) -> Result<LocalState> {
        let _lock = self.lock.lock().await;
        let mut state = self.read().await?;
        apply(&mut state);
        self.write(&state).await?;
        Ok(state)
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<LocalState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LocalState) -> Self {
        Self { state: Mutex::new(state) }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<LocalState> {
        Ok(self.state.lock().await.clone())
    }

    async fn update(&self, apply: StateUpdate<'_>) -> Result<LocalState> {
        let mut state = self.state.lock().await;
        apply(&mut *state);
        Ok(state.clone())
    }
}
