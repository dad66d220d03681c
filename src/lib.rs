//! # PrepX client
//!
//! Async client for the PrepX trading dashboard: REST bindings for the
//! `/api/*` routes, an integrated view of the base account and trading vault
//! balances, open position polling and trading session orchestration
//! (platform fee, session start, reconciliation).

pub use crate::utils::error::{Error, Result};

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod environment;
pub mod persistence;
pub mod portfolio;
pub mod positions;
pub mod session;
pub mod sync;
pub mod utils;
pub mod wallet;

#[cfg(feature = "cli")]
pub mod cli;

pub use dashboard::{Dashboard, DashboardSummary};
