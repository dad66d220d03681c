//! Trading session orchestration: fee, balance refresh, start, and periodic
//! reconciliation with the server.

mod fee;
mod leverage;
mod manager;

pub use fee::{pay_platform_fee, platform_fee, ApiFeePayer, FeePayer, FeeReceipt};
pub use leverage::{compute_leverage, MAX_LEVERAGE, MIN_LEVERAGE};
pub use manager::{
    Progress, ProgressStep, ReconcileOutcome, SessionManager, StartOutcome, StartParams, StartedSession,
};
