//! Open position polling.
//!
//! [`PositionTracker`] keeps the last good list of positions, decides when a
//! fetch is worth issuing, retries network failures and guards close
//! requests against duplicates.

pub mod symbols;
mod tracker;

pub use symbols::{estimate_liquidation_price, pair_index, symbol_for};
pub use tracker::{
    should_fetch_positions, CloseOutcome, FetchOutcome, FetchState, PositionTracker, PositionsSnapshot, SkipReason,
};
