//! Concurrency helpers shared by the state components.
//!
//! - [`FlightSet`]: keyed re-entrancy guard; a second caller for a key that is
//!   already in flight gets `None` and is expected to no-op.
//! - [`StaleCache`]: TTL cache that keeps the last good value across failures.
//! - [`RetryPolicy`]: backoff schedule for retryable (network) errors.

mod cache;
mod flight;
mod retry;

pub use cache::StaleCache;
pub use flight::{FlightGuard, FlightSet};
pub use retry::{retry, Backoff, RetryPolicy};
