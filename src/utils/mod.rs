//! Utility functions and types for the PrepX client.

pub mod error;
mod fs;
mod logging;
pub mod types;

pub use error::{Error, Result};
pub use fs::*;
pub use logging::{init_logging, init_test_logging};
pub use types::*;
