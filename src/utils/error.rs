//! Error handling for the PrepX client.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the PrepX client
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or rejected authentication token (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Client-side validation failures, raised before anything is submitted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection-level failures (DNS, refused, reset). The only retryable class.
    #[error("Network error: {0}")]
    Network(String),

    /// The per-request deadline elapsed
    #[error("Request timed out")]
    Timeout(Duration),

    /// Business errors reported by the server, shown to the user verbatim
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Malformed or unexpected payloads
    #[error("Data error: {0}")]
    Data(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the PrepX client
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an error from a non-2xx HTTP status and the server's message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => {
                let message = if message.is_empty() { "Invalid authentication token".to_string() } else { message };
                Error::Unauthorized(message)
            }
            _ => {
                let message = if message.is_empty() { format!("Request failed with status {status}") } else { message };
                Error::Api { status, message }
            }
        }
    }

    /// Only connection-level failures are worth retrying. Timeouts are surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Human-readable message for banners and CLI output.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthorized(msg) => msg.clone(),
            Error::Validation(msg) => msg.clone(),
            Error::Network(_) => "Network error, please check your connection and try again".to_string(),
            Error::Timeout(_) => "Request timed out".to_string(),
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // the configured deadline is not carried on reqwest's error; ApiClient fills it in
            Error::Timeout(Duration::ZERO)
        } else if err.is_decode() || err.is_body() {
            Error::Data(format!("invalid response body: {err}"))
        } else if let Some(status) = err.status() {
            Error::from_status(status.as_u16(), err.to_string())
        } else if err.is_connect() || err.is_request() {
            Error::Network(err.to_string())
        } else {
            Error::Other(err.to_string())
        }
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
