//! HTTP plumbing shared by every endpoint: base URL, bearer auth, JSON,
//! per-request deadlines and error mapping.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::utils::error::{Error, Result};

const MAX_ERROR_BODY: usize = 300;

/// Shared bearer token. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *slot = if token.trim().is_empty() { None } else { Some(token) };
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn has_token(&self) -> bool {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).is_some()
    }
}

/// Whether a request must carry the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    Required,
    Optional,
}

/// Client for the same-origin PrepX REST API
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenStore,
    request_timeout: Duration,
    bulk_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.tokens.has_token())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ApiClient {
    /// Create a client for `base_url` with the default 30 s / 60 s deadlines
    pub fn new(base_url: &str, tokens: TokenStore) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid API base URL '{}': {}", base_url, e)))?;
        let http = Client::builder()
            .user_agent(concat!("prepx-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            tokens,
            request_timeout: Duration::from_secs(30),
            bulk_timeout: Duration::from_secs(60),
        })
    }

    pub fn from_config(config: &ApiConfig, tokens: TokenStore) -> Result<Self> {
        Ok(Self::new(&config.app_url, tokens)?
            .with_timeouts(config.request_timeout(), config.bulk_timeout()))
    }

    pub fn with_timeouts(mut self, request: Duration, bulk: Duration) -> Self {
        self.request_timeout = request;
        self.bulk_timeout = bulk;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn bulk_timeout(&self) -> Duration {
        self.bulk_timeout
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        auth: Auth,
    ) -> Result<T> {
        let mut req = self.http.get(self.url(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        self.send(req, auth, self.request_timeout).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B, auth: Auth, timeout: Duration) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.http.post(self.url(path)).json(body);
        self.send(req, auth, timeout).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, auth: Auth, timeout: Duration) -> Result<T> {
        let mut req = req.timeout(timeout).header(ACCEPT, "application/json").header(CONTENT_TYPE, "application/json");
        match (self.tokens.get(), auth) {
            (Some(token), _) => req = req.bearer_auth(token),
            (None, Auth::Required) => return Err(Error::Unauthorized("Unauthorized".to_string())),
            (None, Auth::Optional) => {}
        }

        let resp = req.send().await.map_err(|e| transport_error(e, timeout))?;
        let status = resp.status();
        debug!("{} {}", status.as_u16(), resp.url().path());

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let bytes = resp.bytes().await.map_err(|e| transport_error(e, timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Data(format!("unexpected response shape: {}", e)))
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    match Error::from(err) {
        Error::Timeout(_) => Error::Timeout(timeout),
        other => other,
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    Error::from_status(status.as_u16(), extract_error_message(body))
}

/// Pull the human-readable message out of an error body.
///
/// Next.js routes answer `{ "error": ... }`, the Avantis service answers
/// `{ "detail": ... }`; anything else is returned as trimmed text.
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "detail"] {
            match map.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(s)) = inner.get("message") {
                        return s.trim().to_string();
                    }
                }
                _ => {}
            }
        }
    }
    let text = body.trim();
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_store() {
        let tokens = TokenStore::new();
        assert!(!tokens.has_token());

        let shared = tokens.clone();
        tokens.set("jwt-123");
        assert_eq!(shared.get().as_deref(), Some("jwt-123"));

        tokens.set("   ");
        assert!(!shared.has_token());

        tokens.set("jwt-456");
        shared.clear();
        assert!(tokens.get().is_none());
    }

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("https://prepx.example/", TokenStore::new()).unwrap();
        assert_eq!(client.url("/api/positions"), "https://prepx.example/api/positions");

        let prefixed = ApiClient::new("https://prepx.example/app", TokenStore::new()).unwrap();
        assert_eq!(prefixed.url("api/wallet"), "https://prepx.example/app/api/wallet");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(ApiClient::new("not a url", TokenStore::new()), Err(Error::Config(_))));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(extract_error_message(r#"{"error":"Insufficient funds"}"#), "Insufficient funds");
        assert_eq!(extract_error_message(r#"{"detail":"Symbol not supported: XYZ"}"#), "Symbol not supported: XYZ");
        assert_eq!(extract_error_message(r#"{"error":{"message":"nested"}}"#), "nested");
        assert_eq!(extract_error_message("  Bad Gateway "), "Bad Gateway");
        assert_eq!(extract_error_message(""), "");
        assert!(extract_error_message(&"x".repeat(1000)).len() < 400);
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), Error::Unauthorized(_)));
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"error":"Minimum collateral not met"}"#);
        assert!(matches!(err, Error::Api { status: 400, ref message } if message == "Minimum collateral not met"));
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        // port 9 (discard) is never contacted: the request must fail before sending
        let client = ApiClient::new("http://127.0.0.1:9", TokenStore::new()).unwrap();
        let result: Result<Value> = client.get_json("/api/positions", &[], Auth::Required).await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }
}
