//! `/api/auth/*` routes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{ApiClient, Auth};
use super::AuthApi;
use crate::utils::error::Result;

/// Credentials posted to the provider's auth route. Web sign-in sends only
/// the address (if any); Base Account sign-in adds the signed challenge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fid: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fid: Option<u64>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// Answer of `GET` on an auth route
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn authenticate(&self, path: &str, request: &AuthRequest) -> Result<AuthResponse> {
        self.post_json(path, request, Auth::Optional, self.request_timeout()).await
    }

    async fn session_info(&self, path: &str) -> Result<SessionInfo> {
        let mut info: SessionInfo = self.get_json(path, &[], Auth::Required).await?;
        if info.user.is_some() {
            info.authenticated = true;
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_request_skips_empty_fields() {
        let req = AuthRequest { address: Some("0x1".into()), ..Default::default() };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "address": "0x1" }));
    }

    #[test]
    fn test_auth_response() {
        let resp: AuthResponse =
            serde_json::from_value(json!({ "token": "jwt", "user": { "fid": 42, "address": "0xabc" } })).unwrap();
        assert_eq!(resp.token, "jwt");
        assert_eq!(resp.user.unwrap().fid, Some(42));
    }
}
