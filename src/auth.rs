//! Sign-in: exchange wallet credentials for a bearer token and keep it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::api::{AuthApi, AuthRequest, AuthUser, SessionInfo, TokenStore};
use crate::environment::{ClientEnvironment, WalletProvider};
use crate::persistence::{LocalState, StateStore};
use crate::utils::error::{Error, Result};
use crate::wallet::is_valid_address;

impl TokenStore {
    /// Load a persisted token into the store. Returns whether one was found.
    pub async fn restore(&self, store: &dyn StateStore) -> Result<bool> {
        match store.load().await?.auth_token {
            Some(token) if !token.trim().is_empty() => {
                self.set(token);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Message the user signs to prove control of `address`
pub fn challenge_message(address: &str, env: &ClientEnvironment, issued_at: DateTime<Utc>) -> String {
    format!(
        "PrepX wants you to sign in with your account:\n{}\n\nChain ID: {}\nIssued At: {}",
        address,
        env.network.chain_id(),
        issued_at.to_rfc3339()
    )
}

/// Credentials supplied by the caller for sign-in
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub address: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,
    pub fid: Option<u64>,
}

pub struct AuthClient {
    api: Arc<dyn AuthApi>,
    tokens: TokenStore,
    store: Arc<dyn StateStore>,
    provider: WalletProvider,
}

impl AuthClient {
    pub fn new(api: Arc<dyn AuthApi>, tokens: TokenStore, store: Arc<dyn StateStore>, provider: WalletProvider) -> Self {
        Self { api, tokens, store, provider }
    }

    pub fn is_signed_in(&self) -> bool {
        self.tokens.has_token()
    }

    /// Sign in through the provider's auth route; the token is kept in memory
    /// and in the local store.
    pub async fn sign_in(&self, credentials: Credentials) -> Result<Option<AuthUser>> {
        if let Some(address) = &credentials.address {
            if !is_valid_address(address) {
                return Err(Error::Validation(format!("Invalid wallet address: {}", address)));
            }
        }
        if self.provider.requires_signature() {
            if credentials.address.is_none() || credentials.message.is_none() || credentials.signature.is_none() {
                return Err(Error::Validation(
                    "Address, message and signature are required to sign in with a wallet".to_string(),
                ));
            }
        }

        let request = AuthRequest {
            address: credentials.address,
            message: credentials.message,
            signature: credentials.signature,
            fid: credentials.fid,
        };
        let resp = self.api.authenticate(self.provider.auth_path(), &request).await?;
        if resp.token.trim().is_empty() {
            return Err(Error::Data("auth response carried an empty token".to_string()));
        }

        self.tokens.set(resp.token.clone());
        let token = resp.token;
        self.store.update(&move |s: &mut LocalState| s.auth_token = Some(token.clone())).await?;
        info!("signed in via {:?}", self.provider);
        Ok(resp.user)
    }

    /// Ask the server who the token belongs to. A rejected token is dropped.
    pub async fn current_user(&self) -> Result<SessionInfo> {
        match self.api.session_info(self.provider.auth_path()).await {
            Err(err) if err.is_unauthorized() => {
                warn!("stored token was rejected, signing out");
                self.logout().await?;
                Err(err)
            }
            other => other,
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear();
        self.store.update(&|s: &mut LocalState| s.auth_token = None).await?;
        Ok(())
    }
}
