//! Stub PrepX server shared by the integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const TOKEN: &str = "tok-1";
pub const BASE_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const TRADING_ADDRESS: &str = "0x2222222222222222222222222222222222222222";

/// Requests seen by the stub, in arrival order
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<(String, Value)>>>);

impl Calls {
    pub fn record(&self, route: &str, body: Value) {
        self.0.lock().unwrap().push((route.to_string(), body));
    }

    pub fn routes(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn body(&self, route: &str) -> Option<Value> {
        self.0.lock().unwrap().iter().find(|(r, _)| r == route).map(|(_, b)| b.clone())
    }

    pub fn position(&self, route: &str) -> Option<usize> {
        self.routes().iter().position(|r| r == route)
    }
}

/// Serve `app` on an ephemeral local port
pub fn serve(app: Router) -> SocketAddr {
    prepx::utils::init_test_logging();
    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

pub fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

pub fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid authentication token" })))
}

pub fn wallets_body() -> Value {
    json!({
        "wallets": [
            {
                "id": "w-base",
                "address": BASE_ADDRESS,
                "chain": "base",
                "walletType": "base-account",
                "createdAt": "2025-01-01T00:00:00Z"
            },
            {
                "id": "w-trading",
                "address": TRADING_ADDRESS,
                "chain": "base",
                "walletType": "trading",
                "createdAt": "2025-01-02T00:00:00Z"
            }
        ]
    })
}

pub fn usdc_balance(raw: &str, formatted: &str, value: f64) -> Value {
    json!({
        "holdings": [{
            "token": {
                "address": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                "symbol": "USDC",
                "name": "USD Coin",
                "decimals": 6
            },
            "balance": raw,
            "balanceFormatted": formatted,
            "valueUSD": value
        }],
        "totalPortfolioValue": value
    })
}
