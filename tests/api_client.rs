//! ApiClient and PositionTracker against a stub server

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use common::{authorized, serve, unauthorized, Calls, TOKEN};
use prepx::api::{ApiClient, BalanceSource, PositionsApi, TokenStore};
use prepx::config::PollingConfig;
use prepx::positions::{CloseOutcome, FetchOutcome, PositionTracker};
use prepx::Error;

async fn positions(State(calls): State<Calls>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    calls.record("positions", Value::Null);
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "positions": [
                { "pair_index": 0, "is_long": true, "entry_price": 60000, "current_price": 61000, "leverage": 10, "pnl": 12.5 },
                { "pairIndex": 1, "coin": "ETH", "side": "short", "entryPrice": 3000, "markPrice": 3100, "leverage": 5, "pnl": -4 }
            ],
            "totalPnL": 8.5
        })),
    )
}

async fn close_position(State(calls): State<Calls>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    calls.record("close-position", body.clone());
    if body["pairIndex"] == json!(9) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "No open position for pair 9" })));
    }
    (StatusCode::OK, Json(json!({ "success": true, "txHash": "0xabc" })))
}

async fn close_all(State(calls): State<Calls>) -> Json<Value> {
    calls.record("close-all", Value::Null);
    Json(json!({ "success": true, "closedCount": 2 }))
}

async fn balances(State(calls): State<Calls>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    calls.record("balances", json!(query.get("address")));
    Json(common::usdc_balance("25000000", "25", 25.0))
}

async fn expired() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Session expired" })))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "positions": [] }))
}

fn stub(calls: &Calls) -> String {
    let app = Router::new()
        .route("/api/positions", get(positions))
        .route("/api/close-position", post(close_position))
        .route("/api/close-all-positions", post(close_all))
        .route("/api/wallet/balances", get(balances))
        .with_state(calls.clone());
    format!("http://{}", serve(app))
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let calls = Calls::default();
    let client = ApiClient::new(&stub(&calls), TokenStore::with_token(TOKEN)).unwrap();

    let resp = client.fetch_positions().await.unwrap();
    assert_eq!(resp.positions.len(), 2);
    assert_eq!(resp.total_pnl, dec!(8.5));
    assert_eq!(resp.open_count(), 2);
}

#[tokio::test]
async fn missing_token_fails_before_sending() {
    let calls = Calls::default();
    let client = ApiClient::new(&stub(&calls), TokenStore::new()).unwrap();

    assert_matches!(client.fetch_positions().await, Err(Error::Unauthorized(_)));
    assert!(calls.routes().is_empty());
}

#[tokio::test]
async fn wrong_token_maps_to_unauthorized() {
    let calls = Calls::default();
    let client = ApiClient::new(&stub(&calls), TokenStore::with_token("stale")).unwrap();

    let err = client.fetch_positions().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(calls.routes(), vec!["positions"]);
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let app = Router::new().route("/api/positions", get(expired));
    let client = ApiClient::new(&format!("http://{}", serve(app)), TokenStore::with_token(TOKEN)).unwrap();

    let err = client.fetch_positions().await.unwrap_err();
    assert_matches!(&err, Error::Unauthorized(msg) if msg == "Session expired");
    assert_eq!(err.user_message(), "Session expired");
}

#[tokio::test]
async fn business_error_keeps_status_and_message() {
    let calls = Calls::default();
    let client = ApiClient::new(&stub(&calls), TokenStore::with_token(TOKEN)).unwrap();

    let err = client.close_position(9).await.unwrap_err();
    assert_matches!(err, Error::Api { status: 400, ref message } if message == "No open position for pair 9");
}

#[tokio::test]
async fn deadline_is_reported() {
    let app = Router::new().route("/api/positions", get(slow));
    let client = ApiClient::new(&format!("http://{}", serve(app)), TokenStore::with_token(TOKEN))
        .unwrap()
        .with_timeouts(Duration::from_millis(200), Duration::from_secs(1));

    assert_matches!(client.fetch_positions().await, Err(Error::Timeout(d)) if d == Duration::from_millis(200));
}

#[tokio::test]
async fn balances_pass_address_and_fill_it_in() {
    let calls = Calls::default();
    let client = ApiClient::new(&stub(&calls), TokenStore::with_token(TOKEN)).unwrap();

    let balances = client.fetch_balances(common::BASE_ADDRESS).await.unwrap();
    assert_eq!(balances.address, common::BASE_ADDRESS);
    assert_eq!(balances.total_portfolio_value, dec!(25));
    assert_eq!(calls.body("balances"), Some(json!(common::BASE_ADDRESS)));
}

#[tokio::test]
async fn tracker_enriches_and_closes() {
    let calls = Calls::default();
    let tokens = TokenStore::with_token(TOKEN);
    let client = ApiClient::new(&stub(&calls), tokens.clone()).unwrap();
    let tracker = PositionTracker::new(Arc::new(client), tokens, &PollingConfig::default());
    tracker.set_gate(true, dec!(0));

    let snapshot = match tracker.fetch_positions(true).await {
        FetchOutcome::Fetched(snapshot) => snapshot,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(snapshot.positions[0].symbol.as_deref(), Some("BTC"));
    assert_eq!(snapshot.positions[1].symbol.as_deref(), Some("ETH"));
    assert!(snapshot.positions[0].liquidation_price.is_some());
    assert_eq!(tracker.next_interval(), Duration::from_secs(20));

    match tracker.close_position(1).await.unwrap() {
        CloseOutcome::Closed(resp) => assert_eq!(resp.tx_hash.as_deref(), Some("0xabc")),
        CloseOutcome::AlreadyInFlight => panic!("nothing else was closing"),
    }
    assert_eq!(calls.body("close-position"), Some(json!({ "pairIndex": 1 })));

    match tracker.close_all().await.unwrap() {
        CloseOutcome::Closed(resp) => assert_eq!(resp.closed, 2),
        CloseOutcome::AlreadyInFlight => panic!("nothing else was closing"),
    }
    let routes = calls.routes();
    assert_eq!(routes.iter().filter(|r| *r == "positions").count(), 3);
}
