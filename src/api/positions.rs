//! Position routes: list, close one, close all

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::client::{ApiClient, Auth};
use super::PositionsApi;
use crate::utils::error::Result;
use crate::utils::types::Position;

/// Body of `GET /api/positions`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(rename = "totalPnL", alias = "totalPnl", alias = "total_pnl", default)]
    pub total_pnl: Decimal,
    /// Count reported by the server; falls back to `positions.len()`
    #[serde(default, alias = "open_positions")]
    pub open_positions: Option<usize>,
}

impl PositionsResponse {
    pub fn open_count(&self) -> usize {
        self.open_positions.unwrap_or(self.positions.len())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, alias = "tx_hash")]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloseAllResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, alias = "closedCount", alias = "closed_count")]
    pub closed: u32,
    #[serde(default, alias = "tx_hashes")]
    pub tx_hashes: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClosePositionRequest {
    pair_index: u32,
}

#[async_trait]
impl PositionsApi for ApiClient {
    async fn fetch_positions(&self) -> Result<PositionsResponse> {
        self.get_json("/api/positions", &[], Auth::Required).await
    }

    async fn close_position(&self, pair_index: u32) -> Result<ClosePositionResponse> {
        let body = ClosePositionRequest { pair_index };
        self.post_json("/api/close-position", &body, Auth::Required, self.request_timeout()).await
    }

    async fn close_all_positions(&self) -> Result<CloseAllResponse> {
        self.post_json("/api/close-all-positions", &serde_json::json!({}), Auth::Required, self.bulk_timeout())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_positions_response() {
        let resp: PositionsResponse = serde_json::from_value(json!({
            "positions": [
                { "pair_index": 0, "symbol": "BTC", "is_long": true, "entry_price": 60000, "pnl": 4 },
                { "pairIndex": 1, "side": "short", "entryPrice": 3000, "pnl": -1.5 }
            ],
            "totalPnL": 2.5
        }))
        .unwrap();
        assert_eq!(resp.positions.len(), 2);
        assert_eq!(resp.total_pnl, dec!(2.5));
        assert_eq!(resp.open_count(), 2);

        let empty: PositionsResponse = serde_json::from_value(json!({ "positions": [], "openPositions": 0 })).unwrap();
        assert_eq!(empty.open_count(), 0);
    }

    #[test]
    fn test_close_responses() {
        let one: ClosePositionResponse = serde_json::from_value(json!({ "txHash": "0xabc" })).unwrap();
        assert!(one.success);
        assert_eq!(one.tx_hash.as_deref(), Some("0xabc"));

        let all: CloseAllResponse = serde_json::from_value(json!({ "success": true, "closedCount": 3 })).unwrap();
        assert_eq!(all.closed, 3);
    }

    #[test]
    fn test_close_request_body() {
        let body = serde_json::to_value(ClosePositionRequest { pair_index: 7 }).unwrap();
        assert_eq!(body, json!({ "pairIndex": 7 }));
    }
}
