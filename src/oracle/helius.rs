//! Wallet balance oracle over JSON-RPC
//!
//! Speaks the standard `getBalance` shape of Helius-style RPC gateways.
//! Balance failures only ever leave the previously cached value in place, so
//! this client stays strictly fail-soft.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use crate::config::BalanceConfig;
use crate::oracle::BalanceOracle;

const LAMPORTS_PER_SOL: f64 = 1e9;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcResult>,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    value: u64,
}

/// JSON-RPC `getBalance` implementation of [`BalanceOracle`]
pub struct HeliusBalanceOracle {
    client: reqwest::Client,
    rpc_url: String,
}

impl HeliusBalanceOracle {
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(6))
                .build()
                .unwrap_or_default(),
            rpc_url: config.rpc_url.clone(),
        }
    }
}

#[async_trait]
impl BalanceOracle for HeliusBalanceOracle {
    async fn balance(&self, address: &str) -> Option<f64> {
        if self.rpc_url.is_empty() || address.is_empty() {
            return None;
        }

        let req = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address],
        });

        let resp = match self.client.post(&self.rpc_url).json(&req).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Balance RPC request failed: {}", e);
                return None;
            }
        };

        let parsed: RpcResponse = match resp.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!("Balance RPC payload malformed: {}", e);
                return None;
            }
        };

        parsed
            .result
            .map(|r| r.value as f64 / LAMPORTS_PER_SOL)
    }
}
