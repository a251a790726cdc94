//! DexScreener market-data client
//!
//! One endpoint (`/latest/dex/tokens/{mint}`) serves every query; each
//! accessor picks the pair whose base token matches the requested mint.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::OracleConfig;
use crate::oracle::{HolderStats, MarketDataOracle, PoolVolume};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "baseToken")]
    pub base_token: BaseToken,
    #[serde(rename = "priceNative")]
    pub price_native: Option<String>,
    pub liquidity: Option<Liquidity>,
    pub volume: Option<Volume>,
    /// Pool creation time, epoch milliseconds
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
    pub holders: Option<u64>,
    #[serde(rename = "holderConcentration")]
    pub holder_concentration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairsResponse {
    pub pairs: Option<Vec<DexPair>>,
}

/// DexScreener-backed implementation of [`MarketDataOracle`]
pub struct DexScreenerOracle {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerOracle {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the pair whose base token is the requested mint
    async fn matching_pair(&self, token: &str) -> Option<DexPair> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("DexScreener request failed for {}: {}", token, e);
                return None;
            }
        };

        let data: TokenPairsResponse = match resp.json().await {
            Ok(d) => d,
            Err(e) => {
                warn!("DexScreener payload malformed for {}: {}", token, e);
                return None;
            }
        };

        data.pairs
            .unwrap_or_default()
            .into_iter()
            .find(|p| p.base_token.address == token)
    }
}

#[async_trait]
impl MarketDataOracle for DexScreenerOracle {
    async fn price(&self, token: &str) -> Option<f64> {
        let pair = self.matching_pair(token).await?;
        pair.price_native.as_ref().and_then(|p| p.parse().ok())
    }

    async fn pool_age_secs(&self, token: &str) -> Option<u64> {
        let pair = self.matching_pair(token).await?;
        let ts = pair.pair_created_at?;
        // Some sources report seconds rather than milliseconds
        let created_secs = if ts > 1_000_000_000_000 { ts / 1000 } else { ts };
        let age = Utc::now().timestamp() - created_secs;
        (age >= 0).then_some(age as u64)
    }

    async fn volume_liquidity(&self, token: &str) -> Option<PoolVolume> {
        let pair = self.matching_pair(token).await?;
        Some(PoolVolume {
            liquidity: pair.liquidity.as_ref().and_then(|l| l.base).unwrap_or(0.0),
            vol_1h: pair.volume.as_ref().and_then(|v| v.h1).unwrap_or(0.0),
            vol_6h: pair.volume.as_ref().and_then(|v| v.h6).unwrap_or(0.0),
        })
    }

    async fn holder_stats(&self, token: &str) -> Option<HolderStats> {
        let pair = self.matching_pair(token).await?;
        Some(HolderStats {
            holder_count: pair.holders.unwrap_or(0),
            max_holder_pct: pair.holder_concentration.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_response() {
        let json = r#"{
            "pairs": [{
                "baseToken": {"address": "mint1", "name": "Test", "symbol": "TST"},
                "priceNative": "0.0012345",
                "liquidity": {"usd": 15000.0, "base": 42.5, "quote": 80.0},
                "volume": {"h1": 120.0, "h6": 480.0},
                "pairCreatedAt": 1700000000000,
                "holders": 312,
                "holderConcentration": 0.07
            }]
        }"#;

        let resp: TokenPairsResponse = serde_json::from_str(json).unwrap();
        let pairs = resp.pairs.unwrap();
        assert_eq!(pairs.len(), 1);

        let pair = &pairs[0];
        assert_eq!(pair.base_token.address, "mint1");
        assert_eq!(pair.price_native.as_deref(), Some("0.0012345"));
        assert_eq!(pair.liquidity.as_ref().unwrap().base, Some(42.5));
        assert_eq!(pair.holders, Some(312));
    }

    #[test]
    fn test_parse_empty_response() {
        let resp: TokenPairsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.pairs.is_none());

        let resp: TokenPairsResponse =
            serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(resp.pairs.is_none());
    }

    #[test]
    fn test_sparse_pair_fields_default() {
        let json = r#"{
            "pairs": [{
                "baseToken": {"address": "mint1"}
            }]
        }"#;

        let resp: TokenPairsResponse = serde_json::from_str(json).unwrap();
        let pair = &resp.pairs.unwrap()[0];
        assert!(pair.price_native.is_none());
        assert!(pair.liquidity.is_none());
        assert!(pair.pair_created_at.is_none());
        assert!(pair.holders.is_none());
    }
}
