//! Trending-token HTTP pollers
//!
//! Slow lanes: Moralis trending and Bitquery DEX trades, each polled on its
//! own cadence. Both are disabled cleanly when no credential is configured.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{BitqueryFeedConfig, MoralisFeedConfig};
use crate::error::{Error, Result};
use crate::feeds::{Candidate, FeedSource};

#[derive(Debug, Deserialize)]
struct MoralisTrendingResponse {
    result: Option<Vec<MoralisToken>>,
}

#[derive(Debug, Deserialize)]
struct MoralisToken {
    mint: Option<String>,
}

/// Moralis trending-token poller
pub struct MoralisFeed {
    config: MoralisFeedConfig,
    client: reqwest::Client,
    tx: mpsc::Sender<Candidate>,
}

impl MoralisFeed {
    pub fn new(config: MoralisFeedConfig, tx: mpsc::Sender<Candidate>) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(6))
                .build()
                .unwrap_or_default(),
            tx,
        }
    }

    pub async fn run(self) {
        if self.config.api_key.is_empty() {
            warn!("Moralis trending feed not enabled (no API key)");
            return;
        }

        info!("Moralis trending feed polling every {}s", self.config.poll_secs);
        loop {
            match self.fetch().await {
                Ok(mints) => {
                    for mint in mints {
                        let candidate = Candidate {
                            token: mint,
                            source: FeedSource::Moralis,
                        };
                        if self.tx.send(candidate).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => error!("Moralis feed error: {}", e),
            }
            sleep(Duration::from_secs(self.config.poll_secs)).await;
        }
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(&self.config.url)
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| Error::FeedConnection(e.to_string()))?;

        let trend: MoralisTrendingResponse = resp
            .json()
            .await
            .map_err(|e| Error::FeedDecode(e.to_string()))?;

        Ok(trend
            .result
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.mint)
            .collect())
    }
}

const BITQUERY_TRENDING_QUERY: &str =
    "{ Solana { DEXTrades(limit: 10) { baseCurrency { address } } } }";

#[derive(Debug, Deserialize)]
struct BitqueryResponse {
    data: Option<BitqueryData>,
}

#[derive(Debug, Deserialize)]
struct BitqueryData {
    #[serde(rename = "Solana")]
    solana: Option<BitquerySolana>,
}

#[derive(Debug, Deserialize)]
struct BitquerySolana {
    #[serde(rename = "DEXTrades", default)]
    dex_trades: Vec<BitqueryTrade>,
}

#[derive(Debug, Deserialize)]
struct BitqueryTrade {
    #[serde(rename = "baseCurrency")]
    base_currency: Option<BitqueryCurrency>,
}

#[derive(Debug, Deserialize)]
struct BitqueryCurrency {
    address: Option<String>,
}

/// Bitquery DEX-trades poller
pub struct BitqueryFeed {
    config: BitqueryFeedConfig,
    client: reqwest::Client,
    tx: mpsc::Sender<Candidate>,
}

impl BitqueryFeed {
    pub fn new(config: BitqueryFeedConfig, tx: mpsc::Sender<Candidate>) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(6))
                .build()
                .unwrap_or_default(),
            tx,
        }
    }

    pub async fn run(self) {
        if self.config.api_key.is_empty() {
            warn!("Bitquery trending feed not enabled (no OAuth token)");
            return;
        }

        info!("Bitquery feed polling every {}s", self.config.poll_secs);
        loop {
            match self.fetch().await {
                Ok(addresses) => {
                    for address in addresses {
                        let candidate = Candidate {
                            token: address,
                            source: FeedSource::Bitquery,
                        };
                        if self.tx.send(candidate).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => error!("Bitquery feed error: {}", e),
            }
            sleep(Duration::from_secs(self.config.poll_secs)).await;
        }
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        let body = serde_json::json!({ "query": BITQUERY_TRENDING_QUERY });

        let resp = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::FeedConnection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::FeedConnection(format!(
                "Bitquery HTTP {}",
                resp.status()
            )));
        }

        let parsed: BitqueryResponse = resp
            .json()
            .await
            .map_err(|e| Error::FeedDecode(e.to_string()))?;

        let trades = parsed
            .data
            .and_then(|d| d.solana)
            .map(|s| s.dex_trades)
            .unwrap_or_default();

        Ok(trades
            .into_iter()
            .filter_map(|t| t.base_currency.and_then(|c| c.address))
            .collect())
    }
}
