//! PumpPortal WebSocket feed
//!
//! Free real-time pump.fun data. Subscribes to new-token creation events and
//! forwards every mint to the candidate queue. The connection is expected to
//! drop; the task reconnects forever with exponential backoff.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::PumpPortalFeedConfig;
use crate::error::{Error, Result};
use crate::feeds::{Candidate, FeedSource};

/// Subscription request in PumpPortal's dialect
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMessage {
    pub method: String,
}

impl SubscriptionMessage {
    pub fn subscribe_new_tokens() -> Self {
        Self {
            method: "subscribeNewToken".to_string(),
        }
    }
}

/// Pull the mint address out of a feed message, tolerating both the flat and
/// the `params`-wrapped payload shapes
pub fn parse_mint(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;

    let params = &value["params"];
    params["mintAddress"]
        .as_str()
        .or_else(|| params["coinAddress"].as_str())
        .or_else(|| value["mint"].as_str())
        .map(String::from)
}

/// New-token WebSocket feed task
pub struct PumpPortalFeed {
    config: PumpPortalFeedConfig,
    tx: mpsc::Sender<Candidate>,
}

impl PumpPortalFeed {
    pub fn new(config: PumpPortalFeedConfig, tx: mpsc::Sender<Candidate>) -> Self {
        Self { config, tx }
    }

    /// Connect, stream, and reconnect until the candidate queue closes
    pub async fn run(self) {
        if !self.config.enabled {
            info!("PumpPortal feed disabled");
            return;
        }

        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.config.reconnect_delay_ms),
            max_interval: Duration::from_millis(self.config.max_reconnect_delay_ms),
            max_elapsed_time: None,
            ..Default::default()
        };

        loop {
            match self.connect_and_stream().await {
                Ok(()) => {
                    // Queue closed: the consumer is gone, stop the task
                    info!("PumpPortal feed shutting down");
                    return;
                }
                Err(Error::FeedDisconnected) => {
                    // The session was live before it dropped; start the
                    // backoff ladder over
                    backoff.reset();
                    warn!("PumpPortal feed disconnected");
                }
                Err(e) => {
                    warn!("PumpPortal feed error: {}", e);
                }
            }

            let delay = backoff
                .next_backoff()
                .unwrap_or(Duration::from_millis(self.config.max_reconnect_delay_ms));
            warn!("PumpPortal reconnecting in {:?}", delay);
            sleep(delay).await;
        }
    }

    async fn connect_and_stream(&self) -> Result<()> {
        let url = url::Url::parse(&self.config.ws_url)
            .map_err(|e| Error::Config(format!("Invalid WebSocket URL: {}", e)))?;

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::FeedConnection(format!("WebSocket connect failed: {}", e)))?;

        info!("Connected to PumpPortal WebSocket");
        let (mut write, mut read) = ws_stream.split();

        let subscribe = SubscriptionMessage::subscribe_new_tokens();
        let json = serde_json::to_string(&subscribe)?;
        write
            .send(Message::Text(json))
            .await
            .map_err(|e| Error::FeedConnection(format!("Failed to subscribe: {}", e)))?;
        info!("Subscribed to new token events");

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let Some(mint) = parse_mint(&text) else {
                        debug!("Unparsed feed message: {}", &text[..text.len().min(100)]);
                        continue;
                    };

                    let candidate = Candidate {
                        token: mint,
                        source: FeedSource::PumpFun,
                    };
                    if self.tx.send(candidate).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(Message::Ping(payload)) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket closed by server");
                    return Err(Error::FeedDisconnected);
                }
                Err(e) => {
                    return Err(Error::FeedConnection(e.to_string()));
                }
                _ => {}
            }
        }

        Err(Error::FeedDisconnected)
    }
}
