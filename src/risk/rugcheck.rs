//! Rugcheck HTTP client

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::RiskConfig;
use crate::error::{Error, Result};
use crate::risk::{RiskService, RugReport};

/// HTTP client for the rugcheck screening API
pub struct RugcheckClient {
    client: reqwest::Client,
    base_url: String,
}

impl RugcheckClient {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RiskService for RugcheckClient {
    async fn check(&self, token: &str) -> Result<RugReport> {
        let url = format!("{}/api/check/{}", self.base_url, token);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::RiskService(e.to_string()))?;

        // The service occasionally serves an HTML error page with a 200
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.starts_with("application/json") {
            warn!("Rugcheck returned non-JSON for {}", token);
            return Err(Error::RiskResponseMalformed(format!(
                "content-type {content_type}"
            )));
        }

        resp.json::<RugReport>()
            .await
            .map_err(|e| Error::RiskResponseMalformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report() {
        let json = r#"{
            "mint": "mint1",
            "label": "Good",
            "supply_type": "distributed",
            "max_holder_pct": 12.5,
            "authority": "dev1"
        }"#;

        let report: RugReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.label.as_deref(), Some("Good"));
        assert_eq!(report.max_holder_pct, 12.5);
        assert_eq!(report.authority.as_deref(), Some("dev1"));
    }

    #[test]
    fn test_parse_sparse_report() {
        let report: RugReport = serde_json::from_str("{}").unwrap();
        assert!(report.label.is_none());
        assert_eq!(report.max_holder_pct, 0.0);
    }
}
