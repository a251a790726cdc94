//! Pre-trade risk screening
//!
//! The gate runs exactly once per entry attempt, after the cheap in-memory
//! checks and before any order is placed. It is fail-closed: when the risk
//! service cannot produce a usable report, the token is rejected.

pub mod rugcheck;
pub mod score;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::blacklist::Blacklist;
use crate::error::Result;

pub use rugcheck::RugcheckClient;
pub use score::{HashScorer, TokenScorer};

/// Risk-service report for one token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RugReport {
    /// Token mint the report is about
    pub mint: Option<String>,
    /// Quality classification; only "Good" passes
    pub label: Option<String>,
    /// Supply distribution classification
    #[serde(rename = "supply_type")]
    pub supply_type: Option<String>,
    /// Largest single holder's share, in percent
    #[serde(rename = "max_holder_pct", default)]
    pub max_holder_pct: f64,
    /// Issuer/authority wallet
    pub authority: Option<String>,
}

/// Abstract rug/holder-risk scoring service
#[async_trait]
pub trait RiskService: Send + Sync {
    async fn check(&self, token: &str) -> Result<RugReport>;
}

/// Outcome of a gate evaluation
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Token passed; the report carries the issuer for position tracking
    Pass(RugReport),
    Reject(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }
}

/// The rug gate: one risk-service call, fixed rejection rules, and a
/// blacklist side effect on bundled supply
pub struct RiskGate {
    service: Arc<dyn RiskService>,
    blacklist: Arc<Blacklist>,
    max_holder_pct: f64,
}

impl RiskGate {
    pub fn new(
        service: Arc<dyn RiskService>,
        blacklist: Arc<Blacklist>,
        max_holder_pct: f64,
    ) -> Self {
        Self {
            service,
            blacklist,
            max_holder_pct,
        }
    }

    /// Screen a token. A failed or malformed service response rejects.
    pub async fn evaluate(&self, token: &str) -> Verdict {
        let report = match self.service.check(token).await {
            Ok(r) => r,
            Err(e) => {
                debug!("Risk check unavailable for {}: {}", token, e);
                return Verdict::Reject("risk check unavailable".to_string());
            }
        };

        self.apply_rules(report)
    }

    fn apply_rules(&self, report: RugReport) -> Verdict {
        if report.label.as_deref() != Some("Good") {
            return Verdict::Reject("risk label not Good".to_string());
        }

        if report
            .supply_type
            .as_deref()
            .map(|s| s.to_lowercase().contains("bundled"))
            .unwrap_or(false)
        {
            if let Some(mint) = &report.mint {
                self.blacklist.ban_token(mint);
            }
            if let Some(authority) = &report.authority {
                self.blacklist.ban_dev(authority);
            }
            return Verdict::Reject("supply bundled".to_string());
        }

        if report.max_holder_pct > self.max_holder_pct {
            return Verdict::Reject("too concentrated".to_string());
        }

        Verdict::Pass(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FixedRisk(std::result::Result<RugReport, ()>);

    #[async_trait]
    impl RiskService for FixedRisk {
        async fn check(&self, _token: &str) -> Result<RugReport> {
            self.0
                .clone()
                .map_err(|_| Error::RiskService("boom".to_string()))
        }
    }

    fn good_report() -> RugReport {
        RugReport {
            mint: Some("mint1".to_string()),
            label: Some("Good".to_string()),
            supply_type: Some("distributed".to_string()),
            max_holder_pct: 5.0,
            authority: Some("dev1".to_string()),
        }
    }

    fn gate(service: FixedRisk) -> (RiskGate, Arc<Blacklist>) {
        let blacklist = Arc::new(Blacklist::new());
        let gate = RiskGate::new(Arc::new(service), blacklist.clone(), 25.0);
        (gate, blacklist)
    }

    #[tokio::test]
    async fn test_good_report_passes() {
        let (gate, _) = gate(FixedRisk(Ok(good_report())));
        let verdict = gate.evaluate("mint1").await;
        assert!(verdict.is_pass());
    }

    #[tokio::test]
    async fn test_service_failure_fails_closed() {
        let (gate, _) = gate(FixedRisk(Err(())));
        let verdict = gate.evaluate("mint1").await;
        assert!(!verdict.is_pass());
    }

    #[tokio::test]
    async fn test_empty_report_rejected() {
        let (gate, _) = gate(FixedRisk(Ok(RugReport::default())));
        assert!(!gate.evaluate("mint1").await.is_pass());
    }

    #[tokio::test]
    async fn test_bundled_supply_blacklists_token_and_dev() {
        let mut report = good_report();
        report.supply_type = Some("Bundled".to_string());

        let (gate, blacklist) = gate(FixedRisk(Ok(report)));
        let verdict = gate.evaluate("mint1").await;

        assert!(!verdict.is_pass());
        assert!(blacklist.is_token_banned("mint1"));
        assert!(blacklist.is_dev_banned("dev1"));
    }

    #[tokio::test]
    async fn test_concentration_ceiling() {
        let mut report = good_report();
        report.max_holder_pct = 30.0;

        let (gate, blacklist) = gate(FixedRisk(Ok(report)));
        assert!(!gate.evaluate("mint1").await.is_pass());
        // No blacklist side effect for concentration rejects
        assert!(!blacklist.is_token_banned("mint1"));
    }
}
