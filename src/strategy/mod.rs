//! Trading personalities
//!
//! Three independent entry policies share one pipeline: blacklist check →
//! already-open check → strategy pre-gate → risk gate → price fetch → order
//! placement → store insert → event record. The risk gate runs exactly once
//! per attempt, always before the order. A buy that the transport refuses
//! aborts the entry; nothing is inserted.

pub mod consensus;
pub mod momentum;
pub mod rapid;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::blacklist::Blacklist;
use crate::error::Error;
use crate::execution::ExecutionGateway;
use crate::oracle::MarketDataOracle;
use crate::position::{Position, PositionStore};
use crate::report::EventLog;
use crate::risk::{RiskGate, TokenScorer};

pub use consensus::ConsensusPolicy;
pub use momentum::MomentumPolicy;
pub use rapid::RapidPolicy;

/// Closed set of trading personalities
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Ultra-early sniper on freshly created tokens
    Rapid,
    /// Trending scalper entering on volume spikes
    Momentum,
    /// Community/whale swing trader fed by multi-source votes
    Consensus,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::Rapid => "rapid",
            StrategyKind::Momentum => "momentum",
            StrategyKind::Consensus => "consensus",
        };
        f.write_str(s)
    }
}

/// Shared handles every policy needs to run its entry pipeline
#[derive(Clone)]
pub struct EntryContext {
    pub store: Arc<PositionStore>,
    pub blacklist: Arc<Blacklist>,
    pub gate: Arc<RiskGate>,
    pub market: Arc<dyn MarketDataOracle>,
    pub gateway: Arc<dyn ExecutionGateway>,
    pub scorer: Arc<dyn TokenScorer>,
    pub events: Arc<EventLog>,
}

impl EntryContext {
    /// The cheap in-memory screens that precede any external call.
    /// Returns false when the signal is dead on arrival.
    pub async fn pre_screen(&self, kind: StrategyKind, token: &str) -> bool {
        if self.blacklist.is_banned(token, None) {
            debug!("{} [{}] blacklisted, ignoring signal", token, kind);
            return false;
        }

        if self.store.is_open(token).await {
            self.events
                .push(format!("{} [{}] already open, skipping", token, kind))
                .await;
            return false;
        }

        true
    }

    /// Reject issuers already on the permanent dev blacklist. The issuer is
    /// only known once the risk report is in hand, so this runs after the
    /// gate and before the order.
    pub async fn issuer_banned(&self, kind: StrategyKind, token: &str, dev: Option<&str>) -> bool {
        match dev {
            Some(d) if !d.is_empty() && self.blacklist.is_dev_banned(d) => {
                self.events
                    .push(format!("{} [{}] issuer blacklisted, rejecting", token, kind))
                    .await;
                true
            }
            _ => false,
        }
    }

    /// Insert a gated position. A duplicate is a logged no-op, never a crash:
    /// a second signal may have finished gating while this one was suspended
    /// on external calls.
    pub async fn insert(&self, position: Position) -> bool {
        let kind = position.strategy;
        let token = position.token.clone();
        match self.store.try_open(position).await {
            Ok(()) => true,
            Err(Error::PositionOpen(_)) => {
                self.events
                    .push(format!(
                        "{} [{}] position already open, no averaging down",
                        token, kind
                    ))
                    .await;
                false
            }
            Err(e) => {
                warn!("{} [{}] insert failed: {}", token, kind, e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Hand-written doubles for the external collaborators

    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use crate::config::{RiskConfig, ScoringConfig};
    use crate::error::Result;
    use crate::oracle::{BalanceOracle, HolderStats, PoolVolume};
    use crate::risk::{HashScorer, RiskService, RugReport};

    /// Scriptable market data: queued responses are consumed first, then the
    /// configured defaults repeat forever
    #[derive(Default)]
    pub struct MockMarket {
        pub price_seq: Mutex<VecDeque<Option<f64>>>,
        pub default_price: Mutex<Option<f64>>,
        pub volume_seq: Mutex<VecDeque<Option<PoolVolume>>>,
        pub default_volume: Mutex<Option<PoolVolume>>,
        pub pool_age: Mutex<Option<u64>>,
        pub holders: Mutex<Option<HolderStats>>,
    }

    impl MockMarket {
        pub fn set_price(&self, price: Option<f64>) {
            *self.default_price.lock().unwrap() = price;
        }

        pub fn set_volume(&self, volume: Option<PoolVolume>) {
            *self.default_volume.lock().unwrap() = volume;
        }

        pub fn queue_volumes(&self, volumes: &[Option<PoolVolume>]) {
            self.volume_seq
                .lock()
                .unwrap()
                .extend(volumes.iter().copied());
        }

        pub fn liquidity(liquidity: f64) -> PoolVolume {
            PoolVolume {
                liquidity,
                vol_1h: 0.0,
                vol_6h: 0.0,
            }
        }
    }

    #[async_trait]
    impl MarketDataOracle for MockMarket {
        async fn price(&self, _token: &str) -> Option<f64> {
            if let Some(next) = self.price_seq.lock().unwrap().pop_front() {
                return next;
            }
            *self.default_price.lock().unwrap()
        }

        async fn pool_age_secs(&self, _token: &str) -> Option<u64> {
            *self.pool_age.lock().unwrap()
        }

        async fn volume_liquidity(&self, _token: &str) -> Option<PoolVolume> {
            if let Some(next) = self.volume_seq.lock().unwrap().pop_front() {
                return next;
            }
            *self.default_volume.lock().unwrap()
        }

        async fn holder_stats(&self, _token: &str) -> Option<HolderStats> {
            *self.holders.lock().unwrap()
        }
    }

    /// Gateway double recording every command it accepts
    #[derive(Default)]
    pub struct MockGateway {
        pub buys: Mutex<Vec<String>>,
        pub sells: Mutex<Vec<String>>,
        pub fail: AtomicBool,
    }

    impl MockGateway {
        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn buy_count(&self) -> usize {
            self.buys.lock().unwrap().len()
        }

        pub fn sell_count(&self) -> usize {
            self.sells.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExecutionGateway for MockGateway {
        async fn send_buy(
            &self,
            token: &str,
            amount: f64,
            limit_price: Option<f64>,
        ) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::OrderTransport("down".to_string()));
            }
            self.buys
                .lock()
                .unwrap()
                .push(crate::execution::format_buy(token, amount, limit_price));
            Ok(())
        }

        async fn send_sell(&self, token: &str, percent: u8) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::OrderTransport("down".to_string()));
            }
            self.sells
                .lock()
                .unwrap()
                .push(crate::execution::format_sell(token, percent));
            Ok(())
        }
    }

    /// Risk service returning a fixed report (or failing)
    pub struct MockRisk {
        pub report: Mutex<Option<RugReport>>,
    }

    impl MockRisk {
        pub fn good(dev: &str) -> Self {
            Self {
                report: Mutex::new(Some(RugReport {
                    mint: None,
                    label: Some("Good".to_string()),
                    supply_type: Some("distributed".to_string()),
                    max_holder_pct: 5.0,
                    authority: Some(dev.to_string()),
                })),
            }
        }

        pub fn failing() -> Self {
            Self {
                report: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl RiskService for MockRisk {
        async fn check(&self, _token: &str) -> Result<RugReport> {
            self.report
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::RiskService("unavailable".to_string()))
        }
    }

    /// Balance oracle returning a fixed value
    pub struct MockBalance(pub Mutex<Option<f64>>);

    #[async_trait]
    impl BalanceOracle for MockBalance {
        async fn balance(&self, _address: &str) -> Option<f64> {
            *self.0.lock().unwrap()
        }
    }

    pub struct TestHarness {
        pub ctx: EntryContext,
        pub market: Arc<MockMarket>,
        pub gateway: Arc<MockGateway>,
        pub blacklist: Arc<Blacklist>,
        pub store: Arc<PositionStore>,
        pub events: Arc<EventLog>,
    }

    /// Build an [`EntryContext`] wired to doubles
    pub fn harness(risk: MockRisk) -> TestHarness {
        let store = PositionStore::new();
        let blacklist = Arc::new(Blacklist::new());
        let market = Arc::new(MockMarket::default());
        let gateway = Arc::new(MockGateway::default());
        let events = EventLog::new(64);
        let gate = Arc::new(RiskGate::new(
            Arc::new(risk),
            blacklist.clone(),
            RiskConfig::default().max_holder_pct,
        ));
        let scorer = Arc::new(HashScorer::new(&ScoringConfig::default()));

        TestHarness {
            ctx: EntryContext {
                store: store.clone(),
                blacklist: blacklist.clone(),
                gate,
                market: market.clone(),
                gateway: gateway.clone(),
                scorer,
                events: events.clone(),
            },
            market,
            gateway,
            blacklist,
            store,
            events,
        }
    }
}
