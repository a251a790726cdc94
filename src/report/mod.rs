//! Status reporting
//!
//! A bounded rolling event log plus a periodic snapshot of the whole system,
//! published on a `watch` channel and served read-only over HTTP. Win/loss
//! and P&L aggregates come from the position store's structured close events,
//! never from parsing log lines.

pub mod server;

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::info;

use crate::position::{Phase, PositionStore};
use crate::strategy::StrategyKind;

/// Bounded, rolling log of human-readable activity lines
pub struct EventLog {
    entries: RwLock<VecDeque<String>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        })
    }

    /// Append a line, dropping the oldest once at capacity
    pub async fn push(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{}", line);

        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(line);
    }

    /// Current contents, oldest first
    pub async fn recent(&self) -> Vec<String> {
        self.entries.read().await.iter().cloned().collect()
    }
}

/// Mutable runtime facts shared across tasks: the last-good wallet balance
/// and a coarse status string
pub struct RuntimeState {
    wallet_balance: RwLock<f64>,
    status: RwLock<String>,
}

impl RuntimeState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            wallet_balance: RwLock::new(0.0),
            status: RwLock::new("Starting...".to_string()),
        })
    }

    pub async fn set_balance(&self, balance: f64) {
        *self.wallet_balance.write().await = balance;
    }

    pub async fn balance(&self) -> f64 {
        *self.wallet_balance.read().await
    }

    pub async fn set_status(&self, status: impl Into<String>) {
        *self.status.write().await = status.into();
    }

    pub async fn status(&self) -> String {
        self.status.read().await.clone()
    }
}

/// One open position as shown on the status surface
#[derive(Debug, Clone, Serialize)]
pub struct OpenPositionView {
    pub token: String,
    pub strategy: StrategyKind,
    pub source: String,
    pub size: f64,
    pub score: f64,
    pub entry_price: f64,
    pub last_price: f64,
    pub pl: f64,
    pub pl_pct: f64,
    pub phase: Phase,
    pub age_secs: i64,
}

/// Per-strategy aggregate row
#[derive(Debug, Clone, Serialize)]
pub struct StrategyStatsView {
    pub strategy: StrategyKind,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub net_pl: f64,
}

/// Read-only snapshot of the whole system
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub wallet_balance: f64,
    pub exposure: f64,
    pub daily_pl: f64,
    pub open_positions: Vec<OpenPositionView>,
    pub strategies: Vec<StrategyStatsView>,
    pub recent_events: Vec<String>,
}

impl StatusSnapshot {
    pub fn empty() -> Self {
        Self {
            status: "Starting...".to_string(),
            generated_at: chrono::Utc::now(),
            wallet_balance: 0.0,
            exposure: 0.0,
            daily_pl: 0.0,
            open_positions: Vec::new(),
            strategies: Vec::new(),
            recent_events: Vec::new(),
        }
    }
}

/// Periodically assembles and publishes [`StatusSnapshot`]s
pub struct Reporter {
    store: Arc<PositionStore>,
    events: Arc<EventLog>,
    state: Arc<RuntimeState>,
    tx: watch::Sender<StatusSnapshot>,
    interval: Duration,
}

impl Reporter {
    pub fn new(
        store: Arc<PositionStore>,
        events: Arc<EventLog>,
        state: Arc<RuntimeState>,
        interval_ms: u64,
    ) -> (Self, watch::Receiver<StatusSnapshot>) {
        let (tx, rx) = watch::channel(StatusSnapshot::empty());
        (
            Self {
                store,
                events,
                state,
                tx,
                interval: Duration::from_millis(interval_ms),
            },
            rx,
        )
    }

    /// Publish snapshots until every receiver is gone
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let snapshot = self.build_snapshot().await;
            if self.tx.send(snapshot).is_err() {
                return;
            }
        }
    }

    async fn build_snapshot(&self) -> StatusSnapshot {
        let now = chrono::Utc::now();

        let mut open_positions: Vec<OpenPositionView> = self
            .store
            .open_positions()
            .await
            .into_iter()
            .map(|p| OpenPositionView {
                age_secs: p.age_secs(now),
                pl_pct: p.pl_pct(),
                token: p.token,
                strategy: p.strategy,
                source: p.source,
                size: p.size,
                score: p.score,
                entry_price: p.entry_price,
                last_price: p.last_price,
                pl: p.pl,
                phase: p.phase,
            })
            .collect();
        open_positions.sort_by(|a, b| b.age_secs.cmp(&a.age_secs));

        let stats = self.store.stats().await;
        let mut strategies: Vec<StrategyStatsView> = stats
            .into_iter()
            .map(|(strategy, s)| StrategyStatsView {
                strategy,
                trades: s.trades,
                wins: s.wins,
                losses: s.losses,
                win_rate: s.win_rate(),
                net_pl: s.net_pl,
            })
            .collect();
        strategies.sort_by_key(|s| s.strategy);

        StatusSnapshot {
            status: self.state.status().await,
            generated_at: now,
            wallet_balance: self.state.balance().await,
            exposure: self.store.exposure().await,
            daily_pl: self.store.daily_pl().await,
            open_positions,
            strategies,
            recent_events: self.events.recent().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::ExitReason;

    #[tokio::test]
    async fn test_event_log_is_bounded() {
        let log = EventLog::new(3);
        for i in 0..5 {
            log.push(format!("event {}", i)).await;
        }

        let entries = log.recent().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], "event 2");
        assert_eq!(entries[2], "event 4");
    }

    #[tokio::test]
    async fn test_snapshot_reflects_store() {
        let store = PositionStore::new();
        let events = EventLog::new(10);
        let state = RuntimeState::new();
        state.set_balance(1.25).await;
        state.set_status("Running").await;

        let mut pos =
            crate::position::manager::test_position("mint1", StrategyKind::Rapid);
        pos.observe_price(0.002);
        store.try_open(pos).await.unwrap();
        events.push("mint1 opened").await;

        // A closed momentum trade feeds the aggregates
        let mut closed =
            crate::position::manager::test_position("mint2", StrategyKind::Momentum);
        closed.observe_price(0.002);
        store.try_open(closed).await.unwrap();
        store
            .update("mint2", |p| {
                p.pl = 0.05;
                p.mark_exited(ExitReason::TrailingStop);
            })
            .await
            .unwrap();
        store.sweep_closed().await;

        let (reporter, _rx) = Reporter::new(store, events, state, 2000);
        let snapshot = reporter.build_snapshot().await;

        assert_eq!(snapshot.status, "Running");
        assert_eq!(snapshot.wallet_balance, 1.25);
        assert_eq!(snapshot.open_positions.len(), 1);
        assert_eq!(snapshot.open_positions[0].token, "mint1");
        assert_eq!(snapshot.recent_events, vec!["mint1 opened".to_string()]);
        assert!((snapshot.daily_pl - 0.05).abs() < 1e-12);

        assert_eq!(snapshot.strategies.len(), 1);
        assert_eq!(snapshot.strategies[0].strategy, StrategyKind::Momentum);
        assert_eq!(snapshot.strategies[0].wins, 1);
    }
}
