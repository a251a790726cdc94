//! Position store
//!
//! The authoritative map of token → open position. Only the signal router
//! inserts and only the exit evaluator mutates; both run cooperatively on the
//! same runtime, so the store's lock is held strictly across synchronous
//! sections and never across external I/O.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::strategy::StrategyKind;

/// Lifecycle phase of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Limit order placed, fill not yet assumed
    AwaitingFill,
    Filled,
    /// Riding the remainder after a partial take-profit
    Runner,
    /// Terminal; swept out of the store on the next pass
    Exited,
}

/// Why a position reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    HardStop,
    TrailingStop,
    LiquidityCollapse,
    HoldExpired,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::HardStop => "hard stop",
            ExitReason::TrailingStop => "trailing stop",
            ExitReason::LiquidityCollapse => "liquidity collapse",
            ExitReason::HoldExpired => "hold expired",
        };
        f.write_str(s)
    }
}

/// A single open trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Token mint address, unique key
    pub token: String,
    pub strategy: StrategyKind,
    /// Feed that produced the originating signal
    pub source: String,
    pub opened_at: chrono::DateTime<chrono::Utc>,
    /// Remaining size in base currency; never grows after creation
    pub size: f64,
    pub entry_price: f64,
    pub last_price: f64,
    /// High-water mark since entry; only ever moves up
    pub local_high: f64,
    /// Fixed at entry, never recalculated
    pub hard_stop: f64,
    pub phase: Phase,
    /// `(last_price - entry_price) * size`, refreshed each evaluation tick
    pub pl: f64,
    /// Drawdown-from-high fraction that ends the runner phase
    pub trail: f64,
    /// External scorer value recorded at entry
    pub score: f64,
    /// Issuer/authority wallet, used for blacklist propagation
    pub dev: Option<String>,
    /// Forced-exit deadline (consensus strategy only)
    pub hold_until: Option<chrono::DateTime<chrono::Utc>>,
    /// Liquidity at entry (momentum strategy only)
    pub liquidity_ref: Option<f64>,
    /// Set when the position goes terminal
    pub exit_reason: Option<ExitReason>,
}

impl Position {
    /// Fold a fresh price quote into the position
    pub fn observe_price(&mut self, price: f64) {
        self.last_price = price;
        if price > self.local_high {
            self.local_high = price;
        }
        self.pl = (self.last_price - self.entry_price) * self.size;
    }

    /// Shrink the position after a partial exit and arm the runner phase
    pub fn apply_partial_exit(&mut self, keep_fraction: f64) {
        debug_assert!((0.0..=1.0).contains(&keep_fraction));
        self.size *= keep_fraction.clamp(0.0, 1.0);
        self.pl = (self.last_price - self.entry_price) * self.size;
        self.phase = Phase::Runner;
    }

    /// Terminal transition; `size == 0` and `phase == Exited` move together
    pub fn mark_exited(&mut self, reason: ExitReason) {
        self.size = 0.0;
        self.phase = Phase::Exited;
        self.exit_reason = Some(reason);
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Exited
    }

    /// Has the hold deadline passed?
    pub fn hold_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        matches!(self.hold_until, Some(deadline) if now > deadline)
    }

    pub fn pl_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.last_price - self.entry_price) / self.entry_price * 100.0
    }

    pub fn age_secs(&self, now: chrono::DateTime<chrono::Utc>) -> i64 {
        (now - self.opened_at).num_seconds().max(0)
    }
}

/// Structured record of a terminal position, emitted by the sweep.
/// All win/loss/P&L aggregates derive from these events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseEvent {
    pub token: String,
    pub strategy: StrategyKind,
    pub source: String,
    pub pl: f64,
    pub reason: ExitReason,
    pub closed_at: chrono::DateTime<chrono::Utc>,
}

/// Per-strategy win/loss aggregates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StrategyStats {
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub net_pl: f64,
}

impl StrategyStats {
    pub fn record(&mut self, pl: f64) {
        self.trades += 1;
        if pl >= 0.0 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.net_pl += pl;
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            return 0.0;
        }
        self.wins as f64 / self.trades as f64 * 100.0
    }
}

/// Authoritative store of open positions plus the aggregates derived from
/// close events
pub struct PositionStore {
    positions: RwLock<HashMap<String, Position>>,
    stats: RwLock<HashMap<StrategyKind, StrategyStats>>,
    daily_pl: RwLock<f64>,
}

impl PositionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            positions: RwLock::new(HashMap::new()),
            stats: RwLock::new(HashMap::new()),
            daily_pl: RwLock::new(0.0),
        })
    }

    /// Insert a freshly gated position. A token with an open position is
    /// rejected, never averaged.
    pub async fn try_open(&self, position: Position) -> Result<()> {
        let mut positions = self.positions.write().await;
        if positions.contains_key(&position.token) {
            return Err(Error::PositionOpen(position.token.clone()));
        }

        info!(
            "Opened {} position in {} @ {:.7} (size {})",
            position.strategy, position.token, position.entry_price, position.size
        );
        positions.insert(position.token.clone(), position);
        Ok(())
    }

    pub async fn is_open(&self, token: &str) -> bool {
        self.positions.read().await.contains_key(token)
    }

    /// Tokens with open positions, for the evaluator's sweep
    pub async fn tokens(&self) -> Vec<String> {
        self.positions.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, token: &str) -> Option<Position> {
        self.positions.read().await.get(token).cloned()
    }

    /// Apply a synchronous mutation to one position
    pub async fn update<F>(&self, token: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Position),
    {
        let mut positions = self.positions.write().await;
        let position = positions
            .get_mut(token)
            .ok_or_else(|| Error::PositionNotFound(token.to_string()))?;
        mutate(position);
        Ok(())
    }

    /// Remove terminal positions, folding each into the daily P&L
    /// accumulator and the per-strategy aggregates
    pub async fn sweep_closed(&self) -> Vec<CloseEvent> {
        let mut positions = self.positions.write().await;
        let closed: Vec<String> = positions
            .iter()
            .filter(|(_, p)| p.size == 0.0)
            .map(|(token, _)| token.clone())
            .collect();

        let mut events = Vec::with_capacity(closed.len());
        for token in closed {
            if let Some(position) = positions.remove(&token) {
                let reason = position.exit_reason.unwrap_or(ExitReason::HardStop);
                events.push(CloseEvent {
                    token: position.token,
                    strategy: position.strategy,
                    source: position.source,
                    pl: position.pl,
                    reason,
                    closed_at: chrono::Utc::now(),
                });
            }
        }
        drop(positions);

        if !events.is_empty() {
            let mut daily = self.daily_pl.write().await;
            let mut stats = self.stats.write().await;
            for event in &events {
                *daily += event.pl;
                stats.entry(event.strategy).or_default().record(event.pl);
                debug!(
                    "Swept {} ({}, {}): P&L {:+.6}",
                    event.token, event.strategy, event.reason, event.pl
                );
            }
        }

        events
    }

    /// Sum of open sizes in base currency
    pub async fn exposure(&self) -> f64 {
        self.positions.read().await.values().map(|p| p.size).sum()
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.positions.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.positions.read().await.len()
    }

    pub async fn daily_pl(&self) -> f64 {
        *self.daily_pl.read().await
    }

    pub async fn stats(&self) -> HashMap<StrategyKind, StrategyStats> {
        self.stats.read().await.clone()
    }
}

/// Test fixture shared by several modules' tests
#[cfg(test)]
pub(crate) fn test_position(token: &str, strategy: StrategyKind) -> Position {
    Position {
        token: token.to_string(),
        strategy,
        source: "pumpfun".to_string(),
        opened_at: chrono::Utc::now(),
        size: 0.07,
        entry_price: 0.001,
        last_price: 0.001,
        local_high: 0.001,
        hard_stop: 0.0007,
        phase: Phase::Filled,
        pl: 0.0,
        trail: 0.3,
        score: 80.0,
        dev: Some("dev1".to_string()),
        hold_until: None,
        liquidity_ref: None,
        exit_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_open_rejected() {
        let store = PositionStore::new();
        store
            .try_open(test_position("mint1", StrategyKind::Rapid))
            .await
            .unwrap();

        let err = store
            .try_open(test_position("mint1", StrategyKind::Momentum))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PositionOpen(_)));

        // The original position is untouched
        let pos = store.get("mint1").await.unwrap();
        assert_eq!(pos.strategy, StrategyKind::Rapid);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_local_high_only_moves_up() {
        let mut pos = test_position("mint1", StrategyKind::Rapid);

        pos.observe_price(0.002);
        assert_eq!(pos.local_high, 0.002);

        pos.observe_price(0.0015);
        assert_eq!(pos.local_high, 0.002);
        assert_eq!(pos.last_price, 0.0015);

        assert!(pos.local_high >= pos.last_price);
        assert!(pos.local_high >= pos.entry_price);
    }

    #[tokio::test]
    async fn test_partial_exit_shrinks_size() {
        let mut pos = test_position("mint1", StrategyKind::Rapid);
        pos.observe_price(0.002);

        pos.apply_partial_exit(0.15);
        assert!((pos.size - 0.07 * 0.15).abs() < 1e-12);
        assert_eq!(pos.phase, Phase::Runner);

        // Size never grows back
        pos.apply_partial_exit(1.0);
        assert!((pos.size - 0.07 * 0.15).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_exited_means_size_zero() {
        let mut pos = test_position("mint1", StrategyKind::Rapid);
        pos.mark_exited(ExitReason::HardStop);

        assert_eq!(pos.size, 0.0);
        assert_eq!(pos.phase, Phase::Exited);
        assert_eq!(pos.exit_reason, Some(ExitReason::HardStop));
    }

    #[tokio::test]
    async fn test_sweep_removes_terminal_and_folds_pl() {
        let store = PositionStore::new();
        store
            .try_open(test_position("mint1", StrategyKind::Rapid))
            .await
            .unwrap();
        store
            .try_open(test_position("mint2", StrategyKind::Momentum))
            .await
            .unwrap();

        store
            .update("mint1", |p| {
                p.observe_price(0.0006);
                p.mark_exited(ExitReason::HardStop);
                // P&L captured before the exit zeroed the size
                p.pl = -0.02;
            })
            .await
            .unwrap();

        let events = store.sweep_closed().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].token, "mint1");
        assert_eq!(events[0].reason, ExitReason::HardStop);

        assert_eq!(store.count().await, 1);
        assert!(store.get("mint1").await.is_none());
        assert!((store.daily_pl().await - (-0.02)).abs() < 1e-12);

        let stats = store.stats().await;
        let rapid = stats.get(&StrategyKind::Rapid).unwrap();
        assert_eq!(rapid.trades, 1);
        assert_eq!(rapid.losses, 1);
        assert_eq!(rapid.wins, 0);
    }

    #[tokio::test]
    async fn test_reopen_after_sweep_is_allowed() {
        let store = PositionStore::new();
        store
            .try_open(test_position("mint1", StrategyKind::Rapid))
            .await
            .unwrap();

        store
            .update("mint1", |p| p.mark_exited(ExitReason::TrailingStop))
            .await
            .unwrap();
        store.sweep_closed().await;

        // Terminal positions free the token for future signals
        store
            .try_open(test_position("mint1", StrategyKind::Consensus))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_exposure_sums_open_sizes() {
        let store = PositionStore::new();
        store
            .try_open(test_position("mint1", StrategyKind::Rapid))
            .await
            .unwrap();
        let mut second = test_position("mint2", StrategyKind::Momentum);
        second.size = 0.10;
        store.try_open(second).await.unwrap();

        assert!((store.exposure().await - 0.17).abs() < 1e-12);
    }

    #[test]
    fn test_strategy_stats_record() {
        let mut stats = StrategyStats::default();
        stats.record(0.01);
        stats.record(-0.005);
        stats.record(0.02);

        assert_eq!(stats.trades, 3);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert!((stats.win_rate() - 66.67).abs() < 0.1);
        assert!((stats.net_pl - 0.025).abs() < 1e-12);
    }
}
