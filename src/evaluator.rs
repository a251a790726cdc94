//! Exit evaluation sweep
//!
//! The periodic pass over every open position: refresh the price, raise the
//! high-water mark, recompute P&L, then walk the strategy's rule table in
//! fixed priority order: the first matching rule fires and the rest are
//! skipped that tick. Rule order is load-bearing: the rapid table checks the
//! hard stop before take-profit so a crash-and-spike read can never be
//! booked as a win.
//!
//! A sell the transport refuses leaves the position untouched; the same rule
//! fires again on the next sweep. No single token's failure stops the pass.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::blacklist::{Blacklist, RecentRugDevs};
use crate::config::Config;
use crate::execution::ExecutionGateway;
use crate::oracle::{BalanceOracle, MarketDataOracle};
use crate::position::{ExitReason, Phase, Position, PositionStore};
use crate::report::{EventLog, RuntimeState};
use crate::strategy::StrategyKind;

// Take-profit legs: how much is sold and what fraction of the position rides
// on as the runner
const RAPID_TP_SELL_PCT: u8 = 85;
const RAPID_TP_KEEP: f64 = 0.15;
const MOMENTUM_TP_SELL_PCT: u8 = 80;
const MOMENTUM_TP_KEEP: f64 = 0.2;
const CONSENSUS_TP_SELL_PCT: u8 = 50;
const CONSENSUS_TP_KEEP: f64 = 0.5;

/// Per-strategy rule thresholds
#[derive(Debug, Clone)]
pub struct ExitTables {
    pub rapid_tp_multiple: f64,
    pub momentum_tp_multiple: f64,
    pub momentum_collapse_fraction: f64,
    pub consensus_tp_multiple: f64,
}

impl ExitTables {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rapid_tp_multiple: config.rapid.tp_multiple,
            momentum_tp_multiple: config.momentum.tp_multiple,
            momentum_collapse_fraction: config.momentum.collapse_fraction,
            consensus_tp_multiple: config.consensus.tp_multiple,
        }
    }
}

/// What one position sees this tick. Either field may be missing; rules that
/// need the missing datum are skipped, the others still run.
#[derive(Debug, Clone, Copy)]
pub struct TickData {
    pub price: Option<f64>,
    pub liquidity: Option<f64>,
    pub now: DateTime<Utc>,
}

/// The action the rule table selected for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitStep {
    /// Take-profit leg: sell a slice, ride the rest as a runner
    Partial { sell_pct: u8, keep_fraction: f64 },
    /// Terminal exit
    Full {
        reason: ExitReason,
        blacklist_dev: bool,
    },
}

/// Walk the strategy's rule table in priority order. Expects `position` to
/// already reflect this tick's price observation.
pub fn plan_exit(position: &Position, tick: &TickData, tables: &ExitTables) -> Option<ExitStep> {
    match position.strategy {
        StrategyKind::Rapid => plan_rapid(position, tick, tables),
        StrategyKind::Momentum => plan_momentum(position, tick, tables),
        StrategyKind::Consensus => plan_consensus(position, tick, tables),
    }
}

fn plan_rapid(position: &Position, tick: &TickData, tables: &ExitTables) -> Option<ExitStep> {
    let price = tick.price?;

    // Stop-loss outranks take-profit
    if price <= position.hard_stop {
        return Some(ExitStep::Full {
            reason: ExitReason::HardStop,
            blacklist_dev: true,
        });
    }

    if position.phase == Phase::Filled
        && price >= position.entry_price * tables.rapid_tp_multiple
    {
        return Some(ExitStep::Partial {
            sell_pct: RAPID_TP_SELL_PCT,
            keep_fraction: RAPID_TP_KEEP,
        });
    }

    if position.phase == Phase::Runner
        && price < position.local_high * (1.0 - position.trail)
    {
        return Some(ExitStep::Full {
            reason: ExitReason::TrailingStop,
            blacklist_dev: false,
        });
    }

    None
}

fn plan_momentum(position: &Position, tick: &TickData, tables: &ExitTables) -> Option<ExitStep> {
    // Liquidity collapse is checked first and needs no price
    if let (Some(liquidity), Some(reference)) = (tick.liquidity, position.liquidity_ref) {
        if liquidity < reference * tables.momentum_collapse_fraction {
            return Some(ExitStep::Full {
                reason: ExitReason::LiquidityCollapse,
                blacklist_dev: true,
            });
        }
    }

    let price = tick.price?;

    if matches!(position.phase, Phase::AwaitingFill | Phase::Filled)
        && price >= position.entry_price * tables.momentum_tp_multiple
    {
        return Some(ExitStep::Partial {
            sell_pct: MOMENTUM_TP_SELL_PCT,
            keep_fraction: MOMENTUM_TP_KEEP,
        });
    }

    if position.phase == Phase::Runner
        && price < position.local_high * (1.0 - position.trail)
    {
        return Some(ExitStep::Full {
            reason: ExitReason::TrailingStop,
            blacklist_dev: false,
        });
    }

    if price < position.hard_stop {
        return Some(ExitStep::Full {
            reason: ExitReason::HardStop,
            blacklist_dev: true,
        });
    }

    None
}

fn plan_consensus(position: &Position, tick: &TickData, tables: &ExitTables) -> Option<ExitStep> {
    if let Some(price) = tick.price {
        if position.phase == Phase::Filled
            && price >= position.entry_price * tables.consensus_tp_multiple
        {
            return Some(ExitStep::Partial {
                sell_pct: CONSENSUS_TP_SELL_PCT,
                keep_fraction: CONSENSUS_TP_KEEP,
            });
        }

        if price <= position.hard_stop {
            return Some(ExitStep::Full {
                reason: ExitReason::HardStop,
                blacklist_dev: true,
            });
        }
    }

    // The hold deadline fires with or without a quote
    if position.hold_expired(tick.now) {
        return Some(ExitStep::Full {
            reason: ExitReason::HoldExpired,
            blacklist_dev: false,
        });
    }

    if let Some(price) = tick.price {
        if position.phase == Phase::Runner
            && price < position.local_high * (1.0 - position.trail)
        {
            return Some(ExitStep::Full {
                reason: ExitReason::TrailingStop,
                blacklist_dev: false,
            });
        }
    }

    None
}

/// The periodic sweep task
pub struct ExitEvaluator {
    store: Arc<PositionStore>,
    market: Arc<dyn MarketDataOracle>,
    balance: Arc<dyn BalanceOracle>,
    gateway: Arc<dyn ExecutionGateway>,
    blacklist: Arc<Blacklist>,
    rugdevs: Arc<RecentRugDevs>,
    events: Arc<EventLog>,
    state: Arc<RuntimeState>,
    tables: ExitTables,
    wallet_address: String,
    interval: Duration,
}

impl ExitEvaluator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<PositionStore>,
        market: Arc<dyn MarketDataOracle>,
        balance: Arc<dyn BalanceOracle>,
        gateway: Arc<dyn ExecutionGateway>,
        blacklist: Arc<Blacklist>,
        rugdevs: Arc<RecentRugDevs>,
        events: Arc<EventLog>,
        state: Arc<RuntimeState>,
        tables: ExitTables,
        wallet_address: String,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            market,
            balance,
            gateway,
            blacklist,
            rugdevs,
            events,
            state,
            tables,
            wallet_address,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Sweep forever on the configured interval
    pub async fn run(self) {
        info!(
            "Exit evaluator started, sweeping every {:?}",
            self.interval
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// One full pass: every position, then the terminal sweep, then the
    /// wallet balance refresh
    pub async fn sweep(&self) {
        for token in self.store.tokens().await {
            self.evaluate_token(&token).await;
        }

        for event in self.store.sweep_closed().await {
            self.events
                .push(format!(
                    "{} [{}] closed ({}), P&L {:+.6}",
                    event.token, event.strategy, event.reason, event.pl
                ))
                .await;
        }

        if let Some(balance) = self.balance.balance(&self.wallet_address).await {
            self.state.set_balance(balance).await;
        }
    }

    async fn evaluate_token(&self, token: &str) {
        let Some(current) = self.store.get(token).await else {
            return;
        };
        if current.is_terminal() {
            return;
        }

        let price = self.market.price(token).await;
        let liquidity = if current.strategy == StrategyKind::Momentum {
            self.market
                .volume_liquidity(token)
                .await
                .map(|v| v.liquidity)
        } else {
            None
        };

        if let Some(p) = price {
            let _ = self.store.update(token, |pos| pos.observe_price(p)).await;
        }

        let Some(position) = self.store.get(token).await else {
            return;
        };

        let tick = TickData {
            price,
            liquidity,
            now: Utc::now(),
        };

        if let Some(step) = plan_exit(&position, &tick, &self.tables) {
            self.apply_step(&position, step).await;
        }
    }

    async fn apply_step(&self, position: &Position, step: ExitStep) {
        let token = &position.token;

        match step {
            ExitStep::Partial {
                sell_pct,
                keep_fraction,
            } => {
                if let Err(e) = self.gateway.send_sell(token, sell_pct).await {
                    warn!("{} sell failed: {} (will retry next sweep)", token, e);
                    return;
                }

                let _ = self
                    .store
                    .update(token, |p| p.apply_partial_exit(keep_fraction))
                    .await;
                self.events
                    .push(format!(
                        "{} [{}] sold {}% at take-profit, runner armed",
                        token, position.strategy, sell_pct
                    ))
                    .await;
            }

            ExitStep::Full {
                reason,
                blacklist_dev,
            } => {
                if let Err(e) = self.gateway.send_sell(token, 100).await {
                    warn!("{} sell failed: {} (will retry next sweep)", token, e);
                    return;
                }

                if blacklist_dev {
                    if let Some(dev) = position.dev.as_deref() {
                        if !dev.is_empty() {
                            self.blacklist.ban_dev(dev);
                            self.rugdevs.record(dev);
                        }
                    }
                }

                let _ = self.store.update(token, |p| p.mark_exited(reason)).await;
                self.events
                    .push(format!(
                        "{} [{}] {} at {:.5}, full exit{}",
                        token,
                        position.strategy,
                        reason,
                        position.last_price,
                        if blacklist_dev { ", dev blacklisted" } else { "" }
                    ))
                    .await;
            }
        }
    }
}
