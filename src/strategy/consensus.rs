//! Community-consensus swing policy
//!
//! Never reads raw feeds: its lane is the promotion queue filled by the vote
//! aggregator. On top of the shared pipeline it wants a broad holder base,
//! low concentration, and an issuer with no recent rug on record. Positions
//! carry a hold deadline that forces an exit regardless of price.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::warn;

use crate::blacklist::RecentRugDevs;
use crate::config::ConsensusConfig;
use crate::oracle::HolderStats;
use crate::position::{Phase, Position};
use crate::risk::Verdict;
use crate::strategy::{EntryContext, StrategyKind};

pub struct ConsensusPolicy {
    ctx: EntryContext,
    config: ConsensusConfig,
    rugdevs: Arc<RecentRugDevs>,
}

impl ConsensusPolicy {
    pub fn new(ctx: EntryContext, config: ConsensusConfig, rugdevs: Arc<RecentRugDevs>) -> Self {
        Self {
            ctx,
            config,
            rugdevs,
        }
    }

    /// Attempt an entry for a promoted token
    pub async fn try_enter(&self, token: &str) -> Option<Position> {
        if !self.config.enabled {
            return None;
        }

        if !self.ctx.pre_screen(StrategyKind::Consensus, token).await {
            return None;
        }

        let holders = self
            .ctx
            .market
            .holder_stats(token)
            .await
            .unwrap_or(HolderStats {
                holder_count: 0,
                max_holder_pct: 99.0,
            });

        if holders.holder_count < self.config.min_holders
            || holders.max_holder_pct > self.config.max_concentration
        {
            self.ctx
                .events
                .push(format!(
                    "{} [consensus] fails holder/distribution screen",
                    token
                ))
                .await;
            return None;
        }

        let report = match self.ctx.gate.evaluate(token).await {
            Verdict::Pass(report) => report,
            Verdict::Reject(reason) => {
                self.ctx
                    .events
                    .push(format!("{} [consensus] rejected: {}", token, reason))
                    .await;
                return None;
            }
        };

        if self
            .ctx
            .issuer_banned(StrategyKind::Consensus, token, report.authority.as_deref())
            .await
        {
            return None;
        }

        if let Some(dev) = report.authority.as_deref() {
            if self.rugdevs.contains(dev) {
                self.ctx
                    .events
                    .push(format!("{} [consensus] issuer recently rugged", token))
                    .await;
                return None;
            }
        }

        let entry_price = self
            .ctx
            .market
            .price(token)
            .await
            .unwrap_or(self.config.fallback_price);

        if let Err(e) = self
            .ctx
            .gateway
            .send_buy(token, self.config.buy_amount, None)
            .await
        {
            warn!("{} [consensus] buy order failed: {}", token, e);
            self.ctx
                .events
                .push(format!(
                    "{} [consensus] buy order failed, entry aborted",
                    token
                ))
                .await;
            return None;
        }

        let now = Utc::now();
        let position = Position {
            token: token.to_string(),
            strategy: StrategyKind::Consensus,
            source: "consensus".to_string(),
            opened_at: now,
            size: self.config.buy_amount,
            entry_price,
            last_price: entry_price,
            local_high: entry_price,
            hard_stop: entry_price * self.config.hard_stop_fraction,
            phase: Phase::Filled,
            pl: 0.0,
            trail: self.config.trail_fraction,
            score: self.ctx.scorer.score(token),
            dev: report.authority,
            hold_until: Some(now + Duration::seconds(self.config.hold_secs as i64)),
            liquidity_ref: None,
            exit_reason: None,
        };

        if !self.ctx.insert(position.clone()).await {
            return None;
        }

        self.ctx
            .events
            .push(format!(
                "{} [consensus] buy {} @ {:.6}",
                token, self.config.buy_amount, entry_price
            ))
            .await;

        Some(position)
    }
}
