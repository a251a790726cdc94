//! Rapid sniper policy
//!
//! Consumes the new-token lane. Besides the shared pipeline it demands that
//! on-chain liquidity is already above the floor and still climbing across a
//! short sampling window before it will chase a fresh mint.

use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::config::RapidConfig;
use crate::position::{Phase, Position};
use crate::risk::Verdict;
use crate::strategy::{EntryContext, StrategyKind};

pub struct RapidPolicy {
    ctx: EntryContext,
    config: RapidConfig,
}

impl RapidPolicy {
    pub fn new(ctx: EntryContext, config: RapidConfig) -> Self {
        Self { ctx, config }
    }

    /// Attempt an entry for a freshly discovered token
    pub async fn try_enter(&self, token: &str, source: &str) -> Option<Position> {
        if !self.config.enabled {
            return None;
        }

        if !self.ctx.pre_screen(StrategyKind::Rapid, token).await {
            return None;
        }

        if !self.liquidity_rising(token).await {
            self.ctx
                .events
                .push(format!(
                    "{} [rapid] liquidity not rapidly rising, skipping",
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
                    .push(format!("{} [rapid] rejected: {}", token, reason))
                    .await;
                return None;
            }
        };

        if self
            .ctx
            .issuer_banned(StrategyKind::Rapid, token, report.authority.as_deref())
            .await
        {
            return None;
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
            warn!("{} [rapid] buy order failed: {}", token, e);
            self.ctx
                .events
                .push(format!("{} [rapid] buy order failed, entry aborted", token))
                .await;
            return None;
        }

        let position = Position {
            token: token.to_string(),
            strategy: StrategyKind::Rapid,
            source: source.to_string(),
            opened_at: Utc::now(),
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
            hold_until: None,
            liquidity_ref: None,
            exit_reason: None,
        };

        if !self.ctx.insert(position.clone()).await {
            return None;
        }

        self.ctx
            .events
            .push(format!(
                "{} [rapid] buy {} @ {:.5}",
                token, self.config.buy_amount, entry_price
            ))
            .await;

        Some(position)
    }

    /// Sample liquidity a few times and require an upward trend with every
    /// counted sample above the floor
    async fn liquidity_rising(&self, token: &str) -> bool {
        let mut rises = 0u32;
        let mut last = 0.0_f64;

        for i in 0..self.config.samples {
            let liquidity = self
                .ctx
                .market
                .volume_liquidity(token)
                .await
                .map(|v| v.liquidity)
                .unwrap_or(0.0);

            if liquidity >= self.config.min_liquidity && liquidity > last {
                rises += 1;
            }
            last = liquidity;

            if i + 1 < self.config.samples {
                sleep(Duration::from_secs(self.config.sample_delay_secs)).await;
            }
        }

        rises >= self.config.min_rises
    }
}
