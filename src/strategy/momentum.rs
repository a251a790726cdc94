//! Momentum scalper policy
//!
//! Consumes the trending lanes. Wants a young pool with real liquidity and a
//! short-window volume spike, then bids 3% under the market instead of
//! lifting the offer. The position starts in `AwaitingFill`; there is no
//! fill confirmation, so the limit price is tracked as the entry.

use chrono::Utc;
use tracing::warn;

use crate::config::MomentumConfig;
use crate::position::{Phase, Position};
use crate::risk::Verdict;
use crate::strategy::{EntryContext, StrategyKind};

pub struct MomentumPolicy {
    ctx: EntryContext,
    config: MomentumConfig,
}

/// Is the 1h volume at least double the 6h volume extrapolated to a
/// 15-minute average? Zero long-window volume is no evidence of a spike.
pub fn volume_spike(vol_1h: f64, vol_6h: f64) -> bool {
    let avg_15m = vol_6h / 24.0;
    avg_15m > 0.0 && vol_1h >= 2.0 * avg_15m
}

impl MomentumPolicy {
    pub fn new(ctx: EntryContext, config: MomentumConfig) -> Self {
        Self { ctx, config }
    }

    /// Attempt an entry for a trending token
    pub async fn try_enter(&self, token: &str, source: &str) -> Option<Position> {
        if !self.config.enabled {
            return None;
        }

        if !self.ctx.pre_screen(StrategyKind::Momentum, token).await {
            return None;
        }

        let stats = self
            .ctx
            .market
            .volume_liquidity(token)
            .await
            .unwrap_or(crate::oracle::PoolVolume {
                liquidity: 0.0,
                vol_1h: 0.0,
                vol_6h: 0.0,
            });
        let pool_age = self.ctx.market.pool_age_secs(token).await;

        let liq_ok = stats.liquidity >= self.config.min_liquidity;
        let age_ok = matches!(pool_age, Some(age) if age < self.config.max_pool_age_secs);
        let vol_ok = volume_spike(stats.vol_1h, stats.vol_6h);

        if !(liq_ok && age_ok && vol_ok) {
            self.ctx
                .events
                .push(format!(
                    "{} [momentum] entry fail: liq:{} age:{} vol:{}",
                    token, liq_ok, age_ok, vol_ok
                ))
                .await;
            return None;
        }

        let report = match self.ctx.gate.evaluate(token).await {
            Verdict::Pass(report) => report,
            Verdict::Reject(reason) => {
                self.ctx
                    .events
                    .push(format!("{} [momentum] rejected: {}", token, reason))
                    .await;
                return None;
            }
        };

        if self
            .ctx
            .issuer_banned(StrategyKind::Momentum, token, report.authority.as_deref())
            .await
        {
            return None;
        }

        let market_price = self
            .ctx
            .market
            .price(token)
            .await
            .unwrap_or(self.config.fallback_price);
        let limit_price = market_price * (1.0 - self.config.limit_discount);

        if let Err(e) = self
            .ctx
            .gateway
            .send_buy(token, self.config.buy_amount, Some(limit_price))
            .await
        {
            warn!("{} [momentum] buy order failed: {}", token, e);
            self.ctx
                .events
                .push(format!(
                    "{} [momentum] buy order failed, entry aborted",
                    token
                ))
                .await;
            return None;
        }

        let position = Position {
            token: token.to_string(),
            strategy: StrategyKind::Momentum,
            source: source.to_string(),
            opened_at: Utc::now(),
            size: self.config.buy_amount,
            entry_price: limit_price,
            last_price: limit_price,
            local_high: limit_price,
            hard_stop: limit_price * self.config.hard_stop_fraction,
            phase: Phase::AwaitingFill,
            pl: 0.0,
            trail: self.config.trail_fraction,
            score: self.ctx.scorer.score(token),
            dev: report.authority,
            hold_until: None,
            liquidity_ref: Some(stats.liquidity),
            exit_reason: None,
        };

        if !self.ctx.insert(position.clone()).await {
            return None;
        }

        self.ctx
            .events
            .push(format!(
                "{} [momentum] limit-buy {} @ {:.5}",
                token, self.config.buy_amount, limit_price
            ))
            .await;

        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::PoolVolume;
    use crate::strategy::testutil::{harness, MockRisk};

    fn spiking_pool() -> PoolVolume {
        // 6h volume of 240 extrapolates to 10 per 15m; 1h of 25 clears 2x
        PoolVolume {
            liquidity: 50.0,
            vol_1h: 25.0,
            vol_6h: 240.0,
        }
    }

    #[test]
    fn test_volume_spike_rule() {
        assert!(volume_spike(25.0, 240.0));
        assert!(volume_spike(20.0, 240.0)); // exactly double counts
        assert!(!volume_spike(15.0, 240.0));
        // No long-window history, no spike evidence
        assert!(!volume_spike(100.0, 0.0));
    }

    #[tokio::test]
    async fn test_entry_places_discounted_limit() {
        let h = harness(MockRisk::good("dev1"));
        h.market.set_volume(Some(spiking_pool()));
        *h.market.pool_age.lock().unwrap() = Some(600);
        h.market.set_price(Some(0.001));

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        let position = policy.try_enter("mint1", "moralis").await.unwrap();

        assert_eq!(position.phase, Phase::AwaitingFill);
        assert!((position.entry_price - 0.00097).abs() < 1e-12);
        assert!((position.hard_stop - 0.00097 * 0.7).abs() < 1e-12);
        assert_eq!(position.liquidity_ref, Some(50.0));
        assert_eq!(position.source, "moralis");

        let buys = h.gateway.buys.lock().unwrap().clone();
        assert_eq!(buys.len(), 1);
        assert!(buys[0].contains("limit"));
    }

    #[tokio::test]
    async fn test_old_pool_rejected() {
        let h = harness(MockRisk::good("dev1"));
        h.market.set_volume(Some(spiking_pool()));
        *h.market.pool_age.lock().unwrap() = Some(30 * 60);
        h.market.set_price(Some(0.001));

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        assert!(policy.try_enter("mint1", "moralis").await.is_none());
        assert_eq!(h.gateway.buy_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_pool_age_rejected() {
        let h = harness(MockRisk::good("dev1"));
        h.market.set_volume(Some(spiking_pool()));
        *h.market.pool_age.lock().unwrap() = None;
        h.market.set_price(Some(0.001));

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        assert!(policy.try_enter("mint1", "moralis").await.is_none());
    }

    #[tokio::test]
    async fn test_thin_liquidity_rejected() {
        let h = harness(MockRisk::good("dev1"));
        let mut pool = spiking_pool();
        pool.liquidity = 2.0;
        h.market.set_volume(Some(pool));
        *h.market.pool_age.lock().unwrap() = Some(600);
        h.market.set_price(Some(0.001));

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        assert!(policy.try_enter("mint1", "bitquery").await.is_none());
    }

    #[tokio::test]
    async fn test_no_volume_spike_rejected() {
        let h = harness(MockRisk::good("dev1"));
        let mut pool = spiking_pool();
        pool.vol_1h = 5.0;
        h.market.set_volume(Some(pool));
        *h.market.pool_age.lock().unwrap() = Some(600);
        h.market.set_price(Some(0.001));

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        assert!(policy.try_enter("mint1", "bitquery").await.is_none());
    }

    #[tokio::test]
    async fn test_blacklisted_dev_rejected_despite_good_report() {
        let h = harness(MockRisk::good("dev1"));
        h.blacklist.ban_dev("dev1");
        h.market.set_volume(Some(spiking_pool()));
        *h.market.pool_age.lock().unwrap() = Some(600);
        h.market.set_price(Some(0.001));

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        assert!(policy.try_enter("mint1", "moralis").await.is_none());
        assert_eq!(h.gateway.buy_count(), 0);
    }

    #[tokio::test]
    async fn test_gate_runs_after_pre_gate() {
        // A failing risk service only matters once the pre-gate passes
        let h = harness(MockRisk::failing());
        let mut pool = spiking_pool();
        pool.liquidity = 2.0;
        h.market.set_volume(Some(pool));
        *h.market.pool_age.lock().unwrap() = Some(600);

        let policy = MomentumPolicy::new(h.ctx.clone(), MomentumConfig::default());
        assert!(policy.try_enter("mint1", "moralis").await.is_none());

        // Now the pre-gate passes and the gate's fail-closed reject fires
        h.market.set_volume(Some(spiking_pool()));
        assert!(policy.try_enter("mint1", "moralis").await.is_none());
        assert_eq!(h.gateway.buy_count(), 0);
    }
}
