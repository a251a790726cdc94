//! Market-data and wallet-balance oracles
//!
//! Every method is fail-soft: a timeout, transport error, or malformed
//! payload yields `None` and a single warning. Callers treat "no data" as a
//! normal outcome and never retry inside a tick.

pub mod dexscreener;
pub mod helius;

use async_trait::async_trait;

pub use dexscreener::DexScreenerOracle;
pub use helius::HeliusBalanceOracle;

/// Pool liquidity and volume snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolVolume {
    /// Tradable base-side liquidity
    pub liquidity: f64,
    pub vol_1h: f64,
    pub vol_6h: f64,
}

/// Holder distribution snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolderStats {
    pub holder_count: u64,
    /// Largest single holder's share of supply, as a fraction
    pub max_holder_pct: f64,
}

/// Source-agnostic market data provider
#[async_trait]
pub trait MarketDataOracle: Send + Sync {
    /// Latest price in base currency, if the token has a tracked pair
    async fn price(&self, token: &str) -> Option<f64>;

    /// Age of the token's primary pool in seconds
    async fn pool_age_secs(&self, token: &str) -> Option<u64>;

    /// Liquidity and short/long window volumes
    async fn volume_liquidity(&self, token: &str) -> Option<PoolVolume>;

    /// Holder count and concentration
    async fn holder_stats(&self, token: &str) -> Option<HolderStats>;
}

/// Wallet balance provider
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Current balance in base currency for the given address
    async fn balance(&self, address: &str) -> Option<f64>;
}
