//! Token discovery feeds
//!
//! Each feed is a long-lived task pushing `(token, source)` pairs into the
//! shared candidate queue. Delivery is at-most-once and duplicates are
//! expected; downstream dedup (votes, already-open checks) tolerates them.

pub mod pumpportal;
pub mod trending;

use std::fmt;

use crate::strategy::StrategyKind;

pub use pumpportal::PumpPortalFeed;
pub use trending::{BitqueryFeed, MoralisFeed};

/// Where a candidate token was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSource {
    PumpFun,
    Moralis,
    Bitquery,
}

impl FeedSource {
    /// Name used for vote records and position display
    pub fn name(&self) -> &'static str {
        match self {
            FeedSource::PumpFun => "pumpfun",
            FeedSource::Moralis => "moralis",
            FeedSource::Bitquery => "bitquery",
        }
    }

    /// Which strategy handles this source's raw signals
    pub fn lane(&self) -> StrategyKind {
        match self {
            FeedSource::PumpFun => StrategyKind::Rapid,
            FeedSource::Moralis | FeedSource::Bitquery => StrategyKind::Momentum,
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A discovered token heading for the router
#[derive(Debug, Clone)]
pub struct Candidate {
    pub token: String,
    pub source: FeedSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lanes() {
        assert_eq!(FeedSource::PumpFun.lane(), StrategyKind::Rapid);
        assert_eq!(FeedSource::Moralis.lane(), StrategyKind::Momentum);
        assert_eq!(FeedSource::Bitquery.lane(), StrategyKind::Momentum);
    }

    #[test]
    fn test_source_names_are_distinct() {
        let names = [
            FeedSource::PumpFun.name(),
            FeedSource::Moralis.name(),
            FeedSource::Bitquery.name(),
        ];
        let set: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(set.len(), names.len());
    }
}
