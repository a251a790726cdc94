//! Token and dev blacklists
//!
//! Both sets are append-only for the process lifetime: once a token or its
//! issuer is banned, every later signal for it is rejected regardless of any
//! other gate outcome.

use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use tracing::info;

/// Permanent blacklist of token mints and dev/authority wallets
#[derive(Debug, Default)]
pub struct Blacklist {
    tokens: DashSet<String>,
    devs: DashSet<String>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ban a token mint
    pub fn ban_token(&self, token: &str) {
        if self.tokens.insert(token.to_string()) {
            info!("Blacklisted token {}", token);
        }
    }

    /// Ban a dev/authority wallet
    pub fn ban_dev(&self, dev: &str) {
        if self.devs.insert(dev.to_string()) {
            info!("Blacklisted dev {}", dev);
        }
    }

    pub fn is_token_banned(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn is_dev_banned(&self, dev: &str) -> bool {
        self.devs.contains(dev)
    }

    /// Check a signal against both sets
    pub fn is_banned(&self, token: &str, dev: Option<&str>) -> bool {
        if self.tokens.contains(token) {
            return true;
        }
        matches!(dev, Some(d) if !d.is_empty() && self.devs.contains(d))
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn dev_count(&self) -> usize {
        self.devs.len()
    }
}

/// Devs whose positions were stop-lossed or liquidity-collapsed recently.
///
/// Unlike [`Blacklist`], membership here expires after a configured window;
/// only the consensus policy consults it. Entries are pruned lazily on read.
#[derive(Debug)]
pub struct RecentRugDevs {
    inner: DashMap<String, DateTime<Utc>>,
    window: Duration,
}

impl RecentRugDevs {
    pub fn new(window_secs: u64) -> Self {
        Self {
            inner: DashMap::new(),
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// Record a dev whose token just rugged or stopped out
    pub fn record(&self, dev: &str) {
        self.inner.insert(dev.to_string(), Utc::now());
    }

    /// Is the dev still inside the window?
    pub fn contains(&self, dev: &str) -> bool {
        match self.inner.get(dev) {
            Some(seen) => {
                if Utc::now() - *seen < self.window {
                    true
                } else {
                    drop(seen);
                    self.inner.remove(dev);
                    false
                }
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blacklist_is_append_only() {
        let blacklist = Blacklist::new();
        assert!(!blacklist.is_banned("mint1", None));

        blacklist.ban_token("mint1");
        assert!(blacklist.is_banned("mint1", None));
        assert!(blacklist.is_token_banned("mint1"));

        // Banning again is a no-op, membership persists
        blacklist.ban_token("mint1");
        assert!(blacklist.is_banned("mint1", None));
        assert_eq!(blacklist.token_count(), 1);
    }

    #[test]
    fn test_dev_ban_disqualifies_other_tokens() {
        let blacklist = Blacklist::new();
        blacklist.ban_dev("dev1");

        assert!(blacklist.is_banned("some_new_mint", Some("dev1")));
        assert!(!blacklist.is_banned("some_new_mint", Some("dev2")));
        assert!(!blacklist.is_banned("some_new_mint", None));
    }

    #[test]
    fn test_empty_dev_is_ignored() {
        let blacklist = Blacklist::new();
        blacklist.ban_dev("");
        assert!(!blacklist.is_banned("mint", Some("")));
    }

    #[test]
    fn test_recent_rugdevs_window() {
        let recent = RecentRugDevs::new(3600);
        assert!(!recent.contains("dev1"));

        recent.record("dev1");
        assert!(recent.contains("dev1"));

        // A zero-length window expires entries immediately
        let expired = RecentRugDevs::new(0);
        expired.record("dev2");
        assert!(!expired.contains("dev2"));
        // And the lazy prune removed the stale entry
        assert!(expired.inner.get("dev2").is_none());
    }
}
