//! Multi-source vote aggregation
//!
//! A token becomes a candidate for the consensus strategy once enough
//! distinct discovery sources have reported it. Votes only ever accumulate;
//! the book is never cleared, so a promotion can happen at most once per
//! token; duplicate downstream signals are handled by the position store's
//! duplicate rejection.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone)]
struct VoteRecord {
    sources: HashSet<String>,
    first_seen: DateTime<Utc>,
}

/// Token → distinct-source vote sets
pub struct VoteBook {
    votes: RwLock<HashMap<String, VoteRecord>>,
    min_signals: usize,
}

impl VoteBook {
    pub fn new(min_signals: usize) -> Arc<Self> {
        Arc::new(Self {
            votes: RwLock::new(HashMap::new()),
            min_signals,
        })
    }

    /// Record a vote. Returns true exactly when this vote moves the token's
    /// distinct-source count onto the promotion threshold.
    pub async fn record_vote(&self, token: &str, source: &str) -> bool {
        let mut votes = self.votes.write().await;
        let record = votes.entry(token.to_string()).or_insert_with(|| VoteRecord {
            sources: HashSet::new(),
            first_seen: Utc::now(),
        });

        let added = record.sources.insert(source.to_string());
        let count = record.sources.len();

        if added {
            info!(
                "[consensus] {} voted by {:?} ({}/{})",
                token, record.sources, count, self.min_signals
            );
        }

        added && count == self.min_signals
    }

    /// Distinct sources seen so far for a token
    pub async fn distinct_sources(&self, token: &str) -> usize {
        self.votes
            .read()
            .await
            .get(token)
            .map(|r| r.sources.len())
            .unwrap_or(0)
    }

    /// When the token was first reported by any source
    pub async fn first_seen(&self, token: &str) -> Option<DateTime<Utc>> {
        self.votes.read().await.get(token).map(|r| r.first_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_below_threshold_never_promotes() {
        let book = VoteBook::new(2);
        assert!(!book.record_vote("mint1", "pumpfun").await);
        assert_eq!(book.distinct_sources("mint1").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_votes_do_not_double_count() {
        let book = VoteBook::new(2);
        assert!(!book.record_vote("mint1", "pumpfun").await);
        assert!(!book.record_vote("mint1", "pumpfun").await);
        assert!(!book.record_vote("mint1", "pumpfun").await);
        assert_eq!(book.distinct_sources("mint1").await, 1);
    }

    #[tokio::test]
    async fn test_promotion_exactly_once_at_crossing() {
        let book = VoteBook::new(2);
        assert!(!book.record_vote("mint1", "pumpfun").await);
        // Second distinct source crosses the threshold
        assert!(book.record_vote("mint1", "moralis").await);
        // Re-votes and further sources never re-promote
        assert!(!book.record_vote("mint1", "moralis").await);
        assert!(!book.record_vote("mint1", "bitquery").await);
        assert_eq!(book.distinct_sources("mint1").await, 3);
    }

    #[tokio::test]
    async fn test_tokens_are_independent() {
        let book = VoteBook::new(2);
        assert!(!book.record_vote("mint1", "pumpfun").await);
        assert!(!book.record_vote("mint2", "pumpfun").await);
        assert!(book.record_vote("mint1", "moralis").await);
        assert_eq!(book.distinct_sources("mint2").await, 1);
    }

    #[tokio::test]
    async fn test_first_seen_is_sticky() {
        let book = VoteBook::new(2);
        book.record_vote("mint1", "pumpfun").await;
        let first = book.first_seen("mint1").await.unwrap();
        book.record_vote("mint1", "moralis").await;
        assert_eq!(book.first_seen("mint1").await.unwrap(), first);
    }
}
