//! Signal routing
//!
//! One task drains the candidate queue. Every candidate is first recorded as
//! a consensus vote, then dispatched to the strategy owning its lane. Gating
//! can take seconds of external calls; that blocks only the candidate in
//! hand; the feed listeners keep enqueueing concurrently.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::consensus::VoteBook;
use crate::feeds::Candidate;
use crate::strategy::{ConsensusPolicy, MomentumPolicy, RapidPolicy, StrategyKind};

pub struct SignalRouter {
    rx: mpsc::Receiver<Candidate>,
    votes: Arc<VoteBook>,
    promotions: mpsc::Sender<String>,
    rapid: RapidPolicy,
    momentum: MomentumPolicy,
}

impl SignalRouter {
    pub fn new(
        rx: mpsc::Receiver<Candidate>,
        votes: Arc<VoteBook>,
        promotions: mpsc::Sender<String>,
        rapid: RapidPolicy,
        momentum: MomentumPolicy,
    ) -> Self {
        Self {
            rx,
            votes,
            promotions,
            rapid,
            momentum,
        }
    }

    /// Drain the candidate queue until every feed is gone
    pub async fn run(mut self) {
        info!("Signal router started");
        while let Some(candidate) = self.rx.recv().await {
            self.route(candidate).await;
        }
        info!("Candidate queue closed, router stopping");
    }

    async fn route(&self, candidate: Candidate) {
        let Candidate { token, source } = candidate;
        debug!("Routing {} from {}", token, source);

        // Every sighting counts toward community consensus, whichever lane
        // handles the raw signal
        if self.votes.record_vote(&token, source.name()).await {
            if self.promotions.send(token.clone()).await.is_err() {
                warn!("Promotion queue closed, dropping {}", token);
            }
        }

        match source.lane() {
            StrategyKind::Rapid => {
                self.rapid.try_enter(&token, source.name()).await;
            }
            StrategyKind::Momentum => {
                self.momentum.try_enter(&token, source.name()).await;
            }
            // No raw-feed lane maps to consensus; it only consumes promotions
            StrategyKind::Consensus => {}
        }
    }
}

/// Drains the promotion queue into the consensus policy
pub struct ConsensusWorker {
    rx: mpsc::Receiver<String>,
    policy: ConsensusPolicy,
}

impl ConsensusWorker {
    pub fn new(rx: mpsc::Receiver<String>, policy: ConsensusPolicy) -> Self {
        Self { rx, policy }
    }

    pub async fn run(mut self) {
        info!("Consensus worker started");
        while let Some(token) = self.rx.recv().await {
            self.policy.try_enter(&token).await;
        }
        info!("Promotion queue closed, consensus worker stopping");
    }
}
