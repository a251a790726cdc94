//! CLI command implementations

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::blacklist::{Blacklist, RecentRugDevs};
use crate::config::Config;
use crate::consensus::VoteBook;
use crate::evaluator::{ExitEvaluator, ExitTables};
use crate::execution::{DryRunGateway, ExecutionGateway, TelegramGateway};
use crate::feeds::{BitqueryFeed, Candidate, MoralisFeed, PumpPortalFeed};
use crate::oracle::{DexScreenerOracle, HeliusBalanceOracle};
use crate::position::PositionStore;
use crate::report::{EventLog, Reporter, RuntimeState};
use crate::risk::{HashScorer, RiskGate, RugcheckClient};
use crate::router::{ConsensusWorker, SignalRouter};
use crate::strategy::{ConsensusPolicy, EntryContext, MomentumPolicy, RapidPolicy};

/// Start the orchestrator
pub async fn start(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - orders are logged, not sent");
    }

    info!("Starting memepilot...");
    info!(
        "Buy sizes: rapid={} momentum={} consensus={}",
        config.rapid.buy_amount, config.momentum.buy_amount, config.consensus.buy_amount
    );

    // Shared state
    let store = PositionStore::new();
    let blacklist = Arc::new(Blacklist::new());
    let rugdevs = Arc::new(RecentRugDevs::new(config.consensus.rugdev_window_secs));
    let votes = VoteBook::new(config.consensus.min_signals);
    let events = EventLog::new(config.report.event_log_capacity);
    let state = RuntimeState::new();

    // External collaborators
    let market = Arc::new(DexScreenerOracle::new(&config.oracle));
    let balance = Arc::new(HeliusBalanceOracle::new(&config.balance));
    let risk_service = Arc::new(RugcheckClient::new(&config.risk));
    let gate = Arc::new(RiskGate::new(
        risk_service,
        blacklist.clone(),
        config.risk.max_holder_pct,
    ));
    let scorer = Arc::new(HashScorer::new(&config.scoring));

    let gateway: Arc<dyn ExecutionGateway> = if dry_run {
        Arc::new(DryRunGateway)
    } else {
        info!("Execution channel: Telegram chat {}", config.telegram.chat_id);
        Arc::new(TelegramGateway::new(&config.telegram))
    };

    let ctx = EntryContext {
        store: store.clone(),
        blacklist: blacklist.clone(),
        gate,
        market: market.clone(),
        gateway: gateway.clone(),
        scorer,
        events: events.clone(),
    };

    // Discovery feeds share one candidate queue
    let (candidate_tx, candidate_rx) =
        mpsc::channel::<Candidate>(config.router.channel_capacity);
    let (promotion_tx, promotion_rx) = mpsc::channel::<String>(config.router.channel_capacity);

    tokio::spawn(PumpPortalFeed::new(config.feeds.pumpportal.clone(), candidate_tx.clone()).run());
    tokio::spawn(MoralisFeed::new(config.feeds.moralis.clone(), candidate_tx.clone()).run());
    tokio::spawn(BitqueryFeed::new(config.feeds.bitquery.clone(), candidate_tx.clone()).run());
    drop(candidate_tx);

    // Router and consensus lane
    let router = SignalRouter::new(
        candidate_rx,
        votes,
        promotion_tx,
        RapidPolicy::new(ctx.clone(), config.rapid.clone()),
        MomentumPolicy::new(ctx.clone(), config.momentum.clone()),
    );
    tokio::spawn(router.run());

    let consensus_worker = ConsensusWorker::new(
        promotion_rx,
        ConsensusPolicy::new(ctx.clone(), config.consensus.clone(), rugdevs.clone()),
    );
    tokio::spawn(consensus_worker.run());

    // Exit evaluator
    let evaluator = ExitEvaluator::new(
        store.clone(),
        market,
        balance,
        gateway,
        blacklist,
        rugdevs,
        events.clone(),
        state.clone(),
        ExitTables::from_config(config),
        config.balance.wallet_address.clone(),
        config.evaluator.sweep_interval_secs,
    );
    tokio::spawn(evaluator.run());

    // Reporting
    let (reporter, snapshot_rx) = Reporter::new(
        store,
        events,
        state.clone(),
        config.report.snapshot_interval_ms,
    );
    tokio::spawn(reporter.run());

    let listen_addr = config.report.listen_addr.parse()?;
    tokio::spawn(crate::report::server::serve(listen_addr, snapshot_rx));

    state.set_status("Running").await;
    info!("memepilot started. Listening for new tokens...");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("memepilot configuration");
    println!();
    println!("[telegram]");
    println!("  bot_token  = {}", mask(&config.telegram.bot_token));
    println!("  chat_id    = {}", config.telegram.chat_id);
    println!();
    println!("[oracle]    {}", config.oracle.base_url);
    println!("[risk]      {} (max holder {}%)", config.risk.base_url, config.risk.max_holder_pct);
    println!(
        "[balance]   {} wallet={}",
        mask(&config.balance.rpc_url),
        config.balance.wallet_address
    );
    println!();
    println!("[feeds]");
    println!(
        "  pumpportal enabled={} url={}",
        config.feeds.pumpportal.enabled, config.feeds.pumpportal.ws_url
    );
    println!(
        "  moralis    enabled={} poll={}s",
        !config.feeds.moralis.api_key.is_empty(),
        config.feeds.moralis.poll_secs
    );
    println!(
        "  bitquery   enabled={} poll={}s",
        !config.feeds.bitquery.api_key.is_empty(),
        config.feeds.bitquery.poll_secs
    );
    println!();
    println!("[strategies]");
    println!(
        "  rapid      buy={} liq_floor={} tp={}x stop={}x trail={}",
        config.rapid.buy_amount,
        config.rapid.min_liquidity,
        config.rapid.tp_multiple,
        config.rapid.hard_stop_fraction,
        config.rapid.trail_fraction
    );
    println!(
        "  momentum   buy={} liq_floor={} tp={}x stop={}x trail={} collapse={}",
        config.momentum.buy_amount,
        config.momentum.min_liquidity,
        config.momentum.tp_multiple,
        config.momentum.hard_stop_fraction,
        config.momentum.trail_fraction,
        config.momentum.collapse_fraction
    );
    println!(
        "  consensus  buy={} min_signals={} holders>={} tp={}x stop={}x trail={} hold={}s",
        config.consensus.buy_amount,
        config.consensus.min_signals,
        config.consensus.min_holders,
        config.consensus.tp_multiple,
        config.consensus.hard_stop_fraction,
        config.consensus.trail_fraction,
        config.consensus.hold_secs
    );
    println!();
    println!(
        "[evaluator] sweep every {}s",
        config.evaluator.sweep_interval_secs
    );
    println!("[report]    {}", config.report.listen_addr);

    Ok(())
}

/// Fetch and print the status snapshot of a running instance
pub async fn status(config: &Config) -> Result<()> {
    let addr: std::net::SocketAddr = config.report.listen_addr.parse()?;
    let host = if addr.ip().is_unspecified() {
        "127.0.0.1".to_string()
    } else {
        addr.ip().to_string()
    };
    let url = format!("http://{}:{}/status", host, addr.port());

    let snapshot: serde_json::Value = reqwest::Client::new()
        .get(&url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await?
        .json()
        .await?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(unset)".to_string()
    } else if secret.len() <= 8 {
        "********".to_string()
    } else {
        format!("{}...", &secret[..8])
    }
}
