//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub balance: BalanceConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub rapid: RapidConfig,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
}

/// Execution channel (Telegram chat with the execution bot)
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token; required unless running with --dry-run
    #[serde(default)]
    pub bot_token: String,
    /// Numeric chat id of the execution bot conversation
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: 0,
            order_timeout_ms: default_order_timeout_ms(),
        }
    }
}

/// Market-data oracle (DexScreener-compatible)
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_oracle_base_url(),
            timeout_ms: default_oracle_timeout_ms(),
        }
    }
}

/// Rug/risk screening service
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_risk_base_url")]
    pub base_url: String,
    #[serde(default = "default_risk_timeout_ms")]
    pub timeout_ms: u64,
    /// Reject when the largest single holder owns more than this percentage
    #[serde(default = "default_max_holder_pct")]
    pub max_holder_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_url: default_risk_base_url(),
            timeout_ms: default_risk_timeout_ms(),
            max_holder_pct: default_max_holder_pct(),
        }
    }
}

/// Wallet balance oracle (JSON-RPC getBalance)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BalanceConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub wallet_address: String,
}

/// Deterministic token scorer
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_score_low")]
    pub low: f64,
    #[serde(default = "default_score_high")]
    pub high: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            low: default_score_low(),
            high: default_score_high(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeedsConfig {
    #[serde(default)]
    pub pumpportal: PumpPortalFeedConfig,
    #[serde(default)]
    pub moralis: MoralisFeedConfig,
    #[serde(default)]
    pub bitquery: BitqueryFeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PumpPortalFeedConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pumpportal_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Maximum reconnect backoff; delay doubles up to this cap
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
}

impl Default for PumpPortalFeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ws_url: default_pumpportal_ws_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoralisFeedConfig {
    /// Feed is disabled when the key is empty
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_moralis_url")]
    pub url: String,
    #[serde(default = "default_moralis_poll_secs")]
    pub poll_secs: u64,
}

impl Default for MoralisFeedConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: default_moralis_url(),
            poll_secs: default_moralis_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitqueryFeedConfig {
    /// Feed is disabled when the token is empty
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_bitquery_url")]
    pub url: String,
    #[serde(default = "default_bitquery_poll_secs")]
    pub poll_secs: u64,
}

impl Default for BitqueryFeedConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: default_bitquery_url(),
            poll_secs: default_bitquery_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

/// Rapid sniper strategy (pump.fun new-token lane)
#[derive(Debug, Clone, Deserialize)]
pub struct RapidConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rapid_buy_amount")]
    pub buy_amount: f64,
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
    /// Liquidity samples taken before entry
    #[serde(default = "default_rapid_samples")]
    pub samples: u32,
    /// Samples that must show a rise above the previous one
    #[serde(default = "default_rapid_min_rises")]
    pub min_rises: u32,
    #[serde(default = "default_rapid_sample_delay_secs")]
    pub sample_delay_secs: u64,
    #[serde(default = "default_tp_multiple")]
    pub tp_multiple: f64,
    #[serde(default = "default_hard_stop_fraction")]
    pub hard_stop_fraction: f64,
    #[serde(default = "default_rapid_trail")]
    pub trail_fraction: f64,
    /// Entry price used when the oracle has no quote yet
    #[serde(default = "default_fallback_price")]
    pub fallback_price: f64,
}

impl Default for RapidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buy_amount: default_rapid_buy_amount(),
            min_liquidity: default_min_liquidity(),
            samples: default_rapid_samples(),
            min_rises: default_rapid_min_rises(),
            sample_delay_secs: default_rapid_sample_delay_secs(),
            tp_multiple: default_tp_multiple(),
            hard_stop_fraction: default_hard_stop_fraction(),
            trail_fraction: default_rapid_trail(),
            fallback_price: default_fallback_price(),
        }
    }
}

/// Momentum scalper strategy (trending lanes)
#[derive(Debug, Clone, Deserialize)]
pub struct MomentumConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_momentum_buy_amount")]
    pub buy_amount: f64,
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
    #[serde(default = "default_max_pool_age_secs")]
    pub max_pool_age_secs: u64,
    /// Limit order discount below the oracle price
    #[serde(default = "default_limit_discount")]
    pub limit_discount: f64,
    #[serde(default = "default_tp_multiple")]
    pub tp_multiple: f64,
    #[serde(default = "default_hard_stop_fraction")]
    pub hard_stop_fraction: f64,
    #[serde(default = "default_momentum_trail")]
    pub trail_fraction: f64,
    /// Exit when liquidity drops below this fraction of the entry snapshot
    #[serde(default = "default_collapse_fraction")]
    pub collapse_fraction: f64,
    /// Price used when the oracle has no quote yet
    #[serde(default = "default_fallback_price")]
    pub fallback_price: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buy_amount: default_momentum_buy_amount(),
            min_liquidity: default_min_liquidity(),
            max_pool_age_secs: default_max_pool_age_secs(),
            limit_discount: default_limit_discount(),
            tp_multiple: default_tp_multiple(),
            hard_stop_fraction: default_hard_stop_fraction(),
            trail_fraction: default_momentum_trail(),
            collapse_fraction: default_collapse_fraction(),
            fallback_price: default_fallback_price(),
        }
    }
}

/// Community-consensus swing strategy
#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_consensus_buy_amount")]
    pub buy_amount: f64,
    /// Distinct sources required before a token is promoted
    #[serde(default = "default_min_signals")]
    pub min_signals: usize,
    #[serde(default = "default_min_holders")]
    pub min_holders: u64,
    /// Max holder concentration as a fraction of supply
    #[serde(default = "default_max_concentration")]
    pub max_concentration: f64,
    #[serde(default = "default_tp_multiple")]
    pub tp_multiple: f64,
    #[serde(default = "default_consensus_hard_stop_fraction")]
    pub hard_stop_fraction: f64,
    #[serde(default = "default_consensus_trail")]
    pub trail_fraction: f64,
    #[serde(default = "default_hold_secs")]
    pub hold_secs: u64,
    /// How long a stop-lossed dev stays in the recently-rugged set
    #[serde(default = "default_rugdev_window_secs")]
    pub rugdev_window_secs: u64,
    /// Price used when the oracle has no quote yet
    #[serde(default = "default_fallback_price")]
    pub fallback_price: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buy_amount: default_consensus_buy_amount(),
            min_signals: default_min_signals(),
            min_holders: default_min_holders(),
            max_concentration: default_max_concentration(),
            tp_multiple: default_tp_multiple(),
            hard_stop_fraction: default_consensus_hard_stop_fraction(),
            trail_fraction: default_consensus_trail(),
            hold_secs: default_hold_secs(),
            rugdev_window_secs: default_rugdev_window_secs(),
            fallback_price: default_fallback_price(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_order_timeout_ms() -> u64 {
    6_000
}

fn default_oracle_base_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_oracle_timeout_ms() -> u64 {
    6_000
}

fn default_risk_base_url() -> String {
    "https://rugcheck.xyz".to_string()
}

fn default_risk_timeout_ms() -> u64 {
    6_000
}

fn default_max_holder_pct() -> f64 {
    25.0
}

fn default_score_low() -> f64 {
    70.0
}

fn default_score_high() -> f64 {
    97.0
}

fn default_pumpportal_ws_url() -> String {
    "wss://pumpportal.fun/api/data".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    2_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    60_000
}

fn default_moralis_url() -> String {
    "https://solana-gateway.moralis.io/account/mainnet/trending".to_string()
}

fn default_moralis_poll_secs() -> u64 {
    120
}

fn default_bitquery_url() -> String {
    "https://streaming.bitquery.io/graphql".to_string()
}

fn default_bitquery_poll_secs() -> u64 {
    180
}

fn default_channel_capacity() -> usize {
    512
}

fn default_sweep_interval_secs() -> u64 {
    18
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_snapshot_interval_ms() -> u64 {
    2_000
}

fn default_event_log_capacity() -> usize {
    200
}

fn default_rapid_buy_amount() -> f64 {
    0.07
}

fn default_min_liquidity() -> f64 {
    8.0
}

fn default_rapid_samples() -> u32 {
    3
}

fn default_rapid_min_rises() -> u32 {
    2
}

fn default_rapid_sample_delay_secs() -> u64 {
    2
}

fn default_tp_multiple() -> f64 {
    2.0
}

fn default_hard_stop_fraction() -> f64 {
    0.7
}

fn default_rapid_trail() -> f64 {
    0.3
}

fn default_fallback_price() -> f64 {
    0.01
}

fn default_momentum_buy_amount() -> f64 {
    0.10
}

fn default_max_pool_age_secs() -> u64 {
    20 * 60
}

fn default_limit_discount() -> f64 {
    0.03
}

fn default_momentum_trail() -> f64 {
    0.2
}

fn default_collapse_fraction() -> f64 {
    0.6
}

fn default_consensus_buy_amount() -> f64 {
    0.04
}

fn default_min_signals() -> usize {
    2
}

fn default_min_holders() -> u64 {
    250
}

fn default_max_concentration() -> f64 {
    0.10
}

fn default_consensus_hard_stop_fraction() -> f64 {
    0.6
}

fn default_consensus_trail() -> f64 {
    0.4
}

fn default_hold_secs() -> u64 {
    2 * 24 * 60 * 60
}

fn default_rugdev_window_secs() -> u64 {
    6 * 60 * 60
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix MEMEPILOT__)
            .add_source(
                config::Environment::with_prefix("MEMEPILOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.rapid.buy_amount <= 0.0
            || self.momentum.buy_amount <= 0.0
            || self.consensus.buy_amount <= 0.0
        {
            anyhow::bail!("buy amounts must be positive");
        }

        for (name, tp) in [
            ("rapid", self.rapid.tp_multiple),
            ("momentum", self.momentum.tp_multiple),
            ("consensus", self.consensus.tp_multiple),
        ] {
            if tp <= 1.0 {
                anyhow::bail!("{name}.tp_multiple must be above 1.0");
            }
        }

        for (name, frac) in [
            ("rapid.hard_stop_fraction", self.rapid.hard_stop_fraction),
            ("momentum.hard_stop_fraction", self.momentum.hard_stop_fraction),
            (
                "consensus.hard_stop_fraction",
                self.consensus.hard_stop_fraction,
            ),
            ("rapid.trail_fraction", self.rapid.trail_fraction),
            ("momentum.trail_fraction", self.momentum.trail_fraction),
            ("consensus.trail_fraction", self.consensus.trail_fraction),
            ("momentum.collapse_fraction", self.momentum.collapse_fraction),
        ] {
            if !(0.0..1.0).contains(&frac) {
                anyhow::bail!("{name} must be within [0, 1)");
            }
        }

        if self.momentum.limit_discount <= 0.0 || self.momentum.limit_discount >= 1.0 {
            anyhow::bail!("momentum.limit_discount must be within (0, 1)");
        }

        if self.consensus.min_signals == 0 {
            anyhow::bail!("consensus.min_signals must be at least 1");
        }

        if self.scoring.low >= self.scoring.high {
            anyhow::bail!("scoring.low must be below scoring.high");
        }

        if self.evaluator.sweep_interval_secs == 0 {
            anyhow::bail!("evaluator.sweep_interval_secs must be positive");
        }

        if self.router.channel_capacity == 0 {
            anyhow::bail!("router.channel_capacity must be positive");
        }

        self.report
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .context("report.listen_addr is not a valid socket address")?;

        Ok(())
    }

    /// Check that the execution channel is usable for live trading
    pub fn validate_execution(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!(
                "telegram.bot_token is required for live trading \
                 (set MEMEPILOT__TELEGRAM__BOT_TOKEN or use --dry-run)"
            );
        }
        if self.telegram.chat_id == 0 {
            anyhow::bail!(
                "telegram.chat_id is required for live trading \
                 (set MEMEPILOT__TELEGRAM__CHAT_ID or use --dry-run)"
            );
        }
        Ok(())
    }
}
