//! memepilot - multi-strategy memecoin signal orchestrator
//!
//! # WARNING
//! - This bot trades with real money. Only use funds you can afford to lose.
//! - Most freshly minted tokens go to zero (rug pulls, abandonment).
//! - Order acknowledgement is not fill confirmation; the execution bot is
//!   asynchronous and fills are inferred, never guaranteed.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

// Use the library crate
use memepilot::cli::commands;
use memepilot::config::Config;

/// Multi-strategy memecoin signal orchestrator
#[derive(Parser)]
#[command(name = "memepilot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator
    Start {
        /// Log orders instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Query the status endpoint of a running instance
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("memepilot=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Start { dry_run } => {
            if let Err(e) = startup_checks(&config, dry_run) {
                error!("Startup checks failed: {}", e);
                std::process::exit(1);
            }
            commands::start(&config, dry_run).await
        }
        Commands::Config => commands::show_config(&config),
        Commands::Status => commands::status(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Refuse to start without a usable execution channel
fn startup_checks(config: &Config, dry_run: bool) -> Result<()> {
    info!("Performing startup checks...");

    if dry_run {
        warn!("Dry-run: execution credentials not required");
    } else {
        config.validate_execution()?;
    }

    if config.balance.wallet_address.is_empty() {
        warn!("No wallet address configured - balance reporting disabled");
    }

    if config.feeds.moralis.api_key.is_empty() && config.feeds.bitquery.api_key.is_empty() {
        warn!("No trending-feed credentials - momentum lane will see no signals");
    }

    info!("Startup checks passed");
    Ok(())
}
