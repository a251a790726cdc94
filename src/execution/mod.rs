//! Order execution channel
//!
//! Commands are textual and fire-and-forget: `Ok(())` means the transport
//! accepted the message, never that a fill occurred. There is no
//! fill-confirmation channel; callers track positions at the requested price
//! and treat "ordered" and "filled" as distinct states.

pub mod telegram;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

pub use telegram::TelegramGateway;

/// Abstract send-order interface to the external execution bot
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Buy `amount` of base currency worth of the token, optionally at a
    /// limit price instead of market
    async fn send_buy(&self, token: &str, amount: f64, limit_price: Option<f64>) -> Result<()>;

    /// Sell a percentage of the remaining position
    async fn send_sell(&self, token: &str, percent: u8) -> Result<()>;
}

/// Render the buy command in the execution bot's dialect
pub fn format_buy(token: &str, amount: f64, limit_price: Option<f64>) -> String {
    let mut cmd = format!("/buy {} {}", token, amount);
    if let Some(limit) = limit_price {
        cmd.push_str(&format!(" limit {:.7}", limit));
    }
    cmd
}

/// Render the sell command in the execution bot's dialect
pub fn format_sell(token: &str, percent: u8) -> String {
    format!("/sell {} {}%", token, percent)
}

/// Gateway that logs commands instead of sending them
#[derive(Debug, Default)]
pub struct DryRunGateway;

#[async_trait]
impl ExecutionGateway for DryRunGateway {
    async fn send_buy(&self, token: &str, amount: f64, limit_price: Option<f64>) -> Result<()> {
        info!("[dry-run] {}", format_buy(token, amount, limit_price));
        Ok(())
    }

    async fn send_sell(&self, token: &str, percent: u8) -> Result<()> {
        info!("[dry-run] {}", format_sell(token, percent));
        Ok(())
    }
}
