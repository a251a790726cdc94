//! Telegram transport for the execution channel

use async_trait::async_trait;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::info;

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::execution::{format_buy, format_sell, ExecutionGateway};

/// Sends `/buy` and `/sell` commands to the execution bot's chat
pub struct TelegramGateway {
    bot: Bot,
    chat_id: ChatId,
    send_timeout: Duration,
}

impl TelegramGateway {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(config.bot_token.clone()),
            chat_id: ChatId(config.chat_id),
            send_timeout: Duration::from_millis(config.order_timeout_ms),
        }
    }

    async fn send_command(&self, cmd: String) -> Result<()> {
        info!("Sending to execution bot: {}", cmd);

        let send = self.bot.send_message(self.chat_id, cmd);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::OrderTransport(e.to_string())),
            Err(_) => Err(Error::OrderTimeout(self.send_timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl ExecutionGateway for TelegramGateway {
    async fn send_buy(&self, token: &str, amount: f64, limit_price: Option<f64>) -> Result<()> {
        self.send_command(format_buy(token, amount, limit_price)).await
    }

    async fn send_sell(&self, token: &str, percent: u8) -> Result<()> {
        self.send_command(format_sell(token, percent)).await
    }
}
