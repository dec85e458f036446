//! Telegram adapter (teloxide).
//!
//! This crate implements the `stb-core` notification port over the Telegram
//! Bot API and hosts the command layer.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use stb_core::{domain::UserId, errors::Error, notify::NotificationDispatcher, Result};

/// Notification delivery over Telegram direct messages.
///
/// A recipient's user id doubles as their private-chat id, so delivery needs
/// nothing beyond the identity the store already holds.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn map_err(recipient: UserId, e: teloxide::RequestError) -> Error {
        Error::DeliveryFailed {
            recipient,
            reason: format!("telegram error: {e}"),
        }
    }

    async fn with_retry<T, Fut>(&self, recipient: UserId, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(recipient, other)),
                },
            }
        }
    }
}

#[async_trait]
impl NotificationDispatcher for TelegramNotifier {
    async fn notify(&self, recipient: UserId, text: &str) -> Result<()> {
        self.with_retry(recipient, || {
            self.bot
                .send_message(teloxide::types::ChatId(recipient.0), text.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }
}
