//! Telegram update handlers.
//!
//! Commands are the whole surface: plain text just gets a pointer to
//! `/start`. Per-command admin gating happens in the command handler, so
//! ordinary users are not filtered out here.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(bot, msg, state).await;
    }

    let _ = bot
        .send_message(msg.chat.id, "ℹ️ Use /start to see the available commands.")
        .await;
    Ok(())
}
