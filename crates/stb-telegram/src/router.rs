use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use stb_core::{
    auth::AuthorizationPolicy,
    config::Config,
    notify::NotificationDispatcher,
    store::{BanRegistry, MessageLog, TicketStore},
};

use crate::handlers;
use crate::TelegramNotifier;

/// Shared handles passed to every command invocation.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub tickets: TicketStore,
    pub messages: MessageLog,
    pub bans: BanRegistry,
    pub auth: Arc<AuthorizationPolicy>,
    pub notifier: Arc<dyn NotificationDispatcher>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    tickets: TicketStore,
    messages: MessageLog,
    bans: BanRegistry,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!(bot = me.username(), "support bot started");
    }
    tracing::info!(admins = cfg.admin_ids.len(), "admin set loaded");

    let auth = Arc::new(AuthorizationPolicy::new(cfg.admin_ids.clone()));
    let notifier: Arc<dyn NotificationDispatcher> = Arc::new(TelegramNotifier::new(bot.clone()));

    let state = Arc::new(AppState {
        cfg,
        tickets,
        messages,
        bans,
        auth,
        notifier,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
