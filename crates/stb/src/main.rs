use std::sync::Arc;

use stb_core::{
    config::Config,
    store::{open_stores, Database},
};

#[tokio::main]
async fn main() -> Result<(), stb_core::Error> {
    stb_core::logging::init("stb")?;

    let cfg = Arc::new(Config::load()?);
    let db = Database::open(&cfg.db_path)?;
    let (tickets, messages, bans) = open_stores(db);

    stb_telegram::router::run_polling(cfg, tickets, messages, bans)
        .await
        .map_err(|e| stb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
