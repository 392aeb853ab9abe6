use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;

use tracing::info;

use aab_core::{config::Config, pipeline::Pipeline, security::RateLimiter};

use crate::handlers;

pub struct AppState {
    pub cfg: Arc<Config>,
    pub pipeline: Pipeline,
    pub rate_limiter: Mutex<RateLimiter>,
}

pub async fn run_polling(cfg: Arc<Config>, pipeline: Pipeline) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        info!("aab started: @{}", me.username());
    }
    info!("Marketplace: {}", cfg.primary_host);
    info!("Affiliate tag: {}", cfg.affiliate_tag);
    if cfg.telegram_allowed_users.is_empty() {
        info!("Allowed users: everyone");
    } else {
        info!("Allowed users: {}", cfg.telegram_allowed_users.len());
    }
    if !cfg.shortener_configured() {
        info!("YOURLS not configured; sharing affiliate-tagged long links");
    }

    let state = Arc::new(AppState {
        rate_limiter: Mutex::new(RateLimiter::new(
            cfg.rate_limit_enabled,
            cfg.rate_limit_requests,
            cfg.rate_limit_window,
        )),
        cfg,
        pipeline,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
