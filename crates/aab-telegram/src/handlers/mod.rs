//! Telegram update handlers.
//!
//! Each handler is a small adapter: validate auth + rate limits, hand the
//! message text to the core pipeline, send the resulting card back.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use aab_core::security::is_authorized;

use crate::router::AppState;

mod commands;
mod link;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64);

    if !is_authorized(user_id, &state.cfg.telegram_allowed_users) {
        let _ = bot
            .send_message(msg.chat.id, "Non sei autorizzato a usare questo bot.")
            .await;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg, state).await;
        }
        return link::handle_link(bot, msg, state).await;
    }

    // Photos, stickers, voice notes: nothing for this bot to do.
    Ok(())
}
