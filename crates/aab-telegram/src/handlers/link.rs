use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};

use tracing::{info, warn};

use aab_core::links::find_product_link;

use crate::router::AppState;

pub async fn handle_link(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };

    let user_id = user.id.0 as i64;
    let username = user.username.as_deref().unwrap_or("unknown");

    // Messages without an eligible product link are ignored silently: the
    // bot sits in group chats and must not answer ordinary conversation.
    let Some(link) = find_product_link(&text, &state.cfg) else {
        info!("no product link in message from {username}");
        return Ok(());
    };

    let (allowed, retry_after) = state.rate_limiter.lock().await.check(user_id);
    if !allowed {
        let secs = retry_after.map(|d| d.as_secs().max(1)).unwrap_or(1);
        bot.send_message(
            msg.chat.id,
            format!("⏳ Troppi link! Riprova tra {secs} secondi."),
        )
        .await?;
        return Ok(());
    }

    info!("processing link from {username}: {link}");

    // Best-effort status message, edited away once the card is ready.
    let status = bot
        .send_message(msg.chat.id, "⏳ Sto elaborando il link...")
        .await
        .ok();

    let card = state.pipeline.process_link(&link).await;

    let photo_url = card
        .image_url
        .as_deref()
        .and_then(|u| url::Url::parse(u).ok());

    let sent = match photo_url {
        Some(img) => bot
            .send_photo(msg.chat.id, InputFile::url(img))
            .caption(card.caption.clone())
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ()),
        None => bot
            .send_message(msg.chat.id, card.caption.clone())
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ()),
    };

    // A photo Telegram refuses to fetch must not cost the user the card.
    if let Err(e) = sent {
        warn!("card send failed ({e}), retrying as plain message");
        bot.send_message(msg.chat.id, card.caption)
            .parse_mode(ParseMode::Html)
            .await?;
    }

    if let Some(status) = status {
        let _ = bot.delete_message(msg.chat.id, status.id).await;
    }

    Ok(())
}
