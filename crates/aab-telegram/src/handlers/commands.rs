use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use tracing::debug;

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let (cmd, _args) = parse_command(msg.text().unwrap_or(""));

    match cmd.as_str() {
        "start" => {
            let text = format!(
                "👋 Ciao! Incollami un link di un prodotto <b>{}</b> (vanno bene anche \
                 i link corti <code>amzn.to</code> / <code>amzn.eu</code>) e ti rispondo \
                 con la scheda del prodotto pronta da condividere.",
                state.cfg.primary_host
            );
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        "help" => {
            let text = "ℹ️ <b>Come funziona</b>\n\
                 • Invia un messaggio contenente un link Amazon\n\
                 • Il bot risolve il link, legge titolo/prezzo/recensioni e \
                 crea una scheda con link affiliato accorciato\n\
                 • I messaggi senza link Amazon vengono ignorati";
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        other => {
            debug!("ignoring unknown command: /{other}");
        }
    }

    Ok(())
}
