//! Telegram-HTML helpers (escape, strip, truncation).
//!
//! Captions use only the subset Telegram understands: `<b>`, `<i>`,
//! `<a href="...">`. Everything scraped from a page goes through
//! [`escape_html`] before it is embedded.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Plain-text fallback: drop tags, unescape entities.
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}

/// Truncate to `max_len` visible characters, appending an ellipsis when
/// anything was cut. Char-based, never splits a code point.
pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_len.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// Break a long line into two at the last word boundary before `wrap_at`.
/// Lines that fit are returned unchanged.
pub fn wrap_two_lines(text: &str, wrap_at: usize) -> String {
    if text.chars().count() <= wrap_at {
        return text.to_string();
    }
    let head: String = text.chars().take(wrap_at).collect();
    let Some(space) = head.rfind(' ') else {
        return text.to_string();
    };
    format!("{}\n{}", &text[..space], text[space + 1..].trim_start())
}
