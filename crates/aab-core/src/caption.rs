//! Caption composition under the Telegram photo-caption budget.
//!
//! The caption is an ordered list of optional lines. When the rendered
//! whole would blow the channel ceiling, optional lines are dropped in a
//! fixed priority (promotion and coupon first, then the description, then
//! the rating) before the title is truncated further; a minimal caption of
//! title + link is always constructible as a last resort.

use crate::{
    config::Config,
    domain::ProductRecord,
    formatting::{escape_html, truncate_with_ellipsis, wrap_two_lines},
};

/// How many optional-line groups can be dropped, in order.
const DROP_STAGES: u8 = 3;

/// Render `record` + `final_url` into Telegram HTML, never exceeding
/// `cfg.caption_limit` characters.
pub fn compose(record: &ProductRecord, final_url: &str, cfg: &Config) -> String {
    for stage in 0..=DROP_STAGES {
        let caption = render(record, final_url, cfg.title_max_len, stage, cfg);
        if fits(&caption, cfg) {
            return caption;
        }
    }

    // Everything optional is gone; squeeze the title.
    let caption = render(record, final_url, cfg.title_wrap_len, DROP_STAGES, cfg);
    if fits(&caption, cfg) {
        return caption;
    }

    minimal_caption(&record.title, final_url, cfg)
}

fn fits(caption: &str, cfg: &Config) -> bool {
    caption.chars().count() <= cfg.caption_limit
}

fn render(
    record: &ProductRecord,
    final_url: &str,
    title_len: usize,
    drop_stage: u8,
    cfg: &Config,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(title_line(&record.title, title_len, cfg.title_wrap_len));

    if let Some(price) = &record.price {
        lines.push(format!("💰 <b>{}</b>", escape_html(price)));
    }

    if drop_stage < 3 {
        if let Some(line) = rating_line(record) {
            lines.push(line);
        }
    }

    if let Some(condition) = &record.condition {
        lines.push(format!("📦 {}", condition.label()));
    }

    if drop_stage < 1 {
        if let Some(promo) = &record.promotion {
            lines.push(format!("🔥 {}", escape_html(promo)));
        }
        if let Some(coupon) = &record.coupon {
            lines.push(format!("🎟 {}", escape_html(coupon)));
        }
    }

    if drop_stage < 2 {
        if let Some(desc) = &record.description {
            lines.push(format!("<i>{}</i>", escape_html(desc)));
        }
    }

    lines.push(link_line(final_url));
    lines.join("\n")
}

fn title_line(title: &str, max_len: usize, wrap_at: usize) -> String {
    let truncated = truncate_with_ellipsis(title, max_len);
    let wrapped = wrap_two_lines(&truncated, wrap_at);
    // Bold each wrapped line separately; Telegram dislikes tags spanning
    // newlines in some clients.
    wrapped
        .lines()
        .map(|l| format!("<b>{}</b>", escape_html(l)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `4,7` → `⭐⭐⭐⭐⭐ 4,7/5 (12345)`; unparseable ratings fall back to the
/// plain `x/5` form.
fn rating_line(record: &ProductRecord) -> Option<String> {
    let rating = record.rating.as_deref()?;

    let line = match rating.replace(',', ".").parse::<f32>() {
        Ok(value) => {
            let stars = (value.round() as usize).clamp(1, 5);
            format!("{} {}/5", "⭐".repeat(stars), escape_html(rating))
        }
        Err(_) => format!("{}/5", escape_html(rating)),
    };

    match &record.review_count {
        Some(count) => Some(format!("{line} ({} recensioni)", escape_html(count))),
        None => Some(line),
    }
}

fn link_line(final_url: &str) -> String {
    format!(r#"🔗 <a href="{}">Vedi su Amazon</a>"#, escape_html(final_url))
}

/// Last-resort caption: title + link, title squeezed to whatever the
/// ceiling leaves over. Escaping can expand the title (`&` becomes
/// `&amp;`), so the budget shrinks until the rendered whole fits.
fn minimal_caption(title: &str, final_url: &str, cfg: &Config) -> String {
    let overhead = format!("<b></b>\n{}", link_line(final_url)).chars().count();
    let mut budget = cfg.caption_limit.saturating_sub(overhead).max(1);

    loop {
        let caption = format!(
            "<b>{}</b>\n{}",
            escape_html(&truncate_with_ellipsis(title, budget)),
            link_line(final_url)
        );
        if fits(&caption, cfg) || budget == 1 {
            return caption;
        }
        budget = (budget / 2).max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConditionLabel;

    fn full_record() -> ProductRecord {
        ProductRecord {
            title: "Echo Dot (5ª generazione) | Altoparlante intelligente con Alexa".to_string(),
            price: Some("64,99€".to_string()),
            rating: Some("4,7".to_string()),
            review_count: Some("12345".to_string()),
            image_url: Some("https://img.example/dot.jpg".to_string()),
            description: Some("Suono migliorato con voci più nitide e bassi profondi".to_string()),
            condition: Some(ConditionLabel::NewSoldByAmazon),
            promotion: Some("Offerta a tempo".to_string()),
            coupon: Some("Coupon 10%".to_string()),
        }
    }

    const URL: &str = "https://www.amazon.it/dp/B000000000?tag=mytag-21";

    #[test]
    fn full_record_renders_every_line() {
        let cfg = Config::for_tests();
        let caption = compose(&full_record(), URL, &cfg);
        assert!(caption.contains("<b>Echo Dot"));
        assert!(caption.contains("💰 <b>64,99€</b>"));
        assert!(caption.contains("⭐⭐⭐⭐⭐ 4,7/5 (12345 recensioni)"));
        assert!(caption.contains("Nuovo - Venduto da Amazon"));
        assert!(caption.contains("🔥 Offerta a tempo"));
        assert!(caption.contains("🎟 Coupon 10%"));
        assert!(caption.contains(r#"<a href="https://www.amazon.it/dp/B000000000?tag=mytag-21">"#));
    }

    #[test]
    fn caption_fits_for_every_field_combination() {
        let cfg = Config::for_tests();
        let base = full_record();
        // Toggle each optional field on/off.
        for mask in 0..32u8 {
            let mut r = base.clone();
            if mask & 1 == 0 {
                r.price = None;
            }
            if mask & 2 == 0 {
                r.rating = None;
                r.review_count = None;
            }
            if mask & 4 == 0 {
                r.promotion = None;
            }
            if mask & 8 == 0 {
                r.coupon = None;
            }
            if mask & 16 == 0 {
                r.description = None;
            }
            let caption = compose(&r, URL, &cfg);
            assert!(
                caption.chars().count() <= cfg.caption_limit,
                "overflow for mask {mask}"
            );
        }
    }

    #[test]
    fn overflow_drops_promo_and_coupon_before_rating() {
        let mut cfg = Config::for_tests();
        let mut record = full_record();
        record.description = None;

        // Ceiling chosen so the full render overflows but the promo-less
        // one fits.
        let full = render(&record, URL, cfg.title_max_len, 0, &cfg);
        let without_promo = render(&record, URL, cfg.title_max_len, 1, &cfg);
        cfg.caption_limit = without_promo.chars().count();
        assert!(full.chars().count() > cfg.caption_limit);

        let caption = compose(&record, URL, &cfg);
        assert!(!caption.contains("🔥"));
        assert!(!caption.contains("🎟"));
        assert!(caption.contains("⭐"));
    }

    #[test]
    fn overflow_drops_rating_last() {
        let mut cfg = Config::for_tests();
        let record = full_record();

        let rating_only = render(&record, URL, cfg.title_max_len, 2, &cfg);
        cfg.caption_limit = rating_only.chars().count();

        let caption = compose(&record, URL, &cfg);
        assert!(caption.contains("⭐"));
        assert!(!caption.contains("🔥"));
        assert!(!caption.contains("<i>"));
    }

    #[test]
    fn minimal_caption_survives_tiny_ceiling() {
        let mut cfg = Config::for_tests();
        cfg.caption_limit = 120;
        let caption = compose(&full_record(), URL, &cfg);
        assert!(caption.chars().count() <= 120);
        assert!(caption.contains("<a href="));
        // Only title + link survive.
        assert!(!caption.contains("💰"));
    }

    #[test]
    fn long_title_wraps_at_word_boundary() {
        let cfg = Config::for_tests();
        let mut record = full_record();
        record.title =
            "Robot aspirapolvere con stazione di svuotamento automatico e mappatura laser della casa"
                .to_string();
        let caption = compose(&record, URL, &cfg);
        let title_lines: Vec<&str> = caption
            .lines()
            .take_while(|l| l.starts_with("<b>"))
            .collect();
        assert_eq!(title_lines.len(), 2);
    }

    #[test]
    fn unparseable_rating_uses_textual_fallback() {
        let cfg = Config::for_tests();
        let mut record = full_record();
        record.rating = Some("n.d.".to_string());
        record.review_count = None;
        let caption = compose(&record, URL, &cfg);
        assert!(caption.contains("n.d./5"));
        assert!(!caption.contains("⭐"));
    }
}
