//! Heuristic product-attribute extraction from fetched page HTML.
//!
//! Each field has an ordered list of structural locators tried until one
//! yields a usable value; locators are independent of each other and a miss
//! on one field never aborts extraction of the others. Amazon markup is
//! unversioned and unowned, so everything here is tolerant by construction:
//! a locator that finds nothing returns `None` and the field stays absent.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::{
    config::Config,
    domain::{ConditionLabel, ProductRecord, DESCRIPTION_FALLBACK, TITLE_PLACEHOLDER},
};

/// Titles at or below this many chars are treated as locator noise.
const TITLE_MIN_LEN: usize = 5;
/// Description budget before the ellipsis.
const DESCRIPTION_MAX_LEN: usize = 100;
/// Promotion/coupon snippets longer than this are whole-page matches, not
/// badges.
const SNIPPET_MAX_LEN: usize = 80;

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector literal")
}

static TITLE_MAIN: LazyLock<Selector> = LazyLock::new(|| sel("#productTitle"));
static TITLE_ALT: LazyLock<Selector> = LazyLock::new(|| sel("#title"));
static TITLE_OG: LazyLock<Selector> = LazyLock::new(|| sel(r#"meta[property="og:title"]"#));

static PRICE_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| sel("#corePrice_feature_div, span.a-price"));
static PRICE_WHOLE: LazyLock<Selector> = LazyLock::new(|| sel("span.a-price-whole"));

static RATING_ICON: LazyLock<Selector> = LazyLock::new(|| sel("span.a-icon-alt"));
static RATING_POPOVER: LazyLock<Selector> = LazyLock::new(|| sel("#acrPopover"));
static REVIEW_COUNT: LazyLock<Selector> = LazyLock::new(|| sel("#acrCustomerReviewText"));

static IMAGE_LANDING: LazyLock<Selector> = LazyLock::new(|| sel("#landingImage"));
static IMAGE_WRAPPER: LazyLock<Selector> = LazyLock::new(|| sel("#imgTagWrapperId img"));
static IMAGE_OG: LazyLock<Selector> = LazyLock::new(|| sel(r#"meta[property="og:image"]"#));

static FEATURE_BULLET: LazyLock<Selector> =
    LazyLock::new(|| sel("#feature-bullets li span.a-list-item, #feature-bullets li span"));

static TEXT_BEARING: LazyLock<Selector> = LazyLock::new(|| sel("span, div, p"));

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:\.\d{3})*(?:,\d{1,2})?\s*€|€\s*\d{1,3}(?:\.\d{3})*(?:,\d{1,2})?")
        .expect("valid regex")
});
static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:[.,]\d+)?)").expect("valid regex"));
static COUPON_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)coupon").expect("valid regex"));

/// Parse `html` and extract every field independently.
pub fn extract_product(
    html: &str,
    condition: Option<ConditionLabel>,
    cfg: &Config,
) -> ProductRecord {
    let doc = Html::parse_document(html);

    ProductRecord {
        title: extract_title(&doc),
        price: extract_price(&doc),
        rating: extract_rating(&doc),
        review_count: extract_review_count(&doc),
        image_url: extract_image(&doc),
        description: Some(extract_description(&doc)),
        condition,
        promotion: extract_promotion(&doc, &cfg.promo_keywords),
        coupon: extract_coupon(&doc),
    }
}

/// First-success composition over independent locators.
fn first_match(doc: &Html, locators: &[fn(&Html) -> Option<String>]) -> Option<String> {
    locators.iter().find_map(|locate| locate(doc))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============== Title ==============

pub fn extract_title(doc: &Html) -> String {
    let locators: &[fn(&Html) -> Option<String>] = &[
        |d| d.select(&TITLE_MAIN).next().map(element_text),
        |d| d.select(&TITLE_ALT).next().map(element_text),
        |d| {
            d.select(&TITLE_OG)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|c| c.trim().to_string())
        },
    ];

    locators
        .iter()
        .filter_map(|locate| locate(doc))
        .find(|t| t.trim().chars().count() > TITLE_MIN_LEN)
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string())
}

// ============== Price ==============

pub fn extract_price(doc: &Html) -> Option<String> {
    if let Some(container) = doc.select(&PRICE_CONTAINER).next() {
        let text = element_text(container);
        if let Some(price) = first_price_in(&text) {
            return Some(price);
        }
    }

    // Simpler whole-number fallback when the primary container is absent
    // or carries no currency-shaped text.
    let whole = doc.select(&PRICE_WHOLE).next().map(element_text)?;
    let digits: String = whole.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits} €"))
}

/// First currency-shaped match, with the "same price rendered twice"
/// artifact collapsed. Amazon emits the visible price next to an offscreen
/// copy, so the container text often reads `24,99 €24,99 €`.
fn first_price_in(text: &str) -> Option<String> {
    let mut seen: Option<String> = None;
    for m in PRICE_RE.find_iter(text) {
        let normalized = m.as_str().split_whitespace().collect::<String>();
        match &seen {
            Some(first) if *first == normalized => continue,
            Some(_) => break,
            None => seen = Some(normalized),
        }
    }
    seen.map(|p| collapse_doubled(&p))
}

/// `24,99€24,99€` → `24,99€` when a single match captured both renderings.
fn collapse_doubled(price: &str) -> String {
    let half = price.len() / 2;
    if price.len() % 2 == 0
        && price.is_char_boundary(half)
        && price[..half] == price[half..]
    {
        return price[..half].to_string();
    }
    price.to_string()
}

// ============== Rating / Reviews ==============

pub fn extract_rating(doc: &Html) -> Option<String> {
    let raw = doc
        .select(&RATING_POPOVER)
        .next()
        .and_then(|el| el.value().attr("title").map(|t| t.to_string()))
        .or_else(|| doc.select(&RATING_ICON).next().map(element_text))?;

    LEADING_NUMBER_RE
        .captures(&raw)
        .map(|c| c[1].to_string())
}

pub fn extract_review_count(doc: &Html) -> Option<String> {
    let text = doc.select(&REVIEW_COUNT).next().map(element_text)?;
    // Digit groups concatenated: "1.234 recensioni" → "1234".
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits)
}

// ============== Image ==============

pub fn extract_image(doc: &Html) -> Option<String> {
    let locators: &[fn(&Html) -> Option<String>] = &[
        |d| attr_of(d, &IMAGE_LANDING, "src"),
        |d| attr_of(d, &IMAGE_WRAPPER, "src"),
        |d| attr_of(d, &IMAGE_OG, "content"),
    ];
    first_match(doc, locators)
}

fn attr_of(doc: &Html, selector: &Selector, attr: &str) -> Option<String> {
    doc.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============== Description ==============

pub fn extract_description(doc: &Html) -> String {
    let bullet = doc
        .select(&FEATURE_BULLET)
        .map(element_text)
        .find(|t| !t.is_empty());

    match bullet {
        Some(text) => crate::formatting::truncate_with_ellipsis(&text, DESCRIPTION_MAX_LEN),
        None => DESCRIPTION_FALLBACK.to_string(),
    }
}

// ============== Promotion / Coupon ==============

pub fn extract_promotion(doc: &Html, keywords: &[String]) -> Option<String> {
    for el in doc.select(&TEXT_BEARING) {
        let text = element_text(el);
        if text.is_empty() || text.chars().count() > SNIPPET_MAX_LEN {
            continue;
        }
        let lower = text.to_lowercase();
        if keywords.iter().any(|k| lower.contains(k.as_str())) {
            return Some(text);
        }
    }
    None
}

pub fn extract_coupon(doc: &Html) -> Option<String> {
    // Dedicated badge first: any element whose class list mentions coupons.
    for el in doc.select(&TEXT_BEARING) {
        let Some(class) = el.value().attr("class") else {
            continue;
        };
        if !COUPON_CLASS_RE.is_match(class) {
            continue;
        }
        let text = element_text(el);
        if !text.is_empty() && text.chars().count() <= SNIPPET_MAX_LEN {
            return Some(text);
        }
    }

    // Generic fallback: the literal word, same length ceiling.
    for el in doc.select(&TEXT_BEARING) {
        let text = element_text(el);
        if text.is_empty() || text.chars().count() > SNIPPET_MAX_LEN {
            continue;
        }
        if text.to_lowercase().contains("coupon") {
            return Some(text);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const FULL_PAGE: &str = r##"
      <html><head>
        <meta property="og:image" content="https://img.example/og.jpg">
      </head><body>
        <span id="productTitle">  Echo Dot (5ª generazione) altoparlante intelligente  </span>
        <div id="corePrice_feature_div">
          <span class="a-price"><span class="a-offscreen">64,99 €</span>
            <span aria-hidden="true">64,99 €</span></span>
        </div>
        <span id="acrPopover" title="4,7 su 5 stelle"></span>
        <span id="acrCustomerReviewText">12.345 recensioni</span>
        <img id="landingImage" src="https://img.example/dot.jpg">
        <div id="feature-bullets"><ul>
          <li><span class="a-list-item">Suono migliorato con voci più nitide e bassi profondi per ogni stanza della casa</span></li>
          <li><span class="a-list-item">Secondo punto</span></li>
        </ul></div>
        <span class="dealBadge">Offerta a tempo</span>
        <span class="couponBadgeFeature">Coupon: 10% di sconto applicato al checkout</span>
      </body></html>
    "##;

    fn cfg() -> Config {
        Config::for_tests()
    }

    #[test]
    fn extracts_every_field_from_full_page() {
        let rec = extract_product(FULL_PAGE, None, &cfg());
        assert!(rec.title.starts_with("Echo Dot"));
        assert_eq!(rec.price.as_deref(), Some("64,99€"));
        assert_eq!(rec.rating.as_deref(), Some("4,7"));
        assert_eq!(rec.review_count.as_deref(), Some("12345"));
        assert_eq!(rec.image_url.as_deref(), Some("https://img.example/dot.jpg"));
        let desc = rec.description.unwrap();
        assert!(desc.starts_with("Suono migliorato"));
        assert!(desc.chars().count() <= DESCRIPTION_MAX_LEN);
        assert!(rec.promotion.unwrap().contains("Offerta"));
        assert!(rec.coupon.unwrap().contains("Coupon"));
    }

    #[test]
    fn title_placeholder_on_empty_input() {
        assert_eq!(extract_title(&Html::parse_document("")), TITLE_PLACEHOLDER);
        assert_eq!(
            extract_title(&Html::parse_document("<html><body></body></html>")),
            TITLE_PLACEHOLDER
        );
    }

    #[test]
    fn short_title_falls_through_to_next_locator() {
        let html = r#"
          <span id="productTitle">x</span>
          <span id="title">Cuffie wireless con cancellazione del rumore</span>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_title(&doc),
            "Cuffie wireless con cancellazione del rumore"
        );
    }

    #[test]
    fn price_is_never_doubled() {
        // Visible + offscreen rendering of the same price, no separator.
        let html = r#"<span class="a-price"><span>24,99 €</span><span>24,99 €</span></span>"#;
        let doc = Html::parse_document(html);
        let price = extract_price(&doc).unwrap();
        assert_eq!(price, "24,99€");
        let digits = "24,99";
        assert!(!price.replace(' ', "").contains(&format!("{digits}{digits}")));
    }

    #[test]
    fn distinct_prices_keep_the_first() {
        let html =
            r#"<div id="corePrice_feature_div">19,99 € <span class="strike">29,99 €</span></div>"#;
        let doc = Html::parse_document(html);
        assert_eq!(extract_price(&doc).unwrap(), "19,99€");
    }

    #[test]
    fn price_whole_number_fallback() {
        let html = r#"<span class="a-price-whole">1.299</span>"#;
        let doc = Html::parse_document(html);
        assert_eq!(extract_price(&doc).unwrap(), "1299 €");
    }

    #[test]
    fn rating_prefers_popover_title_then_icon_alt() {
        let doc = Html::parse_document(r#"<span class="a-icon-alt">4,3 su 5 stelle</span>"#);
        assert_eq!(extract_rating(&doc).as_deref(), Some("4,3"));

        let doc = Html::parse_document(
            r#"<span id="acrPopover" title="3,9 su 5 stelle"></span>
               <span class="a-icon-alt">4,3 su 5 stelle</span>"#,
        );
        assert_eq!(extract_rating(&doc).as_deref(), Some("3,9"));
    }

    #[test]
    fn review_count_strips_thousands_separators() {
        let doc =
            Html::parse_document(r#"<span id="acrCustomerReviewText">1.234 recensioni</span>"#);
        assert_eq!(extract_review_count(&doc).as_deref(), Some("1234"));
    }

    #[test]
    fn description_defaults_to_fixed_sentence() {
        let rec = extract_product("<html></html>", None, &cfg());
        assert_eq!(rec.description.as_deref(), Some(DESCRIPTION_FALLBACK));
    }

    #[test]
    fn promotion_rejects_whole_page_matches() {
        let long = format!(
            r#"<div>{} offerta</div>"#,
            "parole di riempimento ".repeat(20)
        );
        let doc = Html::parse_document(&long);
        assert!(extract_promotion(&doc, &cfg().promo_keywords).is_none());
    }

    #[test]
    fn coupon_badge_class_is_case_insensitive() {
        let doc = Html::parse_document(
            r#"<span class="promoCOUPONBadge">Risparmia 5 € con coupon</span>"#,
        );
        assert!(extract_coupon(&doc).is_some());
    }

    #[test]
    fn extraction_misses_leave_fields_absent() {
        let rec = extract_product("<html><body>niente</body></html>", None, &cfg());
        assert_eq!(rec.title, TITLE_PLACEHOLDER);
        assert!(rec.price.is_none());
        assert!(rec.rating.is_none());
        assert!(rec.review_count.is_none());
        assert!(rec.image_url.is_none());
        assert!(rec.promotion.is_none());
        assert!(rec.coupon.is_none());
    }
}
