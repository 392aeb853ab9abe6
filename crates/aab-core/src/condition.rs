//! Sale-condition inference.
//!
//! A prioritized signal cascade over the canonical URL's query parameters
//! and the fetched page text. Rules are evaluated top-down and the first
//! match short-circuits; adding a marketplace signal means inserting a rule,
//! not rewriting control flow. This is a best-effort heuristic with no
//! ground truth: deterministic given fixed input, and tested only against
//! synthetic fixtures.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::{config::Config, domain::ConditionLabel};

static MERCHANT_INFO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#merchant-info").expect("valid selector literal"));

/// Signals gathered once per inference, shared by every rule.
struct Signals<'a> {
    query: Vec<(String, String)>,
    page_has_marker: bool,
    merchant_has_marker: bool,
    cfg: &'a Config,
}

impl Signals<'_> {
    fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Rule = fn(&Signals<'_>) -> Option<ConditionLabel>;

/// Fixed precedence. The order has been tuned against misclassified
/// listings before; do not reorder without new reference fixtures.
const RULES: &[Rule] = &[
    aod_offer_view,
    warehouse_storefront,
    page_secondhand_marker,
    merchant_secondhand_marker,
    seller_id,
];

/// Classify the sale condition for `canonical_url` + `page_html`.
///
/// Returns `None` only for unparseable URLs; otherwise the seller-id rule
/// acts as a catch-all default.
pub fn infer_condition(
    canonical_url: &str,
    page_html: Option<&str>,
    cfg: &Config,
) -> Option<ConditionLabel> {
    let url = Url::parse(canonical_url).ok()?;
    let query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let (page_has_marker, merchant_has_marker) = page_html
        .map(|html| page_markers(html, &cfg.secondhand_marker))
        .unwrap_or((false, false));

    let signals = Signals {
        query,
        page_has_marker,
        merchant_has_marker,
        cfg,
    };

    RULES.iter().find_map(|rule| rule(&signals))
}

fn page_markers(html: &str, marker: &str) -> (bool, bool) {
    let doc = Html::parse_document(html);
    let page_text: String = doc.root_element().text().collect();
    let page = page_text.contains(marker);

    let merchant = doc
        .select(&MERCHANT_INFO)
        .next()
        .map(|el| el.text().collect::<String>().contains(marker))
        .unwrap_or(false);

    (page, merchant)
}

// ============== Rules, in precedence order ==============

fn aod_offer_view(s: &Signals<'_>) -> Option<ConditionLabel> {
    (s.query_param("aod") == Some("1")).then_some(ConditionLabel::UsedThirdPartyOffers)
}

fn warehouse_storefront(s: &Signals<'_>) -> Option<ConditionLabel> {
    s.query_param("s")
        .is_some_and(|v| v.contains(&s.cfg.warehouse_token))
        .then_some(ConditionLabel::UsedWarehouse)
}

fn page_secondhand_marker(s: &Signals<'_>) -> Option<ConditionLabel> {
    s.page_has_marker
        .then_some(ConditionLabel::UsedAmazonSecondHand)
}

fn merchant_secondhand_marker(s: &Signals<'_>) -> Option<ConditionLabel> {
    s.merchant_has_marker
        .then_some(ConditionLabel::UsedAmazonSecondHand)
}

/// Catch-all: an official seller id (or none at all) means Amazon retail;
/// any other id is a marketplace seller.
fn seller_id(s: &Signals<'_>) -> Option<ConditionLabel> {
    match s.query_param("smid") {
        Some(id) if s.cfg.official_seller_ids.iter().any(|o| o == id) => {
            Some(ConditionLabel::NewSoldByAmazon)
        }
        Some(_) => Some(ConditionLabel::UsedThirdPartySeller),
        None => Some(ConditionLabel::NewSoldByAmazon),
    }
}
