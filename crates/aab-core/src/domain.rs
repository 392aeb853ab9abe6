//! Domain types shared across the pipeline.
//!
//! Everything here is created fresh per incoming link and dropped after the
//! caption is sent; nothing persists across invocations.

/// Amazon product identifier.
///
/// Either a classic 10-character alphanumeric ASIN (from `/dp/` or
/// `/gp/product/` path segments) or the hex code embedded in `/d/` app-share
/// paths.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Asin(String);

impl Asin {
    /// Accepts the classic 10-char alphanumeric form.
    pub fn parse_classic(s: &str) -> Option<Self> {
        let ok = s.len() == 10 && s.bytes().all(|b| b.is_ascii_alphanumeric());
        ok.then(|| Self(s.to_ascii_uppercase()))
    }

    /// Accepts the short-link `/d/` hex form (8-12 hex chars).
    pub fn parse_hex(s: &str) -> Option<Self> {
        let ok = (8..=12).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit());
        ok.then(|| Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Asin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A product link in its three lifecycle forms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlReference {
    /// Exactly as pasted by the user.
    pub original: String,
    /// After short-link resolution (same as `original` for long-form input).
    pub resolved: String,
    /// Rebuilt on the primary domain, whitelisted params only. Falls back to
    /// `resolved` when no product id could be extracted.
    pub canonical: String,
    pub asin: Option<Asin>,
    /// Query params kept by normalization, in their original order.
    pub preserved_params: Vec<(String, String)>,
}

/// Sale-condition classification produced by the signal cascade.
///
/// Closed set: the cascade only ever picks one of these, never invents a
/// label at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionLabel {
    /// `aod=1` third-party offer view.
    UsedThirdPartyOffers,
    /// Warehouse-deals storefront filter.
    UsedWarehouse,
    /// "Amazon Seconda mano" marker on the page or in the merchant block.
    UsedAmazonSecondHand,
    /// Sold and shipped by Amazon itself.
    NewSoldByAmazon,
    /// A marketplace seller id that is not Amazon.
    UsedThirdPartySeller,
}

impl ConditionLabel {
    /// User-facing label (Italian, matching the bot's locale).
    pub fn label(&self) -> &'static str {
        match self {
            Self::UsedThirdPartyOffers => "Usato - offerte di venditori terzi",
            Self::UsedWarehouse => "Usato - Amazon Warehouse",
            Self::UsedAmazonSecondHand => "Usato - Amazon Seconda mano",
            Self::NewSoldByAmazon => "Nuovo - Venduto da Amazon",
            Self::UsedThirdPartySeller => "Venduto da terzi",
        }
    }
}

/// Scraped product attributes. Every field except `title` is optional and
/// stays absent when extraction misses; nothing here ever panics the
/// pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductRecord {
    pub title: String,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub condition: Option<ConditionLabel>,
    pub promotion: Option<String>,
    pub coupon: Option<String>,
}

/// Placeholder title used whenever title extraction fails.
pub const TITLE_PLACEHOLDER: &str = "Prodotto Amazon";

/// Default description used when the feature-bullet list is absent.
pub const DESCRIPTION_FALLBACK: &str = "Scopri questo prodotto su Amazon.";

impl ProductRecord {
    /// Degraded record used when every fetch attempt failed. The pipeline
    /// still produces a caption and a working link from this.
    pub fn unavailable(condition: Option<ConditionLabel>) -> Self {
        Self {
            title: TITLE_PLACEHOLDER.to_string(),
            condition,
            ..Self::default()
        }
    }
}

/// Final pipeline output, ready for the transport layer.
#[derive(Clone, Debug)]
pub struct ProductCard {
    /// Telegram-HTML caption, guaranteed under the configured ceiling.
    pub caption: String,
    pub image_url: Option<String>,
    /// Short link, or the affiliate-tagged long URL when shortening degraded.
    pub final_url: String,
}
