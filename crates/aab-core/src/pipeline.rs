//! The product-resolution pipeline.
//!
//! Classifier → (short-link resolver) → normalizer → fetch + extract +
//! condition inference → affiliate tag → shortener → caption composer.
//! Each stage fails independently into a defined degraded output, so the
//! pipeline as a whole never errors: worst case is a minimal caption with a
//! working affiliate link.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    caption,
    condition::infer_condition,
    config::Config,
    domain::{ProductCard, ProductRecord, UrlReference},
    extract::extract_product,
    fetch::PageFetcher,
    links,
    ports::LinkShortener,
    resolve::ShortLinkResolver,
};

pub struct Pipeline {
    cfg: Arc<Config>,
    resolver: ShortLinkResolver,
    fetcher: PageFetcher,
    shortener: Arc<dyn LinkShortener>,
}

impl Pipeline {
    pub fn new(
        cfg: Arc<Config>,
        http: reqwest::Client,
        shortener: Arc<dyn LinkShortener>,
    ) -> Self {
        Self {
            resolver: ShortLinkResolver::new(http.clone(), &cfg),
            fetcher: PageFetcher::new(http, &cfg),
            cfg,
            shortener,
        }
    }

    /// Process one already-classified product link into a shareable card.
    ///
    /// `original` must be an eligible link (see [`links::find_product_link`]);
    /// everything downstream degrades rather than failing.
    pub async fn process_link(&self, original: &str) -> ProductCard {
        let resolved = if links::is_short_link(original, &self.cfg) {
            self.resolver.resolve(original).await
        } else {
            original.to_string()
        };

        let url_ref = self.reference(original, resolved);
        debug!(
            canonical = %url_ref.canonical,
            asin = url_ref.asin.as_ref().map(|a| a.as_str()),
            "normalized product link"
        );

        let page = self.fetcher.fetch_page(&url_ref.canonical).await;

        let tagged = links::with_affiliate_tag(&url_ref.canonical, &self.cfg.affiliate_tag);
        let final_url = self.shortener.shorten(&tagged).await;

        let card = build_card(&self.cfg, &url_ref, page.as_deref(), &final_url);
        info!(
            asin = url_ref.asin.as_ref().map(|a| a.as_str()),
            fetched = page.is_some(),
            "product card ready"
        );
        card
    }

    fn reference(&self, original: &str, resolved: String) -> UrlReference {
        let normalized = links::normalize(&resolved, &self.cfg);
        UrlReference {
            original: original.to_string(),
            resolved,
            canonical: normalized.canonical,
            asin: normalized.asin,
            preserved_params: normalized.preserved_params,
        }
    }
}

/// Pure tail of the pipeline: page HTML (or its absence) to a finished card.
fn build_card(
    cfg: &Config,
    url_ref: &UrlReference,
    page: Option<&str>,
    final_url: &str,
) -> ProductCard {
    let condition = infer_condition(&url_ref.canonical, page, cfg);

    let record = match page {
        Some(html) => extract_product(html, condition, cfg),
        None => ProductRecord::unavailable(condition),
    };

    let caption = caption::compose(&record, final_url, cfg);

    ProductCard {
        caption,
        image_url: record.image_url,
        final_url: final_url.to_string(),
    }
}
