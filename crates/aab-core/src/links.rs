//! URL classification and normalization (pure, no I/O).
//!
//! An incoming message is scanned for the first eligible product link; the
//! link is then rebuilt into the canonical `https://<host>/dp/<ASIN>` form,
//! keeping only the query parameters that change what the page shows.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::{config::Config, domain::Asin};

/// Query parameters that survive normalization. Everything else (tracking
/// params, any pre-existing affiliate tag) is dropped.
pub const PRESERVED_PARAMS: [&str; 6] = ["smid", "condition", "psc", "aod", "m", "s"];

static URL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

/// Punctuation that commonly trails a pasted link.
const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''];

/// Result of normalizing a resolved URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub canonical: String,
    pub asin: Option<Asin>,
    pub preserved_params: Vec<(String, String)>,
}

/// First URL-shaped token in `text` whose host is in the eligible set.
///
/// Messages without an eligible link return `None`; the caller stays
/// silent in that case.
pub fn find_product_link(text: &str, cfg: &Config) -> Option<String> {
    for m in URL_TOKEN.find_iter(text) {
        let candidate = m.as_str().trim_end_matches(TRAILING_PUNCT);
        if is_eligible(candidate, cfg) {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Host membership check. Malformed URLs fail closed.
pub fn is_eligible(url: &str, cfg: &Config) -> bool {
    host_of(url)
        .map(|h| cfg.eligible_hosts.iter().any(|e| hosts_match(&h, e)))
        .unwrap_or(false)
}

/// True for redirector hosts (`amzn.to`, `amzn.eu`, ...).
pub fn is_short_link(url: &str, cfg: &Config) -> bool {
    host_of(url)
        .map(|h| cfg.short_hosts.iter().any(|e| hosts_match(&h, e)))
        .unwrap_or(false)
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_lowercase())
}

fn hosts_match(host: &str, entry: &str) -> bool {
    strip_www(host) == strip_www(entry)
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Product id extraction: `/dp/{asin}`, `/gp/product/{asin}`, then
/// `/d/{hex}`; the first pattern that matches wins.
pub fn extract_asin(url: &str) -> Option<Asin> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

    for (i, seg) in segments.iter().enumerate() {
        let next = segments.get(i + 1);
        match *seg {
            "dp" => {
                if let Some(asin) = next.and_then(|s| Asin::parse_classic(s)) {
                    return Some(asin);
                }
            }
            "gp" if next == Some(&"product") => {
                if let Some(asin) = segments.get(i + 2).and_then(|s| Asin::parse_classic(s)) {
                    return Some(asin);
                }
            }
            _ => {}
        }
    }

    // App-share short form: https://www.amazon.it/d/3fa0b71d
    for (i, seg) in segments.iter().enumerate() {
        if *seg == "d" {
            if let Some(asin) = segments.get(i + 1).and_then(|s| Asin::parse_hex(s)) {
                return Some(asin);
            }
        }
    }

    None
}

/// Rebuild `url` as `https://<primary-host>/dp/<ASIN>[?whitelisted]`.
///
/// Idempotent: normalizing an already-canonical URL yields the same
/// string. With no extractable product id the input passes through
/// unchanged (degraded, still shareable).
pub fn normalize(url: &str, cfg: &Config) -> NormalizedUrl {
    let Some(asin) = extract_asin(url) else {
        return NormalizedUrl {
            canonical: url.to_string(),
            asin: None,
            preserved_params: Vec::new(),
        };
    };

    let preserved_params = preserved_params_of(url);

    let mut canonical = format!("https://{}/dp/{}", cfg.primary_host, asin);
    if !preserved_params.is_empty() {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &preserved_params {
            ser.append_pair(k, v);
        }
        canonical.push('?');
        canonical.push_str(&ser.finish());
    }

    NormalizedUrl {
        canonical,
        asin: Some(asin),
        preserved_params,
    }
}

fn preserved_params_of(url: &str) -> Vec<(String, String)> {
    let Ok(parsed) = Url::parse(url) else {
        return Vec::new();
    };
    parsed
        .query_pairs()
        .filter(|(k, _)| PRESERVED_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Set the affiliate `tag` parameter, replacing any prior value.
/// Applying the same tag twice is a no-op.
pub fn with_affiliate_tag(url: &str, tag: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let others: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "tag")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut qp = parsed.query_pairs_mut();
        qp.clear();
        for (k, v) in &others {
            qp.append_pair(k, v);
        }
        qp.append_pair("tag", tag);
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config::for_tests()
    }

    #[test]
    fn finds_first_eligible_link_in_text() {
        let cfg = test_config();
        let text = "guarda https://example.com/x e https://www.amazon.it/dp/B000000000!";
        assert_eq!(
            find_product_link(text, &cfg).as_deref(),
            Some("https://www.amazon.it/dp/B000000000")
        );
    }

    #[test]
    fn ignores_text_without_eligible_links() {
        let cfg = test_config();
        assert!(find_product_link("nessun link qui", &cfg).is_none());
        assert!(find_product_link("https://ebay.it/itm/1", &cfg).is_none());
    }

    #[test]
    fn malformed_urls_fail_closed() {
        let cfg = test_config();
        assert!(!is_eligible("https://", &cfg));
        assert!(!is_eligible("not a url", &cfg));
    }

    #[test]
    fn short_host_detection() {
        let cfg = test_config();
        assert!(is_short_link("https://amzn.to/3xYzAbC", &cfg));
        assert!(!is_short_link("https://www.amazon.it/dp/B000000000", &cfg));
    }

    #[test]
    fn extracts_asin_from_all_accepted_shapes() {
        let dp = extract_asin("https://www.amazon.it/some-title/dp/B000000000/ref=cm_sw").unwrap();
        assert_eq!(dp.as_str(), "B000000000");

        let gp = extract_asin("https://www.amazon.it/gp/product/B0C1234XYZ?th=1").unwrap();
        assert_eq!(gp.as_str(), "B0C1234XYZ");

        let hex = extract_asin("https://www.amazon.it/d/3fa0b71d").unwrap();
        assert_eq!(hex.as_str(), "3fa0b71d");
    }

    #[test]
    fn normalization_keeps_only_whitelisted_params() {
        let cfg = test_config();
        let n = normalize(
            "https://www.amazon.it/some-title/dp/B000000000/?smid=OFFICIAL1&tag=old-21&ref_=x&psc=1",
            &cfg,
        );
        assert_eq!(
            n.canonical,
            "https://www.amazon.it/dp/B000000000?smid=OFFICIAL1&psc=1"
        );
        assert_eq!(
            n.preserved_params,
            vec![
                ("smid".to_string(), "OFFICIAL1".to_string()),
                ("psc".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let cfg = test_config();
        for u in [
            "https://amazon.it/x/dp/B000000000?aod=1&utm_source=feed",
            "https://www.amazon.it/gp/product/B0C1234XYZ?s=merchant-items&m=AXYZ",
            "https://www.amazon.it/d/3fa0b71d?condition=used",
        ] {
            let once = normalize(u, &cfg);
            let twice = normalize(&once.canonical, &cfg);
            assert_eq!(once.canonical, twice.canonical);
            assert_eq!(once.preserved_params, twice.preserved_params);
        }
    }

    #[test]
    fn normalization_passes_through_without_product_id() {
        let cfg = test_config();
        let n = normalize("https://www.amazon.it/gp/help/customer", &cfg);
        assert_eq!(n.canonical, "https://www.amazon.it/gp/help/customer");
        assert!(n.asin.is_none());
    }

    #[test]
    fn affiliate_tag_replaces_prior_value_idempotently() {
        let once = with_affiliate_tag(
            "https://www.amazon.it/dp/B000000000?smid=X&tag=other-21",
            "mytag-21",
        );
        assert_eq!(
            once,
            "https://www.amazon.it/dp/B000000000?smid=X&tag=mytag-21"
        );
        assert_eq!(with_affiliate_tag(&once, "mytag-21"), once);
    }
}
