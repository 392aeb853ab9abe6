use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the bot.
///
/// Built once at startup from the environment and passed by `Arc` into
/// every component; nothing reads ambient state after this point.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    /// Empty = open bot (anyone can use it); non-empty = allowlist.
    pub telegram_allowed_users: Vec<i64>,
    pub affiliate_tag: String,

    // YOURLS shortening service. Both absent = shortening disabled, the
    // pipeline falls back to the affiliate-tagged long URL.
    pub yourls_api_url: Option<String>,
    pub yourls_signature: Option<String>,
    /// Base for rebuilding `<base>/<keyword>` short links on duplicate
    /// submissions. Derived from the API URL when not set explicitly.
    pub yourls_base_url: Option<String>,

    // Marketplace
    pub primary_host: String,
    pub eligible_hosts: Vec<String>,
    pub short_hosts: Vec<String>,
    pub official_seller_ids: Vec<String>,
    pub secondhand_marker: String,
    pub warehouse_token: String,
    pub promo_keywords: Vec<String>,

    // HTTP
    pub user_agents: Vec<String>,
    pub accept_language: String,
    pub resolve_timeout: Duration,
    pub fetch_timeout: Duration,
    pub shorten_timeout: Duration,

    // Caption budget
    pub caption_limit: usize,
    pub title_max_len: usize,
    pub title_wrap_len: usize,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Health endpoint
    pub health_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let affiliate_tag = env_str("AMAZON_AFFILIATE_TAG")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("AMAZON_AFFILIATE_TAG environment variable is required".to_string())
            })?;

        // Optional allowlist: an unset/empty var keeps the bot open.
        let telegram_allowed_users = parse_csv_i64(env_str("TELEGRAM_ALLOWED_USERS"));

        let yourls_api_url = env_str("YOURLS_API_URL").and_then(non_empty);
        let yourls_signature = env_str("YOURLS_SIGNATURE").and_then(non_empty);
        let yourls_base_url = env_str("YOURLS_BASE_URL")
            .and_then(non_empty)
            .or_else(|| yourls_api_url.as_deref().map(derive_base_url));

        let primary_host =
            env_str("AMAZON_HOST").and_then(non_empty).unwrap_or_else(|| "www.amazon.it".to_string());
        let eligible_hosts = parse_csv_lower(env_str("ELIGIBLE_HOSTS").or_else(|| {
            Some("amazon.it,www.amazon.it,amzn.to,amzn.eu".to_string())
        }));
        let short_hosts =
            parse_csv_lower(env_str("SHORT_HOSTS").or_else(|| Some("amzn.to,amzn.eu".to_string())));

        // Seller ids and text markers are deployment knobs, not business
        // rules: Amazon changes them per locale and has done so before.
        let official_seller_ids = parse_csv(
            env_str("OFFICIAL_SELLER_IDS").or_else(|| Some("A11IL2PNWYJU7H".to_string())),
        );
        let secondhand_marker = env_str("SECONDHAND_MARKER")
            .and_then(non_empty)
            .unwrap_or_else(|| "Amazon Seconda mano".to_string());
        let warehouse_token = env_str("WAREHOUSE_TOKEN")
            .and_then(non_empty)
            .unwrap_or_else(|| "warehouse-deals".to_string());
        let promo_keywords = parse_csv_lower(env_str("PROMO_KEYWORDS").or_else(|| {
            Some("offerta,sconto,promozione,risparmia,affare".to_string())
        }));

        let user_agents = parse_csv(env_str("USER_AGENTS")).non_empty_or(default_user_agents());
        let accept_language = env_str("ACCEPT_LANGUAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7".to_string());

        let resolve_timeout = Duration::from_secs(env_u64("RESOLVE_TIMEOUT_SECS").unwrap_or(10));
        let fetch_timeout = Duration::from_secs(env_u64("FETCH_TIMEOUT_SECS").unwrap_or(15));
        let shorten_timeout = Duration::from_secs(env_u64("SHORTEN_TIMEOUT_SECS").unwrap_or(10));

        // Telegram photo captions cap at 1024 chars.
        let caption_limit = env_usize("CAPTION_LIMIT").unwrap_or(1024);
        let title_max_len = env_usize("TITLE_MAX_LEN").unwrap_or(120);
        let title_wrap_len = env_usize("TITLE_WRAP_LEN").unwrap_or(64);

        let rate_limit_enabled = env_bool("RATE_LIMIT_ENABLED").unwrap_or(true);
        let rate_limit_requests = env_u32("RATE_LIMIT_REQUESTS").unwrap_or(20);
        let rate_limit_window = Duration::from_secs(env_u64("RATE_LIMIT_WINDOW").unwrap_or(60));

        let health_port = env_str("HEALTH_PORT")
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(8080);

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            affiliate_tag,
            yourls_api_url,
            yourls_signature,
            yourls_base_url,
            primary_host,
            eligible_hosts,
            short_hosts,
            official_seller_ids,
            secondhand_marker,
            warehouse_token,
            promo_keywords,
            user_agents,
            accept_language,
            resolve_timeout,
            fetch_timeout,
            shorten_timeout,
            caption_limit,
            title_max_len,
            title_wrap_len,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            health_port,
        })
    }

    /// True when both YOURLS knobs are present.
    pub fn shortener_configured(&self) -> bool {
        self.yourls_api_url.is_some() && self.yourls_signature.is_some()
    }
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1".to_string(),
    ]
}

/// YOURLS serves short links from the installation root; the API lives at
/// `<root>/yourls-api.php`.
fn derive_base_url(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) if trimmed[idx..].contains(".php") => trimmed[..idx].to_string(),
        _ => trimmed.to_string(),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
impl Config {
    /// Fixed config for unit tests; never touches the process environment.
    pub(crate) fn for_tests() -> Self {
        Self {
            telegram_bot_token: "test-token".to_string(),
            telegram_allowed_users: vec![],
            affiliate_tag: "mytag-21".to_string(),
            yourls_api_url: None,
            yourls_signature: None,
            yourls_base_url: None,
            primary_host: "www.amazon.it".to_string(),
            eligible_hosts: vec![
                "amazon.it".to_string(),
                "www.amazon.it".to_string(),
                "amzn.to".to_string(),
                "amzn.eu".to_string(),
            ],
            short_hosts: vec!["amzn.to".to_string(), "amzn.eu".to_string()],
            official_seller_ids: vec!["A11IL2PNWYJU7H".to_string()],
            secondhand_marker: "Amazon Seconda mano".to_string(),
            warehouse_token: "warehouse-deals".to_string(),
            promo_keywords: vec![
                "offerta".to_string(),
                "sconto".to_string(),
                "promozione".to_string(),
                "risparmia".to_string(),
                "affare".to_string(),
            ],
            user_agents: vec!["agent-a".to_string(), "agent-b".to_string()],
            accept_language: "it-IT,it;q=0.9".to_string(),
            resolve_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(15),
            shorten_timeout: Duration::from_secs(10),
            caption_limit: 1024,
            title_max_len: 120,
            title_wrap_len: 64,
            rate_limit_enabled: false,
            rate_limit_requests: 20,
            rate_limit_window: Duration::from_secs(60),
            health_port: 8080,
        }
    }
}

trait NonEmptyOr {
    fn non_empty_or(self, fallback: Vec<String>) -> Vec<String>;
}

impl NonEmptyOr for Vec<String> {
    fn non_empty_or(self, fallback: Vec<String>) -> Vec<String> {
        if self.is_empty() {
            fallback
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_base_url_from_api_endpoint() {
        assert_eq!(
            derive_base_url("https://s.example.com/yourls-api.php"),
            "https://s.example.com"
        );
        assert_eq!(
            derive_base_url("https://s.example.com/"),
            "https://s.example.com"
        );
    }

    #[test]
    fn csv_parsing_trims_and_drops_empties() {
        assert_eq!(
            parse_csv_lower(Some("Amzn.To, ,amzn.eu".to_string())),
            vec!["amzn.to".to_string(), "amzn.eu".to_string()]
        );
        assert_eq!(parse_csv_i64(Some("1, x, 3".to_string())), vec![1, 3]);
    }
}
