//! YOURLS adapter (affiliate-link shortening).
//!
//! Implements the core `LinkShortener` port against a self-hosted YOURLS
//! instance. Any failure (timeout, connection error, malformed body,
//! API-level error) degrades to the input URL; the caller always gets a
//! usable link.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use aab_core::{config::Config, errors::Error, ports::LinkShortener, Result};

#[derive(Clone, Debug)]
pub struct YourlsClient {
    api_url: String,
    signature: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl YourlsClient {
    pub fn new(
        api_url: impl Into<String>,
        signature: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client build");
        Self {
            api_url: api_url.into(),
            signature: signature.into(),
            base_url,
            http,
        }
    }

    /// `None` when the YOURLS endpoint/signature are not configured.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        let api_url = cfg.yourls_api_url.clone()?;
        let signature = cfg.yourls_signature.clone()?;
        Some(Self::new(
            api_url,
            signature,
            cfg.yourls_base_url.clone(),
            cfg.shorten_timeout,
        ))
    }

    async fn try_shorten(&self, long_url: &str) -> Result<String> {
        let resp = self
            .http
            .post(&self.api_url)
            .form(&[
                ("signature", self.signature.as_str()),
                ("action", "shorturl"),
                ("format", "json"),
                ("url", long_url),
            ])
            .send()
            .await
            .map_err(|e| Error::External(format!("yourls request error: {e}")))?;

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("yourls json error: {e}")))?;

        interpret_response(&v, self.base_url.as_deref())
            .ok_or_else(|| Error::External(format!("yourls unexpected response: {v}")))
    }
}

/// Pick the short link out of a YOURLS response.
///
/// Success responses carry `shorturl` directly. Submitting a URL that was
/// shortened before yields `status:"fail"` with an "already exists" message
/// and the existing keyword, from which the short link is rebuilt
/// deterministically. Anything else is a failure.
fn interpret_response(v: &serde_json::Value, base_url: Option<&str>) -> Option<String> {
    let status = v.get("status").and_then(|s| s.as_str()).unwrap_or("");

    if status == "success" {
        return v
            .get("shorturl")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string());
    }

    if status == "fail" {
        let message = v.get("message").and_then(|m| m.as_str()).unwrap_or("");
        if message.contains("already exists") {
            let keyword = v
                .get("url")
                .and_then(|u| u.get("keyword"))
                .and_then(|k| k.as_str())?;
            let base = base_url?.trim_end_matches('/');
            return Some(format!("{base}/{keyword}"));
        }
    }

    None
}

#[async_trait]
impl LinkShortener for YourlsClient {
    async fn shorten(&self, long_url: &str) -> String {
        match self.try_shorten(long_url).await {
            Ok(short) => {
                debug!("shortened {long_url} -> {short}");
                short
            }
            Err(e) => {
                warn!("shortening degraded to original url: {e}");
                long_url.to_string()
            }
        }
    }
}
