//! Product-page retrieval with identity rotation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{config::Config, identity::IdentityRotation};

/// Fetches raw page HTML, rotating client identities until one gets a 2xx.
#[derive(Clone)]
pub struct PageFetcher {
    http: reqwest::Client,
    rotation: IdentityRotation,
    accept_language: String,
}

impl PageFetcher {
    pub fn new(http: reqwest::Client, cfg: &Arc<Config>) -> Self {
        Self {
            http,
            rotation: IdentityRotation::new(cfg.user_agents.clone(), cfg.fetch_timeout),
            accept_language: cfg.accept_language.clone(),
        }
    }

    /// First 2xx body wins. A non-2xx response or transport error is a soft
    /// failure for that identity; exhausting the rotation returns `None`
    /// and the pipeline continues with an empty product record.
    pub async fn fetch_page(&self, url: &str) -> Option<String> {
        let body = self
            .rotation
            .first_success(|ua| {
                let http = self.http.clone();
                let url = url.to_string();
                let lang = self.accept_language.clone();
                let timeout = self.rotation.per_attempt_timeout();
                async move {
                    let resp = match http
                        .get(&url)
                        .header(reqwest::header::USER_AGENT, ua)
                        .header(reqwest::header::ACCEPT_LANGUAGE, lang)
                        .timeout(timeout)
                        .send()
                        .await
                    {
                        Ok(resp) => resp,
                        Err(e) => {
                            debug!("page fetch transport error: {e}");
                            return None;
                        }
                    };

                    if !resp.status().is_success() {
                        debug!("page fetch got status {}", resp.status());
                        return None;
                    }

                    resp.text().await.ok()
                }
            })
            .await;

        if body.is_none() {
            warn!("all identities failed fetching {url}; proceeding without page data");
        }
        body
    }
}
