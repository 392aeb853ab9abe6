//! Short-link resolution (`amzn.to` / `amzn.eu` → long-form URL).

use std::sync::Arc;

use tracing::warn;

use crate::{config::Config, identity::IdentityRotation};

/// Follows a redirector link to its long-form destination.
#[derive(Clone)]
pub struct ShortLinkResolver {
    http: reqwest::Client,
    rotation: IdentityRotation,
}

impl ShortLinkResolver {
    pub fn new(http: reqwest::Client, cfg: &Arc<Config>) -> Self {
        Self {
            http,
            rotation: IdentityRotation::new(cfg.user_agents.clone(), cfg.resolve_timeout),
        }
    }

    /// GET with redirect-following, one identity at a time; the first
    /// attempt that completes without a transport error wins and its final
    /// location is returned. Every identity failing degrades to the input
    /// URL unchanged.
    pub async fn resolve(&self, url: &str) -> String {
        let resolved = self
            .rotation
            .first_success(|ua| {
                let http = self.http.clone();
                let url = url.to_string();
                let timeout = self.rotation.per_attempt_timeout();
                async move {
                    match http
                        .get(&url)
                        .header(reqwest::header::USER_AGENT, ua)
                        .timeout(timeout)
                        .send()
                        .await
                    {
                        Ok(resp) => Some(resp.url().to_string()),
                        Err(_) => None,
                    }
                }
            })
            .await;

        match resolved {
            Some(u) => u,
            None => {
                warn!("short-link resolution failed for {url}, keeping original");
                url.to_string()
            }
        }
    }
}
