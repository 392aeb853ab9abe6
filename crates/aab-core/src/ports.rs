//! Ports (traits) implemented by adapter crates.

use async_trait::async_trait;

/// Shortening-service port.
///
/// Contract: always returns a usable URL. Implementations degrade to the
/// input URL on any failure (timeout, connection error, malformed or
/// API-level error response) instead of propagating it.
#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> String;
}

/// No-op shortener used when no shortening service is configured; also the
/// behavior every real implementation degrades to.
pub struct PassthroughShortener;

#[async_trait]
impl LinkShortener for PassthroughShortener {
    async fn shorten(&self, long_url: &str) -> String {
        long_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_returns_input() {
        let s = PassthroughShortener;
        let url = "https://www.amazon.it/dp/B000000000?tag=mytag-21";
        assert_eq!(s.shorten(url).await, url);
    }
}
