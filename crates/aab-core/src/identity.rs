//! Client-identity rotation with first-success semantics.
//!
//! Amazon serves different markup (or nothing at all) depending on the
//! requesting client, so both the short-link resolver and the page fetcher
//! walk a fixed, ordered list of User-Agent identities. Attempts are
//! sequential (never a parallel fan-out against the same target) and the
//! loop short-circuits on the first identity that works.

use std::{future::Future, time::Duration};

use tracing::debug;

/// Ordered identity list plus the per-attempt timeout.
#[derive(Clone, Debug)]
pub struct IdentityRotation {
    user_agents: Vec<String>,
    per_attempt_timeout: Duration,
}

impl IdentityRotation {
    pub fn new(user_agents: Vec<String>, per_attempt_timeout: Duration) -> Self {
        Self {
            user_agents,
            per_attempt_timeout,
        }
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }

    /// Run `attempt` once per identity, in order, returning the first
    /// `Some` result. Each attempt is bounded by the per-attempt timeout;
    /// a timed-out or failed attempt moves on to the next identity.
    pub async fn first_success<T, F, Fut>(&self, mut attempt: F) -> Option<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for (idx, ua) in self.user_agents.iter().enumerate() {
            match tokio::time::timeout(self.per_attempt_timeout, attempt(ua.clone())).await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => debug!("identity {idx} failed, trying next"),
                Err(_) => debug!("identity {idx} timed out after {:?}", self.per_attempt_timeout),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn rotation(n: usize) -> IdentityRotation {
        let uas = (0..n).map(|i| format!("agent-{i}")).collect();
        IdentityRotation::new(uas, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn short_circuits_on_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let out = rotation(3)
            .first_success(move |ua| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some(ua)
                }
            })
            .await;

        assert_eq!(out.as_deref(), Some("agent-0"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_through_to_later_identity() {
        let out = rotation(3)
            .first_success(|ua| async move { (ua == "agent-2").then_some(ua) })
            .await;
        assert_eq!(out.as_deref(), Some("agent-2"));
    }

    #[tokio::test]
    async fn returns_none_when_all_identities_fail() {
        let out = rotation(3)
            .first_success(|_ua| async move { None::<String> })
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn timed_out_attempt_moves_to_next_identity() {
        let out = rotation(2)
            .first_success(|ua| async move {
                if ua == "agent-0" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Some(ua)
            })
            .await;
        assert_eq!(out.as_deref(), Some("agent-1"));
    }
}
