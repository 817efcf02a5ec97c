//! Per-origin robots.txt cache
//!
//! Policies are fetched once per origin, cached in memory for one hour, and
//! refetched when stale. Every failure mode resolves to a permissive
//! decision; robots handling must never take a site down with it.

use crate::robots::parser::RobotsPolicy;
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// How long a fetched policy stays valid
const POLICY_TTL: Duration = Duration::from_secs(60 * 60);

/// Timeout for the robots.txt request itself
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a robots check for one URL
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsDecision {
    /// Whether the URL may be fetched
    pub allowed: bool,

    /// Requested crawl delay in seconds (0 when absent)
    pub crawl_delay: f64,
}

impl RobotsDecision {
    fn permissive() -> Self {
        Self {
            allowed: true,
            crawl_delay: 0.0,
        }
    }
}

struct CachedPolicy {
    policy: RobotsPolicy,
    fetched_at: Instant,
}

impl CachedPolicy {
    fn is_stale(&self) -> bool {
        self.fetched_at.elapsed() > POLICY_TTL
    }
}

/// Process-wide robots.txt policy cache, keyed by origin
pub struct RobotsCache {
    client: Client,
    policies: Mutex<HashMap<String, CachedPolicy>>,
}

impl RobotsCache {
    /// Creates a cache that fetches robots.txt with the given client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a URL is allowed for the given user agent
    ///
    /// Fetches and caches the origin's robots.txt on first contact. Any
    /// upstream failure resolves permissive.
    pub async fn is_allowed(&self, url: &Url, user_agent: &str) -> RobotsDecision {
        let origin = match origin_of(url) {
            Some(o) => o,
            None => return RobotsDecision::permissive(),
        };

        let mut policies = self.policies.lock().await;
        let needs_fetch = match policies.get(&origin) {
            Some(cached) => cached.is_stale(),
            None => true,
        };

        if needs_fetch {
            let policy = self.fetch_policy(&origin).await;
            policies.insert(
                origin.clone(),
                CachedPolicy {
                    policy,
                    fetched_at: Instant::now(),
                },
            );
        }

        let cached = match policies.get(&origin) {
            Some(c) => c,
            None => return RobotsDecision::permissive(),
        };

        RobotsDecision {
            allowed: cached.policy.is_allowed(url.as_str(), user_agent),
            crawl_delay: cached.policy.crawl_delay(user_agent),
        }
    }

    /// Fetches and parses one origin's robots.txt
    async fn fetch_policy(&self, origin: &str) -> RobotsPolicy {
        let robots_url = format!("{}/robots.txt", origin);

        let response = self
            .client
            .get(robots_url.as_str())
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => {
                    tracing::debug!("Fetched robots.txt for {}", origin);
                    RobotsPolicy::from_content(&body)
                }
                Err(e) => {
                    tracing::debug!("Failed reading robots.txt body for {}: {}", origin, e);
                    RobotsPolicy::permissive()
                }
            },
            Ok(resp) => {
                tracing::debug!(
                    "robots.txt for {} returned {}, treating as permissive",
                    origin,
                    resp.status()
                );
                RobotsPolicy::permissive()
            }
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", origin, e);
                RobotsPolicy::permissive()
            }
        }
    }

    /// Number of origins currently cached
    pub async fn cached_origins(&self) -> usize {
        self.policies.lock().await.len()
    }
}

/// Builds the `scheme://host[:port]` origin string for a URL
fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
        None => Some(format!("{}://{}", url.scheme(), host)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_without_port() {
        let url = Url::parse("https://example.se/kontakt?x=1").unwrap();
        assert_eq!(origin_of(&url), Some("https://example.se".to_string()));
    }

    #[test]
    fn test_origin_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(origin_of(&url), Some("http://127.0.0.1:8080".to_string()));
    }

    #[test]
    fn test_stale_after_ttl() {
        let cached = CachedPolicy {
            policy: RobotsPolicy::permissive(),
            fetched_at: Instant::now() - POLICY_TTL - Duration::from_secs(1),
        };
        assert!(cached.is_stale());
    }

    #[test]
    fn test_fresh_within_ttl() {
        let cached = CachedPolicy {
            policy: RobotsPolicy::permissive(),
            fetched_at: Instant::now(),
        };
        assert!(!cached.is_stale());
    }
}
