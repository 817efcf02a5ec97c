//! Response-level crawl cache
//!
//! Per-URL crawl results are memoized in Redis for seven days, keyed by the
//! URL's SHA-256. The cache is strictly best-effort: every failure is
//! logged and swallowed, and without a configured backend every call is a
//! no-op. Values are content-derived, so concurrent writers may race
//! freely.

use deadpool_redis::redis::cmd;
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::extract::PageResult;

/// How long a cached crawl result stays valid
const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Redis-backed cache for per-URL crawl results
pub struct ResponseCache {
    pool: Option<Pool>,
}

impl ResponseCache {
    /// Creates a cache over the given Redis URL
    ///
    /// Passing `None` (or `enabled = false`) yields a disabled cache where
    /// all operations are no-ops.
    pub fn new(redis_url: Option<&str>, enabled: bool) -> Self {
        if !enabled {
            return Self { pool: None };
        }
        let pool = redis_url.and_then(|url| {
            match RedisConfig::from_url(url).create_pool(Some(Runtime::Tokio1)) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!("Response cache disabled, Redis pool failed: {}", e);
                    None
                }
            }
        });
        Self { pool }
    }

    /// Creates a disabled cache
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Whether a backend is configured
    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Cache key for a URL: `crawl:` + hex(sha256(url))
    pub fn cache_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("crawl:{}", hex::encode(hasher.finalize()))
    }

    /// Looks up the cached result for a URL
    pub async fn get(&self, url: &str) -> Option<PageResult> {
        let pool = self.pool.as_ref()?;
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Cache connection failed: {}", e);
                return None;
            }
        };

        let payload: Option<String> = match cmd("GET")
            .arg(Self::cache_key(url))
            .query_async(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", url, e);
                return None;
            }
        };

        match payload {
            Some(json) => match serde_json::from_str(&json) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!("Cache entry for {} is corrupt: {}", url, e);
                    None
                }
            },
            None => None,
        }
    }

    /// Stores a crawl result for a URL with the standard TTL
    pub async fn set(&self, url: &str, result: &PageResult) {
        let Some(pool) = self.pool.as_ref() else {
            return;
        };
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Cache connection failed: {}", e);
                return;
            }
        };

        let payload = match serde_json::to_string(result) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Cache serialization failed for {}: {}", url, e);
                return;
            }
        };

        if let Err(e) = cmd("SET")
            .arg(Self::cache_key(url))
            .arg(payload)
            .arg("EX")
            .arg(CACHE_TTL.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await
        {
            tracing::warn!("Cache write failed for {}: {}", url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shape() {
        let key = ResponseCache::cache_key("https://example.se/kontakt");
        assert!(key.starts_with("crawl:"));
        // sha256 hex digest
        assert_eq!(key.len(), "crawl:".len() + 64);
    }

    #[test]
    fn test_cache_key_deterministic() {
        let a = ResponseCache::cache_key("https://example.se/");
        let b = ResponseCache::cache_key("https://example.se/");
        let c = ResponseCache::cache_key("https://example.se/kontakt");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let cache = ResponseCache::disabled();
        assert!(!cache.is_enabled());
        assert!(cache.get("https://example.se/").await.is_none());
        cache.set("https://example.se/", &PageResult::default()).await;
    }

    #[tokio::test]
    async fn test_new_without_url_is_disabled() {
        let cache = ResponseCache::new(None, true);
        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn test_new_disabled_flag_wins() {
        let cache = ResponseCache::new(Some("redis://127.0.0.1/"), false);
        assert!(!cache.is_enabled());
    }
}
