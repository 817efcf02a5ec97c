//! Crawling core
//!
//! The fetcher, the captcha detector, the per-site state machine, and the
//! shared `CrawlContext` holding every process-wide service a crawl needs.

pub mod captcha;
mod fetcher;
mod site;

pub use fetcher::{build_http_client, fetch_html, FetchError};
pub use site::{candidate_urls, EmailRecord, SiteCrawler, SiteError, SiteResult, CANDIDATE_PATHS};

use reqwest::Client;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

use crate::cache::ResponseCache;
use crate::config::Settings;
use crate::filters::{DncList, TosRegistry};
use crate::limiter::LimiterRegistry;
use crate::metrics::Metrics;
use crate::robots::RobotsCache;
use crate::safety::SafetyGate;
use crate::SpindelError;

/// Process-wide crawl services, shared across all site tasks
///
/// Everything in here is safe to share behind an `Arc`: the limiter
/// registry and robots cache serialize internally, the caches are
/// best-effort, and the site results themselves are never shared.
pub struct CrawlContext {
    pub settings: Settings,
    pub client: Client,
    pub safety: SafetyGate,
    pub robots: RobotsCache,
    pub limiter: LimiterRegistry,
    pub cache: ResponseCache,
    pub dnc: DncList,
    pub tos: TosRegistry,
    pub metrics: Metrics,

    /// Resolver for MX validation; present only when ENABLE_MX_CHECK is on
    pub resolver: Option<TokioAsyncResolver>,
}

impl CrawlContext {
    /// Builds the standard production context from settings
    pub fn new(settings: Settings) -> Result<Self, SpindelError> {
        Self::with_safety(settings, SafetyGate::new())
    }

    /// Builds a context with a custom safety gate
    pub fn with_safety(settings: Settings, safety: SafetyGate) -> Result<Self, SpindelError> {
        let client = build_http_client(&settings)?;
        let robots = RobotsCache::new(client.clone());
        let limiter = LimiterRegistry::new(
            settings.global_concurrency,
            settings.per_host_min_time,
            settings.per_host_max_concurrent,
        );
        let cache = ResponseCache::new(settings.redis_url.as_deref(), settings.enable_cache);

        let resolver = if settings.enable_mx_check {
            match TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!("MX checks disabled, resolver unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            settings,
            client,
            safety,
            robots,
            limiter,
            cache,
            dnc: DncList::new(),
            tos: TosRegistry::new(),
            metrics: Metrics::new(),
            resolver,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(settings: Settings) -> Self {
        Self::with_safety(settings, SafetyGate::without_resolver()).expect("test context")
    }
}
