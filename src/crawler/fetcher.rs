//! HTTP fetcher
//!
//! One GET per page with a browser-like header set, a hard timeout, and
//! exponential backoff with jitter on server errors. Client errors are
//! never retried; 403 and 429 are classified as blocks so the site crawler
//! can back off the host entirely.

use crate::config::Settings;
use crate::metrics::Metrics;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Ceiling for the exponential retry delay (before jitter)
const MAX_BACKOFF_MS: u64 = 8_000;

/// Jitter added on top of each retry delay
const BACKOFF_JITTER_MS: u64 = 1_000;

/// Terminal fetch outcomes
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Blocked by server (HTTP {0})")]
    Blocked(u16),

    #[error("Page not found (HTTP 404)")]
    NotFound,

    #[error("Not an HTML page (content-type: {0})")]
    NonHtml(String),

    #[error("HTTP error {0} after retries")]
    Http(u16),

    #[error("Network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Metric label for `crawl_requests_total{status=...}`
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Blocked(_) => "blocked",
            Self::NotFound => "404",
            Self::NonHtml(_) => "non-html",
            Self::Http(_) | Self::Network(_) => "error",
        }
    }

    /// Whether the failure is worth another scheduling attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }
}

/// Builds the shared HTTP client with the crawler's header set
pub fn build_http_client(settings: &Settings) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("sv-SE,sv;q=0.9,en;q=0.8"),
    );
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

    Client::builder()
        .user_agent(&settings.bot_name)
        .timeout(settings.request_timeout)
        .default_headers(headers)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one URL as HTML, retrying server errors
///
/// Retry delay for attempt `n` is `min(1000 * 2^n, 8000)` ms plus up to a
/// second of jitter. Success increments the per-host success counter and
/// observes the duration histogram; failures increment their own status.
pub async fn fetch_html(
    client: &Client,
    url: &Url,
    settings: &Settings,
    metrics: &Metrics,
) -> Result<String, FetchError> {
    let host = url.host_str().unwrap_or("unknown").to_string();
    let started = Instant::now();
    let mut attempt: u32 = 0;

    let result = loop {
        match fetch_once(client, url).await {
            Err(FetchError::Http(status)) if status >= 500 && attempt < settings.max_retries => {
                let delay = retry_delay(attempt);
                tracing::debug!(
                    "HTTP {} from {}, retry {} in {:?}",
                    status,
                    url,
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => break other,
        }
    };

    match &result {
        Ok(_) => {
            metrics.inc_request("success", &host);
            metrics.observe_duration(started.elapsed().as_secs_f64());
        }
        Err(e) => {
            metrics.inc_request(e.status_label(), &host);
        }
    }

    result
}

/// Single fetch attempt with status classification
async fn fetch_once(client: &Client, url: &Url) -> Result<String, FetchError> {
    let response = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Blocked(status.as_u16()));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound);
    }
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("text/html") {
        return Err(FetchError::NonHtml(content_type));
    }

    response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    })
}

/// Backoff with jitter for a retry attempt (0-indexed)
fn retry_delay(attempt: u32) -> Duration {
    let base = (1000u64 << attempt.min(16)).min(MAX_BACKOFF_MS);
    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(base + jitter)
}
