//! Spindel: a polite, compliance-aware contact-enrichment crawler
//!
//! Given a batch of company websites, Spindel visits a small, bounded set of
//! pages per site, extracts email addresses, phone numbers and social-profile
//! links, normalizes and scores them, and emits structured contact records.
//! Every page fetch passes through a chain of independent gates: SSRF
//! filtering, robots.txt, dual-level rate limiting, response caching, and
//! captcha detection.

pub mod cache;
pub mod config;
pub mod contacts;
pub mod crawler;
pub mod extract;
pub mod filters;
pub mod job;
pub mod limiter;
pub mod metrics;
pub mod robots;
pub mod safety;

use thiserror::Error;

/// Main error type for Spindel operations
#[derive(Debug, Error)]
pub enum SpindelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DNS resolver error: {0}")]
    Resolver(#[from] trust_dns_resolver::error::ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid job input: {0}")]
    InvalidJob(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {variable}: {message}")]
    Parse { variable: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Spindel operations
pub type Result<T> = std::result::Result<T, SpindelError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Settings;
pub use contacts::{ContactRecord, EmailType};
pub use crawler::CrawlContext;
pub use job::{JobInput, JobResult};
