use std::time::Duration;

/// Process-wide crawler settings, loaded from the environment
///
/// Every field has a default so the crawler can start with no environment
/// at all; see `config::env` for the variable names.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Redis connection URL for the response cache (None disables caching)
    pub redis_url: Option<String>,

    /// User-agent string sent with every request and matched against robots.txt
    pub bot_name: String,

    /// Per-request timeout for page fetches
    pub request_timeout: Duration,

    /// Maximum retries for 5xx responses
    pub max_retries: u32,

    /// Politeness sleep between consecutive page fetches within one site
    pub between_requests: Duration,

    /// Maximum concurrent fetches across all hosts
    pub global_concurrency: usize,

    /// Minimum spacing between admissions to the same host
    pub per_host_min_time: Duration,

    /// Maximum concurrent fetches to a single host
    pub per_host_max_concurrent: usize,

    /// Number of jobs a worker processes in parallel
    pub worker_concurrency: usize,

    /// Whether the response cache is consulted at all
    pub enable_cache: bool,

    /// Whether email domains get an MX lookup during classification
    pub enable_mx_check: bool,

    /// Default log level when RUST_LOG is not set
    pub log_level: String,

    /// Path of the append-only audit log
    pub audit_log_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: None,
            bot_name: "CSV-Webcrawler/2.0".to_string(),
            request_timeout: Duration::from_millis(12_000),
            max_retries: 3,
            between_requests: Duration::from_millis(150),
            global_concurrency: 8,
            per_host_min_time: Duration::from_millis(1000),
            per_host_max_concurrent: 1,
            worker_concurrency: 2,
            enable_cache: true,
            enable_mx_check: false,
            log_level: "info".to_string(),
            audit_log_path: "./audit.log".to_string(),
        }
    }
}
