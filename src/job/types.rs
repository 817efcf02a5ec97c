//! Job contract types
//!
//! The shapes exchanged with the queue broker: job input, per-site specs,
//! progress snapshots, and the result envelope. The broker itself lives
//! outside this crate; the binary reads a job from a JSON file and writes
//! the envelope back out.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::contacts::ContactRecord;
use crate::crawler::SiteError;
use crate::SpindelError;

/// Bounds for per-job page and concurrency settings
pub const MAX_PAGES_RANGE: (u32, u32) = (1, 10);
pub const CONCURRENCY_RANGE: (u32, u32) = (1, 8);

/// Maximum length of the sanitized tags string
const TAGS_MAX_LEN: usize = 100;

/// One site to enrich
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpec {
    pub root_url: String,
    pub host: String,
    pub company_name: String,
}

impl SiteSpec {
    /// Builds a normalized spec from a raw website URL
    ///
    /// The host is lowercased and loses a leading `www.` label; the root
    /// URL is rebuilt as bare `scheme://host`.
    pub fn from_url(raw_url: &str, company_name: &str) -> Result<Self, SpindelError> {
        let url = Url::parse(raw_url.trim())?;
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(SpindelError::InvalidJob(format!(
                "unsupported scheme '{}' in {}",
                scheme, raw_url
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| SpindelError::InvalidJob(format!("no host in {}", raw_url)))?;

        let host = normalize_host(host);
        Ok(Self {
            root_url: format!("{}://{}", scheme, host),
            host,
            company_name: company_name.trim().to_string(),
        })
    }

    /// Re-applies host normalization to a spec received over the wire
    pub fn normalize(&mut self) {
        self.host = normalize_host(&self.host);
    }
}

/// Lowercases a host and strips one leading `www.` label
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Per-job crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobConfig {
    pub max_pages: u32,
    pub concurrency: u32,
    pub tags: String,
    pub user: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            concurrency: 4,
            tags: String::new(),
            user: String::new(),
        }
    }
}

impl JobConfig {
    /// Clamps out-of-range values and sanitizes the tags string
    ///
    /// Each adjustment is reported so it can be recorded on the job as a
    /// validation error rather than failing the whole job.
    pub fn clamped(&self) -> (JobConfig, Vec<String>) {
        let mut warnings = Vec::new();

        let max_pages = self.max_pages.clamp(MAX_PAGES_RANGE.0, MAX_PAGES_RANGE.1);
        if max_pages != self.max_pages {
            warnings.push(format!(
                "maxPages {} out of range, clamped to {}",
                self.max_pages, max_pages
            ));
        }

        let concurrency = self
            .concurrency
            .clamp(CONCURRENCY_RANGE.0, CONCURRENCY_RANGE.1);
        if concurrency != self.concurrency {
            warnings.push(format!(
                "concurrency {} out of range, clamped to {}",
                self.concurrency, concurrency
            ));
        }

        let tags = sanitize_tags(&self.tags);
        if tags != self.tags {
            warnings.push("tags were sanitized".to_string());
        }

        (
            JobConfig {
                max_pages,
                concurrency,
                tags,
                user: self.user.trim().to_string(),
            },
            warnings,
        )
    }
}

/// Keeps tag-safe characters and truncates to the length limit
fn sanitize_tags(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ',' | ' '))
        .take(TAGS_MAX_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// A unit of work consumed from the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub job_id: Uuid,
    pub sites: Vec<SiteSpec>,
    #[serde(default)]
    pub config: JobConfig,
}

/// Progress snapshot, reported at least once per site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub percentage: u8,
    pub current: Option<String>,
    pub processed: usize,
    pub total: usize,
    pub found: usize,
}

/// Per-host error bundle in the result envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostErrors {
    pub host: String,
    pub errors: Vec<SiteError>,
}

/// Aggregate statistics for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total_sites: usize,
    pub total_records: usize,
    pub total_errors: usize,
    pub avg_records_per_site: f64,
}

/// The result envelope: always produced, even for a job full of failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub records: Vec<ContactRecord>,
    pub errors: Vec<HostErrors>,
    pub stats: JobStats,
}
