//! Crawl metrics registry
//!
//! Process-wide counters, gauges and one duration histogram, kept in plain
//! mutex-guarded maps and rendered in Prometheus text exposition format for
//! an external scraper. Increments are monotonic; ordering across hosts is
//! unspecified.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Request outcome labels for `crawl_requests_total`
pub const REQUEST_STATUSES: [&str; 8] = [
    "success",
    "error",
    "timeout",
    "blocked",
    "404",
    "non-html",
    "robots-blocked",
    "captcha",
];

/// Histogram bucket upper bounds in seconds
const DURATION_BUCKETS: [f64; 8] = [0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0];

#[derive(Default)]
struct Histogram {
    bucket_counts: [u64; DURATION_BUCKETS.len()],
    sum: f64,
    count: u64,
}

/// Process-wide metrics registry
#[derive(Default)]
pub struct Metrics {
    requests: Mutex<BTreeMap<(String, String), u64>>,
    robots_blocked: Mutex<BTreeMap<String, u64>>,
    contacts_found: Mutex<BTreeMap<&'static str, u64>>,
    active_jobs: AtomicI64,
    duration: Mutex<Histogram>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments `crawl_requests_total{status,host}`
    pub fn inc_request(&self, status: &str, host: &str) {
        let mut requests = self.requests.lock().unwrap();
        *requests
            .entry((status.to_string(), host.to_string()))
            .or_insert(0) += 1;
    }

    /// Increments `robots_blocked_total{host}`
    pub fn inc_robots_blocked(&self, host: &str) {
        let mut blocked = self.robots_blocked.lock().unwrap();
        *blocked.entry(host.to_string()).or_insert(0) += 1;
    }

    /// Adds to `contacts_found_total{type}`; kind is email, phone or social
    pub fn add_contacts_found(&self, kind: &'static str, count: u64) {
        if count == 0 {
            return;
        }
        let mut contacts = self.contacts_found.lock().unwrap();
        *contacts.entry(kind).or_insert(0) += count;
    }

    /// Observes one fetch duration in `crawl_duration_seconds`
    pub fn observe_duration(&self, seconds: f64) {
        let mut histogram = self.duration.lock().unwrap();
        for (i, bound) in DURATION_BUCKETS.iter().enumerate() {
            if seconds <= *bound {
                histogram.bucket_counts[i] += 1;
            }
        }
        histogram.sum += seconds;
        histogram.count += 1;
    }

    /// Adjusts the `crawl_active_jobs` gauge
    pub fn job_started(&self) {
        self.active_jobs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn job_finished(&self) {
        self.active_jobs.fetch_sub(1, Ordering::SeqCst);
    }

    /// Reads one request counter (test and diagnostics hook)
    pub fn request_count(&self, status: &str, host: &str) -> u64 {
        self.requests
            .lock()
            .unwrap()
            .get(&(status.to_string(), host.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Reads one robots-blocked counter
    pub fn robots_blocked_count(&self, host: &str) -> u64 {
        self.robots_blocked
            .lock()
            .unwrap()
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    /// Reads one contacts-found counter
    pub fn contacts_found_count(&self, kind: &str) -> u64 {
        self.contacts_found
            .lock()
            .unwrap()
            .get(kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn active_jobs(&self) -> i64 {
        self.active_jobs.load(Ordering::SeqCst)
    }

    /// Renders the registry in Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# TYPE crawl_requests_total counter\n");
        for ((status, host), value) in self.requests.lock().unwrap().iter() {
            out.push_str(&format!(
                "crawl_requests_total{{status=\"{}\",host=\"{}\"}} {}\n",
                status, host, value
            ));
        }

        out.push_str("# TYPE robots_blocked_total counter\n");
        for (host, value) in self.robots_blocked.lock().unwrap().iter() {
            out.push_str(&format!(
                "robots_blocked_total{{host=\"{}\"}} {}\n",
                host, value
            ));
        }

        out.push_str("# TYPE contacts_found_total counter\n");
        for (kind, value) in self.contacts_found.lock().unwrap().iter() {
            out.push_str(&format!(
                "contacts_found_total{{type=\"{}\"}} {}\n",
                kind, value
            ));
        }

        out.push_str("# TYPE crawl_active_jobs gauge\n");
        out.push_str(&format!("crawl_active_jobs {}\n", self.active_jobs()));

        let histogram = self.duration.lock().unwrap();
        out.push_str("# TYPE crawl_duration_seconds histogram\n");
        for (i, bound) in DURATION_BUCKETS.iter().enumerate() {
            out.push_str(&format!(
                "crawl_duration_seconds_bucket{{le=\"{}\"}} {}\n",
                bound, histogram.bucket_counts[i]
            ));
        }
        out.push_str(&format!(
            "crawl_duration_seconds_bucket{{le=\"+Inf\"}} {}\n",
            histogram.count
        ));
        out.push_str(&format!("crawl_duration_seconds_sum {}\n", histogram.sum));
        out.push_str(&format!("crawl_duration_seconds_count {}\n", histogram.count));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counter_increments() {
        let metrics = Metrics::new();
        metrics.inc_request("success", "acme.se");
        metrics.inc_request("success", "acme.se");
        metrics.inc_request("timeout", "acme.se");

        assert_eq!(metrics.request_count("success", "acme.se"), 2);
        assert_eq!(metrics.request_count("timeout", "acme.se"), 1);
        assert_eq!(metrics.request_count("success", "other.se"), 0);
    }

    #[test]
    fn test_robots_blocked_counter() {
        let metrics = Metrics::new();
        metrics.inc_robots_blocked("blocked.se");
        assert_eq!(metrics.robots_blocked_count("blocked.se"), 1);
    }

    #[test]
    fn test_contacts_found_counter() {
        let metrics = Metrics::new();
        metrics.add_contacts_found("email", 3);
        metrics.add_contacts_found("email", 2);
        metrics.add_contacts_found("phone", 1);
        metrics.add_contacts_found("social", 0);

        assert_eq!(metrics.contacts_found_count("email"), 5);
        assert_eq!(metrics.contacts_found_count("phone"), 1);
        assert_eq!(metrics.contacts_found_count("social"), 0);
    }

    #[test]
    fn test_active_jobs_gauge() {
        let metrics = Metrics::new();
        metrics.job_started();
        metrics.job_started();
        assert_eq!(metrics.active_jobs(), 2);
        metrics.job_finished();
        assert_eq!(metrics.active_jobs(), 1);
    }

    #[test]
    fn test_histogram_buckets_cumulative() {
        let metrics = Metrics::new();
        metrics.observe_duration(0.05);
        metrics.observe_duration(1.5);
        metrics.observe_duration(45.0);

        let rendered = metrics.render();
        assert!(rendered.contains("crawl_duration_seconds_bucket{le=\"0.1\"} 1"));
        assert!(rendered.contains("crawl_duration_seconds_bucket{le=\"2\"} 2"));
        assert!(rendered.contains("crawl_duration_seconds_bucket{le=\"60\"} 3"));
        assert!(rendered.contains("crawl_duration_seconds_bucket{le=\"+Inf\"} 3"));
        assert!(rendered.contains("crawl_duration_seconds_count 3"));
    }

    #[test]
    fn test_render_includes_labels() {
        let metrics = Metrics::new();
        metrics.inc_request("robots-blocked", "blocked.se");
        let rendered = metrics.render();
        assert!(rendered
            .contains("crawl_requests_total{status=\"robots-blocked\",host=\"blocked.se\"} 1"));
    }
}
