//! Append-only audit log
//!
//! One JSON line per completed site crawl. Writes are best-effort: an
//! unwritable audit log degrades to warnings, it never fails a job.

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditEntry<'a> {
    timestamp: String,
    job_id: Uuid,
    host: &'a str,
    records_found: usize,
    user: &'a str,
    action: &'static str,
}

/// JSON-lines audit trail of crawl activity
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one entry for a completed site crawl
    pub async fn record_crawl(&self, job_id: Uuid, host: &str, records_found: usize, user: &str) {
        let entry = AuditEntry {
            timestamp: Utc::now().to_rfc3339(),
            job_id,
            host,
            records_found,
            user,
            action: "crawl",
        };

        let line = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Audit entry serialization failed: {}", e);
                return;
            }
        };

        let open = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;
        match open {
            Ok(mut file) => {
                if let Err(e) = file.write_all(format!("{}\n", line).as_bytes()).await {
                    tracing::warn!("Audit write failed: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("Audit log {} not writable: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let audit = AuditLog::new(&path);
        let job_id = Uuid::new_v4();

        audit.record_crawl(job_id, "acme.se", 2, "tester").await;
        audit.record_crawl(job_id, "other.se", 0, "tester").await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry["host"], "acme.se");
        assert_eq!(entry["recordsFound"], 2);
        assert_eq!(entry["user"], "tester");
        assert_eq!(entry["action"], "crawl");
        assert_eq!(entry["jobId"], job_id.to_string());
        assert!(entry["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_unwritable_path_is_swallowed() {
        let audit = AuditLog::new("/nonexistent-dir/audit.log");
        audit.record_crawl(Uuid::new_v4(), "acme.se", 0, "").await;
    }
}
