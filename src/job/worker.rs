//! Job execution
//!
//! Runs one enrichment job: fans site crawls out over the job's
//! concurrency budget, aggregates records and errors, reports progress per
//! site, and always resolves with a result envelope. A shutdown signal
//! stops new sites but lets in-flight ones finish; unprocessed sites are
//! the broker's to redeliver.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;

use crate::contacts::build_records;
use crate::crawler::{CrawlContext, SiteCrawler, SiteError, SiteResult};
use crate::job::audit::AuditLog;
use crate::job::types::{HostErrors, JobInput, JobProgress, JobResult, JobStats, SiteSpec};

/// Pseudo-host under which job-level validation errors are reported
const CONFIG_ERROR_HOST: &str = "config";

/// Executes jobs against a shared crawl context
pub struct Worker {
    ctx: Arc<CrawlContext>,
    audit: AuditLog,
}

impl Worker {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        let audit = AuditLog::new(ctx.settings.audit_log_path.clone());
        Self { ctx, audit }
    }

    /// Runs a job to completion
    pub async fn run_job(&self, job: JobInput) -> JobResult {
        self.run_job_with(job, None, None).await
    }

    /// Runs a job with optional progress reporting and shutdown signal
    pub async fn run_job_with(
        &self,
        job: JobInput,
        progress: Option<mpsc::UnboundedSender<JobProgress>>,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> JobResult {
        self.ctx.metrics.job_started();
        let result = self.run_job_inner(job, progress, shutdown).await;
        self.ctx.metrics.job_finished();
        result
    }

    async fn run_job_inner(
        &self,
        job: JobInput,
        progress: Option<mpsc::UnboundedSender<JobProgress>>,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> JobResult {
        let (config, warnings) = job.config.clamped();
        let total = job.sites.len();
        let job_id = job.job_id;

        tracing::info!(
            "Job {} starting: {} sites, {} pages/site, concurrency {}",
            job_id,
            total,
            config.max_pages,
            config.concurrency
        );

        let mut host_errors: Vec<HostErrors> = Vec::new();
        for warning in warnings {
            host_errors.push(HostErrors {
                host: CONFIG_ERROR_HOST.to_string(),
                errors: vec![SiteError {
                    url: None,
                    reason: warning,
                }],
            });
        }

        send_progress(&progress, 0, None, 0, total, 0);

        let semaphore = Arc::new(Semaphore::new(config.concurrency as usize));
        let mut join_set: JoinSet<(SiteSpec, Option<SiteResult>)> = JoinSet::new();

        for mut site in job.sites {
            site.normalize();
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            let max_pages = config.max_pages;
            let shutdown = shutdown.clone();

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (site, None);
                };
                if let Some(rx) = &shutdown {
                    if *rx.borrow() {
                        tracing::info!("Shutdown requested, leaving {} to the broker", site.host);
                        return (site, None);
                    }
                }
                let crawler = SiteCrawler::new(&ctx);
                let result = crawler.crawl_site(&site, max_pages).await;
                (site, Some(result))
            });
        }

        let mut records = Vec::new();
        let mut processed = 0usize;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((site, Some(site_result))) => {
                    let site_records = build_records(&site_result);
                    processed += 1;

                    self.audit
                        .record_crawl(job_id, &site.host, site_records.len(), &config.user)
                        .await;

                    if !site_result.errors.is_empty() {
                        host_errors.push(HostErrors {
                            host: site.host.clone(),
                            errors: site_result.errors.clone(),
                        });
                    }
                    records.extend(site_records);

                    let percentage = if total == 0 {
                        100
                    } else {
                        (processed * 100 / total) as u8
                    };
                    send_progress(
                        &progress,
                        percentage,
                        Some(site.host.clone()),
                        processed,
                        total,
                        records.len(),
                    );
                }
                Ok((_, None)) => {}
                Err(e) => {
                    tracing::error!("Site task failed: {}", e);
                    host_errors.push(HostErrors {
                        host: "unknown".to_string(),
                        errors: vec![SiteError {
                            url: None,
                            reason: format!("site task failed: {}", e),
                        }],
                    });
                }
            }
        }

        send_progress(&progress, 100, None, processed, total, records.len());

        let total_errors = host_errors.iter().map(|h| h.errors.len()).sum();
        let stats = JobStats {
            total_sites: total,
            total_records: records.len(),
            total_errors,
            avg_records_per_site: if total == 0 {
                0.0
            } else {
                records.len() as f64 / total as f64
            },
        };

        tracing::info!(
            "Job {} finished: {} records from {} sites, {} errors",
            job_id,
            stats.total_records,
            stats.total_sites,
            stats.total_errors
        );

        JobResult {
            records,
            errors: host_errors,
            stats,
        }
    }
}

fn send_progress(
    progress: &Option<mpsc::UnboundedSender<JobProgress>>,
    percentage: u8,
    current: Option<String>,
    processed: usize,
    total: usize,
    found: usize,
) {
    if let Some(sender) = progress {
        let _ = sender.send(JobProgress {
            percentage,
            current,
            processed,
            total,
            found,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::job::types::JobConfig;
    use uuid::Uuid;

    fn test_worker() -> Worker {
        let dir = std::env::temp_dir().join(format!("spindel-audit-{}", std::process::id()));
        let mut settings = Settings::default();
        settings.audit_log_path = dir.to_string_lossy().to_string();
        settings.enable_cache = false;
        Worker::new(Arc::new(crate::crawler::CrawlContext::for_tests(settings)))
    }

    fn job_with_sites(sites: Vec<SiteSpec>) -> JobInput {
        JobInput {
            job_id: Uuid::new_v4(),
            sites,
            config: JobConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_job_resolves() {
        let worker = test_worker();
        let result = worker.run_job(job_with_sites(vec![])).await;

        assert!(result.records.is_empty());
        assert_eq!(result.stats.total_sites, 0);
        assert_eq!(result.stats.avg_records_per_site, 0.0);
    }

    #[tokio::test]
    async fn test_dnc_site_produces_error_envelope() {
        let worker = test_worker();
        worker.ctx.dnc.add("blocked.se");

        let job = job_with_sites(vec![SiteSpec {
            root_url: "https://blocked.se".to_string(),
            host: "blocked.se".to_string(),
            company_name: "Blocked AB".to_string(),
        }]);
        let result = worker.run_job(job).await;

        assert!(result.records.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].host, "blocked.se");
        assert_eq!(
            result.errors[0].errors[0].reason,
            "Domain on Do-Not-Contact list"
        );
        assert_eq!(result.stats.total_errors, 1);
    }

    #[tokio::test]
    async fn test_config_clamp_recorded_as_validation_error() {
        let worker = test_worker();
        let mut job = job_with_sites(vec![]);
        job.config = JobConfig {
            max_pages: 99,
            concurrency: 4,
            tags: String::new(),
            user: String::new(),
        };
        let result = worker.run_job(job).await;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].host, "config");
        assert!(result.errors[0].errors[0].reason.contains("maxPages"));
    }

    #[tokio::test]
    async fn test_progress_reported_per_site() {
        let worker = test_worker();
        worker.ctx.dnc.add("a.se");
        worker.ctx.dnc.add("b.se");

        let job = job_with_sites(vec![
            SiteSpec {
                root_url: "https://a.se".to_string(),
                host: "a.se".to_string(),
                company_name: "A".to_string(),
            },
            SiteSpec {
                root_url: "https://b.se".to_string(),
                host: "b.se".to_string(),
                company_name: "B".to_string(),
            },
        ]);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = worker.run_job_with(job, Some(tx), None).await;
        assert_eq!(result.stats.total_sites, 2);

        let mut snapshots = Vec::new();
        while let Ok(p) = rx.try_recv() {
            snapshots.push(p);
        }

        // Initial, one per site, and final
        assert!(snapshots.len() >= 4);
        assert_eq!(snapshots.first().unwrap().percentage, 0);
        assert_eq!(snapshots.last().unwrap().percentage, 100);
        assert_eq!(snapshots.last().unwrap().processed, 2);
    }

    #[tokio::test]
    async fn test_shutdown_skips_unstarted_sites() {
        let worker = test_worker();
        worker.ctx.dnc.add("x.se");

        let (shutdown_tx, shutdown_rx) = watch::channel(true);
        let job = job_with_sites(vec![SiteSpec {
            root_url: "https://x.se".to_string(),
            host: "x.se".to_string(),
            company_name: "X".to_string(),
        }]);

        let result = worker.run_job_with(job, None, Some(shutdown_rx)).await;
        drop(shutdown_tx);

        // Site never ran, so no records and no per-site errors
        assert!(result.records.is_empty());
        assert!(result.errors.is_empty());
    }
}
