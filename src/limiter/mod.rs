//! Dual-level rate limiting
//!
//! Two composed layers gate every fetch: a global limiter bounding total
//! concurrency with a minimum spacing between admissions, and a per-host
//! limiter serializing requests to one host with its own spacing plus a
//! token bucket. A task runs only once both layers admit it; the host
//! limiter is the inner layer, held while the global slot is held.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// Tokens a host may burn in one refill window
const HOST_BURST: u32 = 10;

/// How often a host's token bucket refills completely
const HOST_REFILL_INTERVAL: Duration = Duration::from_secs(60);

/// Minimum spacing between global admissions
const GLOBAL_MIN_TIME: Duration = Duration::from_millis(50);

/// Automatic retries for failed limited tasks
const TASK_RETRIES: u32 = 2;

/// Delay between task retries
const TASK_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Permits held for the duration of one admitted task
///
/// Dropping releases the host slot first, then the global slot.
pub struct Admission {
    _host: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Global concurrency limiter with admission spacing
struct GlobalLimiter {
    semaphore: Arc<Semaphore>,
    last_admit: Mutex<Option<Instant>>,
}

impl GlobalLimiter {
    fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            last_admit: Mutex::new(None),
        }
    }

    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        // Spacing is enforced under the lock so concurrent admissions queue
        let mut last = self.last_admit.lock().await;
        if let Some(prev) = *last {
            let next_slot = prev + GLOBAL_MIN_TIME;
            let now = Instant::now();
            if next_slot > now {
                tokio::time::sleep(next_slot - now).await;
            }
        }
        *last = Some(Instant::now());

        Some(permit)
    }
}

struct HostBucket {
    last_admit: Option<Instant>,
    tokens: u32,
    window_start: Instant,
}

/// Per-host limiter: serialized access, spacing, and a token bucket
pub struct HostLimiter {
    semaphore: Arc<Semaphore>,
    min_time: Duration,
    bucket: Mutex<HostBucket>,
}

impl HostLimiter {
    fn new(max_concurrent: usize, min_time: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            min_time,
            bucket: Mutex::new(HostBucket {
                last_admit: None,
                tokens: HOST_BURST,
                window_start: Instant::now(),
            }),
        }
    }

    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        let mut bucket = self.bucket.lock().await;

        // Full refill once per window
        loop {
            let now = Instant::now();
            if now.duration_since(bucket.window_start) >= HOST_REFILL_INTERVAL {
                bucket.tokens = HOST_BURST;
                bucket.window_start = now;
            }
            if bucket.tokens > 0 {
                bucket.tokens -= 1;
                break;
            }
            let until_refill = HOST_REFILL_INTERVAL - now.duration_since(bucket.window_start);
            tokio::time::sleep(until_refill).await;
        }

        if let Some(prev) = bucket.last_admit {
            let next_slot = prev + self.min_time;
            let now = Instant::now();
            if next_slot > now {
                tokio::time::sleep(next_slot - now).await;
            }
        }
        bucket.last_admit = Some(Instant::now());

        Some(permit)
    }

    /// Remaining tokens in the current window (diagnostics)
    pub async fn tokens_remaining(&self) -> u32 {
        self.bucket.lock().await.tokens
    }
}

/// Process-wide limiter registry
///
/// Host limiters are created lazily on first contact and never evicted.
pub struct LimiterRegistry {
    global: GlobalLimiter,
    hosts: Mutex<HashMap<String, Arc<HostLimiter>>>,
    per_host_min_time: Duration,
    per_host_max_concurrent: usize,
}

impl LimiterRegistry {
    /// Creates a registry with the given limits
    pub fn new(
        global_concurrency: usize,
        per_host_min_time: Duration,
        per_host_max_concurrent: usize,
    ) -> Self {
        Self {
            global: GlobalLimiter::new(global_concurrency),
            hosts: Mutex::new(HashMap::new()),
            per_host_min_time,
            per_host_max_concurrent,
        }
    }

    /// Gets or creates the limiter for one host
    pub async fn host_limiter(&self, host: &str) -> Arc<HostLimiter> {
        let mut hosts = self.hosts.lock().await;
        hosts
            .entry(host.to_lowercase())
            .or_insert_with(|| {
                Arc::new(HostLimiter::new(
                    self.per_host_max_concurrent,
                    self.per_host_min_time,
                ))
            })
            .clone()
    }

    /// Admits one task: global slot first, then the host slot
    ///
    /// Returns `None` only if a limiter was shut down, which does not happen
    /// during normal operation.
    pub async fn admit(&self, host: &str) -> Option<Admission> {
        let global = self.global.admit().await?;
        let limiter = self.host_limiter(host).await;
        let host_permit = limiter.admit().await?;
        Some(Admission {
            _host: host_permit,
            _global: global,
        })
    }

    /// Runs a task under both limiters, retrying failures
    ///
    /// Failed tasks are retried up to two more times with a fixed delay.
    /// Whether a given error is worth retrying is the caller's call, via
    /// `should_retry`; permits are released between attempts.
    pub async fn run_with_retry<T, E, F, Fut, P>(
        &self,
        host: &str,
        mut task: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            let admission = self.admit(host).await;
            let result = task().await;
            drop(admission);

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= TASK_RETRIES || !should_retry(&e) {
                        return Err(e);
                    }
                    attempt += 1;
                    tracing::debug!("Task for {} failed, retry {} shortly", host, attempt);
                    tokio::time::sleep(TASK_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Number of hosts with a limiter allocated
    pub async fn tracked_hosts(&self) -> usize {
        self.hosts.lock().await.len()
    }
}
