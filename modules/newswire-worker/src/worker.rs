//! The polling worker: claim, dispatch, report, back off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use newswire_store::HealthMonitor;

use crate::pipeline;
use crate::runtime::Runtime;

/// Cap on the empty-queue poll sleep.
const MAX_IDLE_SLEEP: Duration = Duration::from_secs(60);
/// Cap on the post-connection-error sleep.
const MAX_ERROR_SLEEP: Duration = Duration::from_secs(120);
/// Failure streak that triggers an early pool refresh.
const REFRESH_AFTER_FAILURES: u32 = 3;
/// Failure streak that forces a full refresh and resets the counter.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;
/// Interval between health log lines.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(900);

pub struct Worker {
    runtime: Arc<Runtime>,
    health: HealthMonitor,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(runtime: Arc<Runtime>, running: Arc<AtomicBool>) -> Self {
        let health = HealthMonitor::new(runtime.store.clone());
        let poll_interval = Duration::from_secs(runtime.config.worker_poll_interval.max(1));
        Self {
            runtime,
            health,
            running,
            poll_interval,
        }
    }

    /// The main loop. Returns when the running flag is cleared.
    pub async fn run(self) {
        info!("Worker polling for jobs...");

        let started = Instant::now();
        let mut jobs_processed: u64 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut last_health_log = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            self.health.maybe_probe().await;

            match self.runtime.store.claim().await {
                Ok(Some(job)) => {
                    info!(job_id = job.id, job_type = %job.job_type, "Claimed job");
                    dispatch(&self.runtime, job).await;
                    consecutive_failures = 0;
                    jobs_processed += 1;
                }
                Ok(None) => {
                    let wait = (self.poll_interval * (1 + consecutive_failures))
                        .min(MAX_IDLE_SLEEP);
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    consecutive_failures += 1;

                    if e.is_transient() {
                        warn!(
                            failure = consecutive_failures,
                            max = MAX_CONSECUTIVE_FAILURES,
                            error = %e,
                            "Connection error claiming job"
                        );

                        if consecutive_failures >= REFRESH_AFTER_FAILURES {
                            self.health.force_refresh().await;
                        }

                        let exponent = consecutive_failures.min(4);
                        let wait =
                            (self.poll_interval * 2u32.pow(exponent)).min(MAX_ERROR_SLEEP);
                        info!(wait_secs = wait.as_secs(), "Backing off before next claim");
                        tokio::time::sleep(wait).await;
                    } else {
                        error!(error = %e, "Unhandled error claiming job");
                        tokio::time::sleep(self.poll_interval).await;
                    }

                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        warn!(
                            failures = consecutive_failures,
                            "Too many consecutive failures, forcing pool refresh"
                        );
                        self.health.force_refresh().await;
                        consecutive_failures = 0;
                    }
                }
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                info!(
                    runtime_hours = format!("{:.1}", started.elapsed().as_secs_f64() / 3600.0),
                    jobs_processed,
                    consecutive_failures,
                    "Worker health check"
                );
                last_health_log = Instant::now();
            }
        }

        info!(jobs_processed, "Worker shutting down...");
    }
}

/// Route a claimed job to its handler and record the terminal status.
pub async fn dispatch(runtime: &Arc<Runtime>, job: newswire_store::ClaimedJob) {
    let job_id = job.id;

    let payload = match job.decode() {
        Ok(payload) => payload,
        Err(e) => {
            // Corrupt or unknown payloads are terminal — retrying cannot fix them.
            error!(job_id, error = %e, "Rejecting job with bad payload");
            mark_error(runtime, job_id, &e.to_string()).await;
            return;
        }
    };

    use newswire_common::JobPayload;
    let result = match payload {
        JobPayload::Article(p) => pipeline::run_article_job(runtime, job_id, &p).await,
        JobPayload::Source(p) => pipeline::run_source_job(runtime, Some(job_id), &p)
            .await
            .map(|_| ()),
        JobPayload::Batch(p) => pipeline::run_batch_job(runtime.clone(), job_id, &p).await,
        JobPayload::MultiSource(p) => pipeline::run_multi_source_job(runtime, job_id, &p).await,
    };

    match result {
        Ok(()) => {
            if let Err(e) = runtime.store.mark_done(job_id).await {
                error!(job_id, error = %e, "Failed to mark job done");
            }
        }
        Err(e) => {
            error!(job_id, error = %e, "Job failed");
            mark_error(runtime, job_id, &e.to_string()).await;
        }
    }
}

async fn mark_error(runtime: &Runtime, job_id: i64, message: &str) {
    if let Err(e) = runtime.store.mark_error(job_id, message).await {
        error!(job_id, error = %e, "Failed to mark job error");
    }
}
