//! Batch fan-out: select stale sources and run the source pipeline for each,
//! in parallel under a semaphore sized to the API key budget.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info};

use newswire_common::{BatchPayload, JobCounters, SourcePayload, SourceTable};

use crate::pipeline::source::run_source_job;
use crate::runtime::Runtime;

/// Per-source link limit during batch runs. Keeps a single slow source from
/// monopolizing a batch slot.
const BATCH_SOURCE_LINK_LIMIT: usize = 15;

/// Fan-out width: one slot below the key budget, capped at 8, at least 1.
fn concurrency_width(num_keys: usize) -> usize {
    num_keys.saturating_sub(1).clamp(1, 8)
}

pub async fn run_batch_job(rt: Arc<Runtime>, job_id: i64, payload: &BatchPayload) -> Result<()> {
    let sources = rt
        .store
        .select_sources_for_batch(payload.batch_size, payload.query.as_deref())
        .await?;

    rt.store
        .update_counters(
            job_id,
            JobCounters {
                links_found: Some(sources.len() as i64),
                ..Default::default()
            },
        )
        .await?;

    if payload.dry_run {
        info!(job_id, sources = sources.len(), "Dry run, not processing sources");
        return Ok(());
    }

    let width = concurrency_width(rt.keys.num_keys());
    info!(job_id, sources = sources.len(), width, "Processing batch");

    let semaphore = Arc::new(Semaphore::new(width));
    // (sources completed, sources errored) — written as each source finishes.
    let progress = Arc::new(Mutex::new((0i64, 0i64)));
    let total = sources.len();

    let mut tasks = Vec::with_capacity(total);
    for source in sources {
        let rt = rt.clone();
        let semaphore = semaphore.clone();
        let progress = progress.clone();

        tasks.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };

            let source_payload = SourcePayload {
                source_id: Some(source.id),
                source_table: SourceTable::Primary,
                url: source.url.clone(),
                limit: BATCH_SOURCE_LINK_LIMIT,
            };

            let result = run_source_job(&rt, None, &source_payload).await;

            let (completed, errors) = {
                let mut progress = progress.lock().await;
                match result {
                    Ok(_) => progress.0 += 1,
                    Err(e) => {
                        error!(source_id = %source.id, error = %e, "Error processing source");
                        progress.1 += 1;
                    }
                }
                *progress
            };

            info!(source_id = %source.id, completed, total, "Batch source finished");

            // Completed-source count is reported through articles_saved; see
            // the queue read model for what each counter tracks per job type.
            if let Err(e) = rt
                .store
                .update_counters(
                    job_id,
                    JobCounters {
                        articles_saved: Some(completed),
                        errors: Some(errors),
                        ..Default::default()
                    },
                )
                .await
            {
                error!(job_id, error = %e, "Failed to update batch counters");
            }
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    let (completed, errors) = *progress.lock().await;
    info!(job_id, completed, errors, "Batch processing complete");
    Ok(())
}
