//! Multi-source jobs expand an explicit source list into individual SOURCE
//! jobs. Nothing runs inline — the queue distributes the actual scraping.

use anyhow::Result;
use tracing::{error, info, warn};

use newswire_common::{JobCounters, JobPayload, MultiSourcePayload, SourcePayload};

use crate::runtime::Runtime;

pub async fn run_multi_source_job(
    rt: &Runtime,
    job_id: i64,
    payload: &MultiSourcePayload,
) -> Result<()> {
    info!(job_id, sources = payload.sources.len(), "Processing multi-source job");

    rt.store
        .update_counters(
            job_id,
            JobCounters {
                links_found: Some(payload.sources.len() as i64),
                ..Default::default()
            },
        )
        .await?;

    if payload.dry_run {
        info!(job_id, "Dry run, not enqueuing source jobs");
        return Ok(());
    }

    let mut enqueued = 0i64;
    let mut errors = 0i64;

    for source_ref in &payload.sources {
        let source = match rt
            .store
            .get_source(source_ref.source_id, source_ref.source_table)
            .await
        {
            Ok(Some(source)) => source,
            Ok(None) => {
                warn!(
                    source_id = %source_ref.source_id,
                    table = source_ref.source_table.table_name(),
                    "Source not found"
                );
                errors += 1;
                continue;
            }
            Err(e) => {
                error!(source_id = %source_ref.source_id, error = %e, "Failed to load source");
                errors += 1;
                continue;
            }
        };

        let Some(url) = source.url else {
            warn!(source_id = %source_ref.source_id, "Source has no URL");
            errors += 1;
            continue;
        };

        let source_payload = SourcePayload {
            source_id: Some(source_ref.source_id),
            source_table: source_ref.source_table,
            url: Some(url),
            limit: source_ref.limit,
        };

        match rt.store.enqueue(&JobPayload::Source(source_payload)).await {
            Ok(source_job_id) => {
                info!(source_job_id, source_id = %source_ref.source_id, "Enqueued source job");
                enqueued += 1;
            }
            Err(e) => {
                error!(source_id = %source_ref.source_id, error = %e, "Failed to enqueue source job");
                errors += 1;
            }
        }
    }

    // Sources enqueued are reported through articles_saved for this job type.
    rt.store
        .update_counters(
            job_id,
            JobCounters {
                articles_saved: Some(enqueued),
                errors: Some(errors),
                ..Default::default()
            },
        )
        .await?;

    info!(job_id, enqueued, errors, "Multi-source processing complete");
    Ok(())
}
