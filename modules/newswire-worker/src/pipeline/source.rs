//! The source pipeline: collect candidate links from a source page, then walk
//! them sequentially — dedup, validate, extract, classify — spawning and
//! inline-executing an article job for each keeper. Stops once
//! `processed + skipped` reaches the link limit.

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};

use newswire_common::{
    canonicalize_url, is_article_url, is_likely_news_url, ArticlePayload, JobCounters, JobPayload,
    ProcessedStatus, ScopeLabel, SourcePayload,
};

use crate::classify::classify_content;
use crate::extract::{collect_links, extract_content};
use crate::pipeline::article::run_article_job;
use crate::runtime::Runtime;

#[derive(Debug, Default, Clone, Copy)]
pub struct SourceStats {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

enum LinkOutcome {
    Saved,
    Skipped,
}

/// Run one source job. `job_id` is None when a batch job executes the source
/// inline without a queue row of its own.
pub async fn run_source_job(
    rt: &Runtime,
    job_id: Option<i64>,
    payload: &SourcePayload,
) -> Result<SourceStats> {
    let source_id = payload
        .source_id
        .ok_or_else(|| anyhow!("Missing source_id in payload"))?;

    let source = rt
        .store
        .get_source(source_id, payload.source_table)
        .await?
        .ok_or_else(|| {
            anyhow!(
                "Source {source_id} not found in table {}",
                payload.source_table
            )
        })?;

    let source_url = payload
        .url
        .clone()
        .or(source.url)
        .ok_or_else(|| anyhow!("Source {source_id} has no URL"))?;
    let limit = payload.limit;

    info!(%source_id, source_url, limit, "Processing source");

    // Over-collect so dedup and rejection still leave enough candidates.
    let links = collect_links(rt, &source_url, limit * 2).await?;
    if links.is_empty() {
        warn!(source_id = %source_id, "No article links found on source page");
        return Ok(SourceStats::default());
    }

    let mut stats = SourceStats::default();

    for link in &links {
        if stats.processed + stats.skipped >= limit {
            info!(source_id = %source_id, limit, "Reached link limit for source");
            break;
        }

        match process_link(rt, link, &source_url, payload).await {
            Ok(LinkOutcome::Saved) => stats.processed += 1,
            Ok(LinkOutcome::Skipped) => stats.skipped += 1,
            Err(e) => {
                error!(link, error = %e, "Error processing article link");
                stats.errors += 1;
            }
        }
    }

    info!(
        source_id = %source_id,
        processed = stats.processed,
        skipped = stats.skipped,
        errors = stats.errors,
        "Source processing complete"
    );

    if let Some(job_id) = job_id {
        rt.store
            .update_counters(
                job_id,
                JobCounters {
                    articles_saved: Some(stats.processed as i64),
                    links_skipped: Some(stats.skipped as i64),
                    errors: Some(stats.errors as i64),
                    ..Default::default()
                },
            )
            .await?;
    }

    if payload.source_table.is_primary() {
        rt.store
            .update_source_scraped_at(source_id, payload.source_table)
            .await?;
    }

    Ok(stats)
}

async fn process_link(
    rt: &Runtime,
    link: &str,
    source_url: &str,
    payload: &SourcePayload,
) -> Result<LinkOutcome> {
    let Some(canonical) = canonicalize_url(link) else {
        return Ok(LinkOutcome::Skipped);
    };

    if rt.store.check_processed(&canonical).await?.is_some() {
        info!(canonical, "URL already processed, skipping");
        return Ok(LinkOutcome::Skipped);
    }

    // URL-level rejection is terminal: record it so no later job re-fetches.
    if !is_article_url(link, source_url) || !is_likely_news_url(link) {
        info!(link, "URL rejected by validator, filing as trash");
        rt.store
            .save_processed(&canonical, ProcessedStatus::Trash, None)
            .await?;
        return Ok(LinkOutcome::Skipped);
    }

    let extracted = extract_content(rt, link).await?;

    let classification = classify_content(&rt.ai, &extracted.title, &extracted.text, link).await;
    if classification.label == ScopeLabel::Trash {
        info!(link, "Classified as trash, skipping");
        rt.store
            .save_processed(&canonical, ProcessedStatus::Trash, None)
            .await?;
        return Ok(LinkOutcome::Skipped);
    }

    // Enqueue an article job carrying the already-extracted content and
    // classification, then execute it inline. The queue row makes the work
    // observable; the payload spares the article pipeline a second fetch.
    let article_payload = ArticlePayload {
        url: link.to_string(),
        source_id: payload.source_id,
        extracted: Some(extracted),
        classification: Some(classification),
    };
    let article_job_id = rt
        .store
        .enqueue(&JobPayload::Article(article_payload.clone()))
        .await?;

    match run_article_job(rt, article_job_id, &article_payload).await {
        Ok(()) => {
            rt.store.mark_done(article_job_id).await?;
            Ok(LinkOutcome::Saved)
        }
        Err(e) => {
            if let Err(mark_err) = rt
                .store
                .mark_error(article_job_id, &e.to_string())
                .await
            {
                error!(article_job_id, error = %mark_err, "Failed to mark article job error");
            }
            Err(e)
        }
    }
}
