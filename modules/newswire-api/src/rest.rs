//! REST handlers. The façade is deliberately thin: validate, enqueue, and
//! read job status back through the store — no scraping happens here.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use newswire_common::{
    ArticlePayload, BatchPayload, JobPayload, MultiSourcePayload, SourcePayload, SourceRef,
    SourceTable,
};

use crate::AppState;

/// Hard cap on sources per multi-source request.
const MAX_SOURCES_PER_REQUEST: usize = 50;

// --- Request bodies ---

#[derive(Deserialize)]
pub struct ScrapeArticleRequest {
    url: String,
    #[serde(default)]
    source_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ScrapeSourceRequest {
    url: String,
    #[serde(default)]
    source_id: Option<Uuid>,
    #[serde(default)]
    source_table: Option<SourceTable>,
    #[serde(default = "default_source_limit")]
    limit: usize,
}

fn default_source_limit() -> usize {
    100
}

#[derive(Deserialize)]
pub struct ProcessSourcesRequest {
    #[serde(default = "default_batch_size")]
    batch_size: i64,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

fn default_batch_size() -> i64 {
    50
}

#[derive(Deserialize)]
pub struct ScrapeMultipleSourcesRequest {
    sources: Vec<SourceRef>,
    #[serde(default)]
    dry_run: bool,
}

// --- Helpers ---

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

async fn enqueue(state: &AppState, payload: JobPayload) -> axum::response::Response {
    match state.store.enqueue(&payload).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "job_id": job_id })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to enqueue job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to enqueue job" })),
            )
                .into_response()
        }
    }
}

fn validate_url(url: &str) -> Result<(), &'static str> {
    if url.trim().is_empty() {
        return Err("url must not be empty");
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("url must use http or https");
    }
    Ok(())
}

/// Duplicate `(source_id, source_table)` pairs in a multi-source request.
fn find_duplicate_source(sources: &[SourceRef]) -> Option<&SourceRef> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .find(|s| !seen.insert((s.source_id, s.source_table)))
}

// --- Handlers ---

pub async fn scrape_article(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeArticleRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate_url(&body.url) {
        return bad_request(message);
    }

    let payload = JobPayload::Article(ArticlePayload {
        url: body.url,
        source_id: body.source_id,
        extracted: None,
        classification: None,
    });
    enqueue(&state, payload).await
}

pub async fn scrape_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeSourceRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate_url(&body.url) {
        return bad_request(message);
    }
    if body.source_id.is_some() && body.source_table.is_none() {
        return bad_request("source_table must be provided when source_id is provided");
    }
    if body.limit == 0 {
        return bad_request("limit must be at least 1");
    }

    let payload = JobPayload::Source(SourcePayload {
        source_id: body.source_id,
        source_table: body.source_table.unwrap_or_default(),
        url: Some(body.url),
        limit: body.limit,
    });
    enqueue(&state, payload).await
}

pub async fn process_sources(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProcessSourcesRequest>,
) -> impl IntoResponse {
    if body.batch_size < 1 {
        return bad_request("batch_size must be at least 1");
    }

    let payload = JobPayload::Batch(BatchPayload {
        batch_size: body.batch_size,
        query: body.query,
        dry_run: body.dry_run,
    });
    enqueue(&state, payload).await
}

pub async fn scrape_multiple_sources(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeMultipleSourcesRequest>,
) -> impl IntoResponse {
    if body.sources.is_empty() {
        return bad_request("sources must contain at least one entry");
    }
    if body.sources.len() > MAX_SOURCES_PER_REQUEST {
        return bad_request("sources must contain at most 50 entries");
    }
    if let Some(duplicate) = find_duplicate_source(&body.sources) {
        warn!(source_id = %duplicate.source_id, "Duplicate source in request");
        return bad_request("duplicate source in request");
    }

    let payload = JobPayload::MultiSource(MultiSourcePayload {
        sources: body.sources,
        dry_run: body.dry_run,
    });
    enqueue(&state, payload).await
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_job(id).await {
        Ok(Some(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "job not found" })),
        )
            .into_response(),
        Err(e) => {
            warn!(job_id = id, error = %e, "Failed to load job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to load job" })),
            )
                .into_response()
        }
    }
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_ref(id: Uuid, table: SourceTable) -> SourceRef {
        SourceRef {
            source_id: id,
            source_table: table,
            limit: 10,
        }
    }

    #[test]
    fn url_validation_rejects_empty_and_bad_schemes() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("http://example.com/a").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("   ").is_err());
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn duplicate_sources_are_detected() {
        let id = Uuid::new_v4();
        let sources = vec![
            source_ref(id, SourceTable::Primary),
            source_ref(Uuid::new_v4(), SourceTable::Primary),
            source_ref(id, SourceTable::Primary),
        ];
        assert!(find_duplicate_source(&sources).is_some());
    }

    #[test]
    fn same_id_in_different_tables_is_not_a_duplicate() {
        let id = Uuid::new_v4();
        let sources = vec![
            source_ref(id, SourceTable::Primary),
            source_ref(id, SourceTable::City),
        ];
        assert!(find_duplicate_source(&sources).is_none());
    }
}
