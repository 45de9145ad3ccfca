use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NewswireError;

// =============================================================================
// Job lifecycle
// =============================================================================

/// Queue status of a scrape job. Terminal states are never exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "in_progress" => Some(JobStatus::InProgress),
            "done" => Some(JobStatus::Done),
            "error" => Some(JobStatus::Error),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Article,
    Source,
    Batch,
    MultiSource,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Article => "article",
            JobType::Source => "source",
            JobType::Batch => "batch",
            JobType::MultiSource => "multi_source",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "article" => Some(JobType::Article),
            "source" => Some(JobType::Source),
            "batch" => Some(JobType::Batch),
            "multi_source" => Some(JobType::MultiSource),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Job payloads
// =============================================================================

/// Typed job payload. The tag lives in the `job_type` column; the `payload`
/// column holds only the variant body. Decoded and validated on claim, not on
/// enqueue-reading paths.
#[derive(Debug, Clone)]
pub enum JobPayload {
    Article(ArticlePayload),
    Source(SourcePayload),
    Batch(BatchPayload),
    MultiSource(MultiSourcePayload),
}

impl JobPayload {
    pub fn job_type(&self) -> JobType {
        match self {
            JobPayload::Article(_) => JobType::Article,
            JobPayload::Source(_) => JobType::Source,
            JobPayload::Batch(_) => JobType::Batch,
            JobPayload::MultiSource(_) => JobType::MultiSource,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        match self {
            JobPayload::Article(p) => serde_json::to_value(p),
            JobPayload::Source(p) => serde_json::to_value(p),
            JobPayload::Batch(p) => serde_json::to_value(p),
            JobPayload::MultiSource(p) => serde_json::to_value(p),
        }
        .expect("job payload serializes")
    }

    /// Reassemble a typed payload from the `job_type` column and the stored
    /// JSON body. Fails on unknown types and on bodies that don't match the
    /// declared type.
    pub fn from_parts(job_type: &str, value: serde_json::Value) -> Result<Self, NewswireError> {
        let job_type = JobType::parse(job_type)
            .ok_or_else(|| NewswireError::Payload(format!("unknown job type: {job_type}")))?;
        let payload = match job_type {
            JobType::Article => JobPayload::Article(decode(value)?),
            JobType::Source => JobPayload::Source(decode(value)?),
            JobType::Batch => JobPayload::Batch(decode(value)?),
            JobType::MultiSource => JobPayload::MultiSource(decode(value)?),
        };
        Ok(payload)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, NewswireError> {
    serde_json::from_value(value).map_err(|e| NewswireError::Payload(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    /// Content already extracted by a source job, so the article job can skip
    /// the network round-trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedArticle>,
    /// Classification already computed by a source job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ArticleClassification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePayload {
    /// Absent when the API caller supplied only a URL; the source pipeline
    /// rejects such jobs at claim time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    #[serde(default)]
    pub source_table: SourceTable,
    /// Overrides the URL stored on the source row when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_source_limit")]
    pub limit: usize,
}

fn default_source_limit() -> usize {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPayload {
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_batch_size() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSourcePayload {
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_id: Uuid,
    pub source_table: SourceTable,
    #[serde(default = "default_ref_limit")]
    pub limit: usize,
}

fn default_ref_limit() -> usize {
    100
}

// =============================================================================
// Sources
// =============================================================================

/// The tables a source row may live in. Only the primary table gets its
/// `last_scraped_at` advanced after a successful source job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTable {
    #[default]
    #[serde(rename = "news_sources")]
    Primary,
    #[serde(rename = "city_sources")]
    City,
}

impl SourceTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            SourceTable::Primary => "news_sources",
            SourceTable::City => "city_sources",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, SourceTable::Primary)
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A source row as the worker reads it. `url` is coalesced from the table's
/// `source_url` and `url` columns.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub id: Uuid,
    pub url: Option<String>,
    pub name: Option<String>,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Extraction
// =============================================================================

/// Which engine produced the extraction. Determines the date cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperKind {
    Browser,
    Diffbot,
}

impl ScraperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScraperKind::Browser => "browser",
            ScraperKind::Diffbot => "diffbot",
        }
    }
}

/// Normalized output of content extraction, whichever engine produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub text: String,
    pub markdown: String,
    /// Reduced HTML with navigation, chrome, and scripts removed. Fed to the
    /// AI for date extraction and summarization.
    pub clean_html: String,
    pub metadata: BTreeMap<String, String>,
    pub date: Option<DateTime<Utc>>,
    pub scraper_type: ScraperKind,
    pub date_extraction_method: String,
}

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLabel {
    City,
    Global,
    Industry,
    Trash,
}

impl ScopeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeLabel::City => "city",
            ScopeLabel::Global => "global",
            ScopeLabel::Industry => "industry",
            ScopeLabel::Trash => "trash",
        }
    }
}

/// Audience classification of an article, as returned by the LLM classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleClassification {
    pub label: ScopeLabel,
    /// "city, state" — populated only for city-scope articles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_slug: Option<String>,
}

impl ArticleClassification {
    pub fn trash() -> Self {
        Self {
            label: ScopeLabel::Trash,
            city_slug: None,
            industry_slug: None,
        }
    }

    /// Render the audience scope tag: `[city:seattle, wa]`, `[global]`,
    /// `[industry:fintech]`, or `[trash]`.
    pub fn audience_scope(&self) -> String {
        match self.label {
            ScopeLabel::City => {
                format!("[city:{}]", self.city_slug.as_deref().unwrap_or_default())
            }
            ScopeLabel::Global => "[global]".to_string(),
            ScopeLabel::Industry => format!(
                "[industry:{}]",
                self.industry_slug.as_deref().unwrap_or_default()
            ),
            ScopeLabel::Trash => "[trash]".to_string(),
        }
    }

    /// City name alone (state dropped) — the tag stored on processed URLs and
    /// the articles table.
    pub fn city_tag(&self) -> Option<String> {
        if self.label != ScopeLabel::City {
            return None;
        }
        self.city_slug
            .as_ref()
            .and_then(|slug| slug.split(',').next())
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty())
    }
}

// =============================================================================
// Articles
// =============================================================================

/// A fully processed article ready for insertion.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub url: String,
    pub url_canonical: String,
    pub title: Option<String>,
    pub summary_short: Option<String>,
    /// Populated only for city-scope articles.
    pub summary_medium: Option<String>,
    /// Populated only for city-scope articles.
    pub summary_long: Option<String>,
    pub topic: Option<String>,
    pub main_topic: Option<String>,
    pub topic_2: Option<String>,
    pub topic_3: Option<String>,
    pub grade: i32,
    pub date_posted: Option<DateTime<Utc>>,
    pub full_content: String,
    pub meta_data: BTreeMap<String, String>,
    pub city: Option<String>,
}

// =============================================================================
// Processed URLs
// =============================================================================

/// Terminal status of a canonical URL in the dedup set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedStatus {
    Trash,
    Processed,
}

impl ProcessedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedStatus::Trash => "trash",
            ProcessedStatus::Processed => "processed",
        }
    }

    /// Lenient parse — older rows use "done" for processed.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trash" => Some(ProcessedStatus::Trash),
            "processed" | "done" => Some(ProcessedStatus::Processed),
            _ => None,
        }
    }
}

// =============================================================================
// Job details (read model)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct JobDetails {
    pub id: i64,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub links_found: i64,
    pub links_skipped: i64,
    pub articles_saved: i64,
    pub errors: i64,
}

/// Set-style update of the live progress counters. `None` fields are left
/// untouched; every update bumps `updated_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobCounters {
    pub links_found: Option<i64>,
    pub links_skipped: Option<i64>,
    pub articles_saved: Option<i64>,
    pub errors: Option<i64>,
}

impl JobCounters {
    pub fn is_empty(&self) -> bool {
        self.links_found.is_none()
            && self.links_skipped.is_none()
            && self.articles_saved.is_none()
            && self.errors.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_parts() {
        let payload = JobPayload::Source(SourcePayload {
            source_id: Some(Uuid::new_v4()),
            source_table: SourceTable::City,
            url: Some("https://example.com".to_string()),
            limit: 25,
        });
        let value = payload.to_value();
        let decoded = JobPayload::from_parts("source", value).unwrap();
        match decoded {
            JobPayload::Source(p) => {
                assert_eq!(p.source_table, SourceTable::City);
                assert_eq!(p.limit, 25);
            }
            other => panic!("wrong variant: {:?}", other.job_type()),
        }
    }

    #[test]
    fn unknown_job_type_is_rejected() {
        let err = JobPayload::from_parts("mystery", serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown job type"));
    }

    #[test]
    fn article_payload_defaults_optional_fields() {
        let value = serde_json::json!({"url": "https://example.com/a"});
        let decoded = JobPayload::from_parts("article", value).unwrap();
        match decoded {
            JobPayload::Article(p) => {
                assert!(p.extracted.is_none());
                assert!(p.classification.is_none());
            }
            _ => panic!("expected article payload"),
        }
    }

    #[test]
    fn audience_scope_formats() {
        let city = ArticleClassification {
            label: ScopeLabel::City,
            city_slug: Some("seattle, wa".to_string()),
            industry_slug: None,
        };
        assert_eq!(city.audience_scope(), "[city:seattle, wa]");
        assert_eq!(city.city_tag().as_deref(), Some("seattle"));

        let industry = ArticleClassification {
            label: ScopeLabel::Industry,
            city_slug: None,
            industry_slug: Some("fintech".to_string()),
        };
        assert_eq!(industry.audience_scope(), "[industry:fintech]");
        assert!(industry.city_tag().is_none());

        assert_eq!(ArticleClassification::trash().audience_scope(), "[trash]");
    }

    #[test]
    fn processed_status_parses_legacy_done() {
        assert_eq!(
            ProcessedStatus::parse("done"),
            Some(ProcessedStatus::Processed)
        );
        assert_eq!(ProcessedStatus::parse("pending"), None);
    }
}
