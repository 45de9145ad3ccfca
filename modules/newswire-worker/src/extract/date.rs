//! Publication-date extraction.
//!
//! Two priority orders depending on which engine produced the page:
//! the secondary engine supplies its own date field (tried first, AI as
//! fallback); the primary engine has no date field, so the AI runs first
//! with algorithmic metadata extraction as fallback. Every parsed date must
//! land inside the sanity window or the cascade keeps going.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ai_client::util::truncate_to_char_boundary;
use ai_client::OpenAi;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::{debug, info, warn};

use newswire_common::ScraperKind;

use crate::prompts;
use crate::summarize::format_metadata;

pub const METHOD_SECONDARY_PRIMARY: &str = "secondary-primary";
pub const METHOD_SECONDARY_AI: &str = "secondary-ai-fallback";
pub const METHOD_PRIMARY_AI: &str = "primary-ai";
pub const METHOD_PRIMARY_ALGO: &str = "primary-algorithmic-fallback";
pub const METHOD_FAILED: &str = "failed";

/// Dates older than this are discarded as parser noise.
const MAX_PAST_DAYS: i64 = 3650;
/// Tolerance for timezone skew on "future" dates.
const MAX_FUTURE_DAYS: i64 = 1;

/// Content shown to the AI date extractor (8 KB).
const AI_CONTENT_BUDGET: usize = 8192;

/// Metadata fields checked by the algorithmic fallback, best first.
const METADATA_DATE_FIELDS: &[&str] = &[
    "article:published_time",
    "og:published_time",
    "date",
    "pubdate",
    "published",
    "publication_date",
    "datePublished",
    "article:modified_time",
    "og:updated_time",
    "last-modified",
    "modified",
];

static HOURS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*hours?\s*ago").expect("valid regex"));
static DAYS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*days?\s*ago").expect("valid regex"));

/// Label prefixes the AI sometimes echoes back with the date.
const LABEL_PREFIXES: &[&str] = &[
    "published on",
    "published:",
    "posted on",
    "posted:",
    "updated:",
    "date:",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b. %d, %Y",
    "%d %B %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

/// The cascade entry point. Returns the extracted date and the method that
/// produced it, or `(None, "failed")`. Never errors: a missing date is an
/// expected outcome, not a fault.
pub async fn extract_date(
    ai: &OpenAi,
    scraper: ScraperKind,
    engine_date: Option<&str>,
    markdown: &str,
    metadata: &BTreeMap<String, String>,
    clean_html: &str,
) -> (Option<DateTime<Utc>>, &'static str) {
    let now = Utc::now();

    match scraper {
        ScraperKind::Diffbot => {
            if let Some(raw) = engine_date {
                if let Some(date) = parse_flexible(raw, now) {
                    info!(%date, "Extracted date from engine date field");
                    return (Some(date), METHOD_SECONDARY_PRIMARY);
                }
                warn!(raw, "Engine date did not parse or is out of range");
            }

            if let Some(date) = ai_date(ai, markdown, metadata, clean_html, now).await {
                return (Some(date), METHOD_SECONDARY_AI);
            }
        }
        ScraperKind::Browser => {
            if let Some(date) = ai_date(ai, markdown, metadata, clean_html, now).await {
                return (Some(date), METHOD_PRIMARY_AI);
            }

            if let Some(date) = date_from_metadata(metadata, now) {
                info!(%date, "Extracted date from metadata fallback");
                return (Some(date), METHOD_PRIMARY_ALGO);
            }
        }
    }

    debug!("No publication date recovered");
    (None, METHOD_FAILED)
}

/// Ask the AI for the date string, then parse and range-check it.
async fn ai_date(
    ai: &OpenAi,
    markdown: &str,
    metadata: &BTreeMap<String, String>,
    clean_html: &str,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let content = if clean_html.trim().is_empty() {
        markdown
    } else {
        clean_html
    };
    let metadata_str = format_metadata(metadata);
    let prompt = prompts::fill(
        prompts::DATE_PROMPT,
        &[
            ("metadata", metadata_str.as_str()),
            ("content", truncate_to_char_boundary(content, AI_CONTENT_BUDGET)),
        ],
    );

    let raw = match ai
        .chat_completion(prompts::DATE_SYSTEM, prompt, 0.1, 100)
        .await
    {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "AI date extraction failed");
            return None;
        }
    };

    if raw.is_empty() || raw.eq_ignore_ascii_case("date not found") {
        return None;
    }

    match parse_flexible(&raw, now) {
        Some(date) => {
            info!(%date, raw, "Extracted date with AI");
            Some(date)
        }
        None => {
            warn!(raw, "AI-extracted date did not parse or is out of range");
            None
        }
    }
}

/// Algorithmic fallback: first parseable, in-range metadata field wins.
fn date_from_metadata(
    metadata: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    for field in METADATA_DATE_FIELDS {
        let Some(raw) = metadata.get(*field).filter(|v| !v.is_empty()) else {
            continue;
        };
        if let Some(date) = parse_flexible(raw, now) {
            debug!(field, %date, "Parsed date from metadata field");
            return Some(date);
        }
    }
    None
}

/// Parse a free-form date string: relative phrases, RFC 3339/2822, and a set
/// of common explicit formats. The result must fall within the sanity window
/// `[now - 3650d, now + 1d]`.
pub fn parse_flexible(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(date) = parse_relative(trimmed, now) {
        // Relative dates resolve against the clock and are in range by
        // construction.
        return Some(date);
    }

    let stripped = strip_label_prefix(trimmed);
    parse_absolute(stripped).filter(|date| within_sanity_window(*date, now))
}

fn parse_absolute(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(s) {
        return Some(date.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            // Date-only strings resolve to midday to stay inside the right
            // day across timezone skew.
            let naive = date.and_hms_opt(12, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Resolve "N hours ago", "N days ago", "yesterday", and "today" against the
/// current wall clock.
fn parse_relative(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = s.to_lowercase();

    if let Some(cap) = HOURS_AGO_RE.captures(&lower) {
        let hours: i64 = cap[1].parse().ok()?;
        return Some(now - Duration::hours(hours));
    }

    if let Some(cap) = DAYS_AGO_RE.captures(&lower) {
        let days: i64 = cap[1].parse().ok()?;
        return Some(now - Duration::days(days));
    }

    if lower.contains("yesterday") {
        return Some(now - Duration::days(1));
    }

    if lower.contains("today") {
        return now
            .date_naive()
            .and_hms_opt(12, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    None
}

fn strip_label_prefix(s: &str) -> &str {
    for prefix in LABEL_PREFIXES {
        if let Some(head) = s.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return s[prefix.len()..].trim_start();
            }
        }
    }
    s
}

/// `now - 3650d <= date <= now + 1d`. Out-of-window dates are parser noise
/// (placeholder years, far-future embargo stamps) and are never persisted.
pub fn within_sanity_window(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let min = now - Duration::days(MAX_PAST_DAYS);
    let max = now + Duration::days(MAX_FUTURE_DAYS);
    min <= date && date <= max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn parses_rfc1123_engine_dates() {
        let date = parse_flexible("Thu, 29 May 2025 11:15:17 GMT", now()).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 5, 29, 11, 15, 17).unwrap());
    }

    #[test]
    fn parses_rfc3339() {
        let date = parse_flexible("2024-06-15T10:30:00Z", now()).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn parses_human_formats() {
        assert!(parse_flexible("June 15, 2024", now()).is_some());
        assert!(parse_flexible("Dec 1, 2023", now()).is_some());
        assert!(parse_flexible("2024-06-15", now()).is_some());
        assert!(parse_flexible("06/15/2024", now()).is_some());
    }

    #[test]
    fn strips_label_prefixes() {
        let date = parse_flexible("Published: Dec 1, 2023", now()).unwrap();
        assert_eq!(date.date_naive(), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
    }

    #[test]
    fn resolves_relative_dates() {
        let n = now();
        assert_eq!(parse_flexible("2 hours ago", n).unwrap(), n - Duration::hours(2));
        assert_eq!(parse_flexible("3 days ago", n).unwrap(), n - Duration::days(3));
        assert_eq!(parse_flexible("yesterday", n).unwrap(), n - Duration::days(1));

        let today = parse_flexible("today", n).unwrap();
        assert_eq!(today.date_naive(), n.date_naive());
    }

    #[test]
    fn rejects_dates_outside_sanity_window() {
        assert!(parse_flexible("1990-01-01", now()).is_none());
        assert!(parse_flexible("2030-01-01", now()).is_none());
        // One day of future tolerance for timezone skew.
        assert!(parse_flexible("2025-06-16T08:00:00Z", now()).is_some());
        assert!(parse_flexible("2025-06-17T00:00:00Z", now()).is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_flexible("", now()).is_none());
        assert!(parse_flexible("no date here", now()).is_none());
        assert!(parse_flexible("Date not found", now()).is_none());
    }

    #[test]
    fn metadata_fields_are_checked_in_priority_order() {
        let mut meta = BTreeMap::new();
        meta.insert("last-modified".to_string(), "2024-01-01".to_string());
        meta.insert("article:published_time".to_string(), "2023-05-10".to_string());
        let date = date_from_metadata(&meta, now()).unwrap();
        assert_eq!(date.date_naive(), NaiveDate::from_ymd_opt(2023, 5, 10).unwrap());
    }

    #[test]
    fn metadata_skips_unparseable_and_out_of_range_values() {
        let mut meta = BTreeMap::new();
        meta.insert("article:published_time".to_string(), "not a date".to_string());
        meta.insert("og:published_time".to_string(), "1901-01-01".to_string());
        meta.insert("date".to_string(), "2024-02-02".to_string());
        let date = date_from_metadata(&meta, now()).unwrap();
        assert_eq!(date.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
    }

    #[test]
    fn metadata_with_no_usable_fields_is_none() {
        let mut meta = BTreeMap::new();
        meta.insert("viewport".to_string(), "width=device-width".to_string());
        assert!(date_from_metadata(&meta, now()).is_none());
    }
}
