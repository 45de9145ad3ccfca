//! Summary generation. City-scope articles get the three-tier summary via the
//! city prompt; global and industry articles get the short summary only.

use std::collections::BTreeMap;

use ai_client::util::truncate_to_char_boundary;
use ai_client::OpenAi;
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use newswire_common::{ArticleClassification, ScopeLabel};

use crate::prompts;

/// Content budget when clean HTML is available (richer context, fewer tags).
const CLEAN_HTML_BUDGET: usize = 6000;
/// Content budget when falling back to markdown.
const MARKDOWN_BUDGET: usize = 4000;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ArticleSummary {
    pub title: Option<String>,
    pub short_summary: Option<String>,
    pub medium_summary: Option<String>,
    pub long_summary: Option<String>,
    pub topic: Option<String>,
    pub main_topic: Option<String>,
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub score: i64,
}

pub async fn summarize(
    ai: &OpenAi,
    classification: &ArticleClassification,
    markdown: &str,
    clean_html: &str,
    metadata: &BTreeMap<String, String>,
) -> Result<ArticleSummary> {
    let template = match classification.label {
        ScopeLabel::City => prompts::CITY_PROMPT,
        ScopeLabel::Global | ScopeLabel::Industry => prompts::GLOBAL_INDUSTRY_PROMPT,
        ScopeLabel::Trash => {
            anyhow::bail!("Trash articles are not summarized")
        }
    };

    let content = select_content(markdown, clean_html);
    let metadata_str = format_metadata(metadata);
    let prompt = prompts::fill(
        template,
        &[("content", content), ("metadata", metadata_str.as_str())],
    );

    debug!(
        label = classification.label.as_str(),
        content_bytes = content.len(),
        "Summarizing article"
    );

    let summary = ai.extract(prompts::SUMMARIZER_SYSTEM, prompt, 0.3).await?;
    Ok(summary)
}

/// Clean HTML carries date and byline context the readability pass strips, so
/// prefer it when present.
fn select_content<'a>(markdown: &'a str, clean_html: &'a str) -> &'a str {
    if clean_html.trim().is_empty() {
        truncate_to_char_boundary(markdown, MARKDOWN_BUDGET)
    } else {
        truncate_to_char_boundary(clean_html, CLEAN_HTML_BUDGET)
    }
}

pub(crate) fn format_metadata(metadata: &BTreeMap<String, String>) -> String {
    metadata
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_clean_html_over_markdown() {
        assert_eq!(select_content("md", "<p>html</p>"), "<p>html</p>");
        assert_eq!(select_content("md", "   "), "md");
    }

    #[test]
    fn content_budgets_are_enforced() {
        let long_html = "x".repeat(10_000);
        assert_eq!(select_content("md", &long_html).len(), CLEAN_HTML_BUDGET);

        let long_md = "y".repeat(10_000);
        assert_eq!(select_content(&long_md, "").len(), MARKDOWN_BUDGET);
    }

    #[test]
    fn metadata_formats_one_pair_per_line() {
        let mut meta = BTreeMap::new();
        meta.insert("og:title".to_string(), "A story".to_string());
        meta.insert("date".to_string(), "2024-06-15".to_string());
        assert_eq!(format_metadata(&meta), "date: 2024-06-15\nog:title: A story");
    }
}
