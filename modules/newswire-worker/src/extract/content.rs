//! Article content extraction: primary engine (headless browser) with
//! fallback to the secondary engine (Diffbot Article API).

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use newswire_common::{ExtractedArticle, ScraperKind};

use crate::extract::{date, html};
use crate::runtime::Runtime;

/// Navigation budget for article pages. Slow pages fall through to the
/// secondary engine rather than stalling the pipeline.
const BROWSER_NAV_TIMEOUT: Duration = Duration::from_secs(3);

/// Extract one article, trying the browser engine first and Diffbot on any
/// failure. Errors only when both engines fail.
pub async fn extract_content(rt: &Runtime, url: &str) -> Result<ExtractedArticle> {
    match extract_with_browser(rt, url).await {
        Ok(article) => Ok(article),
        Err(e) => {
            info!(url, error = %e, "Browser extraction failed, falling back to Diffbot");
            extract_with_diffbot(rt, url)
                .await
                .with_context(|| format!("Content extraction failed with both engines for {url}"))
        }
    }
}

async fn extract_with_browser(rt: &Runtime, url: &str) -> Result<ExtractedArticle> {
    let page_html = rt.browserless.content(url, BROWSER_NAV_TIMEOUT).await?;
    if page_html.trim().is_empty() {
        anyhow::bail!("Empty HTML from browser engine");
    }

    let title = html::extract_title(&page_html).unwrap_or_default();
    let metadata = html::extract_metadata(&page_html);
    let markdown = html::html_to_markdown(&page_html, Some(url));
    let clean_html = html::clean_html_for_analysis(&page_html);
    let text = html::html_to_text(&clean_html);

    let (extracted_date, method) = date::extract_date(
        &rt.ai,
        ScraperKind::Browser,
        None,
        &markdown,
        &metadata,
        &clean_html,
    )
    .await;

    info!(url, engine = "browser", date_method = method, "Extracted content");

    Ok(ExtractedArticle {
        title,
        text,
        markdown,
        clean_html,
        metadata,
        date: extracted_date,
        scraper_type: ScraperKind::Browser,
        date_extraction_method: method.to_string(),
    })
}

async fn extract_with_diffbot(rt: &Runtime, url: &str) -> Result<ExtractedArticle> {
    let token = rt.keys.acquire().await;
    let article = rt.diffbot.article(&token, url).await?;

    let page_html = article.html.unwrap_or_default();
    let markdown = html::html_to_markdown(&page_html, Some(url));
    let clean_html = html::clean_html_for_analysis(&page_html);
    let metadata = meta_to_map(article.meta.as_ref());
    let text = match article.text {
        Some(text) if !text.trim().is_empty() => text,
        _ => html::html_to_text(&clean_html),
    };
    let title = article.title.unwrap_or_default();

    let (extracted_date, method) = date::extract_date(
        &rt.ai,
        ScraperKind::Diffbot,
        article.date.as_deref(),
        &markdown,
        &metadata,
        &clean_html,
    )
    .await;

    info!(url, engine = "diffbot", date_method = method, "Extracted content");

    Ok(ExtractedArticle {
        title,
        text,
        markdown,
        clean_html,
        metadata,
        date: extracted_date,
        scraper_type: ScraperKind::Diffbot,
        date_extraction_method: method.to_string(),
    })
}

/// Flatten the engine's meta object into string pairs; nested values are
/// dropped, scalars are stringified.
fn meta_to_map(meta: Option<&serde_json::Value>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let Some(serde_json::Value::Object(object)) = meta else {
        return map;
    };

    for (key, value) in object {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => {
                map.insert(key.clone(), s.clone());
            }
            serde_json::Value::Number(n) => {
                map.insert(key.clone(), n.to_string());
            }
            serde_json::Value::Bool(b) => {
                map.insert(key.clone(), b.to_string());
            }
            _ => {}
        }
    }

    if map.is_empty() && meta.is_some() {
        warn!("Engine meta object had no scalar fields");
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_map_keeps_scalars_and_drops_nests() {
        let meta = serde_json::json!({
            "title": "A story",
            "wordCount": 420,
            "paywalled": false,
            "authors": ["a", "b"],
            "empty": "",
        });
        let map = meta_to_map(Some(&meta));
        assert_eq!(map.get("title").map(String::as_str), Some("A story"));
        assert_eq!(map.get("wordCount").map(String::as_str), Some("420"));
        assert_eq!(map.get("paywalled").map(String::as_str), Some("false"));
        assert!(!map.contains_key("authors"));
        assert!(!map.contains_key("empty"));
    }

    #[test]
    fn meta_map_handles_missing_meta() {
        assert!(meta_to_map(None).is_empty());
        let not_object = serde_json::json!(["a"]);
        assert!(meta_to_map(Some(&not_object)).is_empty());
    }
}
