//! The article pipeline: dedup short-circuit, extraction, classification,
//! summarization, persistence, and best-effort embedding.

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

use newswire_common::{
    canonicalize_url, ArticlePayload, NewArticle, ProcessedStatus, ScopeLabel,
};

use crate::classify::classify_content;
use crate::extract::extract_content;
use crate::runtime::Runtime;
use crate::summarize::{summarize, ArticleSummary};

/// Extractions shorter than this are content-free shells (cookie walls,
/// galleries, stubs) and are filed as trash rather than errors.
const MIN_ARTICLE_CHARS: usize = 50;

pub async fn run_article_job(rt: &Runtime, job_id: i64, payload: &ArticlePayload) -> Result<()> {
    let url = payload.url.trim();
    if url.is_empty() {
        return Err(anyhow!("Missing URL in job payload"));
    }

    let canonical = canonicalize_url(url).ok_or_else(|| anyhow!("Invalid article URL: {url}"))?;
    info!(job_id, url, canonical, "Processing article");

    // Dedup short-circuit: a known URL means the job is already done, with no
    // extraction or classification spent on it.
    if let Some(status) = rt.store.check_processed(&canonical).await? {
        info!(canonical, status = status.as_str(), "URL already processed, skipping");
        return Ok(());
    }

    // Source jobs hand over pre-extracted content; standalone article jobs
    // fetch it here.
    let extracted = match &payload.extracted {
        Some(extracted) => extracted.clone(),
        None => extract_content(rt, url).await?,
    };

    let classification = match &payload.classification {
        Some(classification) => classification.clone(),
        None => classify_content(&rt.ai, &extracted.title, &extracted.text, url).await,
    };

    if classification.label == ScopeLabel::Trash {
        info!(url, "Article classified as trash, skipping");
        rt.store
            .save_processed(&canonical, ProcessedStatus::Trash, None)
            .await?;
        return Ok(());
    }

    if extracted.text.trim().len() < MIN_ARTICLE_CHARS {
        info!(url, chars = extracted.text.trim().len(), "Extracted text too short, filing as trash");
        rt.store
            .save_processed(&canonical, ProcessedStatus::Trash, None)
            .await?;
        return Ok(());
    }

    let summary = summarize(
        &rt.ai,
        &classification,
        &extracted.markdown,
        &extracted.clean_html,
        &extracted.metadata,
    )
    .await
    .context("Summarization failed")?;

    let city = classification.city_tag();
    let article = build_article(url, &canonical, &extracted, &classification, &summary, city.clone());

    let article_id = rt.store.save_article(&article).await?;
    rt.store
        .save_processed(&canonical, ProcessedStatus::Processed, city.as_deref())
        .await?;

    if let Some(embedder) = &rt.embedder {
        let result = embedder
            .embed_article(
                &rt.store,
                article_id,
                &canonical,
                article.title.as_deref().unwrap_or(&extracted.title),
                summary.short_summary.as_deref(),
                extracted.date,
                &classification,
            )
            .await;
        if let Err(e) = result {
            // Embedding is best-effort; the article stays with is_embedded = false.
            error!(article_id, error = %e, "Failed to embed article");
        }
    } else {
        info!(article_id, "Embeddings disabled, skipping");
    }

    info!(job_id, article_id, url, "Article processed");
    Ok(())
}

fn build_article(
    url: &str,
    canonical: &str,
    extracted: &newswire_common::ExtractedArticle,
    classification: &newswire_common::ArticleClassification,
    summary: &ArticleSummary,
    city: Option<String>,
) -> NewArticle {
    let is_city = classification.label == ScopeLabel::City;

    let mut subtopics = summary.subtopics.iter().filter(|s| !s.trim().is_empty());

    // Industry articles carry their industry slug as the main topic.
    let main_topic = if classification.label == ScopeLabel::Industry {
        classification.industry_slug.clone()
    } else {
        summary.main_topic.clone()
    };

    NewArticle {
        url: url.to_string(),
        url_canonical: canonical.to_string(),
        title: summary
            .title
            .clone()
            .or_else(|| Some(extracted.title.clone()).filter(|t| !t.is_empty())),
        summary_short: summary.short_summary.clone(),
        summary_medium: summary.medium_summary.clone().filter(|_| is_city),
        summary_long: summary.long_summary.clone().filter(|_| is_city),
        topic: summary.topic.clone(),
        main_topic,
        topic_2: subtopics.next().cloned(),
        topic_3: subtopics.next().cloned(),
        grade: summary.score.clamp(0, 100) as i32,
        date_posted: extracted.date,
        full_content: extracted.text.clone(),
        meta_data: extracted.metadata.clone(),
        city,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newswire_common::{ArticleClassification, ExtractedArticle, ScraperKind};
    use std::collections::BTreeMap;

    fn extracted() -> ExtractedArticle {
        ExtractedArticle {
            title: "Page title".to_string(),
            text: "body".to_string(),
            markdown: "body".to_string(),
            clean_html: "<p>body</p>".to_string(),
            metadata: BTreeMap::new(),
            date: None,
            scraper_type: ScraperKind::Browser,
            date_extraction_method: "failed".to_string(),
        }
    }

    fn summary() -> ArticleSummary {
        ArticleSummary {
            title: Some("Clean headline".to_string()),
            short_summary: Some("Short.".to_string()),
            medium_summary: Some("Medium.".to_string()),
            long_summary: Some("Long.".to_string()),
            topic: Some("Local News".to_string()),
            main_topic: Some("Politics".to_string()),
            subtopics: vec!["Budget".to_string(), "Housing".to_string()],
            score: 85,
        }
    }

    fn city() -> ArticleClassification {
        ArticleClassification {
            label: ScopeLabel::City,
            city_slug: Some("Seattle, WA".to_string()),
            industry_slug: None,
        }
    }

    fn global() -> ArticleClassification {
        ArticleClassification {
            label: ScopeLabel::Global,
            city_slug: None,
            industry_slug: None,
        }
    }

    #[test]
    fn city_articles_keep_all_three_summaries() {
        let article = build_article(
            "https://example.com/a",
            "https://example.com/a",
            &extracted(),
            &city(),
            &summary(),
            Some("Seattle".to_string()),
        );
        assert_eq!(article.summary_medium.as_deref(), Some("Medium."));
        assert_eq!(article.summary_long.as_deref(), Some("Long."));
        assert_eq!(article.city.as_deref(), Some("Seattle"));
    }

    #[test]
    fn global_articles_drop_tiered_summaries() {
        let article = build_article(
            "https://example.com/a",
            "https://example.com/a",
            &extracted(),
            &global(),
            &summary(),
            None,
        );
        assert!(article.summary_medium.is_none());
        assert!(article.summary_long.is_none());
        assert!(article.city.is_none());
    }

    #[test]
    fn industry_slug_becomes_main_topic() {
        let classification = ArticleClassification {
            label: ScopeLabel::Industry,
            city_slug: None,
            industry_slug: Some("fintech".to_string()),
        };
        let article = build_article(
            "https://example.com/a",
            "https://example.com/a",
            &extracted(),
            &classification,
            &summary(),
            None,
        );
        assert_eq!(article.main_topic.as_deref(), Some("fintech"));
    }

    #[test]
    fn subtopics_fill_the_two_slots_in_order() {
        let article = build_article(
            "https://example.com/a",
            "https://example.com/a",
            &extracted(),
            &global(),
            &summary(),
            None,
        );
        assert_eq!(article.topic_2.as_deref(), Some("Budget"));
        assert_eq!(article.topic_3.as_deref(), Some("Housing"));
    }

    #[test]
    fn grade_is_clamped_to_percent_range() {
        let mut s = summary();
        s.score = 250;
        let article = build_article(
            "https://example.com/a",
            "https://example.com/a",
            &extracted(),
            &global(),
            &s,
            None,
        );
        assert_eq!(article.grade, 100);
    }

    #[test]
    fn falls_back_to_extracted_title() {
        let mut s = summary();
        s.title = None;
        let article = build_article(
            "https://example.com/a",
            "https://example.com/a",
            &extracted(),
            &global(),
            &s,
            None,
        );
        assert_eq!(article.title.as_deref(), Some("Page title"));
    }
}
