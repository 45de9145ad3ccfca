//! Best-effort embedding sub-pipeline: assemble a descriptor text, embed it,
//! upsert into the vector store, and stamp the article row. Bounded by a
//! semaphore so embedding backpressure can't starve the main pipeline.

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::info;

use ai_client::OpenAi;
use anyhow::{anyhow, Context, Result};
use newswire_common::{ArticleClassification, ScopeLabel};
use newswire_store::Store;

pub struct Embedder {
    ai: OpenAi,
    http: reqwest::Client,
    api_key: String,
    index_host: String,
    semaphore: Semaphore,
}

impl Embedder {
    pub fn new(ai: OpenAi, api_key: &str, index_host: &str, max_concurrent: usize) -> Self {
        Self {
            ai,
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            index_host: index_host.trim_end_matches('/').to_string(),
            semaphore: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Embed one saved article and record its vector id. Callers treat any
    /// error as non-fatal: the article stays persisted with
    /// `is_embedded = false`.
    pub async fn embed_article(
        &self,
        store: &Store,
        article_id: i64,
        url: &str,
        title: &str,
        summary: Option<&str>,
        date_posted: Option<DateTime<Utc>>,
        classification: &ArticleClassification,
    ) -> Result<String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| anyhow!("Embedding semaphore closed"))?;

        let (city, state) = split_city_state(classification);
        let topics = classification_topics(classification);

        let text = build_embedding_text(title, city.as_deref(), state.as_deref(), &topics, summary);
        let vector = self.ai.embed(&text).await.context("Embedding request failed")?;

        let vector_id = format!("article_{article_id}");
        let location = match (&city, &state) {
            (Some(c), Some(s)) => format!("{c},{s}"),
            (Some(c), None) => c.clone(),
            _ => String::new(),
        };
        let metadata = serde_json::json!({
            "article_id": article_id.to_string(),
            "url": url,
            "title": title,
            "summary": summary.unwrap_or_default(),
            "date_posted": date_posted.map(|d| d.to_rfc3339()),
            "location": location,
            "topics": topics,
            "last_updated": Utc::now().to_rfc3339(),
        });

        self.upsert(&vector_id, &vector, metadata).await?;

        store
            .update_article_embedding(article_id, &vector_id)
            .await
            .context("Failed to record vector id")?;

        info!(article_id, vector_id, "Embedded article");
        Ok(vector_id)
    }

    async fn upsert(
        &self,
        vector_id: &str,
        values: &[f32],
        metadata: serde_json::Value,
    ) -> Result<()> {
        let body = serde_json::json!({
            "vectors": [{
                "id": vector_id,
                "values": values,
                "metadata": metadata,
            }],
            "namespace": "articles",
        });

        let resp = self
            .http
            .post(format!("{}/vectors/upsert", self.index_host))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Vector store request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector store upsert failed ({status}): {message}");
        }

        Ok(())
    }
}

/// City-scope articles embed with their full "city, state" location; the
/// state travels separately for filtering.
fn split_city_state(classification: &ArticleClassification) -> (Option<String>, Option<String>) {
    if classification.label != ScopeLabel::City {
        return (None, None);
    }
    let Some(slug) = classification.city_slug.as_deref() else {
        return (None, None);
    };

    let state = slug.split(',').nth(1).map(|s| s.trim().to_string());
    (Some(slug.trim().to_string()), state)
}

fn classification_topics(classification: &ArticleClassification) -> Vec<String> {
    match (&classification.label, &classification.industry_slug) {
        (ScopeLabel::Industry, Some(slug)) => vec![slug.clone()],
        _ => Vec::new(),
    }
}

/// Assemble the embedding input from labeled sections.
fn build_embedding_text(
    title: &str,
    city: Option<&str>,
    state: Option<&str>,
    topics: &[String],
    summary: Option<&str>,
) -> String {
    let mut parts = vec![format!("[TITLE]: {title}")];

    match (city, state) {
        (Some(city), _) => parts.push(format!("[LOCATION]: {city}")),
        (None, Some(state)) => parts.push(format!("[LOCATION]: {state}")),
        _ => {}
    }

    if !topics.is_empty() {
        parts.push(format!("[TOPICS]: {}", topics.join(", ")));
    }

    if let Some(summary) = summary.filter(|s| !s.is_empty()) {
        parts.push(format!("[SUMMARY]: {summary}"));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city_classification(slug: &str) -> ArticleClassification {
        ArticleClassification {
            label: ScopeLabel::City,
            city_slug: Some(slug.to_string()),
            industry_slug: None,
        }
    }

    #[test]
    fn splits_city_and_state() {
        let (city, state) = split_city_state(&city_classification("Seattle, WA"));
        assert_eq!(city.as_deref(), Some("Seattle, WA"));
        assert_eq!(state.as_deref(), Some("WA"));
    }

    #[test]
    fn non_city_scopes_have_no_location() {
        let (city, state) = split_city_state(&ArticleClassification::trash());
        assert!(city.is_none());
        assert!(state.is_none());
    }

    #[test]
    fn embedding_text_includes_labeled_sections() {
        let text = build_embedding_text(
            "Budget passes",
            Some("Seattle, WA"),
            Some("WA"),
            &["fintech".to_string()],
            Some("The council approved the budget."),
        );
        assert_eq!(
            text,
            "[TITLE]: Budget passes\n[LOCATION]: Seattle, WA\n[TOPICS]: fintech\n[SUMMARY]: The council approved the budget."
        );
    }

    #[test]
    fn embedding_text_omits_empty_sections() {
        let text = build_embedding_text("Budget passes", None, None, &[], None);
        assert_eq!(text, "[TITLE]: Budget passes");
    }
}
