//! Audience classification via the LLM. Any failure — API, parse, or schema —
//! degrades to a trash classification: a misfiled article is recoverable, a
//! crashed source job is not.

use ai_client::util::truncate_to_char_boundary;
use ai_client::OpenAi;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use newswire_common::{ArticleClassification, ScopeLabel};

use crate::prompts;

/// First N bytes of article text shown to the classifier.
const CLASSIFIER_TEXT_BUDGET: usize = 1000;

#[derive(Debug, Deserialize, JsonSchema)]
struct ClassificationResponse {
    /// "city", "global", "industry", or "trash"
    label: String,
    /// "City, State" for city-scope articles
    city_slug: Option<String>,
    /// Lowercase industry slug for industry-scope articles
    industry_slug: Option<String>,
}

pub async fn classify_content(
    ai: &OpenAi,
    title: &str,
    text: &str,
    url: &str,
) -> ArticleClassification {
    let prompt = prompts::fill(
        prompts::CLASSIFIER_PROMPT,
        &[
            ("url", url),
            ("title", title),
            ("text", truncate_to_char_boundary(text, CLASSIFIER_TEXT_BUDGET)),
        ],
    );

    let response: ClassificationResponse =
        match ai.extract(prompts::CLASSIFIER_SYSTEM, prompt, 0.1).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Classification failed, defaulting to trash");
                return ArticleClassification::trash();
            }
        };

    let classification = validate_classification(response);
    info!(url, label = classification.label.as_str(), "Classified article");
    classification
}

/// Enforce the label contract: unknown labels and scoped labels missing their
/// slug collapse to trash; city slugs without a state get one appended.
fn validate_classification(response: ClassificationResponse) -> ArticleClassification {
    let label = match response.label.as_str() {
        "city" => ScopeLabel::City,
        "global" => ScopeLabel::Global,
        "industry" => ScopeLabel::Industry,
        "trash" => ScopeLabel::Trash,
        other => {
            warn!(label = other, "Unknown classification label, defaulting to trash");
            return ArticleClassification::trash();
        }
    };

    let city_slug = response.city_slug.filter(|s| !s.trim().is_empty());
    let industry_slug = response.industry_slug.filter(|s| !s.trim().is_empty());

    match label {
        ScopeLabel::City => {
            let Some(slug) = city_slug else {
                warn!("City classification missing city_slug, defaulting to trash");
                return ArticleClassification::trash();
            };
            let slug = if slug.contains(',') {
                slug
            } else {
                format!("{slug}, Unknown State")
            };
            ArticleClassification {
                label,
                city_slug: Some(slug),
                industry_slug: None,
            }
        }
        ScopeLabel::Industry => {
            let Some(slug) = industry_slug else {
                warn!("Industry classification missing industry_slug, defaulting to trash");
                return ArticleClassification::trash();
            };
            ArticleClassification {
                label,
                city_slug: None,
                industry_slug: Some(slug),
            }
        }
        ScopeLabel::Global => ArticleClassification {
            label,
            city_slug: None,
            industry_slug: None,
        },
        ScopeLabel::Trash => ArticleClassification::trash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(label: &str, city: Option<&str>, industry: Option<&str>) -> ClassificationResponse {
        ClassificationResponse {
            label: label.to_string(),
            city_slug: city.map(String::from),
            industry_slug: industry.map(String::from),
        }
    }

    #[test]
    fn unknown_label_becomes_trash() {
        let c = validate_classification(response("spam", None, None));
        assert_eq!(c.label, ScopeLabel::Trash);
    }

    #[test]
    fn city_without_slug_becomes_trash() {
        let c = validate_classification(response("city", None, None));
        assert_eq!(c.label, ScopeLabel::Trash);
    }

    #[test]
    fn city_slug_without_state_gets_one_appended() {
        let c = validate_classification(response("city", Some("Portland"), None));
        assert_eq!(c.city_slug.as_deref(), Some("Portland, Unknown State"));
    }

    #[test]
    fn city_slug_with_state_is_preserved() {
        let c = validate_classification(response("city", Some("Seattle, WA"), None));
        assert_eq!(c.city_slug.as_deref(), Some("Seattle, WA"));
    }

    #[test]
    fn industry_without_slug_becomes_trash() {
        let c = validate_classification(response("industry", None, None));
        assert_eq!(c.label, ScopeLabel::Trash);
    }

    #[test]
    fn global_drops_stray_slugs() {
        let c = validate_classification(response("global", Some("Seattle, WA"), Some("fintech")));
        assert_eq!(c.label, ScopeLabel::Global);
        assert!(c.city_slug.is_none());
        assert!(c.industry_slug.is_none());
    }
}
