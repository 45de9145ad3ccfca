//! Prompt templates for the classifier, summarizer, and date extraction.
//!
//! Placeholders use `{name}` markers substituted with `str::replace` so the
//! templates can contain literal JSON braces without escaping.

pub const CLASSIFIER_SYSTEM: &str =
    "You are a content classifier assistant that responds with valid JSON only.";

pub const CLASSIFIER_PROMPT: &str = r#"Classify this news article by its audience.

Labels:
- "city": the story matters primarily to residents of one city or metro area.
  Include "city_slug" as "City, State" (e.g. "Seattle, WA").
- "industry": the story matters primarily to one industry or profession.
  Include "industry_slug" as a short lowercase slug (e.g. "fintech").
- "global": genuine news of broad interest that is neither city- nor
  industry-scoped.
- "trash": not a news article — navigation pages, ads, error pages, category
  listings, product pages, boilerplate, or content-free fragments.

URL: {url}
Title: {title}
Content: {text}

Respond with JSON: {"label": ..., "city_slug": ..., "industry_slug": ...}.
Set unused slug fields to null. When in doubt between trash and anything
else, choose trash."#;

pub const SUMMARIZER_SYSTEM: &str = "You analyze news articles and provide structured \
summaries and metadata. Always respond with valid JSON.";

pub const CITY_PROMPT: &str = r#"Analyze this local news article and produce a structured summary for city readers.

ARTICLE CONTENT:
{content}

METADATA:
{metadata}

Produce JSON with these fields:
- "title": a clean headline for the story (rewrite clickbait plainly)
- "short_summary": 1-2 sentences, the story at a glance
- "medium_summary": one paragraph with the key facts
- "long_summary": 2-3 paragraphs covering who, what, where, when, why
- "topic": one of Government | Finance | Sports | Local News | Culture | Crime
- "main_topic": the dominant subject (e.g. Politics, Business, Technology)
- "subtopics": up to two narrower subjects as an array of strings
- "score": 0-100 newsworthiness for a local reader (100 = must-read)"#;

pub const GLOBAL_INDUSTRY_PROMPT: &str = r#"Analyze this news article and produce a structured summary.

ARTICLE CONTENT:
{content}

METADATA:
{metadata}

Produce JSON with these fields:
- "title": a clean headline for the story (rewrite clickbait plainly)
- "short_summary": 1-2 sentences, the story at a glance
- "topic": one of Government | Finance | Sports | World | Technology | Culture
- "main_topic": the dominant subject (e.g. Politics, Business, Technology)
- "subtopics": up to two narrower subjects as an array of strings
- "score": 0-100 newsworthiness (100 = must-read)
Set "medium_summary" and "long_summary" to null."#;

pub const DATE_SYSTEM: &str = "You are an expert at extracting publication dates from news \
articles. You analyze both metadata and content to find when an article was published.";

pub const DATE_PROMPT: &str = r#"Extract the publication date of this news article.

METADATA:
{metadata}

ARTICLE CONTENT:
{content}

INSTRUCTIONS:
1. Check the metadata first for fields like 'date', 'article:published_time', 'pubdate'.
2. Otherwise search the content: bylines, "Published on", "Posted on",
   timestamps near the title or author, datelines, relative dates like
   "2 hours ago" or "yesterday".
3. Prefer the publication date over event dates mentioned in the story.

Return ONLY the date string exactly as found — do not reformat it.
If no publication date exists, return "Date not found".

Date found:"#;

/// Substitute `{name}` placeholders in a template.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_substitutes_named_placeholders() {
        let out = fill("a {x} b {y}", &[("x", "1"), ("y", "2")]);
        assert_eq!(out, "a 1 b 2");
    }

    #[test]
    fn fill_leaves_json_braces_alone() {
        let out = fill(r#"{"label": {label}}"#, &[("label", "\"city\"")]);
        assert_eq!(out, r#"{"label": "city"}"#);
    }
}
