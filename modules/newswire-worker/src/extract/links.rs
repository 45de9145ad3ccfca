//! Link collection from source pages: render with the browser engine and
//! harvest hrefs, falling back to the Diffbot List API.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use newswire_common::{canonicalize_url, is_article_url};

use crate::runtime::Runtime;

/// Source pages are link-heavy and slow; give navigation more room than
/// article fetches get.
const SOURCE_NAV_TIMEOUT: Duration = Duration::from_secs(10);

/// Matches `href` attributes — `<a href>`, `<link href>`, `<area href>`.
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// `og:url` metas sometimes carry canonical article URLs missing from hrefs.
static OG_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*property\s*=\s*["']og:url["'][^>]*content\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex")
});

/// Collect up to `limit` candidate article links from a source page.
/// Browser engine first; Diffbot List API on failure. Every returned link is
/// validated, canonicalized, and unique.
pub async fn collect_links(rt: &Runtime, source_url: &str, limit: usize) -> Result<Vec<String>> {
    match collect_with_browser(rt, source_url, limit).await {
        Ok(links) => {
            info!(source_url, count = links.len(), engine = "browser", "Collected links");
            return Ok(links);
        }
        Err(e) => {
            warn!(source_url, error = %e, "Browser link collection failed, falling back to Diffbot");
        }
    }

    let links = collect_with_diffbot(rt, source_url, limit)
        .await
        .with_context(|| format!("Link collection failed with both engines for {source_url}"))?;

    info!(source_url, count = links.len(), engine = "diffbot", "Collected links");
    Ok(links)
}

async fn collect_with_browser(rt: &Runtime, source_url: &str, limit: usize) -> Result<Vec<String>> {
    let page_html = rt.browserless.content(source_url, SOURCE_NAV_TIMEOUT).await?;
    if page_html.trim().is_empty() {
        anyhow::bail!("Empty HTML from browser engine");
    }
    Ok(harvest_links(&page_html, source_url, limit))
}

async fn collect_with_diffbot(rt: &Runtime, source_url: &str, limit: usize) -> Result<Vec<String>> {
    let token = rt.keys.acquire().await;
    let list = rt.diffbot.list(&token, source_url).await?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let candidates = list
        .items
        .into_iter()
        .filter_map(|item| item.link)
        .chain(list.next_pages);

    for candidate in candidates {
        if links.len() >= limit {
            break;
        }
        push_candidate(&candidate, source_url, &mut seen, &mut links);
    }

    Ok(links)
}

/// Harvest hrefs (plus og:url metas) from rendered HTML, resolving relative
/// URLs, filtering through the article-URL validator, canonicalizing, and
/// deduplicating, capped at `limit`.
pub(crate) fn harvest_links(html: &str, base_url: &str, limit: usize) -> Vec<String> {
    let base = url::Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let hrefs = HREF_RE.captures_iter(html).map(|cap| cap[1].to_string());
    let og_urls = OG_URL_RE.captures_iter(html).map(|cap| cap[1].to_string());

    for raw in hrefs.chain(og_urls) {
        if links.len() >= limit {
            break;
        }
        let Some(resolved) = resolve_href(&raw, base.as_ref()) else {
            continue;
        };
        push_candidate(&resolved, base_url, &mut seen, &mut links);
    }

    links
}

/// Resolve a raw href against the page URL, dropping the fragment.
fn resolve_href(raw: &str, base: Option<&url::Url>) -> Option<String> {
    let mut parsed = if raw.starts_with("http://") || raw.starts_with("https://") {
        url::Url::parse(raw).ok()?
    } else {
        base?.join(raw).ok()?
    };
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

fn push_candidate(
    candidate: &str,
    base_url: &str,
    seen: &mut HashSet<String>,
    links: &mut Vec<String>,
) {
    if !is_article_url(candidate, base_url) {
        return;
    }
    let Some(canonical) = canonicalize_url(candidate) else {
        return;
    };
    if seen.insert(canonical.clone()) {
        links.push(canonical);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com";

    #[test]
    fn harvests_valid_article_links() {
        let html = r#"
            <a href="https://example.com/news/story-one">One</a>
            <a href="/news/story-two">Two</a>
        "#;
        let links = harvest_links(html, BASE, 10);
        assert_eq!(
            links,
            vec![
                "https://example.com/news/story-one",
                "https://example.com/news/story-two",
            ]
        );
    }

    #[test]
    fn filters_non_article_links() {
        let html = r#"
            <a href="/news/story-one">Story</a>
            <a href="/about">About</a>
            <a href="/photo.jpg">Photo</a>
            <a href="https://facebook.com/sharer/sharer.php?u=x">Share</a>
            <a href="https://other-site.com/news/story">Elsewhere</a>
        "#;
        let links = harvest_links(html, BASE, 10);
        assert_eq!(links, vec!["https://example.com/news/story-one"]);
    }

    #[test]
    fn canonicalizes_and_deduplicates() {
        let html = r#"
            <a href="https://www.example.com/news/story-one/">A</a>
            <a href="https://example.com/news/story-one?utm_source=home">B</a>
        "#;
        let links = harvest_links(html, BASE, 10);
        assert_eq!(links, vec!["https://example.com/news/story-one"]);
    }

    #[test]
    fn fragment_links_resolve_to_page_urls() {
        let html = r##"<a href="/news/story-one#comments">Story</a>"##;
        let links = harvest_links(html, BASE, 10);
        assert_eq!(links, vec!["https://example.com/news/story-one"]);
    }

    #[test]
    fn respects_the_limit() {
        let html: String = (0..30)
            .map(|i| format!(r#"<a href="/news/story-{i}">s</a>"#))
            .collect();
        let links = harvest_links(&html, BASE, 5);
        assert_eq!(links.len(), 5);
    }

    #[test]
    fn reads_og_url_metas() {
        let html = r#"
            <meta property="og:url" content="https://example.com/news/canonical-story" />
        "#;
        let links = harvest_links(html, BASE, 10);
        assert_eq!(links, vec!["https://example.com/news/canonical-story"]);
    }

    #[test]
    fn empty_page_yields_no_links() {
        assert!(harvest_links("<p>no links</p>", BASE, 10).is_empty());
    }
}
