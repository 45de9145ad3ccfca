//! HTML reduction: markdown conversion, chrome-stripping, and title/metadata
//! harvesting from rendered pages.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));

/// Structural chrome: navigation, headers, footers, sidebars.
static CHROME_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<nav.*?</nav>",
        r"(?is)<header.*?</header>",
        r"(?is)<footer.*?</footer>",
        r"(?is)<aside.*?</aside>",
        r#"(?is)<div[^>]*class="[^"]*(?:ad|advertisement|banner|sidebar|footer|header|nav|menu|social|related|comment)[^"]*".*?</div>"#,
        r#"(?is)<div[^>]*id="[^"]*(?:ad|advertisement|banner|sidebar|footer|header|nav|menu|social|related|comment)[^"]*".*?</div>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid regex"));

/// Convert raw HTML into clean markdown using Readability extraction.
pub fn html_to_markdown(html: &str, url: Option<&str>) -> String {
    let parsed_url = url.and_then(|u| url::Url::parse(u).ok());
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    transform_content_input(input, &config)
}

/// Strip headers, footers, navigation, sidebars, ad containers, scripts and
/// styles, keeping the main article body. The result is what the AI sees for
/// date extraction and summarization.
pub fn clean_html_for_analysis(html: &str) -> String {
    let mut cleaned = SCRIPT_RE.replace_all(html, "").into_owned();
    cleaned = STYLE_RE.replace_all(&cleaned, "").into_owned();

    for re in CHROME_RES.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }

    BLANK_LINES_RE
        .replace_all(&cleaned, "\n\n")
        .trim()
        .to_string()
}

/// Flatten HTML to whitespace-collapsed plain text.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, " ");
    WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// The document `<title>` text, whitespace-collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    let element = document.select(&selector).next()?;
    let title = element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    (!title.is_empty()).then_some(title)
}

/// All `<meta name|property=... content=...>` pairs from the document.
/// Later duplicates do not overwrite earlier ones.
pub fn extract_metadata(html: &str) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("meta") else {
        return metadata;
    };

    for element in document.select(&selector) {
        let tag = element.value();
        let Some(key) = tag.attr("name").or_else(|| tag.attr("property")) else {
            continue;
        };
        let Some(content) = tag.attr("content") else {
            continue;
        };
        if !content.is_empty() {
            metadata
                .entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_html_strips_chrome_and_scripts() {
        let html = r#"
            <header>Site name</header>
            <nav><a href="/">Home</a></nav>
            <script>track();</script>
            <style>.a{color:red}</style>
            <p>The city council voted on Tuesday.</p>
            <div class="sidebar-widget">Trending</div>
            <footer>© 2024</footer>
        "#;
        let cleaned = clean_html_for_analysis(html);
        assert!(cleaned.contains("city council voted"));
        assert!(!cleaned.contains("Site name"));
        assert!(!cleaned.contains("track()"));
        assert!(!cleaned.contains("Trending"));
        assert!(!cleaned.contains("© 2024"));
    }

    #[test]
    fn html_to_text_collapses_whitespace() {
        let html = "<p>First   paragraph</p>\n\n<p>Second</p>";
        assert_eq!(html_to_text(html), "First paragraph Second");
    }

    #[test]
    fn title_is_extracted_and_trimmed() {
        let html = "<html><head><title>  Budget passes  </title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Budget passes"));
        assert!(extract_title("<html></html>").is_none());
    }

    #[test]
    fn title_with_entities_and_nested_whitespace() {
        let html = "<title>Budget\n        passes &amp; taxes hold</title>";
        assert_eq!(
            extract_title(html).as_deref(),
            Some("Budget passes & taxes hold")
        );
    }

    #[test]
    fn metadata_reads_name_and_property_tags() {
        let html = r#"
            <meta name="date" content="2024-06-15">
            <meta property="og:title" content="A story" />
            <meta name="empty" content="">
            <meta charset="utf-8">
        "#;
        let meta = extract_metadata(html);
        assert_eq!(meta.get("date").map(String::as_str), Some("2024-06-15"));
        assert_eq!(meta.get("og:title").map(String::as_str), Some("A story"));
        assert!(!meta.contains_key("empty"));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn first_meta_value_wins_on_duplicates() {
        let html = r#"
            <meta name="date" content="2024-01-01">
            <meta name="date" content="1999-01-01">
        "#;
        let meta = extract_metadata(html);
        assert_eq!(meta.get("date").map(String::as_str), Some("2024-01-01"));
    }
}
