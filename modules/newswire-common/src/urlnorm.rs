//! URL canonicalization and article-link filtering.
//!
//! Canonical URLs are the dedup key for the whole pipeline: two spellings of
//! the same page must canonicalize to the same string before they reach the
//! processed-URL set.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Query parameters stripped during canonicalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "_ga",
    "ref",
    "source",
];

/// File extensions that are never article pages.
static NON_CONTENT_EXTENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\.(jpg|jpeg|png|gif|bmp|webp|svg|ico|tiff|mp4|avi|mov|wmv|flv|mkv|m4v|webm|mp3|wav|ogg|m4a|aac|css|js|json|xml|rss|pdf|zip|rar|doc|docx|xls|xlsx|ppt|pptx)$",
    )
    .expect("valid regex")
});

static SOCIAL_HOSTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(facebook\.com|twitter\.com|instagram\.com|linkedin\.com|youtube\.com|tiktok\.com|pinterest\.com)",
    )
    .expect("valid regex")
});

/// Hostname fragments that identify static/media/CDN hosts.
const STATIC_MEDIA_HOSTS: &[&str] = &[
    "images.",
    "img.",
    "cdn.",
    "static.",
    "image.",
    "media.",
    "assets.",
    "videos.",
    "video.",
    "pics.",
    "photos.",
    "thumbs.",
    "thumbnail.",
    "mcdn.",
    "lura.live",
    "cloudfront.net",
    "akamai.net",
    "fastly.net",
    "cloudinary.com",
    "foxtv.",
    "q13fox.",
];

/// Query fragments that mark print/share/navigation views rather than content.
const SKIP_QUERY_PARAMS: &[&str] = &[
    "print=", "share=", "format=", "output=", "view=", "action=", "filter=", "sort=", "search=",
    "query=", "page=", "ref=",
];

const SOCIAL_SHARE_PATTERNS: &[&str] = &[
    "/sharer/",
    "/share?",
    "share-offsite",
    "linkedin.com/sharing",
    "facebook.com/sharer",
    "twitter.com/share",
    "pinterest.com/pin",
];

/// Section landing pages. An exact path match is a listing, not an article;
/// a deeper path under the same section is allowed.
const SECTION_PATHS: &[&str] = &[
    "/live", "/news", "/sports", "/weather", "/shows", "/about", "/contact", "/search", "/tag",
    "/category",
];

/// Government-site navigation paths. A trailing `$` means exact match only.
const GOV_SKIP_PATHS: &[&str] = &[
    "/city-government",
    "/departments",
    "/services",
    "/business",
    "/community",
    "/recreation",
    "/permits",
    "/utilities",
    "/transportation",
    "/city-council",
    "/mayor",
    "/administration",
    "/planning",
    "/development",
    "/police",
    "/video",
    "/fire",
    "/parks",
    "/library",
    "/myaccount",
    "/myaccount.aspx",
    "/business.aspx",
    "/our-community",
    "/our-community.aspx",
    "/municipal",
    "/public-works",
    "/discover",
    "/city-news$",
    "/resident-resources",
    "/newcomers-guide",
    "/about",
    "/contact",
    "/faqs",
    "/meetings",
    "/events",
    "/calendar",
];

const NON_ARTICLE_PATHS: &[&str] = &[
    "/search",
    "/tag",
    "/category",
    "/author",
    "/about",
    "/contact",
    "/privacy",
    "/terms",
    "/login",
    "/register",
    "/welcome",
    "/public-safety",
    "/public-safety.aspx",
    "/public-safety.html",
    "/public-safety.php",
    "/public-safety.asp",
    "/subscribe",
    "/subscription",
    "/wp-admin",
    "/wp-includes",
    "/cdn-cgi",
    "/emergency-preparedness",
    "/static",
    "/media",
    "/images",
    "/css",
    "/js",
    "/fonts",
    "/doing-business",
    "/assets",
    "/weather",
    "/traffic",
    "/contests",
    "/apps",
    "/advertise",
    "/advertise-with-us",
    "/careers",
    "/jobs",
    "/staff",
    "/newsletters",
    "/help",
    "/faq",
    "/support",
    "/calendar",
    "/events",
    "/directory",
    "/classified",
    "/person",
    "/winning-question",
    "/links-you-saw-on-tv",
    "/profilecreate",
    "/profilecreate.aspx",
    "/profileedit",
    "/profileedit.aspx",
    "/profileview",
    "/profileview.aspx",
    "/marketplace",
    "/shop",
    "/donate",
    "/giving",
    "/sponsors",
    "/discover",
    "/development",
    "/development-pipeline",
    "/team",
    "/pipeline",
    "/projects",
    "/construction",
    "/future-projects",
    "/eeo-report",
    "/public-file",
    "/closed-captioning",
    "/business",
    "/business.aspx",
    "/our-community",
    "/our-community.aspx",
    "/city-services",
    "/fcc-applications",
    "/fcc-public-file",
    "/station-info",
    "/corporate-info",
    "/legal",
    "/accessibility-statement",
];

/// Registrable domains that never host news articles. Used by the
/// pre-extraction screen, not the per-source link validator.
const NON_NEWS_DOMAINS: &[&str] = &[
    "apps.apple.com",
    "play.google.com",
    "chrome.google.com",
    "itunes.apple.com",
    "music.apple.com",
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "linkedin.com",
    "instagram.com",
    "pinterest.com",
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "amazon.com",
    "ebay.com",
    "etsy.com",
    "wikipedia.org",
    "wikimedia.org",
];

/// URL fragments that mark feeds, APIs, and boilerplate pages.
const NON_NEWS_PATH_PATTERNS: &[&str] = &[
    "/privacy-policy",
    "/privacy",
    "/terms-of-service",
    "/terms",
    "/contact-us",
    "/contact",
    "/about-us",
    "/about",
    "/advertise-with-us",
    "/advertise",
    "/sitemap",
    "/robots.txt",
    ".xml",
    ".json",
    "/feed",
    "/rss",
    "/feeds/",
    ".rss",
    ".atom",
    "/api/",
    "/wp-json/",
    "/xmlrpc.php",
];

// =============================================================================
// Canonicalization
// =============================================================================

/// Canonicalize a URL into the pipeline's dedup key.
///
/// Lowercases scheme and host, strips a leading `www.`, removes tracking
/// query parameters, sorts the remaining parameters by key then value, drops
/// the fragment, and trims the trailing slash from non-root paths. Idempotent
/// and independent of query parameter order. Returns `None` for strings that
/// don't parse as absolute URLs with a host.
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let path = parsed.path().trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    let mut canonical = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        canonical.push_str(&format!(":{port}"));
    }
    canonical.push_str(path);

    if !pairs.is_empty() {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        canonical.push('?');
        canonical.push_str(&serializer.finish());
    }

    Some(canonical)
}

// =============================================================================
// Article-URL validation
// =============================================================================

/// Decide whether a candidate link from a source page should be followed.
///
/// Rules run in order; the first rejection wins. Two escape hatches override
/// everything: CivicAlerts pages and campaign-archive.com newsletters are
/// always accepted.
pub fn is_article_url(url: &str, base_url: &str) -> bool {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return false;
    }

    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_lowercase();
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let query = parsed.query().unwrap_or_default();
    let full_url = url.to_lowercase();

    // Escape hatches win over every rejection rule below.
    if path.contains("civicalerts.aspx") || host == "campaign-archive.com" {
        return true;
    }

    // Homepage or fragment-only link.
    if path.is_empty() || path == "/" || url.contains('#') {
        return false;
    }

    if NON_CONTENT_EXTENSIONS.is_match(&path) {
        return false;
    }

    if STATIC_MEDIA_HOSTS.iter().any(|p| host.contains(p)) {
        return false;
    }

    if SKIP_QUERY_PARAMS.iter().any(|p| query.contains(p)) {
        return false;
    }

    if SOCIAL_SHARE_PATTERNS.iter().any(|p| full_url.contains(p)) {
        return false;
    }

    if SOCIAL_HOSTS.is_match(url) {
        return false;
    }

    // Section landing pages are listings, not articles.
    if SECTION_PATHS.iter().any(|section| path == *section) {
        return false;
    }

    if host.contains(".gov") && !passes_gov_rules(&path) {
        return false;
    }

    for pattern in NON_ARTICLE_PATHS {
        if path == *pattern || path.starts_with(&format!("{pattern}/")) {
            return false;
        }
    }

    same_site_or_cdn(&host, base_url)
}

/// Government sites are navigation-heavy; only `/city-news/<slug>` pages with
/// real content segments are worth following.
fn passes_gov_rules(path: &str) -> bool {
    if let Some(rest) = path.strip_prefix("/city-news/") {
        return rest.split('/').any(|s| !s.is_empty());
    }

    if path == "/" || path.ends_with("/home") || path.ends_with("/index") {
        return false;
    }

    for skip in GOV_SKIP_PATHS {
        if let Some(exact) = skip.strip_suffix('$') {
            if path == exact {
                return false;
            }
        } else if path.starts_with(skip) {
            return false;
        }
    }

    true
}

/// The link must stay on the source's registrable domain (or a subdomain), or
/// live on an allow-listed CDN host.
fn same_site_or_cdn(host: &str, base_url: &str) -> bool {
    let Some(base_host) = Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    else {
        return false;
    };

    let base_host = base_host.strip_prefix("www.").unwrap_or(&base_host).to_string();
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host == base_host || host.ends_with(&format!(".{base_host}")) {
        return true;
    }

    STATIC_MEDIA_HOSTS.iter().any(|cdn| host.contains(cdn))
}

/// Pre-extraction screen: obvious non-news URLs that should be marked trash
/// without spending an extraction call. Everything that passes goes to the AI
/// classifier, which makes the real content decision.
pub fn is_likely_news_url(url: &str) -> bool {
    let lower = url.to_lowercase();

    let Ok(parsed) = Url::parse(&lower) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);

    if NON_NEWS_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    {
        return false;
    }

    if NON_NEWS_PATH_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- canonicalization ---

    #[test]
    fn canonicalizes_scheme_host_tracking_and_fragment() {
        let canonical =
            canonicalize_url("HTTP://WWW.Example.COM/Page/?utm_source=t&id=1#frag").unwrap();
        assert_eq!(canonical, "http://example.com/Page?id=1");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let inputs = [
            "https://www.example.com/a/b/?z=2&a=1&utm_campaign=x",
            "http://EXAMPLE.com/",
            "https://news.example.com/story?id=9&fbclid=abc",
            "https://example.com:8080/path/",
        ];
        for input in inputs {
            let once = canonicalize_url(input).unwrap();
            let twice = canonicalize_url(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn query_order_does_not_matter() {
        let a = canonicalize_url("https://example.com/x?b=2&a=1&c=3").unwrap();
        let b = canonicalize_url("https://example.com/x?c=3&a=1&b=2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn repeated_keys_sort_by_value() {
        let a = canonicalize_url("https://example.com/x?t=b&t=a").unwrap();
        let b = canonicalize_url("https://example.com/x?t=a&t=b").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "https://example.com/x?t=a&t=b");
    }

    #[test]
    fn root_path_is_preserved() {
        assert_eq!(
            canonicalize_url("https://www.example.com/").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            canonicalize_url("https://example.com").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn unparseable_input_is_none() {
        assert!(canonicalize_url("not a url").is_none());
        assert!(canonicalize_url("").is_none());
    }

    // --- article-URL validation (spec'd scenarios) ---

    #[test]
    fn accepts_article_under_section() {
        assert!(is_article_url(
            "https://example.com/news/story-x",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_section_root() {
        assert!(!is_article_url(
            "https://example.com/news",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_static_subdomain() {
        assert!(!is_article_url(
            "https://images.example.com/x",
            "https://example.com"
        ));
    }

    #[test]
    fn accepts_gov_city_news_article() {
        assert!(is_article_url(
            "https://city.gov/city-news/budget-2024",
            "https://city.gov"
        ));
    }

    #[test]
    fn rejects_gov_navigation_page() {
        assert!(!is_article_url(
            "https://city.gov/departments",
            "https://city.gov"
        ));
    }

    #[test]
    fn rejects_gov_city_news_root() {
        assert!(!is_article_url(
            "https://city.gov/city-news/",
            "https://city.gov"
        ));
    }

    #[test]
    fn rejects_non_content_extension() {
        assert!(!is_article_url(
            "https://example.com/foo.pdf",
            "https://example.com"
        ));
    }

    #[test]
    fn civicalerts_escape_hatch_wins() {
        assert!(is_article_url(
            "https://example.com/civicalerts.aspx?id=9",
            "https://example.com"
        ));
    }

    #[test]
    fn campaign_archive_escape_hatch_wins() {
        assert!(is_article_url(
            "https://campaign-archive.com/?u=abc&id=def",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_homepage_and_fragments() {
        assert!(!is_article_url("https://example.com/", "https://example.com"));
        assert!(!is_article_url(
            "https://example.com/story#comments",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_wrong_scheme() {
        assert!(!is_article_url("ftp://example.com/story", "https://example.com"));
        assert!(!is_article_url("mailto:x@example.com", "https://example.com"));
    }

    #[test]
    fn rejects_social_hosts_and_share_links() {
        assert!(!is_article_url(
            "https://facebook.com/sharer/sharer.php?u=x",
            "https://example.com"
        ));
        assert!(!is_article_url(
            "https://twitter.com/example/status/1",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_skip_query_params() {
        assert!(!is_article_url(
            "https://example.com/story?print=1",
            "https://example.com"
        ));
        assert!(!is_article_url(
            "https://example.com/archive?page=3",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_cross_domain_but_allows_subdomain() {
        assert!(!is_article_url(
            "https://other.com/news/story",
            "https://example.com"
        ));
        assert!(is_article_url(
            "https://blog.example.com/news/story",
            "https://example.com"
        ));
    }

    #[test]
    fn rejects_non_article_paths() {
        assert!(!is_article_url(
            "https://example.com/careers/openings",
            "https://example.com"
        ));
        assert!(!is_article_url(
            "https://example.com/subscribe",
            "https://example.com"
        ));
    }

    // --- pre-extraction screen ---

    #[test]
    fn screens_out_non_news_domains() {
        assert!(!is_likely_news_url("https://github.com/rust-lang/rust"));
        assert!(!is_likely_news_url("https://en.wikipedia.org/wiki/Rust"));
        assert!(is_likely_news_url("https://example.com/news/story-x"));
    }

    #[test]
    fn screens_out_feeds_and_api_paths() {
        assert!(!is_likely_news_url("https://example.com/feed"));
        assert!(!is_likely_news_url("https://example.com/wp-json/wp/v2/posts"));
        assert!(!is_likely_news_url("https://example.com/sitemap.xml"));
    }
}
