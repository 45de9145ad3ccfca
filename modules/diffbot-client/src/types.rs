use serde::Deserialize;

/// Envelope shared by the Article and List endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default = "Vec::new")]
    pub objects: Vec<T>,
    #[serde(default = "Vec::new", rename = "nextPages")]
    pub next_pages: Vec<String>,
}

/// One extracted article from the Article API.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffbotArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    /// RFC-1123-style timestamp, e.g. "Thu, 29 May 2025 11:15:17 GMT".
    #[serde(default)]
    pub date: Option<String>,
    /// Page meta tags, present when the `meta` field is requested.
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// One entry from the List API.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffbotListItem {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// The List API result: page links plus pagination URLs.
#[derive(Debug, Clone)]
pub struct DiffbotList {
    pub items: Vec<DiffbotListItem>,
    pub next_pages: Vec<String>,
}
