pub mod error;
pub mod types;

pub use error::{DiffbotError, Result};
pub use types::{DiffbotArticle, DiffbotList, DiffbotListItem};

use std::time::Duration;

use types::ApiResponse;

const BASE_URL: &str = "https://api.diffbot.com/v3";

/// Per-request budget for article extraction.
const ARTICLE_TIMEOUT: Duration = Duration::from_secs(15);
/// Per-request budget for listing page links.
const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stateless client for the Diffbot extraction APIs. The token is supplied
/// per call so a rate-limited key pool can rotate keys between requests.
pub struct DiffbotClient {
    client: reqwest::Client,
    base_url: String,
}

impl DiffbotClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Extract one article. Returns the first object from the response.
    pub async fn article(&self, token: &str, url: &str) -> Result<DiffbotArticle> {
        let endpoint = format!("{}/article", self.base_url);

        tracing::debug!(url, "Diffbot article request");

        let resp = self
            .client
            .get(&endpoint)
            .query(&[("token", token), ("url", url), ("fields", "meta")])
            .timeout(ARTICLE_TIMEOUT)
            .send()
            .await?;

        let body: ApiResponse<DiffbotArticle> = Self::check(resp).await?.json().await?;

        body.objects
            .into_iter()
            .next()
            .ok_or_else(|| DiffbotError::Empty(url.to_string()))
    }

    /// List the links on an index/section page.
    pub async fn list(&self, token: &str, url: &str) -> Result<DiffbotList> {
        let endpoint = format!("{}/list", self.base_url);

        tracing::debug!(url, "Diffbot list request");

        let resp = self
            .client
            .get(&endpoint)
            .query(&[("token", token), ("url", url)])
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;

        let body: ApiResponse<DiffbotListItem> = Self::check(resp).await?.json().await?;

        Ok(DiffbotList {
            items: body.objects,
            next_pages: body.next_pages,
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        match status.as_u16() {
            200..=299 => Ok(resp),
            429 => Err(DiffbotError::QuotaExceeded),
            403 => Err(DiffbotError::Forbidden),
            code => {
                let message = resp.text().await.unwrap_or_default();
                Err(DiffbotError::Api {
                    status: code,
                    message,
                })
            }
        }
    }
}

impl Default for DiffbotClient {
    fn default() -> Self {
        Self::new()
    }
}
