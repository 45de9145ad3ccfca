pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

/// Extra headroom on the HTTP request beyond the in-page navigation timeout,
/// covering queueing inside Browserless and response transfer.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint. `goto_timeout` bounds the in-page navigation; article fetches
    /// use a tight budget (~3s) while source-page renders get more.
    pub async fn content(&self, url: &str, goto_timeout: Duration) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "timeout": goto_timeout.as_millis() as u64,
                "waitUntil": "domcontentloaded",
            },
        });

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .timeout(goto_timeout + HTTP_TIMEOUT_MARGIN)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout(goto_timeout)
                } else {
                    BrowserlessError::from(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(url, status = status.as_u16(), "Browserless content request failed");
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
