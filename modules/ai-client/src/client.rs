use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{AiError, Result};
use crate::types::{ChatResponse, EmbeddingRequest, EmbeddingResponse};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Wire-level OpenAI client. Both completion flavors (plain chat and
/// schema-constrained) go through the same endpoint and differ only in the
/// request body, so a single generic post path serves everything.
pub(crate) struct OpenAiHttp {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiHttp {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// POST a JSON body and decode the JSON reply. Non-2xx statuses become
    /// typed API errors carrying the response text.
    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Run a completion request (chat or structured) and return the first
    /// choice's content.
    pub async fn completion<B: Serialize>(&self, request: &B) -> Result<String> {
        debug!("OpenAI completion request");

        let reply: ChatResponse = self.post("/chat/completions", request).await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AiError::EmptyResponse)
    }

    pub async fn embed(&self, model: &str, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: model.to_string(),
            input,
        };

        let reply: EmbeddingResponse = self.post("/embeddings", &request).await?;
        Ok(reply.data.into_iter().map(|d| d.embedding).collect())
    }
}
