mod client;
pub mod error;
pub mod schema;
mod types;
pub mod util;

pub use error::{AiError, Result};
pub use schema::StructuredOutput;

use client::OpenAiHttp;
use types::{ChatRequest, JsonSchemaFormat, ResponseFormat, StructuredRequest, WireMessage};

/// OpenAI client carrying a default chat model and embedding model.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AiError::MissingApiKey)?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiHttp {
        let client = OpenAiHttp::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Simple chat completion with a system and user message.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        };

        self.client().completion(&request).await
    }

    /// Type-safe structured output extraction. The response is constrained to
    /// the JSON schema derived from `T` and deserialized into it.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        temperature: f32,
    ) -> Result<T> {
        let request = StructuredRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(system_prompt),
                WireMessage::user(user_prompt),
            ],
            temperature: Some(temperature),
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "structured_response".to_string(),
                    strict: true,
                    schema: T::openai_schema(),
                },
            },
        };

        let raw = self.client().completion(&request).await?;
        let cleaned = util::strip_code_blocks(&raw);

        serde_json::from_str(cleaned).map_err(|e| AiError::Malformed(e.to_string()))
    }

    /// Create an embedding for one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .client()
            .embed(
                &self.embedding_model,
                serde_json::Value::String(text.to_string()),
            )
            .await?;

        if vectors.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(vectors.remove(0))
    }

    /// Create embeddings for a batch of texts, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let input = serde_json::Value::Array(
            texts
                .iter()
                .map(|t| serde_json::Value::String(t.clone()))
                .collect(),
        );
        self.client().embed(&self.embedding_model, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_defaults() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.embedding_model, "text-embedding-3-small");
        assert!(ai.base_url.is_none());
    }

    #[test]
    fn builder_overrides() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_embedding_model("text-embedding-3-large")
            .with_base_url("https://proxy.example.com/v1");
        assert_eq!(ai.embedding_model, "text-embedding-3-large");
        assert_eq!(ai.base_url.as_deref(), Some("https://proxy.example.com/v1"));
    }
}
