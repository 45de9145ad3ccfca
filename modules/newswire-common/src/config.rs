use std::env;

use anyhow::{bail, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI provider
    pub openai_api_key: String,

    // Extraction engines
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    /// Comma-separated list in DIFFBOT_KEYS. Each key is limited to 5 calls/minute.
    pub diffbot_keys: Vec<String>,

    // Vector store (required only when embeddings are enabled)
    pub pinecone_api_key: String,
    pub pinecone_index_host: String,

    // Feature flags
    pub enable_embeddings: bool,
    pub max_concurrent_embeddings: usize,

    // Worker
    /// Base seconds between empty queue polls.
    pub worker_poll_interval: u64,

    // API server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load config for the worker process. Loads `.env` if present.
    pub fn worker_from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: required_env("DATABASE_URL")?,
            openai_api_key: required_env("OPENAI_API_KEY")?,
            browserless_url: required_env("BROWSERLESS_URL")?,
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            diffbot_keys: comma_list(&required_env("DIFFBOT_KEYS")?),
            pinecone_api_key: env::var("PINECONE_API_KEY").unwrap_or_default(),
            pinecone_index_host: env::var("PINECONE_INDEX_HOST").unwrap_or_default(),
            enable_embeddings: bool_env("ENABLE_EMBEDDINGS", true),
            max_concurrent_embeddings: env::var("MAX_CONCURRENT_EMBEDDINGS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            worker_poll_interval: env::var("WORKER_POLL_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            api_host: String::new(),
            api_port: 0,
        };

        if config.diffbot_keys.is_empty() {
            bail!("DIFFBOT_KEYS must contain at least one key");
        }
        if config.enable_embeddings
            && (config.pinecone_api_key.is_empty() || config.pinecone_index_host.is_empty())
        {
            bail!(
                "PINECONE_API_KEY and PINECONE_INDEX_HOST are required \
                 (or set ENABLE_EMBEDDINGS=false)"
            );
        }

        Ok(config)
    }

    /// Load config for the API server. Only the database is required — the API
    /// never talks to extraction or AI backends.
    pub fn api_from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            openai_api_key: String::new(),
            browserless_url: String::new(),
            browserless_token: None,
            diffbot_keys: Vec::new(),
            pinecone_api_key: String::new(),
            pinecone_index_host: String::new(),
            enable_embeddings: false,
            max_concurrent_embeddings: 0,
            worker_poll_interval: 0,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .or_else(|_| env::var("PORT"))
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        })
    }

    /// Log the shape of each sensitive value without leaking it.
    pub fn log_redacted(&self) {
        let vars = [
            ("DATABASE_URL", self.database_url.len()),
            ("OPENAI_API_KEY", self.openai_api_key.len()),
            ("BROWSERLESS_URL", self.browserless_url.len()),
            ("PINECONE_API_KEY", self.pinecone_api_key.len()),
        ];
        for (name, len) in vars {
            if len == 0 {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({len} chars)");
            }
        }
        tracing::info!("DIFFBOT_KEYS = ({} keys)", self.diffbot_keys.len());
    }
}

fn required_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{key} environment variable is required"),
    }
}

fn bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "y"))
        .unwrap_or(default)
}

fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_list_trims_and_drops_empties() {
        assert_eq!(comma_list("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(comma_list("").is_empty());
    }
}
