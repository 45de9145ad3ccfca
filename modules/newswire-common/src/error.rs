use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewswireError {
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid job payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
