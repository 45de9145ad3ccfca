use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffbotError>;

#[derive(Debug, Error)]
pub enum DiffbotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Diffbot quota exceeded for key")]
    QuotaExceeded,

    #[error("Diffbot rejected key (forbidden)")]
    Forbidden,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Diffbot returned no objects for {0}")]
    Empty(String),
}

impl From<reqwest::Error> for DiffbotError {
    fn from(err: reqwest::Error) -> Self {
        DiffbotError::Network(err.to_string())
    }
}
