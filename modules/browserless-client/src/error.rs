use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Navigation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // The outer HTTP timeout; the caller-supplied goto timeout is
            // reported separately by the client.
            return BrowserlessError::Network(format!("request timed out: {err}"));
        }
        BrowserlessError::Network(err.to_string())
    }
}
