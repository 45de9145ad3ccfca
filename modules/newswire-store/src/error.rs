use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique violation on the processed-URL set. The URL is already known,
    /// which callers treat as success, and the retry wrapper never retries.
    #[error("URL already recorded as processed: {0}")]
    AlreadyProcessed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Whether this failure is worth retrying with backoff. Prefers typed
    /// driver error kinds; falls back to message sniffing for faults the
    /// driver surfaces only as protocol errors.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::AlreadyProcessed(_) => false,
            StoreError::Migration(_) => false,
            StoreError::Database(e) => match e {
                sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed => true,
                other => {
                    let msg = other.to_string().to_lowercase();
                    ["timeout", "connection", "reset", "network"]
                        .iter()
                        .any(|marker| msg.contains(marker))
                }
            },
        }
    }
}

/// Postgres unique-violation check (SQLSTATE 23505), typed rather than
/// string-sniffed.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_processed_is_never_transient() {
        let err = StoreError::AlreadyProcessed("https://example.com/a".to_string());
        assert!(!err.is_transient());
    }

    #[test]
    fn pool_timeout_is_transient() {
        let err = StoreError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = StoreError::Database(sqlx::Error::Io(io));
        assert!(err.is_transient());
    }

    #[test]
    fn row_not_found_is_not_transient() {
        let err = StoreError::Database(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
    }
}
