//! The processed-URL dedup set. Append-only: rows are inserted once and
//! never mutated.

use tracing::debug;

use newswire_common::ProcessedStatus;

use crate::error::{is_unique_violation, Result, StoreError};
use crate::retry::{with_retry, RetryPolicy};
use crate::store::Store;

impl Store {
    /// Dedup lookup by canonical URL.
    pub async fn check_processed(&self, url: &str) -> Result<Option<ProcessedStatus>> {
        with_retry(RetryPolicy::default(), || async move {
            let pool = self.pool().await;
            let status = sqlx::query_scalar::<_, String>(
                "SELECT processing_status FROM processed_news_urls WHERE url = $1",
            )
            .bind(url)
            .fetch_optional(&pool)
            .await?;

            Ok(status.as_deref().and_then(ProcessedStatus::parse))
        })
        .await
    }

    /// Record a canonical URL as terminally handled. A second insert of the
    /// same URL is the expected outcome of concurrent source jobs and is
    /// swallowed: the unique violation surfaces internally as
    /// `AlreadyProcessed` and is mapped back to success here.
    pub async fn save_processed(
        &self,
        url: &str,
        status: ProcessedStatus,
        city: Option<&str>,
    ) -> Result<()> {
        let result = with_retry(RetryPolicy::default(), || async move {
            let pool = self.pool().await;
            sqlx::query(
                r#"
                INSERT INTO processed_news_urls (url, city, scrape_date, is_news, processing_status)
                VALUES ($1, $2, now(), $3, $4)
                "#,
            )
            .bind(url)
            .bind(city.unwrap_or("unknown"))
            .bind(status != ProcessedStatus::Trash)
            .bind(status.as_str())
            .execute(&pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::AlreadyProcessed(url.to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(StoreError::AlreadyProcessed(_)) => {
                debug!(url, "URL already in processed set");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}
