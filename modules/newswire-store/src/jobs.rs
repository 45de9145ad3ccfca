//! Queue operations on the scrape_jobs table.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use newswire_common::{JobCounters, JobDetails, JobPayload, JobStatus, NewswireError};

use crate::error::Result;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::Store;

/// A job handed to exactly one worker by `claim`. The payload is decoded
/// lazily so a corrupt body can be marked ERROR instead of poisoning the
/// claim path.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: i64,
    pub job_type: String,
    pub payload: serde_json::Value,
}

impl ClaimedJob {
    pub fn decode(&self) -> std::result::Result<JobPayload, NewswireError> {
        JobPayload::from_parts(&self.job_type, self.payload.clone())
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    job_type: String,
    payload: serde_json::Value,
    status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    links_found: i64,
    links_skipped: i64,
    articles_saved: i64,
    errors: i64,
}

impl From<JobRow> for JobDetails {
    fn from(row: JobRow) -> Self {
        JobDetails {
            id: row.id,
            job_type: row.job_type,
            payload: row.payload,
            status: row.status,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
            links_found: row.links_found,
            links_skipped: row.links_skipped,
            articles_saved: row.articles_saved,
            errors: row.errors,
        }
    }
}

impl Store {
    /// Insert a new QUEUED job and return its id.
    pub async fn enqueue(&self, payload: &JobPayload) -> Result<i64> {
        let job_type = payload.job_type();
        let body = payload.to_value();

        let id = with_retry(RetryPolicy::default(), || {
            let body = body.clone();
            async move {
                let pool = self.pool().await;
                let id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO scrape_jobs (job_type, payload, status, created_at, updated_at)
                    VALUES ($1, $2, $3, now(), now())
                    RETURNING id
                    "#,
                )
                .bind(job_type.as_str())
                .bind(body)
                .bind(JobStatus::Queued.as_str())
                .fetch_one(&pool)
                .await?;
                Ok(id)
            }
        })
        .await?;

        info!(job_id = id, job_type = %job_type, "Enqueued job");
        Ok(id)
    }

    /// Atomically claim the oldest QUEUED job, if any.
    ///
    /// The subselect locks the candidate row with `FOR UPDATE SKIP LOCKED`,
    /// so two workers claiming concurrently can never receive the same row;
    /// the status flip and the read happen in the same statement.
    pub async fn claim(&self) -> Result<Option<ClaimedJob>> {
        let pool = self.pool().await;

        let row = sqlx::query_as::<_, (i64, String, serde_json::Value)>(
            r#"
            UPDATE scrape_jobs
            SET status = 'in_progress', updated_at = now()
            WHERE id = (
                SELECT id FROM scrape_jobs
                WHERE status = 'queued'
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, job_type, payload
            "#,
        )
        .fetch_optional(&pool)
        .await?;

        Ok(row.map(|(id, job_type, payload)| ClaimedJob {
            id,
            job_type,
            payload,
        }))
    }

    pub async fn mark_done(&self, job_id: i64) -> Result<()> {
        self.set_status(job_id, JobStatus::Done, None).await
    }

    pub async fn mark_error(&self, job_id: i64, message: &str) -> Result<()> {
        self.set_status(job_id, JobStatus::Error, Some(message)).await
    }

    async fn set_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        with_retry(RetryPolicy::default(), || async move {
            let pool = self.pool().await;
            sqlx::query(
                r#"
                UPDATE scrape_jobs
                SET status = $1, error_message = COALESCE($2, error_message), updated_at = now()
                WHERE id = $3
                "#,
            )
            .bind(status.as_str())
            .bind(error_message)
            .bind(job_id)
            .execute(&pool)
            .await?;
            Ok(())
        })
        .await?;

        debug!(job_id, status = %status, "Updated job status");
        Ok(())
    }

    /// Set-style update of the live progress counters; bumps `updated_at`.
    pub async fn update_counters(&self, job_id: i64, counters: JobCounters) -> Result<()> {
        if counters.is_empty() {
            return Ok(());
        }

        with_retry(RetryPolicy::default(), || async move {
            let pool = self.pool().await;
            let mut builder =
                sqlx::QueryBuilder::new("UPDATE scrape_jobs SET updated_at = now()");
            if let Some(v) = counters.links_found {
                builder.push(", links_found = ").push_bind(v);
            }
            if let Some(v) = counters.links_skipped {
                builder.push(", links_skipped = ").push_bind(v);
            }
            if let Some(v) = counters.articles_saved {
                builder.push(", articles_saved = ").push_bind(v);
            }
            if let Some(v) = counters.errors {
                builder.push(", errors = ").push_bind(v);
            }
            builder.push(" WHERE id = ").push_bind(job_id);
            builder.build().execute(&pool).await?;
            Ok(())
        })
        .await
    }

    /// Full job row, or None if the id is unknown.
    pub async fn get_job(&self, job_id: i64) -> Result<Option<JobDetails>> {
        let details = with_retry(RetryPolicy::default(), || async move {
            let pool = self.pool().await;
            let row = sqlx::query_as::<_, JobRow>("SELECT * FROM scrape_jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&pool)
                .await?;
            Ok(row)
        })
        .await?;

        Ok(details.map(JobDetails::from))
    }

    /// Startup sweep: convert every QUEUED or IN_PROGRESS row left over from
    /// a previous worker into CANCELLED so it can never block new claims.
    pub async fn cancel_stale_jobs(&self) -> Result<u64> {
        let pool = self.pool().await;
        let result = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'cancelled',
                error_message = 'Job cancelled due to worker restart',
                updated_at = now()
            WHERE status IN ('queued', 'in_progress')
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(result.rows_affected())
    }
}
