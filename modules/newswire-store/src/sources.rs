//! Reads and bookkeeping for the external sources tables.

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use newswire_common::{SourceRow, SourceTable};

use crate::error::Result;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::Store;

/// The column holding the page URL differs between the two source tables.
fn url_column(table: SourceTable) -> &'static str {
    match table {
        SourceTable::Primary => "source_url",
        SourceTable::City => "url",
    }
}

#[derive(sqlx::FromRow)]
struct SourceRecord {
    id: Uuid,
    url: Option<String>,
    name: Option<String>,
    last_scraped_at: Option<DateTime<Utc>>,
}

impl From<SourceRecord> for SourceRow {
    fn from(r: SourceRecord) -> Self {
        SourceRow {
            id: r.id,
            url: r.url,
            name: r.name,
            last_scraped_at: r.last_scraped_at,
        }
    }
}

impl Store {
    /// Load one source by id from the given table.
    pub async fn get_source(&self, id: Uuid, table: SourceTable) -> Result<Option<SourceRow>> {
        let sql = format!(
            "SELECT id, {} AS url, name, last_scraped_at FROM {} WHERE id = $1",
            url_column(table),
            table.table_name(),
        );

        let record = with_retry(RetryPolicy::default(), || {
            let sql = sql.clone();
            async move {
                let pool = self.pool().await;
                let row = sqlx::query_as::<_, SourceRecord>(&sql)
                    .bind(id)
                    .fetch_optional(&pool)
                    .await?;
                Ok(row)
            }
        })
        .await?;

        Ok(record.map(SourceRow::from))
    }

    /// Pick up to `batch_size` active sources from the primary table whose
    /// `last_scraped_at` is NULL or older than 24 hours, never-scraped rows
    /// first, with an optional name filter. Duplicates across the two
    /// sub-queries are removed.
    pub async fn select_sources_for_batch(
        &self,
        batch_size: i64,
        query: Option<&str>,
    ) -> Result<Vec<SourceRow>> {
        let cutoff = Utc::now() - Duration::hours(24);

        let rows = with_retry(RetryPolicy::default(), || async move {
            let pool = self.pool().await;

            let mut never_scraped_query =
                batch_query("last_scraped_at IS NULL", query, batch_size, None);
            let never_scraped = never_scraped_query
                .build_query_as::<SourceRecord>()
                .fetch_all(&pool)
                .await?;

            let mut stale_query = batch_query("last_scraped_at < ", query, batch_size, Some(cutoff));
            let stale = stale_query
                .build_query_as::<SourceRecord>()
                .fetch_all(&pool)
                .await?;

            Ok((never_scraped, stale))
        })
        .await?;

        let mut seen = std::collections::HashSet::new();
        let mut sources = Vec::new();
        for record in rows.0.into_iter().chain(rows.1) {
            if seen.insert(record.id) {
                sources.push(SourceRow::from(record));
            }
            if sources.len() as i64 >= batch_size {
                break;
            }
        }

        info!(selected = sources.len(), "Selected sources for batch processing");
        Ok(sources)
    }

    /// Stamp a source as just scraped.
    pub async fn update_source_scraped_at(&self, id: Uuid, table: SourceTable) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET last_scraped_at = now() WHERE id = $1",
            table.table_name(),
        );

        let pool = self.pool().await;
        sqlx::query(&sql).bind(id).execute(&pool).await?;

        info!(source_id = %id, table = table.table_name(), "Updated last_scraped_at");
        Ok(())
    }
}

/// Build one of the two batch-selection sub-queries against the primary table.
fn batch_query<'a>(
    scraped_predicate: &str,
    name_filter: Option<&'a str>,
    limit: i64,
    cutoff: Option<DateTime<Utc>>,
) -> sqlx::QueryBuilder<'a, sqlx::Postgres> {
    let mut builder = sqlx::QueryBuilder::new(format!(
        "SELECT id, source_url AS url, name, last_scraped_at FROM {} \
         WHERE has_been_processed = true AND verified = true AND {}",
        SourceTable::Primary.table_name(),
        scraped_predicate,
    ));
    if let Some(cutoff) = cutoff {
        builder.push_bind(cutoff);
    }
    if let Some(name) = name_filter {
        builder.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    builder.push(" ORDER BY last_scraped_at ASC NULLS FIRST LIMIT ");
    builder.push_bind(limit);
    builder
}
