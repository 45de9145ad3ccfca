use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Result, StoreError};

/// Max pooled connections, shared across every handler in the process.
const MAX_CONNECTIONS: u32 = 20;
/// Budget for the health probe round-trip.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for rebuilding the pool during a refresh.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Postgres-backed persistence for the job queue, articles, the
/// processed-URL dedup set, and source bookkeeping.
///
/// The pool lives behind a lock so a connection refresh can swap it without
/// tearing down the `Store` handle held by callers.
#[derive(Clone)]
pub struct Store {
    database_url: String,
    pool: Arc<RwLock<PgPool>>,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting Postgres pool (max_connections={MAX_CONNECTIONS})");
        let pool = Self::build_pool(database_url).await?;
        Ok(Self {
            database_url: database_url.to_string(),
            pool: Arc::new(RwLock::new(pool)),
        })
    }

    async fn build_pool(database_url: &str) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(pool)
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        let pool = self.pool().await;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(())
    }

    pub(crate) async fn pool(&self) -> PgPool {
        self.pool.read().await.clone()
    }

    /// Cheap connection health probe. Returns false on error or timeout
    /// rather than propagating — the caller decides whether to refresh.
    pub async fn probe(&self) -> bool {
        let pool = self.pool().await;
        let query = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool);
        match tokio::time::timeout(PROBE_TIMEOUT, query).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Connection probe failed");
                false
            }
            Err(_) => {
                warn!("Connection probe timed out");
                false
            }
        }
    }

    /// Tear down and rebuild the connection pool. In-flight operations on the
    /// old pool finish against closed connections and surface as transient
    /// errors, which the retry wrapper absorbs.
    pub async fn refresh(&self) -> Result<()> {
        info!("Refreshing Postgres connection pool");
        let new_pool = tokio::time::timeout(REFRESH_TIMEOUT, Self::build_pool(&self.database_url))
            .await
            .map_err(|_| StoreError::Database(sqlx::Error::PoolTimedOut))??;

        let old_pool = {
            let mut guard = self.pool.write().await;
            std::mem::replace(&mut *guard, new_pool)
        };
        old_pool.close().await;

        info!("Connection pool refreshed");
        Ok(())
    }
}
