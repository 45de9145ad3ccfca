//! Connection supervision: a throttled `SELECT 1` probe with pool refresh on
//! failure, so a wedged connection can't stall the worker forever.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::store::Store;

/// Minimum gap between probes.
const PROBE_INTERVAL: Duration = Duration::from_secs(300);

pub struct HealthMonitor {
    store: Store,
    last_probe: Mutex<Option<Instant>>,
}

impl HealthMonitor {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            last_probe: Mutex::new(None),
        }
    }

    /// Probe the connection if the last probe is older than the interval.
    /// On probe failure the pool is refreshed. Never propagates — a failed
    /// probe must not take the worker loop down.
    pub async fn maybe_probe(&self) {
        {
            let mut last = self.last_probe.lock().await;
            let due = last.map(|t| t.elapsed() >= PROBE_INTERVAL).unwrap_or(true);
            if !due {
                return;
            }
            *last = Some(Instant::now());
        }

        if !self.store.probe().await {
            warn!("Health probe failed, refreshing connection pool");
            self.force_refresh().await;
        }
    }

    /// Unconditional probe-and-refresh, used after a failure streak.
    pub async fn force_refresh(&self) {
        if let Err(e) = self.store.refresh().await {
            error!(error = %e, "Connection pool refresh failed");
        }
    }
}
