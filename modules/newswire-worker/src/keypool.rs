//! Rate-limited API key scheduler.
//!
//! Diffbot allows 5 calls per minute per key. The pool tracks a sliding
//! 60-second window of issuance timestamps per key, hands out the least-used
//! eligible key (random tie-break so no key gets pinned), and cooperatively
//! sleeps until a slot frees when every key is saturated.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Width of the sliding usage window.
const WINDOW: Duration = Duration::from_secs(60);
/// Max issuances per key within the window.
const CALLS_PER_WINDOW: usize = 5;

pub struct KeyPool {
    keys: Vec<String>,
    usage: Mutex<HashMap<String, Vec<Instant>>>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        assert!(!keys.is_empty(), "KeyPool requires at least one key");
        Self {
            keys,
            usage: Mutex::new(HashMap::new()),
        }
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Hand out a key that has been used fewer than 5 times in the trailing
    /// 60 seconds, recording the issuance. When every key is saturated, the
    /// lock is released and the caller sleeps until the earliest in-window
    /// timestamp ages out, then retries.
    pub async fn acquire(&self) -> String {
        loop {
            let wake_at = {
                let mut usage = self.usage.lock().await;
                let now = Instant::now();

                for stamps in usage.values_mut() {
                    stamps.retain(|t| now.duration_since(*t) < WINDOW);
                }

                let counts: Vec<(usize, &String)> = self
                    .keys
                    .iter()
                    .map(|k| (usage.get(k).map_or(0, Vec::len), k))
                    .collect();

                let min_eligible = counts
                    .iter()
                    .filter(|(count, _)| *count < CALLS_PER_WINDOW)
                    .map(|(count, _)| *count)
                    .min();

                if let Some(min_count) = min_eligible {
                    let candidates: Vec<&String> = counts
                        .iter()
                        .filter(|(count, _)| *count == min_count)
                        .map(|(_, key)| *key)
                        .collect();
                    let chosen =
                        candidates[rand::rng().random_range(0..candidates.len())].clone();
                    usage.entry(chosen.clone()).or_default().push(now);
                    debug!(recent_uses = min_count + 1, "Issued API key");
                    return chosen;
                }

                // Saturated: wake when the oldest in-window stamp expires.
                let earliest = usage
                    .values()
                    .flat_map(|stamps| stamps.iter())
                    .min()
                    .copied()
                    .unwrap_or(now);
                warn!(
                    wait_secs = (earliest + WINDOW - now).as_secs(),
                    "All API keys at rate limit, waiting for a slot"
                );
                earliest + WINDOW
            };

            tokio::time::sleep_until(wake_at).await;
        }
    }
}
