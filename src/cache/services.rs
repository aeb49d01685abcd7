//! Cached list of upstream service names.

use std::{fmt::Display, future::Future, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};

pub const SERVICE_NAMES_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Snapshot {
    names: Vec<String>,
    fetched_at: Option<Instant>,
}

/// Single-slot cache; concurrent stale readers wait on one refresh.
#[derive(Debug)]
pub struct ServiceNameCache {
    ttl: Duration,
    slot: Mutex<Snapshot>,
}

impl Default for ServiceNameCache {
    fn default() -> Self {
        Self::new(SERVICE_NAMES_TTL)
    }
}

impl ServiceNameCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(Snapshot::default()),
        }
    }

    /// Return the cached names, refreshing them with `fetch` when stale.
    ///
    /// A failed refresh keeps the previous list and leaves it stale so the
    /// next caller retries.
    pub async fn get_or_refresh<F, Fut, E>(&self, fetch: F) -> Vec<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
        E: Display,
    {
        let mut slot = self.slot.lock().await;
        let fresh = slot
            .fetched_at
            .is_some_and(|at| at.elapsed() < self.ttl);
        if fresh {
            return slot.names.clone();
        }

        match fetch().await {
            Ok(names) => {
                debug!(count = names.len(), "refreshed service names");
                slot.names = names;
                slot.fetched_at = Some(Instant::now());
            }
            Err(err) => warn!("failed to refresh service names: {err}"),
        }
        slot.names.clone()
    }
}
