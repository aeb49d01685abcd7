//! Profile cache keyed by the signature segment of the access token.

use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, trace};

use crate::profile::UserProfile;

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Clone, Debug)]
struct CacheEntry {
    profile: UserProfile,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Concurrent, bounded map from cache key to profile with per-entry expiry.
///
/// An entry never outlives the token it was fetched for: callers pass the
/// seconds remaining until the token's `exp` as the TTL.
#[derive(Debug)]
pub struct ProfileCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl ProfileCache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Live profile for `key`, if any. Expired entries are dropped on read.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<UserProfile> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.profile.clone());
            }
        }
        // Guard dropped above; removing while holding it would deadlock the shard.
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Store `profile` for `ttl_seconds`. Non-positive TTLs store nothing.
    pub fn set(&self, key: &str, profile: UserProfile, ttl_seconds: i64) {
        let Ok(ttl) = u64::try_from(ttl_seconds) else {
            return;
        };
        if ttl == 0 {
            return;
        }

        let now = Instant::now();
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.make_room(now);
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                profile,
                expires_at: now + Duration::from_secs(ttl),
            },
        );
        trace!(ttl, "profile cached");
    }

    pub fn delete(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!("profile cache entry invalidated");
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_live(now));
        if self.entries.len() < self.max_entries {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!("profile cache full, evicted entry closest to expiry");
        }
    }
}

/// Periodically purge expired entries. Abort the handle to stop it.
pub fn spawn_sweeper(cache: Arc<ProfileCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!(removed, remaining = cache.len(), "swept profile cache");
            }
        }
    })
}
