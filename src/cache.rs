use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::{CacheKey, RainMap};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    key: CacheKey,
    stored_at: DateTime<Utc>,
    map: Arc<RainMap>,
}

/// Single-slot store for the most recent rain map.
///
/// Only one map is kept regardless of key, so alternating keys always miss.
/// The lock guards individual reads and writes only. Two requests that miss
/// at the same time both compute and both store, and the later store wins.
pub struct ResultCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn get(&self, key: CacheKey) -> Option<Arc<RainMap>> {
        let slot = self.slot.read().await;
        let entry = slot.as_ref()?;
        if entry.key != key || entry.map.data.is_empty() {
            return None;
        }
        // A clock that stepped backwards reads as a fresh entry.
        let fresh = match (self.clock.now() - entry.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        };
        fresh.then(|| entry.map.clone())
    }

    /// Replaces whatever the slot held. `stored_at` is the time the request
    /// that produced `map` started.
    pub async fn put(&self, key: CacheKey, map: RainMap, stored_at: DateTime<Utc>) -> Arc<RainMap> {
        let map = Arc::new(map);
        *self.slot.write().await = Some(CacheEntry {
            key,
            stored_at,
            map: map.clone(),
        });
        map
    }
}
