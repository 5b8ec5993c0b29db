//! Memoization of personal records
//!
//! Record computation is idempotent for unchanged telemetry, so hosts may
//! keep results keyed by user and distance-table version. Entries must be
//! invalidated whenever new telemetry is ingested for the user; the TTL is
//! only a safety net. The engine itself never consults a cache.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::config::{AnalysisConfig, DEFAULT_CACHE_CAPACITY};
use crate::types::PersonalRecords;

/// Cache key: user plus distance-table fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordCacheKey {
    pub user_id: String,
    pub table_version: String,
}

impl RecordCacheKey {
    pub fn new(user_id: &str, table_version: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            table_version: table_version.to_string(),
        }
    }
}

/// Storage for memoized personal records
pub trait RecordCache: Send + Sync {
    /// Fetch a live entry
    fn get(&self, key: &RecordCacheKey) -> Option<PersonalRecords>;

    /// Store an entry, replacing any previous one
    fn put(&self, key: RecordCacheKey, records: PersonalRecords);

    /// Drop every entry for a user, across table versions
    fn invalidate_user(&self, user_id: &str);

    /// Drop everything
    fn clear(&self);
}

/// Cache that never stores anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecordCache;

impl RecordCache for NoRecordCache {
    fn get(&self, _key: &RecordCacheKey) -> Option<PersonalRecords> {
        None
    }

    fn put(&self, _key: RecordCacheKey, _records: PersonalRecords) {}

    fn invalidate_user(&self, _user_id: &str) {}

    fn clear(&self) {}
}

#[derive(Debug, Clone)]
struct CacheEntry {
    records: PersonalRecords,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process LRU cache with per-entry TTL
pub struct InMemoryRecordCache {
    store: Mutex<LruCache<RecordCacheKey, CacheEntry>>,
    ttl: Duration,
}

impl Default for InMemoryRecordCache {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl InMemoryRecordCache {
    const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CACHE_CAPACITY) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a cache holding up to `capacity` entries for `ttl`
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(Self::FALLBACK_CAPACITY);
        Self {
            store: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<RecordCacheKey, CacheEntry>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordCache for InMemoryRecordCache {
    fn get(&self, key: &RecordCacheKey) -> Option<PersonalRecords> {
        let mut store = self.lock();
        match store.get(key) {
            Some(entry) if !entry.is_expired() => {
                log::debug!("record cache hit for user {}", key.user_id);
                Some(entry.records.clone())
            }
            Some(_) => {
                log::debug!("record cache entry expired for user {}", key.user_id);
                store.pop(key);
                None
            }
            None => {
                log::debug!("record cache miss for user {}", key.user_id);
                None
            }
        }
    }

    fn put(&self, key: RecordCacheKey, records: PersonalRecords) {
        let entry = CacheEntry {
            records,
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().put(key, entry);
    }

    fn invalidate_user(&self, user_id: &str) {
        let mut store = self.lock();
        let stale: Vec<RecordCacheKey> = store
            .iter()
            .filter(|(k, _)| k.user_id == user_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            store.pop(key);
        }
        log::debug!("invalidated {} record cache entries for user {user_id}", stale.len());
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
