//! Expiring LRU store shared by the account and parameter caches

use crate::account::AccountState;
use crate::params::ModuleParams;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// A value held by the shared store
#[derive(Clone, Debug, PartialEq)]
pub enum CachedValue {
    Account(AccountState),
    Params(ModuleParams),
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    fetched_at: Instant,
}

/// Bounded store of node responses
///
/// Entries older than the expiry are treated as absent. They stay until they
/// are overwritten, removed, or evicted by LRU replacement.
#[derive(Debug)]
pub struct SharedCache {
    entries: Mutex<LruCache<String, Entry>>,
    expiry: Duration,
}

impl SharedCache {
    /// Create a store holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize, expiry: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Value stored under `key` if it is younger than the expiry
    pub fn get_fresh(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        (entry.fetched_at.elapsed() < self.expiry).then(|| entry.value.clone())
    }

    /// Store a value fetched just now
    pub fn insert(&self, key: String, value: CachedValue) {
        self.entries.lock().put(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Remove `key`; returns whether it was present
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
