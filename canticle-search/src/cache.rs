//! Bounded in-memory cache with per-entry expiry.
//!
//! Expired entries are removed lazily when read; nothing sweeps them in
//! the background. When an insert pushes the cache over capacity, the
//! entries closest to their natural expiry are evicted first. This is not
//! LRU: a frequently read entry that expires soon is still the first to go.
//!
//! Time is read from [`tokio::time::Instant`] so tests can drive expiry
//! with a paused clock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// A stored value and the instant it stops being served.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Insertion sequence, orders entries that share an expiry instant.
    seq: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    next_seq: u64,
}

/// Generic TTL cache shared behind `&self`.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_entries` values, each living
    /// `default_ttl` unless overridden on insert.
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            default_ttl,
            max_entries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the value for `key` if it has not expired.
    ///
    /// A stale entry is deleted by this call.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let now = Instant::now();
        match inner.entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                inner.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key`, expiring after `ttl` or the default TTL.
    ///
    /// Overwrites any previous entry, then evicts the soonest-expiring
    /// entries until the cache is back within capacity.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                seq,
            },
        );
        prune(&mut inner.entries, self.max_entries);
    }

    /// Remove `key` whether or not it has expired.
    pub fn delete(&self, key: &K) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Whether `key` is physically stored, ignoring expiry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }
}

fn prune<K, V>(entries: &mut HashMap<K, CacheEntry<V>>, max_entries: usize)
where
    K: Eq + Hash + Clone,
{
    if entries.len() <= max_entries {
        return;
    }
    let mut by_expiry: Vec<(Instant, u64, K)> = entries
        .iter()
        .map(|(k, e)| (e.expires_at, e.seq, k.clone()))
        .collect();
    by_expiry.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let excess = entries.len() - max_entries;
    for (_, _, key) in by_expiry.into_iter().take(excess) {
        entries.remove(&key);
    }
}
