//! Eviction Engine Module
//!
//! Main cache engine combining a HashMap index with an arena recency list,
//! bounded capacity and lazy TTL expiration.

use std::collections::{HashMap, HashSet};

use crate::cache::entry::current_timestamp;
use crate::cache::lru::{Handle, RecencyList};
use crate::cache::{CacheEntry, CacheStats, TTL};
use crate::error::{CacheError, Result};
use crate::snapshot::Snapshot;

// == LRU Engine ==
/// Bounded key/value store with LRU eviction and lazy TTL expiry.
///
/// Every key in `index` has exactly one entry in `order` and vice versa.
/// The engine carries no synchronisation; see
/// [`PersistentCache`](crate::cache::PersistentCache) for shared use.
#[derive(Debug)]
pub struct LruEngine {
    /// Key to slot lookup
    index: HashMap<u32, Handle>,
    /// Entries from most to least recently used
    order: RecencyList,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: u32,
    /// Set when state changed since the last `take_dirty`
    dirty: bool,
}

impl LruEngine {
    // == Constructor ==
    /// Creates an empty engine holding at most `capacity` entries.
    ///
    /// A zero capacity is accepted and yields an engine that stores nothing.
    pub fn new(capacity: u32) -> Self {
        // Don't trust a huge capacity for preallocation
        let prealloc = capacity.min(4096) as usize;
        Self {
            index: HashMap::with_capacity(prealloc),
            order: RecencyList::with_capacity(prealloc),
            stats: CacheStats::new(),
            capacity,
            dirty: false,
        }
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    ///
    /// An entry at least [`TTL`] old is removed and reported as absent.
    pub fn get(&mut self, key: u32) -> Option<u32> {
        self.get_at(key, current_timestamp())
    }

    /// [`get`](Self::get) evaluated at an explicit time.
    pub fn get_at(&mut self, key: u32, now: i64) -> Option<u32> {
        let Some(&handle) = self.index.get(&key) else {
            self.stats.record_lookup(false);
            return None;
        };

        let entry = self.order.get(handle).copied()?;
        if entry.is_expired(now, TTL) {
            self.unlink(key, handle);
            self.stats.record_expired_lookup();
            self.dirty = true;
            return None;
        }

        self.order.move_to_front(handle);
        self.stats.record_lookup(true);
        self.dirty = true;
        Some(entry.value)
    }

    // == Put ==
    /// Stores `value` under `key` as the most recently used entry.
    ///
    /// Overwriting resets the entry's age. Inserting a new key into a full
    /// engine first evicts the least recently used entry, whatever its age.
    pub fn put(&mut self, key: u32, value: u32) {
        self.put_at(key, value, current_timestamp());
    }

    /// [`put`](Self::put) evaluated at an explicit time.
    pub fn put_at(&mut self, key: u32, value: u32, now: i64) {
        if let Some(&handle) = self.index.get(&key) {
            if let Some(entry) = self.order.get_mut(handle) {
                entry.value = value;
                entry.created_at = now;
            }
            self.order.move_to_front(handle);
            self.dirty = true;
            return;
        }

        if self.capacity == 0 {
            return;
        }

        if self.order.len() + 1 > self.capacity as usize {
            self.evict_back();
        }

        let handle = self.order.push_front(CacheEntry::new(key, value, now));
        self.index.insert(key, handle);
        self.dirty = true;
    }

    // == Delete ==
    /// Removes `key` regardless of its age and returns the value it held.
    pub fn delete(&mut self, key: u32) -> Option<u32> {
        let handle = *self.index.get(&key)?;
        let entry = self.unlink(key, handle)?;
        self.dirty = true;
        Some(entry.value)
    }

    // == Purge Expired ==
    /// Removes every entry at least [`TTL`] old and returns how many went.
    ///
    /// Nothing calls this on a schedule; expiry is otherwise discovered on
    /// `get` only.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(current_timestamp())
    }

    pub fn purge_expired_at(&mut self, now: i64) -> usize {
        let expired: Vec<u32> = self
            .order
            .iter()
            .filter(|entry| entry.is_expired(now, TTL))
            .map(|entry| entry.key)
            .collect();

        for key in &expired {
            if let Some(&handle) = self.index.get(key) {
                self.unlink(*key, handle);
            }
        }
        self.stats.record_expirations(expired.len());

        if !expired.is_empty() {
            self.dirty = true;
        }
        expired.len()
    }

    // == Read-only accessors ==

    /// Returns the value without touching recency or checking expiry.
    pub fn peek(&self, key: u32) -> Option<u32> {
        let handle = self.index.get(&key)?;
        self.order.get(*handle).map(|entry| entry.value)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.index.contains_key(&key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<u32> {
        self.order.iter().map(|entry| entry.key).collect()
    }

    /// Entries from most to least recently used.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.order.iter()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.with_entries(self.index.len())
    }

    // == Dirty tracking ==
    /// Returns whether state changed since the last call, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // == Snapshot ==
    /// Copies the full engine state into a serialisable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let entries: Vec<CacheEntry> = self.order.iter().copied().collect();
        let keys = self.index.keys().copied().collect();
        Snapshot {
            capacity: self.capacity,
            entries,
            keys,
        }
    }

    /// Rebuilds an engine from a snapshot, preserving recency order.
    ///
    /// Fails if the snapshot has zero capacity, breaks the index/list
    /// lockstep or holds more entries than its capacity.
    pub fn restore(snapshot: Snapshot) -> Result<Self> {
        let Snapshot {
            capacity,
            entries,
            keys,
        } = snapshot;

        if capacity == 0 {
            return Err(CacheError::CorruptSnapshot(
                "capacity must be greater than zero".to_string(),
            ));
        }

        if entries.len() > capacity as usize {
            return Err(CacheError::CorruptSnapshot(format!(
                "{} entries exceed capacity {}",
                entries.len(),
                capacity
            )));
        }

        let mut engine = Self::new(capacity);
        for entry in entries {
            if engine.index.contains_key(&entry.key) {
                return Err(CacheError::CorruptSnapshot(format!(
                    "duplicate key {}",
                    entry.key
                )));
            }
            let handle = engine.order.push_back(entry);
            engine.index.insert(entry.key, handle);
        }

        if let Some(missing) = keys.iter().find(|key| !engine.index.contains_key(key)) {
            return Err(CacheError::CorruptSnapshot(format!(
                "cannot find key {}",
                missing
            )));
        }
        let indexed: HashSet<u32> = keys.into_iter().collect();
        if indexed.len() != engine.index.len() {
            return Err(CacheError::CorruptSnapshot(format!(
                "{} indexed keys for {} entries",
                indexed.len(),
                engine.index.len()
            )));
        }

        Ok(engine)
    }

    // == Internal helpers ==

    fn unlink(&mut self, key: u32, handle: Handle) -> Option<CacheEntry> {
        self.index.remove(&key);
        self.order.remove(handle)
    }

    fn evict_back(&mut self) {
        let Some(handle) = self.order.back() else {
            return;
        };
        if let Some(victim) = self.order.remove(handle) {
            self.index.remove(&victim.key);
            self.stats.record_eviction();
        }
    }
}
