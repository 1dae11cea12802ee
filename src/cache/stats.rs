//! Counters reported by [`LruEngine::stats`](crate::cache::LruEngine::stats).

use serde::Serialize;

/// Lookup and removal counters for one engine.
///
/// The engine keeps the counters; `total_entries` is only filled in on the
/// copy it hands out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Includes lookups that found an expired entry
    pub misses: u64,
    /// Capacity evictions, never TTL removals
    pub evictions: u64,
    pub expirations: u64,
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of lookups that hit, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// A lookup that found its entry past the TTL: one miss, one expiration.
    pub(crate) fn record_expired_lookup(&mut self) {
        self.expirations += 1;
        self.record_lookup(false);
    }

    pub(crate) fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub(crate) fn with_entries(&self, total_entries: usize) -> Self {
        Self {
            total_entries,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_before_any_lookup() {
        let stats = CacheStats::new();
        assert_eq!(stats.lookups(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        for hit in [true, true, true, false] {
            stats.record_lookup(hit);
        }
        assert_eq!(stats.lookups(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_expired_lookup_is_a_miss() {
        let mut stats = CacheStats::new();
        stats.record_expired_lookup();
        stats.record_expirations(2);

        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 3);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_with_entries_keeps_counters() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_lookup(true);

        let copy = stats.with_entries(7);
        assert_eq!(copy.total_entries, 7);
        assert_eq!(copy.evictions, 1);
        assert_eq!(copy.hits, 1);
        assert_eq!(stats.total_entries, 0);
    }
}
