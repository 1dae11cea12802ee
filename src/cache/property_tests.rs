//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine against a reference model and against
//! its recency, capacity and persistence guarantees.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::cache::{LruEngine, TTL};

// == Test Configuration ==
const NOW: i64 = 1_700_000_000;

// == Strategies ==
/// Keys drawn from a small range so operations collide often
fn key_strategy() -> impl Strategy<Value = u32> {
    0u32..16
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: u32, value: u32 },
    Get { key: u32 },
    Delete { key: u32 },
    /// Advance the clock by this many seconds
    Tick(u32),
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        4 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => (0u32..600).prop_map(CacheOp::Tick),
    ]
}

/// Reference model: a plain Vec of (key, value, created_at), front = MRU.
#[derive(Debug, Default)]
struct Model {
    capacity: usize,
    entries: Vec<(u32, u32, i64)>,
}

impl Model {
    fn position(&self, key: u32) -> Option<usize> {
        self.entries.iter().position(|(k, _, _)| *k == key)
    }

    fn get(&mut self, key: u32, now: i64) -> Option<u32> {
        let idx = self.position(key)?;
        let entry = self.entries.remove(idx);
        if now - entry.2 >= TTL.as_secs() as i64 {
            return None;
        }
        let value = entry.1;
        self.entries.insert(0, entry);
        Some(value)
    }

    fn put(&mut self, key: u32, value: u32, now: i64) {
        if let Some(idx) = self.position(key) {
            self.entries.remove(idx);
        } else if self.capacity == 0 {
            return;
        } else if self.entries.len() + 1 > self.capacity {
            self.entries.pop();
        }
        self.entries.insert(0, (key, value, now));
    }

    fn delete(&mut self, key: u32) -> Option<u32> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx).1)
    }

    fn keys(&self) -> Vec<u32> {
        self.entries.iter().map(|(k, _, _)| *k).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // The engine agrees with the reference model after every operation,
    // including recency order and lazy expiry.
    #[test]
    fn prop_matches_reference_model(
        capacity in 0u32..8,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let mut engine = LruEngine::new(capacity);
        let mut model = Model { capacity: capacity as usize, ..Model::default() };
        let mut now = NOW;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    engine.put_at(key, value, now);
                    model.put(key, value, now);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(engine.get_at(key, now), model.get(key, now));
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(engine.delete(key), model.delete(key));
                }
                CacheOp::Tick(secs) => now += secs as i64,
            }
            prop_assert_eq!(engine.keys(), model.keys());
        }
    }

    // For any sequence of puts, the number of live entries never exceeds capacity.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1u32..50,
        entries in prop::collection::vec((any::<u32>(), any::<u32>()), 1..200)
    ) {
        let mut engine = LruEngine::new(capacity);

        for (key, value) in entries {
            engine.put(key, value);
            prop_assert!(
                engine.len() <= capacity as usize,
                "Cache size {} exceeds capacity {}",
                engine.len(),
                capacity
            );
        }
    }

    // After get(k) or put(k, v) on a present key, k is at the front.
    #[test]
    fn prop_touch_moves_to_front(
        keys in prop::collection::hash_set(any::<u32>(), 2..10),
        pick in any::<prop::sample::Index>(),
        via_put in any::<bool>()
    ) {
        let keys: Vec<u32> = keys.into_iter().collect();
        let mut engine = LruEngine::new(keys.len() as u32);
        for key in &keys {
            engine.put_at(*key, *key, NOW);
        }

        let touched = keys[pick.index(keys.len())];
        if via_put {
            engine.put_at(touched, 0, NOW);
        } else {
            prop_assert_eq!(engine.get_at(touched, NOW), Some(touched));
        }

        prop_assert_eq!(engine.keys()[0], touched);
        prop_assert_eq!(engine.len(), keys.len());
    }

    // Inserting a new key at capacity evicts exactly the least recently used key.
    #[test]
    fn prop_lru_eviction_order(
        keys in prop::collection::hash_set(0u32..1000, 3..10),
        new_key in 1000u32..2000
    ) {
        let keys: Vec<u32> = keys.into_iter().collect();
        let capacity = keys.len() as u32;
        let mut engine = LruEngine::new(capacity);
        for key in &keys {
            engine.put_at(*key, *key, NOW);
        }

        // Touch the oldest key so the second one inserted becomes the victim
        let accessed = keys[0];
        engine.get_at(accessed, NOW);
        let expected_evicted = keys[1];

        engine.put_at(new_key, 0, NOW);

        prop_assert_eq!(engine.len(), keys.len());
        prop_assert!(!engine.contains(expected_evicted));
        prop_assert!(engine.contains(accessed));
        prop_assert!(engine.contains(new_key));
        for key in keys.iter().skip(2) {
            prop_assert!(engine.contains(*key), "Key {} should survive", key);
        }
    }

    // Deleting twice returns the value once, then absent.
    #[test]
    fn prop_delete_removes_entry(key in any::<u32>(), value in any::<u32>()) {
        let mut engine = LruEngine::new(4);
        engine.put(key, value);

        prop_assert_eq!(engine.delete(key), Some(value));
        prop_assert_eq!(engine.delete(key), None);
        prop_assert_eq!(engine.get(key), None);
    }

    // Entries at least TTL old read as absent and are dropped.
    #[test]
    fn prop_ttl_expiration(key in any::<u32>(), age in 0i64..3600) {
        let mut engine = LruEngine::new(4);
        engine.put_at(key, 1, NOW);

        let result = engine.get_at(key, NOW + age);
        if age >= TTL.as_secs() as i64 {
            prop_assert_eq!(result, None);
            prop_assert!(!engine.contains(key));
        } else {
            prop_assert_eq!(result, Some(1));
        }
    }

    // snapshot then restore reproduces capacity, keys, values and order.
    #[test]
    fn prop_snapshot_roundtrip(
        capacity in 1u32..20,
        ops in prop::collection::vec(cache_op_strategy(), 0..80)
    ) {
        let mut engine = LruEngine::new(capacity);
        let mut now = NOW;
        for op in ops {
            match op {
                CacheOp::Put { key, value } => engine.put_at(key, value, now),
                CacheOp::Get { key } => { engine.get_at(key, now); }
                CacheOp::Delete { key } => { engine.delete(key); }
                CacheOp::Tick(secs) => now += secs as i64,
            }
        }

        let snapshot = engine.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = LruEngine::restore(serde_json::from_str(&json).unwrap()).unwrap();

        prop_assert_eq!(restored.capacity(), engine.capacity());
        prop_assert_eq!(restored.keys(), engine.keys());
        let original: Vec<_> = engine.entries().copied().collect();
        let copied: Vec<_> = restored.entries().copied().collect();
        prop_assert_eq!(copied, original);
        let live: HashSet<u32> = snapshot.keys.iter().copied().collect();
        prop_assert_eq!(live.len(), engine.len());
    }
}
