//! Cache Entry Module
//!
//! Defines the unit of storage and its age check against the global TTL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single key/value pair with its creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: u32,
    pub value: u32,
    /// Creation timestamp (Unix seconds), reset whenever the value is replaced
    pub created_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with `now`.
    pub fn new(key: u32, value: u32, now: i64) -> Self {
        Self {
            key,
            value,
            created_at: now,
        }
    }

    // == Age ==
    /// Seconds elapsed since creation. Clock skew into the past yields zero.
    pub fn age_secs(&self, now: i64) -> u64 {
        u64::try_from(now.saturating_sub(self.created_at)).unwrap_or(0)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl` at time `now`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is already expired.
    pub fn is_expired(&self, now: i64, ttl: Duration) -> bool {
        self.age_secs(now) >= ttl.as_secs()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
