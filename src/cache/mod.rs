//! Cache Module
//!
//! Provides the bounded LRU engine with lazy TTL expiration, and the
//! lock-sharing wrapper that persists it.

mod entry;
mod lru;
mod shared;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

// Re-export public types
pub use entry::{current_timestamp, CacheEntry};
pub use lru::{Handle, RecencyList};
pub use shared::PersistentCache;
pub use stats::CacheStats;
pub use store::LruEngine;

// == Public Constants ==
/// Age at which an entry stops being served
pub const TTL: Duration = Duration::from_secs(15 * 60);
