//! snapcache - A bounded key/value cache
//!
//! LRU eviction, lazy TTL expiration and crash-safe JSON snapshots.

pub mod cache;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod tasks;

pub use cache::{LruEngine, PersistentCache};
pub use config::{Config, PersistMode};
pub use error::{CacheError, Result};
pub use snapshot::{Snapshot, SnapshotStore};
pub use tasks::spawn_flush_task;
