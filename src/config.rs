//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// When snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Save after every operation that changed the cache.
    EveryWrite,
    /// Mark dirty and let the background flush task save once per interval.
    Interval(Duration),
    /// Never write snapshots.
    Disabled,
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub capacity: u32,
    /// Location of the snapshot file
    pub snapshot_path: PathBuf,
    /// Snapshot trigger policy
    pub persist_mode: PersistMode,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1024)
    /// - `SNAPSHOT_PATH` - Snapshot file (default: ./snapcache_snapshot.json)
    /// - `PERSIST_MODE` - `every-write`, `interval` or `disabled` (default: every-write)
    /// - `FLUSH_INTERVAL` - Seconds between flushes in interval mode (default: 5)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let capacity = env::var("CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.capacity);
        let snapshot_path = env::var("SNAPSHOT_PATH")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.snapshot_path);
        let flush_interval = env::var("FLUSH_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FLUSH_INTERVAL_SECS);
        let persist_mode = match env::var("PERSIST_MODE").ok().as_deref() {
            Some("interval") => PersistMode::Interval(Duration::from_secs(flush_interval)),
            Some("disabled") => PersistMode::Disabled,
            _ => PersistMode::EveryWrite,
        };

        Self {
            capacity,
            snapshot_path,
            persist_mode,
        }
    }

    // == Validate ==
    /// Rejects configurations the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if let PersistMode::Interval(interval) = self.persist_mode {
            if interval.is_zero() {
                return Err(CacheError::InvalidConfig(
                    "flush interval must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            snapshot_path: PathBuf::from("./snapcache_snapshot.json"),
            persist_mode: PersistMode::EveryWrite,
        }
    }
}
