//! Persistent Cache Module
//!
//! Shares one [`LruEngine`] behind a single lock and writes snapshots after
//! the lock is released.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::cache::{CacheStats, LruEngine};
use crate::config::{Config, PersistMode};
use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotStore};

// == Persistent Cache ==
/// Thread-safe cache that mirrors its state into a [`SnapshotStore`].
///
/// Each operation holds the engine lock for its whole duration. A snapshot
/// copy is taken under that lock and written only after it is dropped, so
/// slow disks never stall other callers. Copies are numbered in lock order
/// and the store refuses to write one older than the file it holds.
#[derive(Debug)]
pub struct PersistentCache {
    engine: Mutex<LruEngine>,
    /// Bumped under the engine lock for every snapshot copy
    generation: AtomicU64,
    store: SnapshotStore,
    mode: PersistMode,
    /// Unsaved changes, consumed by `flush_if_dirty`
    pending: AtomicBool,
    save_failures: AtomicU64,
}

impl PersistentCache {
    // == Open ==
    /// Opens the cache described by `config`.
    ///
    /// A missing, unreadable or corrupt snapshot is logged and replaced by an
    /// empty cache. Only an unusable snapshot directory is fatal.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = SnapshotStore::new(&config.snapshot_path);
        store.check_location()?;

        let engine = match store.load() {
            Ok(Some(snapshot)) => restore_or_empty(snapshot, config.capacity),
            Ok(None) => {
                info!(
                    path = %store.path().display(),
                    "No snapshot found, starting empty"
                );
                LruEngine::new(config.capacity)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load snapshot, starting empty");
                LruEngine::new(config.capacity)
            }
        };

        Ok(Self::with_engine(engine, store, config.persist_mode))
    }

    /// Wraps an existing engine without touching the store.
    pub fn with_engine(engine: LruEngine, store: SnapshotStore, mode: PersistMode) -> Self {
        Self {
            engine: Mutex::new(engine),
            generation: AtomicU64::new(0),
            store,
            mode,
            pending: AtomicBool::new(false),
            save_failures: AtomicU64::new(0),
        }
    }

    // == Get ==
    pub fn get(&self, key: u32) -> Option<u32> {
        self.run(|engine| engine.get(key))
    }

    // == Put ==
    pub fn put(&self, key: u32, value: u32) {
        self.run(|engine| engine.put(key, value))
    }

    // == Delete ==
    pub fn delete(&self, key: u32) -> Option<u32> {
        self.run(|engine| engine.delete(key))
    }

    pub fn len(&self) -> usize {
        self.engine.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.lock().is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.engine.lock().capacity()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<u32> {
        self.engine.lock().keys()
    }

    pub fn stats(&self) -> CacheStats {
        self.engine.lock().stats()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.lock().snapshot()
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    /// Number of snapshot writes that failed since the cache was opened.
    pub fn save_failures(&self) -> u64 {
        self.save_failures.load(Ordering::Relaxed)
    }

    // == Flush ==
    /// Writes the current state regardless of pending changes.
    pub fn flush(&self) -> Result<()> {
        self.pending.store(false, Ordering::Release);
        let (snapshot, generation) = self.capture(&self.engine.lock());
        self.save_tracked(&snapshot, generation).map(|_| ())
    }

    /// Writes the current state if anything changed since the last write.
    ///
    /// Returns whether a snapshot was written.
    pub fn flush_if_dirty(&self) -> Result<bool> {
        if !self.pending.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        let (snapshot, generation) = self.capture(&self.engine.lock());
        self.save_tracked(&snapshot, generation)
    }

    /// Copies the engine state with the next generation number. Must be
    /// called with the engine lock held.
    fn capture(&self, engine: &LruEngine) -> (Snapshot, u64) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        (engine.snapshot(), generation)
    }

    /// Saves `snapshot` unless a newer one is already on disk, re-arming the
    /// pending flag on failure.
    fn save_tracked(&self, snapshot: &Snapshot, generation: u64) -> Result<bool> {
        self.store.save_generation(snapshot, generation).inspect_err(|_| {
            self.pending.store(true, Ordering::Release);
            self.save_failures.fetch_add(1, Ordering::Relaxed);
        })
    }

    // == Close ==
    /// Final teardown write. Skipped when persistence is disabled.
    pub fn close(&self) -> Result<()> {
        if self.mode == PersistMode::Disabled {
            return Ok(());
        }
        self.flush()
    }

    /// Runs `op` under the engine lock, then persists per the mode.
    fn run<T>(&self, op: impl FnOnce(&mut LruEngine) -> T) -> T {
        let (result, snapshot) = {
            let mut engine = self.engine.lock();
            let result = op(&mut engine);
            let snapshot = match (engine.take_dirty(), self.mode) {
                (true, PersistMode::EveryWrite) => Some(self.capture(&engine)),
                (true, PersistMode::Interval(_)) => {
                    self.pending.store(true, Ordering::Release);
                    None
                }
                _ => None,
            };
            (result, snapshot)
        };

        if let Some((snapshot, generation)) = snapshot {
            if let Err(e) = self.store.save_generation(&snapshot, generation) {
                self.save_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Failed to save snapshot");
            }
        }
        result
    }
}

fn restore_or_empty(snapshot: Snapshot, capacity: u32) -> LruEngine {
    match LruEngine::restore(snapshot) {
        Ok(engine) => {
            if engine.capacity() != capacity {
                warn!(
                    snapshot_capacity = engine.capacity(),
                    configured_capacity = capacity,
                    "Snapshot capacity differs from configuration, keeping snapshot capacity"
                );
            }
            info!(entries = engine.len(), "Cache restored from snapshot");
            engine
        }
        Err(e) => {
            warn!(error = %e, "Snapshot rejected, starting empty");
            LruEngine::new(capacity)
        }
    }
}
