//! Snapshot File Store
//!
//! Crash-safe JSON persistence: every save goes to a temporary file in the
//! target directory and is renamed over the destination once fully written.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::snapshot::Snapshot;

// == Snapshot Store ==
/// Reads and writes [`Snapshot`]s at a fixed path.
///
/// Saves and loads through one store are serialised by the store's own lock.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    /// Guards the file; holds the newest generation written through
    /// [`save_generation`](Self::save_generation)
    file_lock: Mutex<u64>,
}

impl SnapshotStore {
    // == Constructor ==
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Check Location ==
    /// Verifies the snapshot's directory exists so saves can succeed.
    pub fn check_location(&self) -> Result<()> {
        let dir = self.dir();
        let meta = fs::metadata(dir).map_err(|e| CacheError::io(dir, e))?;
        if !meta.is_dir() {
            return Err(CacheError::InvalidConfig(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(())
    }

    // == Save ==
    /// Atomically replaces the snapshot file with `snapshot`.
    ///
    /// A reader sees either the previous file or the new one, never a
    /// partial write. The temporary file is cleaned up on failure.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let _guard = self.file_lock.lock();
        self.write_file(&bytes, snapshot.entries.len())
    }

    /// Like [`save`](Self::save), but only if `generation` is newer than
    /// every generation already written through this method.
    ///
    /// Snapshots copied in order can reach the store out of order; the stale
    /// ones are dropped. Returns whether the file was written.
    pub fn save_generation(&self, snapshot: &Snapshot, generation: u64) -> Result<bool> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let mut last_written = self.file_lock.lock();
        if generation <= *last_written {
            debug!(generation, last_written = *last_written, "Stale snapshot skipped");
            return Ok(false);
        }
        self.write_file(&bytes, snapshot.entries.len())?;
        *last_written = generation;
        Ok(true)
    }

    /// Caller must hold `file_lock`.
    fn write_file(&self, bytes: &[u8], entries: usize) -> Result<()> {
        let dir = self.dir();
        let mut tmp = tempfile::Builder::new()
            .prefix(".snapcache")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| CacheError::io(dir, e))?;
        tmp.write_all(bytes)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| CacheError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), entries, "Snapshot saved");
        Ok(())
    }

    // == Load ==
    /// Reads the snapshot file.
    ///
    /// Returns `Ok(None)` when no snapshot has been written yet, and an error
    /// when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = {
            let _guard = self.file_lock.lock();
            match fs::read(&self.path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(CacheError::io(&self.path, e)),
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        debug!(
            path = %self.path.display(),
            entries = snapshot.entries.len(),
            "Snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
