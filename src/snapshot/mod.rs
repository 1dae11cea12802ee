//! Snapshot Module
//!
//! Serialisable copy of the engine state and the file store that persists it.

mod file;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

pub use file::SnapshotStore;

// == Snapshot ==
/// Full point-in-time copy of an engine.
///
/// `keys` repeats the indexed key set; the loader cross-checks it against
/// `entries` before trusting the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub capacity: u32,
    /// Entries from most to least recently used
    pub entries: Vec<CacheEntry>,
    pub keys: Vec<u32>,
}

impl Snapshot {
    /// Snapshot of an empty engine.
    #[cfg(test)]
    pub(crate) fn empty(capacity: u32) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            keys: Vec::new(),
        }
    }
}
