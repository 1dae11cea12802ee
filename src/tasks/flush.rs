//! Snapshot Flush Task
//!
//! Background task that periodically writes pending cache changes to disk
//! when the cache runs in interval persistence mode.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::PersistentCache;

/// Spawns a background task that saves the cache whenever it has unsaved
/// changes, at most once per `interval`.
///
/// File writes run on the blocking pool so the runtime's workers are never
/// stalled by disk I/O. The returned handle can be aborted during shutdown;
/// callers should then run [`PersistentCache::close`] for the final write.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(PersistentCache::open(&config)?);
/// let flush_handle = spawn_flush_task(cache.clone(), Duration::from_secs(5));
/// // Later, during shutdown:
/// flush_handle.abort();
/// cache.close()?;
/// ```
pub fn spawn_flush_task(cache: Arc<PersistentCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting snapshot flush task with interval of {} ms",
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let cache = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || cache.flush_if_dirty()).await {
                Ok(Ok(true)) => debug!("Snapshot flush: pending changes written"),
                Ok(Ok(false)) => debug!("Snapshot flush: nothing to write"),
                Ok(Err(e)) => warn!(error = %e, "Snapshot flush failed, will retry"),
                Err(e) => warn!(error = %e, "Snapshot flush worker panicked"),
            }
        }
    })
}
