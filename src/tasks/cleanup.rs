//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries, so keys
//! that are never read again do not hold capacity until eviction.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryBackend;

/// Spawns a background task that sweeps expired entries every
/// `cleanup_interval_secs` seconds.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(backend: Arc<MemoryBackend>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "cache expiry sweeper started");

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "expired cache entries swept");
            } else {
                debug!("expiry sweep found nothing");
            }
        }
    })
}
