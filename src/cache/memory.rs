//! In-Memory Cache Backend
//!
//! HashMap storage with absolute per-entry expiry, glob sweeps and a bounded
//! capacity. Expired entries are dropped lazily on read and in bulk by the
//! background cleanup task.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{glob_match, BackendError, CacheBackend, CacheEntry};

// == Memory Backend ==
/// Process-local cache backend.
#[derive(Debug)]
pub struct MemoryBackend {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates an empty backend holding at most `max_entries` keys.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries)
    }

    // == Length ==
    /// Number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // == Keys ==
    /// Sorted snapshot of the live (unexpired) keys.
    pub async fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Makes room for one new key: expired entries go first, then the entry
    /// closest to expiry.
    fn make_room(&self, entries: &mut HashMap<String, CacheEntry>) -> Result<(), BackendError> {
        if entries.len() < self.max_entries {
            return Ok(());
        }

        let purged = purge_expired(entries);
        if purged > 0 {
            debug!(purged, "purged expired entries to make room");
            return Ok(());
        }

        let victim = entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());

        match victim {
            Some(key) => {
                debug!(%key, "evicted entry closest to expiry");
                entries.remove(&key);
                Ok(())
            }
            None => Err(BackendError::Full(format!(
                "capacity of {} entries leaves no room",
                self.max_entries
            ))),
        }
    }
}

fn purge_expired(entries: &mut HashMap<String, CacheEntry>) -> usize {
    let now = current_timestamp_ms();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired_at(now));
    before - entries.len()
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a fresh value replaced it meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) {
            self.make_room(&mut entries)?;
        }

        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize, BackendError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok(before - entries.len())
    }
}
