//! Cache Backend Module
//!
//! The raw key-value contract the cache manager sits on: string keys, string
//! values, per-key TTL and glob deletion.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a cache backend. Never reaches an API caller.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend cannot be reached or refused the operation
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend is at capacity and could not make room
    #[error("cache full: {0}")]
    Full(String),
}

/// A shared key-value store with expiry and pattern deletion.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the stored value if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Stores `value` under `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError>;

    /// Removes one key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Removes every key matching the glob. Returns how many were removed.
    async fn delete_matching(&self, pattern: &str) -> Result<usize, BackendError>;
}
