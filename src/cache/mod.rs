//! Cache Module
//!
//! Read-through / write-invalidate caching: key derivation, a fail-open
//! manager, and an in-memory backend with TTL expiry and glob sweeps.

mod backend;
mod entry;
pub mod keys;
mod manager;
mod memory;
mod pattern;
mod stats;


// Re-export public types
pub use backend::{BackendError, CacheBackend};
pub use entry::CacheEntry;
pub use keys::InvalidationPlan;
pub use manager::{CacheManager, Generation};
pub use memory::MemoryBackend;
pub use pattern::glob_match;
pub use stats::{CacheStats, StatsSnapshot};
