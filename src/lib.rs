//! Product API - category and product catalog service
//!
//! CRUD over a relational store with a cache-aside, write-invalidate cache
//! in front of every read.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheManager, MemoryBackend};
pub use config::Config;
pub use error::ServiceError;
pub use store::SqliteStore;
pub use tasks::spawn_cleanup_task;
