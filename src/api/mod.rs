//! API Module
//!
//! HTTP handlers and routing for the product catalog REST API.
//!
//! # Endpoints
//! - `GET /` - Welcome message
//! - `GET /health` - Health check endpoint
//! - `GET /cache/stats` - Cache statistics
//! - `/api/v1/categories` - Category CRUD and per-category product listing
//! - `/api/v1/products` - Product CRUD

pub mod extract;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
