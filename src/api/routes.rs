//! API Routes
//!
//! Configures the Axum router: service endpoints at the root, entity
//! endpoints under the configured prefix.

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::normalize_api_prefix;

use super::handlers::{
    cache_stats_handler, create_category, create_product, delete_category, delete_product,
    get_category, get_product, health_handler, list_categories, list_category_products,
    list_products, root_handler, update_category, update_product, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /`, `GET /health`, `GET /cache/stats`
/// - `{prefix}/categories[/:id[/products]]`
/// - `{prefix}/products[/:id]`
///
/// # Middleware
/// - CORS: origins from `CORS_ORIGINS`, any method and header
/// - Tracing: one span per request
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.cors_origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let entities = Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/categories/:id/products", get(list_category_products))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        );

    let service = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/cache/stats", get(cache_stats_handler));

    // axum refuses to nest at the root
    let prefix = normalize_api_prefix(&state.config.api_prefix);
    let router = if prefix.is_empty() {
        service.merge(entities)
    } else {
        service.nest(&prefix, entities)
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` anywhere in the list allows every origin. Unparsable entries are
/// skipped with a warning.
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(parsed)
}
