//! API Handlers
//!
//! Thin HTTP adapters: extract, call the service, wrap the result.
//! Status codes for failures come from [`ServiceError`]'s `IntoResponse`.
//!
//! [`ServiceError`]: crate::error::ServiceError

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};

use super::extract::{AppJson, AppPath, AppQuery};
use crate::cache::{CacheBackend, CacheManager, StatsSnapshot};
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    Category, CategoryCreate, CategoryGetParams, CategoryListParams, CategoryUpdate, CategoryView,
    HealthResponse, Page, PageParams, Product, ProductCreate, ProductGetParams, ProductListParams,
    ProductUpdate, ProductView, ProductWithCategory, WelcomeResponse,
};
use crate::services::{CategoryService, ProductService};
use crate::store::Store;

/// Application state shared across all handlers.
///
/// Cloning is cheap: every field is a handle to shared state.
#[derive(Clone)]
pub struct AppState {
    pub categories: CategoryService,
    pub products: ProductService,
    pub cache: Arc<CacheManager>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires both services to one store and one cache manager.
    pub fn new(store: Arc<dyn Store>, cache: Arc<CacheManager>, config: Config) -> Self {
        let products = ProductService::new(store.clone(), cache.clone());
        let categories = CategoryService::new(store, cache.clone(), products.clone());
        Self {
            categories,
            products,
            cache,
            config: Arc::new(config),
        }
    }

    /// Builds the cache manager from `CACHE_EXPIRE_TIME` over `backend`.
    pub fn from_config(store: Arc<dyn Store>, backend: Arc<dyn CacheBackend>, config: Config) -> Self {
        let ttl = Duration::from_secs(config.cache_expire_time);
        Self::new(store, Arc::new(CacheManager::new(backend, ttl)), config)
    }
}

// == Service Endpoints ==

/// Handler for GET /
pub async fn root_handler(State(state): State<AppState>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse::new(&state.config.app_name))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(&state.config.app_version))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.stats())
}

// == Categories ==

pub async fn list_categories(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<CategoryListParams>,
) -> Result<Json<Vec<CategoryView>>> {
    let page = Page::new(params.skip, params.limit)?;
    let categories = state.categories.list(page, params.include_products).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    AppJson(input): AppJson<CategoryCreate>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<CategoryGetParams>,
) -> Result<Json<CategoryView>> {
    let category = state.categories.get(id, params.include_products).await?;
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(input): AppJson<CategoryUpdate>,
) -> Result<Json<Category>> {
    let category = state.categories.update(id, input).await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_category_products(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Vec<Product>>> {
    let page = Page::new(params.skip, params.limit)?;
    let products = state.categories.list_products(id, page).await?;
    Ok(Json(products))
}

// == Products ==

pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ProductListParams>,
) -> Result<Json<Vec<ProductView>>> {
    let page = Page::new(params.skip, params.limit)?;
    let products = state
        .products
        .list(page, params.category_id, params.include_category)
        .await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    AppJson(input): AppJson<ProductCreate>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<ProductGetParams>,
) -> Result<Json<ProductView>> {
    let product = state.products.get(id, params.include_category).await?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(input): AppJson<ProductUpdate>,
) -> Result<Json<ProductWithCategory>> {
    let product = state.products.update(id, input).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use crate::error::ServiceError;
    use crate::store::SqliteStore;

    async fn test_state() -> AppState {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        AppState::from_config(store, Arc::new(MemoryBackend::new(100)), Config::default())
    }

    #[tokio::test]
    async fn test_create_then_get_category() {
        let state = test_state().await;

        let input = CategoryCreate {
            name: "Books".to_string(),
            description: None,
        };
        let (status, Json(created)) = create_category(State(state.clone()), AppJson(input))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let params = CategoryGetParams {
            include_products: false,
        };
        let Json(view) = get_category(State(state), AppPath(created.id), AppQuery(params))
            .await
            .unwrap();
        assert_eq!(view.category(), &created);
    }

    #[tokio::test]
    async fn test_limit_out_of_range_is_validation_error() {
        let state = test_state().await;

        let params = ProductListParams {
            skip: 0,
            limit: 0,
            category_id: None,
            include_category: false,
        };
        let result = list_products(State(state.clone()), AppQuery(params)).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(state.cache.stats().misses, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_product() {
        let state = test_state().await;

        let result = delete_product(State(state), AppPath(42)).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_root_uses_app_name() {
        let state = test_state().await;

        let Json(welcome) = root_handler(State(state)).await;
        assert_eq!(welcome.message, "Welcome to Product Management API");
    }
}
