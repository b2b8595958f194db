//! Services Module
//!
//! Cache-aside reads and write-invalidate mutations over a [`Store`].
//!
//! Every service holds the same two long-lived handles: the store, which is
//! authoritative, and the shared [`CacheManager`]. Input is validated before
//! either is touched, and cache invalidation runs only after the store write
//! has committed.
//!
//! [`Store`]: crate::store::Store
//! [`CacheManager`]: crate::cache::CacheManager

mod category;
mod product;

pub use category::CategoryService;
pub use product::ProductService;

use crate::error::ServiceError;

fn category_not_found() -> ServiceError {
    ServiceError::NotFound("Category not found".to_string())
}

fn product_not_found() -> ServiceError {
    ServiceError::NotFound("Product not found".to_string())
}
