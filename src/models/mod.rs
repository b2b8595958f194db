//! Request and response models for the entity API
//!
//! The response shapes double as cached values: what is cached is exactly
//! what the API returns.

pub mod category;
pub mod price;
pub mod product;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use category::{Category, CategoryView, CategoryWithProducts, ProductSummary};
pub use price::Price;
pub use product::{CategorySummary, Product, ProductView, ProductWithCategory};
pub use requests::{
    CategoryChanges, CategoryCreate, CategoryGetParams, CategoryListParams, CategoryUpdate,
    NewCategory, NewProduct, Page, PageParams, ProductChanges, ProductCreate, ProductGetParams,
    ProductListParams, ProductUpdate,
};
pub use responses::{ErrorResponse, HealthResponse, WelcomeResponse};
