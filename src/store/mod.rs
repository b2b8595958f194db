//! Store Module
//!
//! Persistence contract for categories and products. The store is the single
//! source of truth: it enforces name uniqueness and product→category
//! integrity, and every call runs in its own transaction.

mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Category, CategoryChanges, NewCategory, NewProduct, Page, Product, ProductChanges};

pub use sqlite::SqliteStore;

/// Failure surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("{0}")]
    UniqueViolation(String),

    /// A foreign key constraint rejected the write
    #[error("{0}")]
    ForeignKeyViolation(String),

    /// A stored row could not be mapped back to a model
    #[error("stored row is invalid: {0}")]
    Corrupt(String),

    /// Schema migration failed at startup
    #[error("migration failed: {0}")]
    Migration(String),

    /// Connection loss and other unexpected database failures
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How a query treats the other side of the category/product relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Fetch only the entity itself
    Skip,
    /// Load the related entities in the same round trip
    Eager,
}

/// Related data attached to a record, tagged with whether it was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Related<T> {
    NotLoaded,
    Loaded(T),
}

impl<T> Related<T> {
    pub fn into_loaded(self) -> Option<T> {
        match self {
            Related::Loaded(value) => Some(value),
            Related::NotLoaded => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Related::Loaded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub category: Category,
    pub products: Related<Vec<Product>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub product: Product,
    pub category: Related<Category>,
}

/// Outcome of a guarded category delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryDeletion {
    Deleted,
    NotFound,
    /// Refused: the category still owns this many products
    HasProducts(i64),
}

/// Transactional persistence for categories and products.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_category(&self, id: i64, relation: Relation) -> StoreResult<Option<CategoryRecord>>;

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;

    async fn list_categories(&self, page: Page, relation: Relation) -> StoreResult<Vec<CategoryRecord>>;

    async fn insert_category(&self, new: &NewCategory) -> StoreResult<Category>;

    /// Applies only the fields present in `changes`. `None` if the id is unknown.
    async fn update_category(&self, id: i64, changes: &CategoryChanges) -> StoreResult<Option<Category>>;

    /// Deletes unless the category owns products, checked in the same transaction.
    async fn delete_category(&self, id: i64) -> StoreResult<CategoryDeletion>;

    async fn find_product(&self, id: i64, relation: Relation) -> StoreResult<Option<ProductRecord>>;

    /// Products ordered by id, optionally restricted to one category.
    async fn list_products(
        &self,
        category_id: Option<i64>,
        page: Page,
        relation: Relation,
    ) -> StoreResult<Vec<ProductRecord>>;

    async fn insert_product(&self, new: &NewProduct) -> StoreResult<Product>;

    /// Applies only the fields present in `changes`. `None` if the id is unknown.
    async fn update_product(&self, id: i64, changes: &ProductChanges) -> StoreResult<Option<Product>>;

    /// Returns whether a row was deleted.
    async fn delete_product(&self, id: i64) -> StoreResult<bool>;
}
