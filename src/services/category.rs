//! Category service

use std::sync::Arc;

use tracing::{debug, info};

use super::{category_not_found, ProductService};
use crate::cache::{keys, CacheManager, InvalidationPlan};
use crate::error::{Result, ServiceError};
use crate::models::{
    Category, CategoryCreate, CategoryUpdate, CategoryView, CategoryWithProducts, Page, Product,
};
use crate::store::{CategoryDeletion, CategoryRecord, Related, Relation, Store};

fn name_taken() -> ServiceError {
    ServiceError::Conflict("Category name already exists".to_string())
}

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
    cache: Arc<CacheManager>,
    products: ProductService,
}

impl CategoryService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<CacheManager>, products: ProductService) -> Self {
        Self {
            store,
            cache,
            products,
        }
    }

    // == Reads ==

    pub async fn list(&self, page: Page, include_products: bool) -> Result<Vec<CategoryView>> {
        let key = keys::category_list(page.skip, page.limit, include_products);

        if include_products {
            let views = self
                .cache
                .get_or_load(&key, move || self.load_list_with_products(page))
                .await?;
            Ok(views.into_iter().map(CategoryView::WithProducts).collect())
        } else {
            let categories = self
                .cache
                .get_or_load(&key, move || self.load_list(page))
                .await?;
            Ok(categories.into_iter().map(CategoryView::Plain).collect())
        }
    }

    pub async fn get(&self, id: i64, include_products: bool) -> Result<CategoryView> {
        let key = keys::category(id, include_products);

        if include_products {
            let view = self
                .cache
                .get_or_load(&key, move || self.load_with_products(id))
                .await?;
            Ok(CategoryView::WithProducts(view))
        } else {
            let category = self.cache.get_or_load(&key, move || self.load(id)).await?;
            Ok(CategoryView::Plain(category))
        }
    }

    /// Products owned by a category. Listing results are cached by the
    /// product service under its own keys.
    pub async fn list_products(&self, id: i64, page: Page) -> Result<Vec<Product>> {
        self.products.require_category(id).await?;
        self.products.list_in_category(id, page).await
    }

    // == Writes ==

    /// Creates a category. The name pre-check is racy; the store's unique
    /// constraint backs it with the same Conflict.
    pub async fn create(&self, input: CategoryCreate) -> Result<Category> {
        let new = input.validate()?;

        if self.store.find_category_by_name(&new.name).await?.is_some() {
            return Err(name_taken());
        }

        let category = self.store.insert_category(&new).await?;
        info!(id = category.id, name = %category.name, "category created");

        self.cache
            .invalidate(&InvalidationPlan::category_created())
            .await;
        Ok(category)
    }

    pub async fn update(&self, id: i64, input: CategoryUpdate) -> Result<Category> {
        let changes = input.validate()?;

        let current = self
            .store
            .find_category(id, Relation::Skip)
            .await?
            .ok_or_else(category_not_found)?
            .category;

        if let Some(name) = changes.name.as_deref().filter(|name| *name != current.name) {
            if let Some(existing) = self.store.find_category_by_name(name).await? {
                if existing.id != id {
                    return Err(name_taken());
                }
            }
        }

        let updated = self
            .store
            .update_category(id, &changes)
            .await?
            .ok_or_else(category_not_found)?;

        if !changes.is_empty() {
            let renamed = updated.name != current.name;
            info!(id, renamed, "category updated");
            self.cache
                .invalidate(&InvalidationPlan::category_updated(id, renamed))
                .await;
        }
        Ok(updated)
    }

    /// Refused with Conflict while the category owns products; nothing is
    /// written or invalidated in that case.
    pub async fn delete(&self, id: i64) -> Result<()> {
        match self.store.delete_category(id).await? {
            CategoryDeletion::Deleted => {
                info!(id, "category deleted");
                self.cache
                    .invalidate(&InvalidationPlan::category_deleted(id))
                    .await;
                Ok(())
            }
            CategoryDeletion::NotFound => Err(category_not_found()),
            CategoryDeletion::HasProducts(count) => {
                debug!(id, count, "category delete refused");
                Err(ServiceError::Conflict(
                    "Cannot delete category with existing products. \
                     Please move or delete products first."
                        .to_string(),
                ))
            }
        }
    }

    // == Store Loaders ==

    async fn load(&self, id: i64) -> Result<Category> {
        self.store
            .find_category(id, Relation::Skip)
            .await?
            .map(|record| record.category)
            .ok_or_else(category_not_found)
    }

    async fn load_with_products(&self, id: i64) -> Result<CategoryWithProducts> {
        let record = self
            .store
            .find_category(id, Relation::Eager)
            .await?
            .ok_or_else(category_not_found)?;
        self.attach_products(record).await
    }

    async fn load_list(&self, page: Page) -> Result<Vec<Category>> {
        let records = self.store.list_categories(page, Relation::Skip).await?;
        Ok(records.into_iter().map(|record| record.category).collect())
    }

    async fn load_list_with_products(&self, page: Page) -> Result<Vec<CategoryWithProducts>> {
        let records = self.store.list_categories(page, Relation::Eager).await?;

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(self.attach_products(record).await?);
        }
        Ok(views)
    }

    async fn attach_products(&self, record: CategoryRecord) -> Result<CategoryWithProducts> {
        let products = match record.products {
            Related::Loaded(products) => products,
            Related::NotLoaded => self
                .store
                .find_category(record.category.id, Relation::Eager)
                .await?
                .and_then(|reloaded| reloaded.products.into_loaded())
                .unwrap_or_default(),
        };
        Ok(CategoryWithProducts::new(record.category, &products))
    }
}
