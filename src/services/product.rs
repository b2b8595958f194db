//! Product service

use std::sync::Arc;

use tracing::{debug, info};

use super::{category_not_found, product_not_found};
use crate::cache::{keys, CacheManager, InvalidationPlan};
use crate::error::{Result, ServiceError};
use crate::models::{
    Category, Page, Product, ProductCreate, ProductUpdate, ProductView, ProductWithCategory,
};
use crate::store::{ProductRecord, Related, Relation, Store, StoreError};

/// A missing owner surfaces as a foreign key violation on insert/update.
fn missing_owner(err: StoreError) -> ServiceError {
    match err {
        StoreError::ForeignKeyViolation(_) => category_not_found(),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn Store>,
    cache: Arc<CacheManager>,
}

impl ProductService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<CacheManager>) -> Self {
        Self { store, cache }
    }

    // == Reads ==

    /// Paginated products. A category filter takes precedence and always
    /// yields plain products; otherwise `include_category` selects the join.
    pub async fn list(
        &self,
        page: Page,
        category_id: Option<i64>,
        include_category: bool,
    ) -> Result<Vec<ProductView>> {
        let key = keys::product_list(page.skip, page.limit, category_id, include_category);

        if include_category && category_id.is_none() {
            let views = self
                .cache
                .get_or_load(&key, move || self.load_list_with_category(page))
                .await?;
            return Ok(views.into_iter().map(ProductView::WithCategory).collect());
        }

        let products = self
            .cache
            .get_or_load(&key, move || self.load_list(category_id, page))
            .await?;
        Ok(products.into_iter().map(ProductView::Plain).collect())
    }

    /// Products of one category. The caller checks that the category exists.
    pub async fn list_in_category(&self, category_id: i64, page: Page) -> Result<Vec<Product>> {
        let key = keys::product_list(page.skip, page.limit, Some(category_id), false);
        self.cache
            .get_or_load(&key, move || self.load_list(Some(category_id), page))
            .await
    }

    pub async fn get(&self, id: i64, include_category: bool) -> Result<ProductView> {
        let key = keys::product(id, include_category);

        if include_category {
            let view = self
                .cache
                .get_or_load(&key, move || self.load_with_category(id))
                .await?;
            Ok(ProductView::WithCategory(view))
        } else {
            let product = self.cache.get_or_load(&key, move || self.load(id)).await?;
            Ok(ProductView::Plain(product))
        }
    }

    // == Writes ==

    pub async fn create(&self, input: ProductCreate) -> Result<Product> {
        let new = input.validate()?;
        self.require_category(new.category_id).await?;

        let product = self.store.insert_product(&new).await.map_err(missing_owner)?;
        info!(id = product.id, category_id = product.category_id, "product created");

        self.cache
            .invalidate(&InvalidationPlan::product_created(product.category_id))
            .await;
        Ok(product)
    }

    /// Partial update. The response always embeds the owning category.
    pub async fn update(&self, id: i64, input: ProductUpdate) -> Result<ProductWithCategory> {
        let changes = input.validate()?;

        let current = self
            .store
            .find_product(id, Relation::Skip)
            .await?
            .ok_or_else(product_not_found)?
            .product;

        let mut new_owner = None;
        if let Some(category_id) = changes.category_id {
            if category_id != current.category_id {
                new_owner = Some(self.require_category(category_id).await?);
            }
        }

        let updated = self
            .store
            .update_product(id, &changes)
            .await
            .map_err(missing_owner)?
            .ok_or_else(product_not_found)?;

        if !changes.is_empty() {
            info!(id, "product updated");
            self.cache
                .invalidate(&InvalidationPlan::product_updated(
                    id,
                    &[current.category_id, updated.category_id],
                ))
                .await;
        }

        let owner = match new_owner {
            Some(category) => category,
            None => self.require_category(updated.category_id).await?,
        };
        Ok(ProductWithCategory::new(updated, &owner))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let product = self
            .store
            .find_product(id, Relation::Skip)
            .await?
            .ok_or_else(product_not_found)?
            .product;

        if !self.store.delete_product(id).await? {
            return Err(product_not_found());
        }
        info!(id, "product deleted");

        self.cache
            .invalidate(&InvalidationPlan::product_deleted(id, product.category_id))
            .await;
        Ok(())
    }

    // == Store Loaders ==

    pub(crate) async fn require_category(&self, id: i64) -> Result<Category> {
        self.store
            .find_category(id, Relation::Skip)
            .await?
            .map(|record| record.category)
            .ok_or_else(category_not_found)
    }

    async fn load(&self, id: i64) -> Result<Product> {
        self.store
            .find_product(id, Relation::Skip)
            .await?
            .map(|record| record.product)
            .ok_or_else(product_not_found)
    }

    async fn load_with_category(&self, id: i64) -> Result<ProductWithCategory> {
        let record = self
            .store
            .find_product(id, Relation::Eager)
            .await?
            .ok_or_else(product_not_found)?;
        self.attach_category(record).await
    }

    async fn load_list(&self, category_id: Option<i64>, page: Page) -> Result<Vec<Product>> {
        let records = self
            .store
            .list_products(category_id, page, Relation::Skip)
            .await?;
        debug!(count = records.len(), "products loaded from store");
        Ok(records.into_iter().map(|record| record.product).collect())
    }

    async fn load_list_with_category(&self, page: Page) -> Result<Vec<ProductWithCategory>> {
        let records = self.store.list_products(None, page, Relation::Eager).await?;

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(self.attach_category(record).await?);
        }
        Ok(views)
    }

    async fn attach_category(&self, record: ProductRecord) -> Result<ProductWithCategory> {
        let category = match record.category {
            Related::Loaded(category) => category,
            Related::NotLoaded => self.require_category(record.product.category_id).await?,
        };
        Ok(ProductWithCategory::new(record.product, &category))
    }
}
