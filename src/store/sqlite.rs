//! SQLite store
//!
//! `sqlx` implementation of [`Store`]. Timestamps are stored as RFC 3339
//! text with microsecond precision, prices as integer cents.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use super::{
    CategoryDeletion, CategoryRecord, ProductRecord, Related, Relation, Store, StoreError,
    StoreResult,
};
use crate::models::{
    Category, CategoryChanges, NewCategory, NewProduct, Page, Price, Product, ProductChanges,
};

const SELECT_CATEGORY: &str =
    "SELECT id, name, description, created_at, updated_at FROM categories";

const SELECT_PRODUCT: &str = "SELECT p.id AS id, p.name AS name, p.description AS description, \
     p.price_cents AS price_cents, p.category_id AS category_id, \
     p.created_at AS created_at, p.updated_at AS updated_at \
     FROM products p";

const SELECT_PRODUCT_WITH_CATEGORY: &str = "SELECT p.id AS id, p.name AS name, \
     p.description AS description, p.price_cents AS price_cents, \
     p.category_id AS category_id, p.created_at AS created_at, p.updated_at AS updated_at, \
     c.id AS c_id, c.name AS c_name, c.description AS c_description, \
     c.created_at AS c_created_at, c.updated_at AS c_updated_at \
     FROM products p JOIN categories c ON c.id = p.category_id";

/// SQLite-backed store with a pooled connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `database_url`.
    ///
    /// # Configuration
    /// - Journal mode: WAL
    /// - Synchronous: NORMAL
    /// - Foreign keys: enabled
    /// - Busy timeout: 5 seconds
    /// - Acquire timeout: 10 seconds
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        info!(database_url, max_connections, "store connected");
        Ok(Self { pool })
    }

    /// Private, migrated in-memory database. The pool pins a single
    /// connection because every SQLite memory connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Applies pending migrations from `./migrations`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        debug!("migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// == Row Mapping ==

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp {raw:?}: {e}")))
}

/// Reads a category from columns named `{prefix}id`, `{prefix}name`, ...
fn category_from_row(row: &SqliteRow, prefix: &str) -> StoreResult<Category> {
    let col = |name: &str| format!("{prefix}{name}");
    let created_at: String = row.try_get(col("created_at").as_str())?;
    let updated_at: Option<String> = row.try_get(col("updated_at").as_str())?;

    Ok(Category {
        id: row.try_get(col("id").as_str())?,
        name: row.try_get(col("name").as_str())?,
        description: row.try_get(col("description").as_str())?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: updated_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn product_from_row(row: &SqliteRow) -> StoreResult<Product> {
    let id: i64 = row.try_get("id")?;
    let cents: i64 = row.try_get("price_cents")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;

    Ok(Product {
        id,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Price::from_cents(cents)
            .ok_or_else(|| StoreError::Corrupt(format!("product {id} has price {cents}")))?,
        category_id: row.try_get("category_id")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: updated_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn product_record_from_row(row: &SqliteRow, relation: Relation) -> StoreResult<ProductRecord> {
    let category = match relation {
        Relation::Eager => Related::Loaded(category_from_row(row, "c_")?),
        Relation::Skip => Related::NotLoaded,
    };
    Ok(ProductRecord {
        product: product_from_row(row)?,
        category,
    })
}

fn select_products(relation: Relation) -> &'static str {
    match relation {
        Relation::Eager => SELECT_PRODUCT_WITH_CATEGORY,
        Relation::Skip => SELECT_PRODUCT,
    }
}

// == Constraint Messages ==

fn category_name_taken(err: sqlx::Error) -> StoreError {
    match StoreError::from(err) {
        StoreError::UniqueViolation(_) => {
            StoreError::UniqueViolation("Category name already exists".to_string())
        }
        other => other,
    }
}

fn category_missing(err: sqlx::Error) -> StoreError {
    match StoreError::from(err) {
        StoreError::ForeignKeyViolation(_) => {
            StoreError::ForeignKeyViolation("Category not found".to_string())
        }
        other => other,
    }
}

// == Connection-level Queries ==

async fn fetch_category(conn: &mut SqliteConnection, id: i64) -> StoreResult<Option<Category>> {
    let row = sqlx::query(&format!("{SELECT_CATEGORY} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(|r| category_from_row(r, "")).transpose()
}

async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> StoreResult<Option<Product>> {
    let row = sqlx::query(&format!("{SELECT_PRODUCT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(product_from_row).transpose()
}

/// Products of every listed category, grouped by owner, in one query.
async fn products_by_category(
    conn: &mut SqliteConnection,
    category_ids: &[i64],
) -> StoreResult<HashMap<i64, Vec<Product>>> {
    let mut grouped: HashMap<i64, Vec<Product>> = HashMap::new();
    if category_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query = QueryBuilder::<Sqlite>::new(SELECT_PRODUCT);
    query.push(" WHERE p.category_id IN (");
    let mut ids = query.separated(", ");
    for id in category_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY p.id");

    for row in query.build().fetch_all(&mut *conn).await? {
        let product = product_from_row(&row)?;
        grouped.entry(product.category_id).or_default().push(product);
    }
    Ok(grouped)
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_category(&self, id: i64, relation: Relation) -> StoreResult<Option<CategoryRecord>> {
        let mut tx = self.pool.begin().await?;

        let Some(category) = fetch_category(&mut tx, id).await? else {
            return Ok(None);
        };

        let products = match relation {
            Relation::Skip => Related::NotLoaded,
            Relation::Eager => {
                let mut grouped = products_by_category(&mut tx, &[id]).await?;
                Related::Loaded(grouped.remove(&id).unwrap_or_default())
            }
        };

        tx.commit().await?;
        Ok(Some(CategoryRecord { category, products }))
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!("{SELECT_CATEGORY} WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|r| category_from_row(r, "")).transpose()
    }

    async fn list_categories(&self, page: Page, relation: Relation) -> StoreResult<Vec<CategoryRecord>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(&format!("{SELECT_CATEGORY} ORDER BY id LIMIT ? OFFSET ?"))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.skip))
            .fetch_all(&mut *tx)
            .await?;
        let categories = rows
            .iter()
            .map(|r| category_from_row(r, ""))
            .collect::<StoreResult<Vec<_>>>()?;

        let records = match relation {
            Relation::Skip => categories
                .into_iter()
                .map(|category| CategoryRecord {
                    category,
                    products: Related::NotLoaded,
                })
                .collect(),
            Relation::Eager => {
                let ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
                let mut grouped = products_by_category(&mut tx, &ids).await?;
                categories
                    .into_iter()
                    .map(|category| {
                        let products = grouped.remove(&category.id).unwrap_or_default();
                        CategoryRecord {
                            category,
                            products: Related::Loaded(products),
                        }
                    })
                    .collect()
            }
        };

        tx.commit().await?;
        Ok(records)
    }

    async fn insert_category(&self, new: &NewCategory) -> StoreResult<Category> {
        let created_at = now();

        let result =
            sqlx::query("INSERT INTO categories (name, description, created_at) VALUES (?, ?, ?)")
                .bind(new.name.as_str())
                .bind(new.description.as_deref())
                .bind(format_timestamp(created_at))
                .execute(&self.pool)
                .await
                .map_err(category_name_taken)?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            description: new.description.clone(),
            created_at,
            updated_at: None,
        })
    }

    async fn update_category(&self, id: i64, changes: &CategoryChanges) -> StoreResult<Option<Category>> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = fetch_category(&mut tx, id).await? else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(existing));
        }

        let updated = Category {
            id,
            name: changes.name.clone().unwrap_or(existing.name),
            description: changes.description.clone().unwrap_or(existing.description),
            created_at: existing.created_at,
            updated_at: Some(now()),
        };

        sqlx::query("UPDATE categories SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(updated.name.as_str())
            .bind(updated.description.as_deref())
            .bind(updated.updated_at.map(format_timestamp))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(category_name_taken)?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_category(&self, id: i64) -> StoreResult<CategoryDeletion> {
        let mut tx = self.pool.begin().await?;

        if fetch_category(&mut tx, id).await?.is_none() {
            return Ok(CategoryDeletion::NotFound);
        }

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if owned > 0 {
            return Ok(CategoryDeletion::HasProducts(owned));
        }

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|err| match StoreError::from(err) {
                StoreError::ForeignKeyViolation(_) => StoreError::ForeignKeyViolation(
                    "Cannot delete category with existing products".to_string(),
                ),
                other => other,
            })?;

        tx.commit().await?;
        Ok(CategoryDeletion::Deleted)
    }

    async fn find_product(&self, id: i64, relation: Relation) -> StoreResult<Option<ProductRecord>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", select_products(relation)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(|r| product_record_from_row(r, relation))
            .transpose()
    }

    async fn list_products(
        &self,
        category_id: Option<i64>,
        page: Page,
        relation: Relation,
    ) -> StoreResult<Vec<ProductRecord>> {
        let mut query = QueryBuilder::<Sqlite>::new(select_products(relation));
        if let Some(category_id) = category_id {
            query.push(" WHERE p.category_id = ").push_bind(category_id);
        }
        query
            .push(" ORDER BY p.id LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.skip));

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| product_record_from_row(r, relation))
            .collect()
    }

    async fn insert_product(&self, new: &NewProduct) -> StoreResult<Product> {
        let created_at = now();

        let result = sqlx::query(
            "INSERT INTO products (name, description, price_cents, category_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.name.as_str())
        .bind(new.description.as_deref())
        .bind(new.price.cents())
        .bind(new.category_id)
        .bind(format_timestamp(created_at))
        .execute(&self.pool)
        .await
        .map_err(category_missing)?;

        Ok(Product {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            description: new.description.clone(),
            price: new.price,
            category_id: new.category_id,
            created_at,
            updated_at: None,
        })
    }

    async fn update_product(&self, id: i64, changes: &ProductChanges) -> StoreResult<Option<Product>> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = fetch_product(&mut tx, id).await? else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(existing));
        }

        let updated = Product {
            id,
            name: changes.name.clone().unwrap_or(existing.name),
            description: changes.description.clone().unwrap_or(existing.description),
            price: changes.price.unwrap_or(existing.price),
            category_id: changes.category_id.unwrap_or(existing.category_id),
            created_at: existing.created_at,
            updated_at: Some(now()),
        };

        sqlx::query(
            "UPDATE products SET name = ?, description = ?, price_cents = ?, category_id = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(updated.name.as_str())
        .bind(updated.description.as_deref())
        .bind(updated.price.cents())
        .bind(updated.category_id)
        .bind(updated.updated_at.map(format_timestamp))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(category_missing)?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_product(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            description: None,
        }
    }

    fn new_product(name: &str, cents: i64, category_id: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Price::from_cents(cents).unwrap(),
            category_id,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_category() {
        let store = store().await;

        let created = store.insert_category(&new_category("Books")).await.unwrap();
        let found = store
            .find_category(created.id, Relation::Skip)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.category, created);
        assert_eq!(found.products, Related::NotLoaded);
    }

    #[tokio::test]
    async fn test_duplicate_category_name_is_unique_violation() {
        let store = store().await;
        store.insert_category(&new_category("Books")).await.unwrap();

        let err = store.insert_category(&new_category("Books")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_eager_category_loads_products() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();
        let music = store.insert_category(&new_category("Music")).await.unwrap();
        store.insert_product(&new_product("Novel", 999, books.id)).await.unwrap();
        store.insert_product(&new_product("Atlas", 2500, books.id)).await.unwrap();

        let found = store
            .find_category(books.id, Relation::Eager)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<String> = found
            .products
            .into_loaded()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Novel", "Atlas"]);

        let listed = store
            .list_categories(Page::default(), Relation::Eager)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].category.id, music.id);
        assert_eq!(listed[1].products, Related::Loaded(vec![]));
    }

    #[tokio::test]
    async fn test_list_categories_paginates_by_id() {
        let store = store().await;
        for name in ["A", "B", "C", "D"] {
            store.insert_category(&new_category(name)).await.unwrap();
        }

        let page = store
            .list_categories(Page::new(1, 2).unwrap(), Relation::Skip)
            .await
            .unwrap();
        let names: Vec<&str> = page.iter().map(|r| r.category.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_update_category_partial() {
        let store = store().await;
        let created = store
            .insert_category(&NewCategory {
                name: "Books".to_string(),
                description: Some("Printed".to_string()),
            })
            .await
            .unwrap();

        let changes = CategoryChanges {
            name: Some("Printed Books".to_string()),
            description: None,
        };
        let updated = store
            .update_category(created.id, &changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Printed Books");
        assert_eq!(updated.description.as_deref(), Some("Printed"));
        assert!(updated.updated_at.is_some());

        let reread = store.find_category(created.id, Relation::Skip).await.unwrap().unwrap();
        assert_eq!(reread.category, updated);
    }

    #[tokio::test]
    async fn test_update_category_rename_collision() {
        let store = store().await;
        store.insert_category(&new_category("Books")).await.unwrap();
        let music = store.insert_category(&new_category("Music")).await.unwrap();

        let changes = CategoryChanges {
            name: Some("Books".to_string()),
            description: None,
        };
        let err = store.update_category(music.id, &changes).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_delete_category_guarded() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();
        store.insert_product(&new_product("Novel", 999, books.id)).await.unwrap();

        assert_eq!(
            store.delete_category(books.id).await.unwrap(),
            CategoryDeletion::HasProducts(1)
        );
        assert!(store.find_category(books.id, Relation::Skip).await.unwrap().is_some());
        assert_eq!(store.delete_category(999).await.unwrap(), CategoryDeletion::NotFound);
    }

    #[tokio::test]
    async fn test_delete_empty_category() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();

        assert_eq!(store.delete_category(books.id).await.unwrap(), CategoryDeletion::Deleted);
        assert!(store.find_category(books.id, Relation::Skip).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_product_requires_existing_category() {
        let store = store().await;

        let err = store.insert_product(&new_product("Novel", 999, 42)).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn test_find_product_with_category() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();
        let novel = store.insert_product(&new_product("Novel", 999, books.id)).await.unwrap();

        let record = store.find_product(novel.id, Relation::Eager).await.unwrap().unwrap();
        assert_eq!(record.product, novel);
        assert_eq!(record.category, Related::Loaded(books));

        let plain = store.find_product(novel.id, Relation::Skip).await.unwrap().unwrap();
        assert!(!plain.category.is_loaded());
    }

    #[tokio::test]
    async fn test_list_products_by_category() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();
        let music = store.insert_category(&new_category("Music")).await.unwrap();
        store.insert_product(&new_product("Novel", 999, books.id)).await.unwrap();
        store.insert_product(&new_product("Vinyl", 3000, music.id)).await.unwrap();

        let only_music = store
            .list_products(Some(music.id), Page::default(), Relation::Skip)
            .await
            .unwrap();
        assert_eq!(only_music.len(), 1);
        assert_eq!(only_music[0].product.name, "Vinyl");

        let all = store
            .list_products(None, Page::default(), Relation::Eager)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.category.is_loaded()));
    }

    #[tokio::test]
    async fn test_update_product_moves_category() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();
        let music = store.insert_category(&new_category("Music")).await.unwrap();
        let novel = store.insert_product(&new_product("Novel", 999, books.id)).await.unwrap();

        let changes = ProductChanges {
            category_id: Some(music.id),
            price: Price::from_cents(1299),
            ..Default::default()
        };
        let updated = store.update_product(novel.id, &changes).await.unwrap().unwrap();

        assert_eq!(updated.category_id, music.id);
        assert_eq!(updated.price.cents(), 1299);
        assert_eq!(updated.name, "Novel");

        let bad = ProductChanges {
            category_id: Some(404),
            ..Default::default()
        };
        let err = store.update_product(novel.id, &bad).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn test_delete_product() {
        let store = store().await;
        let books = store.insert_category(&new_category("Books")).await.unwrap();
        let novel = store.insert_product(&new_product("Novel", 999, books.id)).await.unwrap();

        assert!(store.delete_product(novel.id).await.unwrap());
        assert!(!store.delete_product(novel.id).await.unwrap());
    }
}
