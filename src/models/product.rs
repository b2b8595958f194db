//! Product response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Price};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Category as embedded in a product view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: Product,
    pub category: CategorySummary,
}

impl ProductWithCategory {
    pub fn new(product: Product, category: &Category) -> Self {
        Self {
            product,
            category: CategorySummary::from(category),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProductView {
    WithCategory(ProductWithCategory),
    Plain(Product),
}

impl ProductView {
    pub fn product(&self) -> &Product {
        match self {
            ProductView::WithCategory(view) => &view.product,
            ProductView::Plain(product) => product,
        }
    }
}
