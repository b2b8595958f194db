//! Category response shapes
//!
//! These are both the API response bodies and the cached values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Price, Product};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Product as embedded in a category view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub price: Price,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<ProductSummary>,
}

impl CategoryWithProducts {
    pub fn new(category: Category, products: &[Product]) -> Self {
        Self {
            category,
            products: products.iter().map(ProductSummary::from).collect(),
        }
    }
}

/// Either category shape, depending on what the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CategoryView {
    WithProducts(CategoryWithProducts),
    Plain(Category),
}

impl CategoryView {
    pub fn category(&self) -> &Category {
        match self {
            CategoryView::WithProducts(view) => &view.category,
            CategoryView::Plain(category) => category,
        }
    }
}
