//! Request DTOs for the entity API
//!
//! Incoming bodies and query strings, plus the validated forms the store
//! accepts. Validation happens before any store or cache interaction.

use serde::{Deserialize, Deserializer};

use crate::error::{Result, ServiceError};
use crate::models::Price;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

// == Validation Helpers ==

/// Trims and checks a name. Length is counted in characters.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("Name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(description: Option<String>) -> Result<Option<String>> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => {
            Err(ServiceError::Validation(format!(
                "Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters"
            )))
        }
        other => Ok(other),
    }
}

fn validate_price(price: f64) -> Result<Price> {
    Price::from_decimal(price).map_err(ServiceError::Validation)
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field
/// (`None`, via `#[serde(default)]`).
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// == Pagination ==

/// Validated offset/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(skip: u32, limit: u32) -> Result<Self> {
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ServiceError::Validation(format!(
                "Limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(Self { skip, limit })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

// == Category Bodies ==

/// Body of `POST /categories`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Validated new category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryCreate {
    pub fn validate(self) -> Result<NewCategory> {
        Ok(NewCategory {
            name: validate_name(&self.name)?,
            description: validate_description(self.description)?,
        })
    }
}

/// Body of `PUT /categories/:id`. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,
}

/// Validated partial category update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

impl CategoryUpdate {
    pub fn validate(self) -> Result<CategoryChanges> {
        Ok(CategoryChanges {
            name: self.name.as_deref().map(validate_name).transpose()?,
            description: self.description.map(validate_description).transpose()?,
        })
    }
}

// == Product Bodies ==

/// Body of `POST /products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: i64,
}

impl ProductCreate {
    pub fn validate(self) -> Result<NewProduct> {
        Ok(NewProduct {
            name: validate_name(&self.name)?,
            description: validate_description(self.description)?,
            price: validate_price(self.price)?,
            category_id: self.category_id,
        })
    }
}

/// Body of `PUT /products/:id`. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Price>,
    pub category_id: Option<i64>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
    }
}

impl ProductUpdate {
    pub fn validate(self) -> Result<ProductChanges> {
        Ok(ProductChanges {
            name: self.name.as_deref().map(validate_name).transpose()?,
            description: self.description.map(validate_description).transpose()?,
            price: self.price.map(validate_price).transpose()?,
            category_id: self.category_id,
        })
    }
}

// == Query Strings ==

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_true() -> bool {
    true
}

/// `GET /categories`
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryListParams {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub include_products: bool,
}

/// `GET /categories/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryGetParams {
    #[serde(default = "default_true")]
    pub include_products: bool,
}

/// `GET /categories/:id/products`
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// `GET /products`
#[derive(Debug, Clone, Deserialize)]
pub struct ProductListParams {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub include_category: bool,
}

/// `GET /products/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ProductGetParams {
    #[serde(default)]
    pub include_category: bool,
}
