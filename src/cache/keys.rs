//! Cache key definitions.
//!
//! Key layout (shared with any pre-existing cache state):
//! - lists: `{plural}:{skip}:{limit}[:{extra}]`
//! - single-item variants: `{entity}:{id}:{flag}`
//! - single-item, no variant: `{entity}:{id}`
//!
//! plus the invalidation plans each write produces.

use std::collections::BTreeSet;

/// Every paginated category listing.
pub const CATEGORY_LISTINGS: &str = "categories:*";
/// Category listings that embed product summaries.
pub const CATEGORY_LISTINGS_WITH_PRODUCTS: &str = "categories:*:true";
/// Every paginated product listing.
pub const PRODUCT_LISTINGS: &str = "products:*";
/// Product listings that embed category summaries.
pub const PRODUCT_LISTINGS_WITH_CATEGORY: &str = "products:*:true";
/// Single-product views that embed category summaries.
pub const PRODUCTS_WITH_CATEGORY: &str = "product:*:true";

pub fn category_list(skip: u32, limit: u32, include_products: bool) -> String {
    format!("categories:{skip}:{limit}:{include_products}")
}

pub fn category(id: i64, include_products: bool) -> String {
    format!("category:{id}:{include_products}")
}

/// `category_id` renders as `all` when the listing is unfiltered.
pub fn product_list(
    skip: u32,
    limit: u32,
    category_id: Option<i64>,
    include_category: bool,
) -> String {
    match category_id {
        Some(id) => format!("products:{skip}:{limit}:{id}:{include_category}"),
        None => format!("products:{skip}:{limit}:all:{include_category}"),
    }
}

pub fn product(id: i64, include_category: bool) -> String {
    format!("product:{id}:{include_category}")
}

/// Variant-less product key written by older deployments.
pub fn product_plain(id: i64) -> String {
    format!("product:{id}")
}

// == Invalidation Plan ==
/// Exact keys and glob patterns to evict after a committed write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Keys removed one by one
    pub keys: BTreeSet<String>,
    /// Globs removed by sweep
    pub patterns: BTreeSet<String>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: String) -> Self {
        self.keys.insert(key);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.patterns.insert(pattern.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.patterns.is_empty()
    }

    /// A new category can land on any listing page.
    pub fn category_created() -> Self {
        Self::new().pattern(CATEGORY_LISTINGS)
    }

    /// Both per-id variants plus every listing. A rename also reaches the
    /// product views that embed the category's name.
    pub fn category_updated(id: i64, renamed: bool) -> Self {
        let plan = Self::category_deleted(id);
        if renamed {
            plan.pattern(PRODUCTS_WITH_CATEGORY)
                .pattern(PRODUCT_LISTINGS_WITH_CATEGORY)
        } else {
            plan
        }
    }

    pub fn category_deleted(id: i64) -> Self {
        Self::new()
            .key(category(id, true))
            .key(category(id, false))
            .pattern(CATEGORY_LISTINGS)
    }

    /// Every product listing, plus the with-products views of the owner.
    pub fn product_created(category_id: i64) -> Self {
        Self::new()
            .pattern(PRODUCT_LISTINGS)
            .with_owner_views(category_id)
    }

    /// `owners` holds the category before and after the write; both embed
    /// a summary of this product.
    pub fn product_updated(id: i64, owners: &[i64]) -> Self {
        let plan = Self::new()
            .key(product_plain(id))
            .key(product(id, true))
            .key(product(id, false))
            .pattern(PRODUCT_LISTINGS);
        owners
            .iter()
            .fold(plan, |plan, &owner| plan.with_owner_views(owner))
    }

    pub fn product_deleted(id: i64, category_id: i64) -> Self {
        Self::product_updated(id, &[category_id])
    }

    fn with_owner_views(self, category_id: i64) -> Self {
        self.key(category(category_id, true))
            .pattern(CATEGORY_LISTINGS_WITH_PRODUCTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_key_formats() {
        assert_eq!(category_list(0, 100, false), "categories:0:100:false");
        assert_eq!(category(7, true), "category:7:true");
        assert_eq!(product_list(10, 20, None, true), "products:10:20:all:true");
        assert_eq!(product_list(0, 100, Some(3), false), "products:0:100:3:false");
        assert_eq!(product(5, false), "product:5:false");
        assert_eq!(product_plain(5), "product:5");
    }

    #[test]
    fn test_category_created_plan() {
        let plan = InvalidationPlan::category_created();
        assert!(plan.keys.is_empty());
        assert_eq!(plan.patterns, set(&["categories:*"]));
    }

    #[test]
    fn test_category_updated_plan() {
        let plan = InvalidationPlan::category_updated(4, false);
        assert_eq!(plan.keys, set(&["category:4:false", "category:4:true"]));
        assert_eq!(plan.patterns, set(&["categories:*"]));

        let renamed = InvalidationPlan::category_updated(4, true);
        assert_eq!(
            renamed.patterns,
            set(&["categories:*", "product:*:true", "products:*:true"])
        );
    }

    #[test]
    fn test_product_updated_plan_covers_both_owners() {
        let plan = InvalidationPlan::product_updated(9, &[1, 2]);
        assert_eq!(
            plan.keys,
            set(&[
                "category:1:true",
                "category:2:true",
                "product:9",
                "product:9:false",
                "product:9:true",
            ])
        );
        assert_eq!(plan.patterns, set(&["categories:*:true", "products:*"]));
    }

    #[test]
    fn test_product_deleted_same_as_update_with_single_owner() {
        assert_eq!(
            InvalidationPlan::product_deleted(9, 1),
            InvalidationPlan::product_updated(9, &[1])
        );
    }

    #[test]
    fn test_product_created_plan() {
        let plan = InvalidationPlan::product_created(3);
        assert_eq!(plan.keys, set(&["category:3:true"]));
        assert_eq!(plan.patterns, set(&["categories:*:true", "products:*"]));
    }
}
