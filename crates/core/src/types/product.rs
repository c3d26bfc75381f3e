//! Catalog product as served by the backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::status::ProductStatus;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// List price (MRP).
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// List and selling price.
    #[must_use]
    pub const fn pricing(&self) -> Price {
        Price {
            amount: self.price,
            discounted: self.discounted_price,
        }
    }

    /// What the customer pays per unit.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.pricing().effective()
    }

    /// Whether at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether `size`/`color` are offered (case-insensitive).
    ///
    /// A product that lists no sizes (or no colors) accepts any value for
    /// that dimension.
    #[must_use]
    pub fn offers(&self, size: &str, color: &str) -> bool {
        let matches = |options: &[String], wanted: &str| {
            options.is_empty() || options.iter().any(|o| o.eq_ignore_ascii_case(wanted))
        };
        matches(&self.sizes, size) && matches(&self.colors, color)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "_id": "65b0",
        "name": "Linen Shirt",
        "category": "shirts",
        "price": 1999,
        "discountedPrice": 1499.5,
        "stock": 3,
        "status": "active",
        "sizes": ["S", "M"],
        "colors": ["white"],
        "createdAt": "2024-03-01T10:00:00Z"
    }"#;

    #[test]
    fn test_deserialize_backend_product() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(product.id.as_str(), "65b0");
        assert_eq!(product.price, Decimal::from(1999));
        assert_eq!(product.discounted_price, Some(Decimal::new(14995, 1)));
        assert_eq!(product.effective_price(), Decimal::new(14995, 1));
        assert!(product.in_stock());
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_defaults_for_sparse_product() {
        let product: Product =
            serde_json::from_str(r#"{"_id":"x","name":"Tote","price":10}"#).unwrap();
        assert_eq!(product.status, ProductStatus::Active);
        assert!(!product.in_stock());
        assert!(product.offers("anything", "any"));
    }

    #[test]
    fn test_offers_is_case_insensitive() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert!(product.offers("m", "WHITE"));
        assert!(!product.offers("XL", "white"));
    }
}
