//! Product create/edit form.

use rust_decimal::Decimal;
use serde::Serialize;
use threadline_core::{FieldError, Product, ProductStatus};

/// Longest accepted product name.
pub const MAX_NAME_LENGTH: usize = 120;

/// Body of `POST /admin/products` and `PUT /admin/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discounted_price: Option<Decimal>,
    /// Signed so a negative form entry can be reported instead of wrapping.
    pub stock: i64,
    pub status: ProductStatus,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            category: String::new(),
            price: Decimal::ZERO,
            discounted_price: None,
            stock: 0,
            status: ProductStatus::Active,
            sizes: Vec::new(),
            colors: Vec::new(),
            images: Vec::new(),
        }
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price,
            discounted_price: product.discounted_price,
            stock: i64::from(product.stock),
            status: product.status,
            sizes: product.sizes.clone(),
            colors: product.colors.clone(),
            images: product.images.clone(),
        }
    }
}

impl ProductDraft {
    /// Check the form, collecting every problem.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "is required"));
        } else if name.chars().count() > MAX_NAME_LENGTH {
            errors.push(FieldError::new(
                "name",
                format!("must be at most {MAX_NAME_LENGTH} characters"),
            ));
        }

        if self.category.trim().is_empty() {
            errors.push(FieldError::new("category", "is required"));
        }

        if self.price <= Decimal::ZERO {
            errors.push(FieldError::new("price", "must be greater than zero"));
        }

        if let Some(discounted) = self.discounted_price {
            if discounted <= Decimal::ZERO {
                errors.push(FieldError::new(
                    "discountedPrice",
                    "must be greater than zero",
                ));
            } else if discounted > self.price {
                errors.push(FieldError::new(
                    "discountedPrice",
                    "cannot exceed the price",
                ));
            }
        }

        if !self.sizes.iter().any(|size| !size.trim().is_empty()) {
            errors.push(FieldError::new("sizes", "select at least one size"));
        }

        if self.stock < 0 {
            errors.push(FieldError::new("stock", "cannot be negative"));
        }

        errors
    }
}
