//! Back-office product list filtering.

use threadline_core::{Product, ProductStatus};

/// Admin product list criteria.
///
/// Unlike the storefront, inactive products are listed unless a status
/// filter says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminFilter {
    /// Case-insensitive match against name and category.
    pub text: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
}

impl AdminFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }

        self.status.is_none_or(|status| product.status == status)
    }

    /// Matching products, newest first.
    #[must_use]
    pub fn apply(&self, mut products: Vec<Product>) -> Vec<Product> {
        products.retain(|product| self.matches(product));
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product(id: &str, name: &str, category: &str, status: &str, created: &str) -> Product {
        serde_json::from_value(json!({
            "_id": id,
            "name": name,
            "category": category,
            "price": 100,
            "status": status,
            "createdAt": created
        }))
        .unwrap()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("a", "Silk Dupatta", "accessories", "active", "2024-01-01T00:00:00Z"),
            product("b", "Denim Jacket", "jackets", "inactive", "2024-03-01T00:00:00Z"),
            product("c", "Silk Kurta", "kurtas", "inactive", "2024-02-01T00:00:00Z"),
        ]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_default_lists_everything_newest_first() {
        assert_eq!(ids(&AdminFilter::default().apply(catalog())), ["b", "c", "a"]);
    }

    #[test]
    fn test_filters_combine() {
        let filter = AdminFilter {
            text: Some("silk".to_string()),
            status: Some(ProductStatus::Inactive),
            ..AdminFilter::default()
        };
        assert_eq!(ids(&filter.apply(catalog())), ["c"]);

        let filter = AdminFilter {
            category: Some("Jackets".to_string()),
            ..AdminFilter::default()
        };
        assert_eq!(ids(&filter.apply(catalog())), ["b"]);
    }
}
