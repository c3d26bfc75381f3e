//! Product catalog.
//!
//! The backend serves the whole product list in one call; filtering and
//! sorting happen client-side. The list is cached with `moka` so browsing
//! and repeated searches do not refetch it.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use threadline_client::{ApiClient, ApiError, segment};
use threadline_core::{Product, ProductId};
use tracing::{debug, instrument};

use crate::error::CatalogError;

const CACHE_CAPACITY: u64 = 1000;

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// `GET /products` answers either a bare array or `{ products: [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProductList {
    Bare(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl ProductList {
    fn into_vec(self) -> Vec<Product> {
        match self {
            Self::Bare(products) | Self::Wrapped { products } => products,
        }
    }
}

// =============================================================================
// Query
// =============================================================================

/// Product list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
    /// Largest discount percentage first, cheaper first on ties.
    TopDiscount,
    /// Alphabetical by name.
    Name,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "newest" => Ok(Self::Newest),
            "price-low-to-high" | "price-asc" => Ok(Self::PriceLowToHigh),
            "price-high-to-low" | "price-desc" => Ok(Self::PriceHighToLow),
            "top-discount" | "discount" => Ok(Self::TopDiscount),
            "name" => Ok(Self::Name),
            _ => Err(format!("invalid sort order: {s}")),
        }
    }
}

/// Storefront search and filter criteria.
///
/// Every criterion is optional; an empty query returns every visible
/// product, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive match against name, description and category.
    pub text: Option<String>,
    pub category: Option<String>,
    /// Bounds on the effective (discounted) price, inclusive.
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Keep products offered in any of these sizes.
    pub sizes: Vec<String>,
    /// Keep products offered in any of these colors.
    pub colors: Vec<String>,
    pub in_stock_only: bool,
    pub sort: SortOrder,
}

impl ProductQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub const fn price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    #[must_use]
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.sizes.push(size.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.colors.push(color.into());
        self
    }

    #[must_use]
    pub const fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    #[must_use]
    pub const fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Whether `product` passes every filter. Inactive products never do.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !product.status.is_active() {
            return false;
        }

        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = [&product.name, &product.description, &product.category]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }

        let price = product.effective_price();
        if self.min_price.is_some_and(|min| price < min)
            || self.max_price.is_some_and(|max| price > max)
        {
            return false;
        }

        if !any_offered(&product.sizes, &self.sizes) || !any_offered(&product.colors, &self.colors)
        {
            return false;
        }

        !self.in_stock_only || product.in_stock()
    }

    /// Filter and sort `products`.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut hits: Vec<Product> = products
            .iter()
            .filter(|product| self.matches(product))
            .cloned()
            .collect();
        hits.sort_by(|a, b| compare(self.sort, a, b));
        hits
    }
}

fn any_offered(offered: &[String], wanted: &[String]) -> bool {
    wanted.is_empty()
        || offered
            .iter()
            .any(|o| wanted.iter().any(|w| o.eq_ignore_ascii_case(w)))
}

fn compare(sort: SortOrder, a: &Product, b: &Product) -> Ordering {
    match sort {
        // Products without a timestamp sink to the bottom
        SortOrder::Newest => b.created_at.cmp(&a.created_at),
        SortOrder::PriceLowToHigh => a.effective_price().cmp(&b.effective_price()),
        SortOrder::PriceHighToLow => b.effective_price().cmp(&a.effective_price()),
        SortOrder::TopDiscount => b
            .pricing()
            .discount_percent()
            .cmp(&a.pricing().discount_percent())
            .then_with(|| a.effective_price().cmp(&b.effective_price())),
        SortOrder::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Read-only access to the product catalog.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    /// Create a catalog whose responses live for `ttl`.
    #[must_use]
    pub fn new(api: ApiClient, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner { api, cache }),
        }
    }

    /// Every product the backend knows about, including inactive ones.
    async fn all_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("cache hit for product list");
            return Ok(products);
        }

        let list: ProductList = self.inner.api.get("/products").await?;
        let products = Arc::new(list.into_vec());
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        debug!(count = products.len(), "product list cached");
        Ok(products)
    }

    /// Products visible to customers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the product list cannot be fetched.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        self.search(&ProductQuery::default()).await
    }

    /// Filter and sort the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the product list cannot be fetched.
    #[instrument(skip(self), fields(sort = ?query.sort))]
    pub async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let products = self.all_products().await?;
        let hits = query.apply(&products);
        debug!(matched = hits.len(), total = products.len(), "catalog searched");
        Ok(hits)
    }

    /// One product by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown or inactive products.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            return Ok(*product);
        }

        let path = format!("/products/{}", segment(id.as_str()));
        let product: Product = match self.inner.api.get(&path).await {
            Ok(product) => product,
            Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => return Err(CatalogError::NotFound(id.clone())),
            Err(e) => return Err(e.into()),
        };

        if !product.status.is_active() {
            return Err(CatalogError::NotFound(id.clone()));
        }

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Distinct categories of visible products, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the product list cannot be fetched.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let products = self.all_products().await?;
        let mut categories: Vec<String> = products
            .iter()
            .filter(|p| p.status.is_active() && !p.category.is_empty())
            .map(|p| p.category.clone())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        Ok(categories)
    }

    /// Drop everything cached.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
        debug!("catalog cache cleared");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use threadline_core::ProductStatus;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: &str, price: &str, discounted: Option<&str>, day: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            category: "shirts".to_string(),
            price: d(price),
            discounted_price: discounted.map(d),
            stock: 5,
            status: ProductStatus::Active,
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["white".to_string()],
            images: Vec::new(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
        }
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_top_discount_orders_by_percentage_then_price() {
        let products = vec![
            product("none", "1000", None, 1),
            product("ten", "1000", Some("900"), 2),
            product("half-expensive", "2000", Some("1000"), 3),
            product("half-cheap", "1000", Some("500"), 4),
        ];

        let sorted = ProductQuery::new().sort(SortOrder::TopDiscount).apply(&products);

        assert_eq!(ids(&sorted), ["half-cheap", "half-expensive", "ten", "none"]);
    }

    #[test]
    fn test_price_sorts_use_effective_price() {
        let products = vec![
            product("a", "1000", Some("400"), 1),
            product("b", "500", None, 2),
            product("c", "800", None, 3),
        ];

        let asc = ProductQuery::new().sort(SortOrder::PriceLowToHigh).apply(&products);
        assert_eq!(ids(&asc), ["a", "b", "c"]);

        let desc = ProductQuery::new().sort(SortOrder::PriceHighToLow).apply(&products);
        assert_eq!(ids(&desc), ["c", "b", "a"]);
    }

    #[test]
    fn test_default_query_hides_inactive_and_sorts_newest_first() {
        let mut hidden = product("hidden", "100", None, 9);
        hidden.status = ProductStatus::Inactive;
        let products = vec![product("old", "100", None, 1), hidden, product("new", "100", None, 5)];

        assert_eq!(ids(&ProductQuery::new().apply(&products)), ["new", "old"]);
    }

    #[test]
    fn test_filters_compose() {
        let mut tee = product("tee", "600", None, 1);
        tee.name = "Organic Cotton Tee".to_string();
        tee.category = "t-shirts".to_string();
        tee.sizes = vec!["L".to_string()];

        let mut sold_out = product("sold-out", "600", None, 2);
        sold_out.name = "Cotton Polo".to_string();
        sold_out.stock = 0;

        let mut pricey = product("pricey", "5000", None, 3);
        pricey.name = "Cotton Blazer".to_string();

        let products = vec![tee, sold_out, pricey, product("linen", "700", None, 4)];

        let query = ProductQuery::new()
            .text("cotton")
            .price_range(None, Some(d("1000")))
            .in_stock_only();
        assert_eq!(ids(&query.apply(&products)), ["tee"]);

        let by_size = ProductQuery::new().size("m");
        assert_eq!(ids(&by_size.apply(&products)), ["linen", "pricey", "sold-out"]);

        let by_category = ProductQuery::new().category("T-SHIRTS");
        assert_eq!(ids(&by_category.apply(&products)), ["tee"]);
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("top-discount".parse::<SortOrder>().unwrap(), SortOrder::TopDiscount);
        assert_eq!("price_asc".parse::<SortOrder>().unwrap(), SortOrder::PriceLowToHigh);
        assert_eq!("Name".parse::<SortOrder>().unwrap(), SortOrder::Name);
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_product_list_accepts_both_shapes() {
        let bare: ProductList = serde_json::from_str(r#"[{"_id": "p1", "name": "A", "price": 10}]"#).unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let wrapped: ProductList =
            serde_json::from_str(r#"{"products": [{"_id": "p1", "name": "A", "price": 10}]}"#).unwrap();
        assert_eq!(wrapped.into_vec().len(), 1);
    }
}
