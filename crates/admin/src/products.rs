//! Back-office product management.

use reqwest::StatusCode;
use serde::Serialize;
use threadline_client::{ApiClient, ApiError, segment};
use threadline_core::{Price, Product, ProductId, ProductStatus};
use tracing::{info, instrument};

use crate::draft::ProductDraft;
use crate::error::AdminError;
use crate::filter::AdminFilter;

/// Product summary for list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: ProductStatus,
    pub stock: u32,
    /// Selling price, two decimals.
    pub price: String,
    /// List price when the product is on sale.
    pub list_price: Option<String>,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        let pricing = product.pricing();
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            status: product.status,
            stock: product.stock,
            price: Price::display(pricing.effective()),
            list_price: pricing
                .is_discounted()
                .then(|| Price::display(pricing.amount)),
        }
    }
}

// =============================================================================
// Type Conversions
// =============================================================================

fn product_path(id: &ProductId) -> String {
    format!("/admin/products/{}", segment(id.as_str()))
}

/// Map well-known statuses onto admin errors.
fn classify(error: ApiError, id: Option<&ProductId>) -> AdminError {
    match (error.status(), id) {
        (Some(StatusCode::NOT_FOUND), Some(id)) => AdminError::NotFound(id.clone()),
        (Some(StatusCode::FORBIDDEN), _) => AdminError::Forbidden,
        _ => AdminError::Api(error),
    }
}

#[derive(Serialize)]
struct StatusChange {
    status: ProductStatus,
}

/// Product CRUD for administrators.
#[derive(Clone)]
pub struct AdminProducts {
    api: ApiClient,
}

impl AdminProducts {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every product matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &AdminFilter) -> Result<Vec<Product>, AdminError> {
        let products: Vec<Product> = self
            .api
            .get("/admin/products")
            .await
            .map_err(|e| classify(e, None))?;
        Ok(filter.apply(products))
    }

    /// One product by ID.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for unknown IDs.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId) -> Result<Product, AdminError> {
        self.api
            .get(&product_path(id))
            .await
            .map_err(|e| classify(e, Some(id)))
    }

    /// Create a product after validating the draft.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Invalid` without calling the backend when the
    /// draft fails validation.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, AdminError> {
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(AdminError::Invalid(errors));
        }

        let product: Product = self
            .api
            .post("/admin/products", draft)
            .await
            .map_err(|e| classify(e, None))?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replace a product after validating the draft.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Invalid` for a bad draft and
    /// `AdminError::NotFound` for unknown IDs.
    #[instrument(skip(self, draft), fields(product_id = %id))]
    pub async fn update(&self, id: &ProductId, draft: &ProductDraft) -> Result<Product, AdminError> {
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(AdminError::Invalid(errors));
        }

        let product: Product = self
            .api
            .put(&product_path(id), draft)
            .await
            .map_err(|e| classify(e, Some(id)))?;
        info!("product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for unknown IDs.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: &ProductId) -> Result<(), AdminError> {
        self.api
            .delete(&product_path(id))
            .await
            .map_err(|e| classify(e, Some(id)))?;
        info!("product deleted");
        Ok(())
    }

    /// Flip a product between active and inactive.
    ///
    /// `current` is the status the caller last saw; the product is moved to
    /// the opposite one, which is returned.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for unknown IDs.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn toggle_status(
        &self,
        id: &ProductId,
        current: ProductStatus,
    ) -> Result<ProductStatus, AdminError> {
        let next = current.toggled();
        let path = format!("{}/status", product_path(id));
        let _: Option<serde_json::Value> = self
            .api
            .patch(&path, &StatusChange { status: next })
            .await
            .map_err(|e| classify(e, Some(id)))?;
        info!(status = %next, "product status changed");
        Ok(next)
    }
}
