//! Admin error types.

use thiserror::Error;
use threadline_client::ApiError;
use threadline_core::{FieldError, ProductId, validation};

/// Errors from back-office product management.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The signed-in user is not an administrator.
    #[error("Admin access required")]
    Forbidden,

    /// The form failed validation; nothing was sent.
    #[error("Invalid product: {}", validation::describe(.0))]
    Invalid(Vec<FieldError>),
}
