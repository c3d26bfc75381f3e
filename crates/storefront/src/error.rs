//! Storefront error types.
//!
//! Each service has its own error enum wrapping [`ApiError`] plus the
//! domain failures that service can detect before touching the network.

use thiserror::Error;
use threadline_client::ApiError;
use threadline_core::{EmailError, FieldError, ProductId, VariantKey, validation};

/// Errors from browsing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The product does not exist or is not visible to customers.
    #[error("Product not found: {0}")]
    NotFound(ProductId),
}

/// Errors from cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The server rejected the change; the local cart was rolled back.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The product is not sold in this size/color.
    #[error("{product} is not available as {variant}")]
    UnknownVariant {
        product: ProductId,
        variant: VariantKey,
    },

    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

/// Errors from sign-in, sign-out and account pages.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong email or password.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Login succeeded but the answer carried no usable token.
    #[error("Login response did not contain a token")]
    MissingToken,

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid shipping address: {}", validation::describe(.0))]
    InvalidAddress(Vec<FieldError>),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Errors from the wishlist.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}
