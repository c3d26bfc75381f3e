//! Threadline Core - Shared types library.
//!
//! This crate provides common types used across all Threadline components:
//! - `client` - HTTP transport, credential storage and token refresh
//! - `storefront` - Customer-facing catalog, cart, wishlist and checkout
//! - `admin` - Back-office product management
//! - `cli` - Command-line host for both fronts
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - IDs, the response envelope, products, prices, variant
//!   keys, the cart snapshot and validated emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
