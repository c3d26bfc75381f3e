//! Core types for Threadline.
//!
//! This module provides type-safe wrappers for the domain concepts both
//! fronts share.

pub mod cart;
pub mod email;
pub mod envelope;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod validation;
pub mod variant;

pub use cart::{CartLine, CartPayload, CartSnapshot};
pub use email::{Email, EmailError};
pub use envelope::{Envelope, ErrorEnvelope, ResponseBody};
pub use id::*;
pub use order::{Order, UserProfile};
pub use price::Price;
pub use product::Product;
pub use status::*;
pub use validation::FieldError;
pub use variant::{VariantKey, VariantKeyError};
