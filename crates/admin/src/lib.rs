//! Threadline admin library.
//!
//! Back-office product management: listing with client-side filters,
//! create/edit with form validation, deletion and the active/inactive
//! toggle.
//!
//! # Security
//!
//! Every call needs an administrator's access token; the backend answers
//! 403 otherwise, surfaced as [`AdminError::Forbidden`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod draft;
pub mod error;
pub mod filter;
pub mod products;

pub use draft::ProductDraft;
pub use error::AdminError;
pub use filter::AdminFilter;
pub use products::{AdminProducts, ProductRow};
