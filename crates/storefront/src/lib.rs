//! Threadline storefront library.
//!
//! Customer-facing services: catalog browsing and search, cart, wishlist,
//! account and checkout. Every service talks to the backend through a
//! shared [`threadline_client::ApiClient`], so an expired access token is
//! refreshed once no matter which service noticed it first.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod state;
pub mod wishlist;

pub use account::Account;
pub use cart::CartService;
pub use catalog::{Catalog, ProductQuery, SortOrder};
pub use checkout::{Checkout, ShippingAddress};
pub use error::{AccountError, CartError, CatalogError, CheckoutError, WishlistError};
pub use state::Storefront;
pub use wishlist::Wishlist;
