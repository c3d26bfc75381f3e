//! Storefront services bundled for the hosting application.

use std::sync::Arc;
use std::time::Duration;

use threadline_client::{ApiClient, ClientConfig, CredentialStore, SessionEvents, TransportError};

use crate::account::Account;
use crate::cart::CartService;
use crate::catalog::Catalog;
use crate::checkout::Checkout;
use crate::wishlist::Wishlist;

/// Every storefront service, sharing one [`ApiClient`].
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    api: ApiClient,
    catalog: Catalog,
    cart: CartService,
    wishlist: Wishlist,
    account: Account,
    checkout: Checkout,
}

impl Storefront {
    /// Wire the services around an existing client.
    #[must_use]
    pub fn new(api: ApiClient, catalog_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(StorefrontInner {
                catalog: Catalog::new(api.clone(), catalog_ttl),
                cart: CartService::new(api.clone()),
                wishlist: Wishlist::new(api.clone()),
                account: Account::new(api.clone()),
                checkout: Checkout::new(api.clone()),
                api,
            }),
        }
    }

    /// Build the client from configuration, then wire the services.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        events: SessionEvents,
    ) -> Result<Self, TransportError> {
        let api = ApiClient::from_config(config, store, events)?;
        Ok(Self::new(api, config.catalog_ttl))
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &Wishlist {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn account(&self) -> &Account {
        &self.inner.account
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }
}
