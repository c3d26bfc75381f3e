//! Saved-for-later products.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use threadline_client::{ApiClient, segment};
use threadline_core::{Product, ProductId};
use tracing::instrument;

use crate::error::WishlistError;

/// Wishlist payload: either full product documents or bare IDs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WishlistEntry {
    Product(Box<Product>),
    Id(ProductId),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddToWishlist<'a> {
    product_id: &'a ProductId,
}

/// The signed-in customer's wishlist.
///
/// Remembers the IDs seen in the last server answer so [`Wishlist::contains`]
/// can be answered without a round trip.
#[derive(Clone)]
pub struct Wishlist {
    api: ApiClient,
    known: Arc<RwLock<BTreeSet<ProductId>>>,
}

impl Wishlist {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            known: Arc::new(RwLock::new(BTreeSet::new())),
        }
    }

    fn remember(&self, entries: &[WishlistEntry]) -> Vec<ProductId> {
        let ids: Vec<ProductId> = entries
            .iter()
            .map(|entry| match entry {
                WishlistEntry::Product(product) => product.id.clone(),
                WishlistEntry::Id(id) => id.clone(),
            })
            .collect();
        *self.known.write().unwrap_or_else(PoisonError::into_inner) =
            ids.iter().cloned().collect();
        ids
    }

    /// IDs of every saved product.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be fetched.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ProductId>, WishlistError> {
        let entries: Vec<WishlistEntry> = self.api.get("/wishlist").await?;
        Ok(self.remember(&entries))
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the change.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId) -> Result<Vec<ProductId>, WishlistError> {
        let entries: Vec<WishlistEntry> = self
            .api
            .post("/wishlist", &AddToWishlist { product_id })
            .await?;
        Ok(self.remember(&entries))
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the change.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        self.api
            .delete(&format!("/wishlist/{}", segment(product_id.as_str())))
            .await?;
        self.known
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(product_id);
        Ok(())
    }

    /// Whether the product was in the last known wishlist.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(product_id)
    }
}
