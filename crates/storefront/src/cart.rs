//! Shopping cart with optimistic updates.
//!
//! Mutations are applied to the local snapshot first so the UI can show
//! them immediately, then sent to the backend. The server's answer always
//! wins: on success the snapshot is reconciled with the returned cart, on
//! failure it is restored to what it was before the call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use serde::Serialize;
use threadline_client::ApiClient;
use threadline_core::{CartPayload, CartSnapshot, Product, ProductId, VariantKey};
use tracing::{debug, instrument, warn};

use crate::error::CartError;

/// Body of `POST /cart` (quantity is a delta) and `PUT /cart` (absolute).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartMutation<'a> {
    product_id: &'a ProductId,
    size: &'a str,
    color: &'a str,
    quantity: i64,
}

impl<'a> CartMutation<'a> {
    fn new(product_id: &'a ProductId, variant: &'a VariantKey, quantity: i64) -> Self {
        Self {
            product_id,
            size: variant.size(),
            color: variant.color(),
            quantity,
        }
    }
}

/// The signed-in customer's cart.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: ApiClient,
    snapshot: Mutex<CartSnapshot>,
}

impl CartService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CartInner {
                api,
                snapshot: Mutex::new(CartSnapshot::new()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartSnapshot> {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current local view of the cart.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lock().clone()
    }

    /// Rehydrate the snapshot from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be fetched; the snapshot is left
    /// untouched.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<CartSnapshot, CartError> {
        let payload: CartPayload = self.inner.api.get("/cart").await?;
        let server = CartSnapshot::from(payload);
        *self.lock() = server.clone();
        debug!(items = server.item_count(), "cart loaded");
        Ok(server)
    }

    /// Add `quantity` units of one variant.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UnknownVariant` if the product is not sold in
    /// that size/color, `CartError::InvalidQuantity` for zero, and
    /// `CartError::Api` if the server rejects the change.
    #[instrument(skip(self, product), fields(product_id = %product.id, variant = %variant))]
    pub async fn add(
        &self,
        product: &Product,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<CartSnapshot, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if !product.offers(variant.size(), variant.color()) {
            return Err(CartError::UnknownVariant {
                product: product.id.clone(),
                variant: variant.clone(),
            });
        }

        let delta = i64::from(quantity);
        self.mutate(
            |snapshot| snapshot.add(&product.id, variant, delta),
            self.inner
                .api
                .post("/cart", &CartMutation::new(&product.id, variant, delta)),
        )
        .await
    }

    /// Set one variant's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the server rejects the change.
    #[instrument(skip(self), fields(product_id = %product_id, variant = %variant))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        variant: &VariantKey,
        quantity: i64,
    ) -> Result<CartSnapshot, CartError> {
        let quantity = quantity.max(0);
        self.mutate(
            |snapshot| snapshot.set(product_id, variant, quantity),
            self.inner
                .api
                .put("/cart", &CartMutation::new(product_id, variant, quantity)),
        )
        .await
    }

    /// Remove one variant from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the server rejects the change.
    pub async fn remove(
        &self,
        product_id: &ProductId,
        variant: &VariantKey,
    ) -> Result<CartSnapshot, CartError> {
        self.set_quantity(product_id, variant, 0).await
    }

    /// Apply `optimistic` locally, await `request`, then reconcile or roll
    /// back.
    async fn mutate<F, R>(&self, optimistic: F, request: R) -> Result<CartSnapshot, CartError>
    where
        F: FnOnce(&mut CartSnapshot),
        R: Future<Output = Result<CartPayload, threadline_client::ApiError>>,
    {
        let previous = {
            let mut snapshot = self.lock();
            let previous = snapshot.clone();
            optimistic(&mut *snapshot);
            previous
        };

        match request.await {
            Ok(payload) => {
                let mut snapshot = self.lock();
                if snapshot.reconcile(CartSnapshot::from(payload)) {
                    debug!("server cart differed from optimistic update");
                }
                Ok(snapshot.clone())
            }
            Err(e) => {
                warn!(error = %e, "cart update failed, rolling back");
                *self.lock() = previous;
                Err(e.into())
            }
        }
    }

    /// Forget the local cart (after an order was placed).
    pub fn clear_local(&self) {
        *self.lock() = CartSnapshot::new();
    }

    /// Total units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().item_count()
    }

    /// Subtotal at effective prices, using `products` for pricing.
    ///
    /// Lines whose product is not in `products` are skipped.
    #[must_use]
    pub fn subtotal(&self, products: &[Product]) -> Decimal {
        self.lock().subtotal(|id| {
            products
                .iter()
                .find(|p| &p.id == id)
                .map(Product::effective_price)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use threadline_client::{
        ApiRequest, ApiResponse, AuthCoordinator, Credentials, MemoryCredentialStore,
        RefreshPolicy, SessionEvents, Transport, TransportError,
    };
    use threadline_core::ProductStatus;

    use super::*;

    /// Minimal cart server: keeps lines in memory, can be told to fail.
    #[derive(Default)]
    struct CartServer {
        lines: Mutex<Vec<Value>>,
        fail: AtomicBool,
    }

    impl CartServer {
        fn payload(&self) -> ApiResponse {
            let items = self.lines.lock().unwrap().clone();
            ApiResponse::json_value(
                StatusCode::OK,
                &json!({"statuscode": 200, "responseBody": {"data": {"items": items}}}),
            )
        }
    }

    #[async_trait]
    impl Transport for CartServer {
        async fn execute(
            &self,
            request: &ApiRequest,
            _bearer: Option<&SecretString>,
        ) -> Result<ApiResponse, TransportError> {
            if self.fail.load(Ordering::SeqCst) {
                return Ok(ApiResponse::json_value(
                    StatusCode::BAD_REQUEST,
                    &json!({"statuscode": 400, "responseBody": {"message": "Insufficient stock"}}),
                ));
            }

            if let Some(body) = &request.body {
                let mut lines = self.lines.lock().unwrap();
                let same = |line: &Value| {
                    line["productId"] == body["productId"]
                        && line["size"] == body["size"]
                        && line["color"] == body["color"]
                };
                let quantity = body["quantity"].as_i64().unwrap();
                let current = lines
                    .iter()
                    .find(|l| same(l))
                    .and_then(|l| l["quantity"].as_i64())
                    .unwrap_or(0);
                let next = if request.method == reqwest::Method::POST {
                    current + quantity
                } else {
                    quantity
                };
                lines.retain(|l| !same(l));
                if next > 0 {
                    let mut line = body.clone();
                    line["quantity"] = json!(next);
                    lines.push(line);
                }
            }
            Ok(self.payload())
        }
    }

    fn cart(server: Arc<CartServer>) -> CartService {
        let store = MemoryCredentialStore::with_credentials(Credentials::new(
            SecretString::from("t1"),
            None,
        ));
        CartService::new(ApiClient::new(AuthCoordinator::new(
            server,
            Arc::new(store),
            SessionEvents::default(),
            RefreshPolicy::default(),
        )))
    }

    fn shirt() -> Product {
        serde_json::from_value(json!({
            "_id": "shirt",
            "name": "Linen Shirt",
            "price": 1000,
            "discountedPrice": 800,
            "stock": 10,
            "status": ProductStatus::Active,
            "sizes": ["S", "M"],
            "colors": ["white"]
        }))
        .unwrap()
    }

    fn key(size: &str, color: &str) -> VariantKey {
        VariantKey::new(size, color).unwrap()
    }

    #[tokio::test]
    async fn test_add_reconciles_with_server() {
        let server = Arc::new(CartServer::default());
        let cart = cart(server.clone());
        let shirt = shirt();

        cart.add(&shirt, &key("M", "white"), 2).await.unwrap();
        let snapshot = cart.add(&shirt, &key("M", "white"), 1).await.unwrap();

        assert_eq!(snapshot.quantity(&shirt.id, &key("M", "white")), 3);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(&[shirt]), "2400".parse::<Decimal>().unwrap());
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back() {
        let server = Arc::new(CartServer::default());
        let cart = cart(server.clone());
        let shirt = shirt();
        cart.add(&shirt, &key("S", "white"), 1).await.unwrap();
        let before = cart.snapshot();

        server.fail.store(true, Ordering::SeqCst);
        let err = cart.add(&shirt, &key("S", "white"), 4).await.unwrap_err();

        assert!(err.to_string().contains("Insufficient stock"));
        assert_eq!(cart.snapshot(), before);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line_and_product() {
        let server = Arc::new(CartServer::default());
        let cart = cart(server);
        let shirt = shirt();
        cart.add(&shirt, &key("S", "white"), 1).await.unwrap();

        let snapshot = cart.set_quantity(&shirt.id, &key("S", "white"), -3).await.unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.product_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_variant_is_rejected_locally() {
        let cart = cart(Arc::new(CartServer::default()));
        let err = cart
            .add(&shirt(), &key("XXL", "white"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::UnknownVariant { .. }));
        assert!(cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_load_rehydrates_and_clear_local_forgets() {
        let server = Arc::new(CartServer::default());
        server.lines.lock().unwrap().push(json!({
            "productId": "shirt", "size": "M", "color": "white", "quantity": 2
        }));
        let cart = cart(server);

        let snapshot = cart.load().await.unwrap();
        assert_eq!(snapshot.item_count(), 2);

        cart.clear_local();
        assert_eq!(cart.item_count(), 0);
    }
}
