//! Checkout: shipping address validation and order placement.

use serde::{Deserialize, Serialize};
use threadline_client::{ApiClient, ApiError, ApiRequest};
use threadline_core::{CartLine, FieldError, Order, PaymentMethod};
use tracing::{info, instrument};

use crate::cart::CartService;
use crate::error::CheckoutError;

/// Where an order is delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    /// 10-digit mobile number.
    pub phone: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    /// 6-digit postal code.
    pub postal_code: String,
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

impl ShippingAddress {
    /// Check every field, collecting all problems.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let required = [
            ("fullName", &self.full_name),
            ("addressLine1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "is required"));
            }
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            errors.push(FieldError::new("phone", "is required"));
        } else if !is_digits(phone, 10) {
            errors.push(FieldError::new("phone", "must be 10 digits"));
        }

        let postal_code = self.postal_code.trim();
        if postal_code.is_empty() {
            errors.push(FieldError::new("postalCode", "is required"));
        } else if !is_digits(postal_code, 6) {
            errors.push(FieldError::new("postalCode", "must be 6 digits"));
        }

        errors
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrder<'a> {
    items: Vec<CartLine>,
    shipping_address: &'a ShippingAddress,
    payment_method: PaymentMethod,
}

/// Turns the current cart into an order.
#[derive(Clone)]
pub struct Checkout {
    api: ApiClient,
}

impl Checkout {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Place an order for everything in `cart`.
    ///
    /// The local cart is cleared once the backend accepts the order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` or `CheckoutError::InvalidAddress`
    /// without calling the backend, and `CheckoutError::Api` if the backend
    /// rejects the order.
    #[instrument(skip(self, cart, address))]
    pub async fn place_order(
        &self,
        cart: &CartService,
        address: &ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Order, CheckoutError> {
        let snapshot = cart.snapshot();
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let errors = address.validate();
        if !errors.is_empty() {
            return Err(CheckoutError::InvalidAddress(errors));
        }

        let request = ApiRequest::post("/orders")
            .with_json(&PlaceOrder {
                items: snapshot.lines(),
                shipping_address: address,
                payment_method,
            })
            .map_err(ApiError::from)?;
        let order: Order = self.api.execute(request).await?.data;

        cart.clear_local();
        info!(order_id = %order.id, total = %order.total, "order placed");
        Ok(order)
    }
}
