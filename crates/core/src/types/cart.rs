//! Client-side cart snapshot.
//!
//! The server owns the cart. The client keeps a snapshot shaped
//! `product_id -> (variant key -> quantity)` that is rehydrated from the
//! server, mutated optimistically, and then replaced by whatever the server
//! answers.
//!
//! Invariant: a stored quantity is always positive. Setting a quantity of
//! zero or less removes the variant, and a product with no variants left is
//! removed as well.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::variant::VariantKey;

/// One cart line as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    pub quantity: i64,
}

/// Cart payload returned by the cart endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// In-memory mirror of the server cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    entries: BTreeMap<ProductId, BTreeMap<VariantKey, u32>>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from server lines.
    ///
    /// Lines with a non-positive quantity or an unparseable variant are
    /// skipped; duplicate lines for the same variant are summed.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let mut snapshot = Self::new();
        for line in lines {
            if line.quantity <= 0 {
                continue;
            }
            let Ok(variant) = VariantKey::new(&line.size, &line.color) else {
                continue;
            };
            let current = i64::from(snapshot.quantity(&line.product_id, &variant));
            snapshot.set(&line.product_id, &variant, current.saturating_add(line.quantity));
        }
        snapshot
    }

    /// Quantity of one variant (zero when absent).
    #[must_use]
    pub fn quantity(&self, product: &ProductId, variant: &VariantKey) -> u32 {
        self.entries
            .get(product)
            .and_then(|variants| variants.get(variant))
            .copied()
            .unwrap_or(0)
    }

    /// Set the quantity of one variant, deleting it when `quantity <= 0`.
    pub fn set(&mut self, product: &ProductId, variant: &VariantKey, quantity: i64) {
        if quantity <= 0 {
            if let Some(variants) = self.entries.get_mut(product) {
                variants.remove(variant);
                if variants.is_empty() {
                    self.entries.remove(product);
                }
            }
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.entries
            .entry(product.clone())
            .or_default()
            .insert(variant.clone(), quantity);
    }

    /// Add `delta` units of a variant (negative deltas decrement).
    pub fn add(&mut self, product: &ProductId, variant: &VariantKey, delta: i64) {
        let current = i64::from(self.quantity(product, variant));
        self.set(product, variant, current.saturating_add(delta));
    }

    /// Remove a variant entirely.
    pub fn remove(&mut self, product: &ProductId, variant: &VariantKey) {
        self.set(product, variant, 0);
    }

    /// Replace local state with the server's view.
    ///
    /// Returns `true` when the server disagreed with the local snapshot.
    pub fn reconcile(&mut self, server: Self) -> bool {
        let changed = *self != server;
        *self = server;
        changed
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.entries
            .values()
            .flat_map(BTreeMap::values)
            .map(|&q| u64::from(q))
            .sum()
    }

    /// Iterate `(product, variant, quantity)` in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &VariantKey, u32)> {
        self.entries.iter().flat_map(|(product, variants)| {
            variants
                .iter()
                .map(move |(variant, &quantity)| (product, variant, quantity))
        })
    }

    /// The snapshot as backend lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.iter()
            .map(|(product, variant, quantity)| CartLine {
                product_id: product.clone(),
                size: variant.size().to_owned(),
                color: variant.color().to_owned(),
                quantity: i64::from(quantity),
            })
            .collect()
    }

    /// Sum of `unit price * quantity`, skipping products with no known price.
    pub fn subtotal<F>(&self, mut unit_price: F) -> Decimal
    where
        F: FnMut(&ProductId) -> Option<Decimal>,
    {
        self.iter()
            .filter_map(|(product, _, quantity)| {
                unit_price(product).map(|price| price * Decimal::from(quantity))
            })
            .sum()
    }
}

impl From<CartPayload> for CartSnapshot {
    fn from(payload: CartPayload) -> Self {
        Self::from_lines(&payload.items)
    }
}
