//! Decimal price arithmetic.
//!
//! Product prices are decimal amounts in the store currency. Floating point
//! is never used for money; discount percentages are computed on
//! [`Decimal`] and rounded to two places.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A list price together with an optional discounted (selling) price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// List price (MRP).
    pub amount: Decimal,
    /// Selling price when the product is on sale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted: Option<Decimal>,
}

impl Price {
    /// Create a price without a discount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self {
            amount,
            discounted: None,
        }
    }

    /// Create a price with a discounted selling price.
    #[must_use]
    pub const fn with_discount(amount: Decimal, discounted: Decimal) -> Self {
        Self {
            amount,
            discounted: Some(discounted),
        }
    }

    /// The price the customer actually pays.
    ///
    /// A discounted price that is not strictly below the list price is
    /// ignored.
    #[must_use]
    pub fn effective(&self) -> Decimal {
        match self.discounted {
            Some(discounted) if discounted > Decimal::ZERO && discounted < self.amount => {
                discounted
            }
            _ => self.amount,
        }
    }

    /// Discount as a percentage of the list price, rounded to 2 places.
    ///
    /// Returns zero when there is no effective discount.
    #[must_use]
    pub fn discount_percent(&self) -> Decimal {
        if self.amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let saved = self.amount - self.effective();
        // Near Decimal::MAX the saving cannot be scaled first; the ratio is below one.
        let percent = saved.checked_mul(Decimal::ONE_HUNDRED).map_or_else(
            || saved / self.amount * Decimal::ONE_HUNDRED,
            |scaled| scaled / self.amount,
        );
        percent.round_dp(2)
    }

    /// Whether the product is currently on sale.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.effective() < self.amount
    }

    /// Format an amount with two decimal places.
    #[must_use]
    pub fn display(amount: Decimal) -> String {
        format!("{:.2}", amount.round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(Price::new(d("100")).effective(), d("100"));
        assert_eq!(
            Price::with_discount(d("100"), d("80")).effective(),
            d("80")
        );
    }

    #[test]
    fn test_discount_not_below_list_is_ignored() {
        let price = Price::with_discount(d("100"), d("120"));
        assert_eq!(price.effective(), d("100"));
        assert_eq!(price.discount_percent(), Decimal::ZERO);
        assert!(!price.is_discounted());
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(
            Price::with_discount(d("1999"), d("1499")).discount_percent(),
            d("25.01")
        );
        assert_eq!(
            Price::with_discount(d("200"), d("50")).discount_percent(),
            d("75")
        );
    }

    #[test]
    fn test_discount_percent_near_decimal_max() {
        let price = Price::with_discount(Decimal::MAX, Decimal::ONE);
        assert_eq!(price.discount_percent(), d("100"));

        let half = Price::with_discount(Decimal::MAX, Decimal::MAX / Decimal::TWO);
        assert_eq!(half.discount_percent(), d("50"));
    }

    #[test]
    fn test_zero_list_price_has_no_discount() {
        assert_eq!(Price::new(Decimal::ZERO).discount_percent(), Decimal::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::display(d("12.5")), "12.50");
    }
}
