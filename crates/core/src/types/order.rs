//! Orders and the signed-in user's profile.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartLine;
use super::id::{OrderId, UserId};
use super::status::{OrderStatus, PaymentMethod};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Whether the account may use the back-office.
    #[serde(default)]
    pub is_admin: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_order() {
        let json = r#"{
            "_id": "o1",
            "items": [{"productId": "p1", "size": "M", "color": "red", "quantity": 2}],
            "total": 2598,
            "status": "shipped",
            "paymentMethod": "upi"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.payment_method, PaymentMethod::Upi);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total, Decimal::from(2598));
    }

    #[test]
    fn test_deserialize_profile() {
        let json = r#"{"_id":"u1","name":"Asha","email":"asha@example.com","isAdmin":true}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert!(profile.is_admin);
        assert_eq!(profile.phone, None);
    }
}
