//! Order domain models and outbound sync state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A locally placed order.
///
/// `external_order_id` doubles as the outbound idempotency guard: an order
/// with a stored external identity is excluded from future push runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub is_paid: bool,
    pub external_order_id: Option<i64>,
    pub synced_at: Option<String>,
    pub sync_error: Option<String>,
    pub created_at: String,
}

impl Order {
    /// True when the order is paid locally but not yet acknowledged by the
    /// external system.
    pub fn awaits_push(&self) -> bool {
        self.is_paid && self.external_order_id.is_none()
    }
}

/// One line of an order, referencing a local product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}
