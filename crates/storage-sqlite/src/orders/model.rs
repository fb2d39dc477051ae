//! Database models for orders and order lines.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shoplink_core::errors::Result;
use shoplink_core::orders::{Order, OrderLine};

use crate::money::{decimal_from_db, decimal_to_db};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderDB {
    pub id: String,
    pub discount_amount: String,
    pub shipping_amount: String,
    pub total_amount: String,
    pub is_paid: i32,
    pub external_order_id: Option<i64>,
    pub synced_at: Option<String>,
    pub sync_error: Option<String>,
    pub created_at: String,
}

impl OrderDB {
    pub fn into_domain(self) -> Result<Order> {
        Ok(Order {
            discount_amount: decimal_from_db(&self.discount_amount)?,
            shipping_amount: decimal_from_db(&self.shipping_amount)?,
            total_amount: decimal_from_db(&self.total_amount)?,
            id: self.id,
            is_paid: self.is_paid != 0,
            external_order_id: self.external_order_id,
            synced_at: self.synced_at,
            sync_error: self.sync_error,
            created_at: self.created_at,
        })
    }

    pub fn from_domain(order: &Order) -> Self {
        OrderDB {
            id: order.id.clone(),
            discount_amount: decimal_to_db(&order.discount_amount),
            shipping_amount: decimal_to_db(&order.shipping_amount),
            total_amount: decimal_to_db(&order.total_amount),
            is_paid: order.is_paid as i32,
            external_order_id: order.external_order_id,
            synced_at: order.synced_at.clone(),
            sync_error: order.sync_error.clone(),
            created_at: order.created_at.clone(),
        }
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::order_lines)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderLineDB {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: String,
}

impl OrderLineDB {
    pub fn into_domain(self) -> Result<OrderLine> {
        Ok(OrderLine {
            unit_price: decimal_from_db(&self.unit_price)?,
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            quantity: self.quantity,
        })
    }

    pub fn from_domain(line: &OrderLine) -> Self {
        OrderLineDB {
            id: line.id.clone(),
            order_id: line.order_id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: decimal_to_db(&line.unit_price),
        }
    }
}
