//! Repository for orders and their lines.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use shoplink_core::errors::Result;
use shoplink_core::orders::{Order, OrderLine};
use shoplink_core::repositories::OrderRepositoryTrait;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{order_lines, orders};

use super::model::{OrderDB, OrderLineDB};

pub struct OrderRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl OrderRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        OrderRepository { pool, writer }
    }

    /// Orders are created by the storefront, not by sync; this exists for
    /// embedders and tests.
    pub async fn insert_order(&self, order: Order, lines: Vec<OrderLine>) -> Result<Order> {
        self.writer
            .exec(move |conn| {
                let order_db = OrderDB::from_domain(&order);
                diesel::insert_into(orders::table)
                    .values(&order_db)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                for line in &lines {
                    diesel::insert_into(order_lines::table)
                        .values(OrderLineDB::from_domain(line))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(order)
            })
            .await
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    fn list_awaiting_push(&self) -> Result<Vec<Order>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = orders::table
            .filter(orders::is_paid.eq(1))
            .filter(orders::external_order_id.is_null())
            .order(orders::created_at.asc())
            .load::<OrderDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(OrderDB::into_domain).collect()
    }

    fn lines_for(&self, order_id: &str) -> Result<Vec<OrderLine>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = order_lines::table
            .filter(order_lines::order_id.eq(order_id))
            .load::<OrderLineDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(OrderLineDB::into_domain).collect()
    }

    async fn mark_synced(&self, order_id: String, external_order_id: i64) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(orders::table.find(order_id))
                    .set((
                        orders::external_order_id.eq(external_order_id),
                        orders::synced_at.eq(Utc::now().to_rfc3339()),
                        orders::sync_error.eq(None::<String>),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_sync_error(&self, order_id: String, error: String) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(orders::table.find(order_id))
                    .set(orders::sync_error.eq(error))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
