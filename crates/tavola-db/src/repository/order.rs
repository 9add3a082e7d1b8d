//! # Order Repository
//!
//! Read access to the orders billing is issued against. Implements
//! [`OrderLookup`].

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tavola_core::ports::OrderLookup;
use tavola_core::{BillingResult, Order};

/// Repository for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, customer_id, table_id, status, created_at FROM orders WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    /// Inserts an order.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, table_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.table_id)
        .bind(&order.status)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderLookup for OrderRepository {
    async fn find_order(&self, order_id: &str) -> BillingResult<Option<Order>> {
        Ok(self.find_by_id(order_id).await?)
    }
}
