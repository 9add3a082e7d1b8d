//! # Customer Repository
//!
//! Loyalty point balances. Implements [`PointsLedger`].
//!
//! ## Atomic Deltas
//! ```text
//! award   UPDATE customers SET points = points + n WHERE id = ?
//! redeem  UPDATE customers SET points = points - n WHERE id = ? AND points >= n
//!
//! No read-modify-write: two settlements for the same customer
//! cannot lose an update.
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::loyalty::is_movement;
use tavola_core::ports::PointsLedger;
use tavola_core::{BillingError, BillingResult, Customer};

const CUSTOMER_COLUMNS: &str = "id, name, phone, points, created_at, updated_at";

/// Repository for customer balances.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// Inserts a customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, points, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.points)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Adds `points` and returns the updated row, `None` if the customer is missing.
    async fn add_points(&self, id: &str, points: i64) -> DbResult<Option<Customer>> {
        let sql = format!(
            "UPDATE customers SET points = points + ?1, updated_at = ?2 WHERE id = ?3 RETURNING {}",
            CUSTOMER_COLUMNS
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(points)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// Subtracts `points` only if the balance covers it.
    ///
    /// `None` when the customer is missing or the balance is short.
    async fn deduct_points(&self, id: &str, points: i64) -> DbResult<Option<Customer>> {
        let sql = format!(
            "UPDATE customers SET points = points - ?1, updated_at = ?2 \
             WHERE id = ?3 AND points >= ?1 RETURNING {}",
            CUSTOMER_COLUMNS
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(points)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }
}

#[async_trait]
impl PointsLedger for CustomerRepository {
    async fn customer(&self, customer_id: &str) -> BillingResult<Option<Customer>> {
        Ok(self.find_by_id(customer_id).await?)
    }

    async fn award(&self, customer_id: &str, points: i64) -> BillingResult<Option<Customer>> {
        if !is_movement(customer_id, points) {
            return Ok(None);
        }

        debug!(customer_id = %customer_id, points, "Awarding points");

        match self.add_points(customer_id, points).await? {
            Some(customer) => Ok(Some(customer)),
            None => Err(DbError::not_found("Customer", customer_id).into()),
        }
    }

    async fn redeem(&self, customer_id: &str, points: i64) -> BillingResult<Option<Customer>> {
        if !is_movement(customer_id, points) {
            return Ok(None);
        }

        debug!(customer_id = %customer_id, points, "Redeeming points");

        if let Some(customer) = self.deduct_points(customer_id, points).await? {
            return Ok(Some(customer));
        }

        // The conditional update matched nothing: tell apart missing from short.
        match self.find_by_id(customer_id).await? {
            Some(customer) => Err(BillingError::InsufficientBalance {
                available: customer.points,
                requested: points,
            }),
            None => Err(BillingError::not_found("Customer", customer_id)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
