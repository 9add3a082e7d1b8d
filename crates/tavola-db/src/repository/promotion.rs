//! # Promotion Repository
//!
//! Promotion lookups and usage accounting. Implements [`PromotionGateway`].
//!
//! ## Usage Cap
//! ```text
//! increment_uses(id)
//!      │
//!      ▼
//!  UPDATE promotions SET current_uses = current_uses + 1
//!  WHERE id = ? AND (max_uses = -1 OR current_uses < max_uses)
//!      │
//!      ├── 1 row  → updated promotion
//!      └── 0 rows → promotion missing?  NotFound
//!                   otherwise           PromotionLimitExceeded
//! ```
//!
//! Two concurrent increments against the last remaining use cannot both
//! succeed: the cap check and the increment are one statement.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tavola_core::ports::PromotionGateway;
use tavola_core::{BillingError, BillingResult, Promotion};

const PROMOTION_COLUMNS: &str = "id, code, name, discount_type, discount_value, \
     min_order_cents, max_discount_cents, start_date, end_date, is_active, \
     max_uses, current_uses";

/// Repository for promotions.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Gets a promotion by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let sql = format!("SELECT {} FROM promotions WHERE id = ?1", PROMOTION_COLUMNS);
        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promotion)
    }

    /// Gets a promotion by its code (case-insensitive).
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Promotion>> {
        let sql = format!(
            "SELECT {} FROM promotions WHERE code = ?1 COLLATE NOCASE",
            PROMOTION_COLUMNS
        );
        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promotion)
    }

    /// Inserts a promotion.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(id = %promotion.id, code = %promotion.code, "Inserting promotion");

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, code, name, discount_type, discount_value,
                min_order_cents, max_discount_cents, start_date, end_date,
                is_active, max_uses, current_uses
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12
            )
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.code)
        .bind(&promotion.name)
        .bind(promotion.discount_type)
        .bind(promotion.discount_value)
        .bind(promotion.min_order_cents)
        .bind(promotion.max_discount_cents)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.is_active)
        .bind(promotion.max_uses)
        .bind(promotion.current_uses)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts promotions.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promotions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Conditional increment. `None` when nothing matched.
    async fn try_increment(&self, id: &str) -> DbResult<Option<Promotion>> {
        let sql = format!(
            "UPDATE promotions SET current_uses = current_uses + 1 \
             WHERE id = ?1 AND (max_uses = -1 OR current_uses < max_uses) \
             RETURNING {}",
            PROMOTION_COLUMNS
        );
        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promotion)
    }
}

#[async_trait]
impl PromotionGateway for PromotionRepository {
    async fn get_by_id(&self, promotion_id: &str) -> BillingResult<Option<Promotion>> {
        Ok(self.find_by_id(promotion_id).await?)
    }

    async fn get_by_code(&self, code: &str) -> BillingResult<Option<Promotion>> {
        Ok(self.find_by_code(code).await?)
    }

    async fn increment_uses(&self, promotion_id: &str) -> BillingResult<Promotion> {
        if let Some(promotion) = self.try_increment(promotion_id).await? {
            debug!(
                id = %promotion.id,
                current_uses = promotion.current_uses,
                "Promotion use recorded"
            );
            return Ok(promotion);
        }

        match self.find_by_id(promotion_id).await? {
            Some(promotion) => Err(BillingError::PromotionLimitExceeded {
                code: promotion.code,
                max_uses: promotion.max_uses,
            }),
            None => Err(BillingError::not_found("Promotion", promotion_id)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
