//! # Staff Repository
//!
//! Platform users as billing sees them. Implements [`StaffLookup`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tavola_core::ports::StaffLookup;
use tavola_core::{BillingResult, StaffUser};

/// Repository for platform users.
#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    /// Creates a new StaffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    /// Gets a user by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<StaffUser>> {
        let user = sqlx::query_as::<_, StaffUser>(
            "SELECT id, full_name, role, is_active FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Inserts a user.
    pub async fn insert(&self, user: &StaffUser) -> DbResult<()> {
        debug!(id = %user.id, role = user.role.as_str(), "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StaffLookup for StaffRepository {
    async fn find_user(&self, user_id: &str) -> BillingResult<Option<StaffUser>> {
        Ok(self.find_by_id(user_id).await?)
    }
}
