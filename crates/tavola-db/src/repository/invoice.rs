//! # Invoice Repository
//!
//! Database operations for invoices and their promotion links.
//! Implements [`InvoiceStore`].
//!
//! ## Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Conditional Status Updates                          │
//! │                                                                         │
//! │  mark_paid        UPDATE ... SET payment_status = 'paid'               │
//! │                   WHERE id = ? AND payment_status = 'pending'          │
//! │                                                                         │
//! │  mark_cancelled   UPDATE ... SET payment_status = 'cancelled'          │
//! │                   WHERE id = ? AND payment_status = 'pending'          │
//! │                                                                         │
//! │  update_pending   UPDATE ... WHERE id = ? AND payment_status = 'pending'│
//! │  delete_pending   DELETE ... WHERE id = ? AND payment_status = 'pending'│
//! │                                                                         │
//! │  replace_promotion  BEGIN; update_pending; relink; COMMIT              │
//! │                                                                         │
//! │  rows_affected == 0  →  the invoice left `pending` (or never existed)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::ports::InvoiceStore;
use tavola_core::{
    BillingResult, DailyRevenue, Invoice, InvoiceFilter, InvoicePromotion, InvoiceStatistics,
    PaymentMethod, MAX_LIST_LIMIT,
};

const INVOICE_COLUMNS: &str = "id, invoice_number, order_id, staff_id, customer_id, \
     subtotal_cents, tax_cents, discount_cents, total_cents, \
     points_used, points_earned, payment_method, payment_status, notes, \
     invoice_date, paid_at, created_at, updated_at";

const DEFAULT_LIST_LIMIT: i64 = 50;

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Escapes LIKE wildcards so user text matches literally (`ESCAPE '\'`).
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn write_pending(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    invoice: &Invoice,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            customer_id = ?2,
            subtotal_cents = ?3,
            tax_cents = ?4,
            discount_cents = ?5,
            total_cents = ?6,
            points_used = ?7,
            points_earned = ?8,
            payment_method = ?9,
            notes = ?10,
            updated_at = ?11
        WHERE id = ?1 AND payment_status = 'pending'
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.customer_id)
    .bind(invoice.subtotal_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.total_cents)
    .bind(invoice.points_used)
    .bind(invoice.points_earned)
    .bind(invoice.payment_method)
    .bind(&invoice.notes)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_link(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    link: &InvoicePromotion,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_promotions (
            invoice_id, promotion_id, promotion_code, discount_applied_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&link.invoice_id)
    .bind(&link.promotion_id)
    .bind(&link.promotion_code)
    .bind(link.discount_applied_cents)
    .bind(link.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn delete_links(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    invoice_id: &str,
) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM invoice_promotions WHERE invoice_id = ?1")
        .bind(invoice_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Loads one invoice matching `column = value`, links included.
    async fn fetch_one_by(&self, column: &str, value: &str) -> DbResult<Option<Invoice>> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE {} = ?1",
            INVOICE_COLUMNS, column
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        match invoice {
            Some(mut invoice) => {
                invoice.promotions = self.get_links(&invoice.id).await?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    /// Gets the promotion links of an invoice, oldest first.
    pub async fn get_links(&self, invoice_id: &str) -> DbResult<Vec<InvoicePromotion>> {
        let links = sqlx::query_as::<_, InvoicePromotion>(
            r#"
            SELECT invoice_id, promotion_id, promotion_code, discount_applied_cents, created_at
            FROM invoice_promotions
            WHERE invoice_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    /// Runs a filtered listing, newest first.
    pub async fn search(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM invoices WHERE 1 = 1",
            INVOICE_COLUMNS
        ));

        if let Some(status) = filter.payment_status {
            qb.push(" AND payment_status = ").push_bind(status);
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND payment_method = ").push_bind(method);
        }
        if let Some(customer_id) = &filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id.clone());
        }
        if let Some(staff_id) = &filter.staff_id {
            qb.push(" AND staff_id = ").push_bind(staff_id.clone());
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND date(invoice_date) >= ").push_bind(day(start));
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND date(invoice_date) <= ").push_bind(day(end));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(search.trim()));
            qb.push(" AND (invoice_number LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR notes LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);

        qb.push(" ORDER BY invoice_date DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let mut invoices = qb.build_query_as::<Invoice>().fetch_all(&self.pool).await?;

        for invoice in &mut invoices {
            invoice.promotions = self.get_links(&invoice.id).await?;
        }

        Ok(invoices)
    }

    /// Inserts a new invoice row.
    pub async fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            order_id = %invoice.order_id,
            "Inserting invoice"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, order_id, staff_id, customer_id,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                points_used, points_earned, payment_method, payment_status, notes,
                invoice_date, paid_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.order_id)
        .bind(&invoice.staff_id)
        .bind(&invoice.customer_id)
        .bind(invoice.subtotal_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.total_cents)
        .bind(invoice.points_used)
        .bind(invoice.points_earned)
        .bind(invoice.payment_method)
        .bind(invoice.payment_status)
        .bind(&invoice.notes)
        .bind(invoice.invoice_date)
        .bind(invoice.paid_at)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { field, .. } if field.contains("order_id") => {
                    Err(DbError::duplicate("order_id", &invoice.order_id))
                }
                DbError::UniqueViolation { field, .. } if field.contains("invoice_number") => {
                    Err(DbError::duplicate("invoice_number", &invoice.invoice_number))
                }
                other => Err(other),
            },
        }
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    async fn find_by_id(&self, id: &str) -> BillingResult<Option<Invoice>> {
        Ok(self.fetch_one_by("id", id).await?)
    }

    async fn find_by_number(&self, invoice_number: &str) -> BillingResult<Option<Invoice>> {
        Ok(self.fetch_one_by("invoice_number", invoice_number).await?)
    }

    async fn find_by_order(&self, order_id: &str) -> BillingResult<Option<Invoice>> {
        Ok(self.fetch_one_by("order_id", order_id).await?)
    }

    async fn exists_for_order(&self, order_id: &str) -> BillingResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(count > 0)
    }

    async fn count_by_number_prefix(&self, prefix: &str) -> BillingResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM invoices WHERE invoice_number LIKE ?1 ESCAPE '\'",
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(count)
    }

    async fn list(&self, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        Ok(self.search(filter).await?)
    }

    async fn insert(&self, invoice: &Invoice) -> BillingResult<()> {
        Ok(self.insert_invoice(invoice).await?)
    }

    async fn update_pending(&self, invoice: &Invoice) -> BillingResult<bool> {
        debug!(id = %invoice.id, total_cents = invoice.total_cents, "Updating invoice");

        Ok(write_pending(&self.pool, invoice).await?)
    }

    async fn replace_promotion(
        &self,
        invoice: &Invoice,
        link: &InvoicePromotion,
    ) -> BillingResult<bool> {
        debug!(
            id = %invoice.id,
            promotion_id = %link.promotion_id,
            total_cents = invoice.total_cents,
            "Replacing invoice promotion"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // dropping `tx` rolls back
        if !write_pending(&mut *tx, invoice).await? {
            return Ok(false);
        }
        delete_links(&mut *tx, &invoice.id).await?;
        insert_link(&mut *tx, link).await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(true)
    }

    async fn mark_paid(
        &self,
        id: &str,
        method: PaymentMethod,
        paid_at: DateTime<Utc>,
    ) -> BillingResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                payment_status = 'paid',
                payment_method = ?2,
                paid_at = ?3,
                updated_at = ?3
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(method)
        .bind(paid_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_cancelled(&self, id: &str) -> BillingResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                payment_status = 'cancelled',
                updated_at = ?2
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_pending(&self, id: &str) -> BillingResult<u64> {
        debug!(id = %id, "Deleting invoice");

        let result =
            sqlx::query("DELETE FROM invoices WHERE id = ?1 AND payment_status = 'pending'")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

        Ok(result.rows_affected())
    }

    async fn attach_promotion(&self, link: &InvoicePromotion) -> BillingResult<()> {
        debug!(
            invoice_id = %link.invoice_id,
            promotion_id = %link.promotion_id,
            discount = link.discount_applied_cents,
            "Attaching promotion"
        );

        Ok(insert_link(&self.pool, link).await?)
    }

    async fn clear_promotions(&self, invoice_id: &str) -> BillingResult<u64> {
        Ok(delete_links(&self.pool, invoice_id).await?)
    }

    async fn statistics(&self) -> BillingResult<InvoiceStatistics> {
        let stats = sqlx::query_as::<_, InvoiceStatistics>(
            r#"
            SELECT
                COUNT(*) AS total_invoices,
                COALESCE(SUM(CASE WHEN payment_status = 'pending' THEN 1 ELSE 0 END), 0) AS pending_count,
                COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN 1 ELSE 0 END), 0) AS paid_count,
                COALESCE(SUM(CASE WHEN payment_status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled_count,
                COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN total_cents ELSE 0 END), 0) AS total_revenue_cents,
                COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN discount_cents ELSE 0 END), 0) AS total_discount_cents,
                COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN points_earned ELSE 0 END), 0) AS total_points_earned
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(stats.with_average())
    }

    async fn revenue_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BillingResult<Vec<DailyRevenue>> {
        let rows = sqlx::query_as::<_, DailyRevenue>(
            r#"
            SELECT
                date(invoice_date) AS date,
                COALESCE(SUM(total_cents), 0) AS total_cents,
                COUNT(*) AS count
            FROM invoices
            WHERE payment_status = 'paid'
              AND date(invoice_date) BETWEEN ?1 AND ?2
            GROUP BY date(invoice_date)
            ORDER BY date ASC
            "#,
        )
        .bind(day(start))
        .bind(day(end))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
