//! # Ports
//!
//! The narrow interfaces the invoice orchestrator is wired through.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        InvoiceService                                   │
//! │                                                                         │
//! │   InvoiceStore   PointsLedger   PromotionGateway   OrderLookup  Staff.. │
//! │        ▲              ▲                ▲               ▲          ▲     │
//! └────────┼──────────────┼────────────────┼───────────────┼──────────┼─────┘
//!          │              │                │               │          │
//!   ┌──────┴──────────────┴────────────────┴───────────────┴──────────┴──┐
//!   │         tavola-db repositories   (or test doubles)                  │
//!   └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every trait is object safe so the service can hold `Arc<dyn Trait>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{BillingError, BillingResult};
use crate::invoice::{Invoice, InvoiceFilter, InvoicePromotion, PaymentMethod};
use crate::loyalty::check_redemption;
use crate::money::Money;
use crate::promotion::{Promotion, PromotionQuote};
use crate::types::{Customer, DailyRevenue, InvoiceStatistics, Order, StaffUser};

// =============================================================================
// Invoice Store
// =============================================================================

/// Persistence and querying of invoices and their promotion links.
///
/// Lookups return invoices with `promotions` populated. Mutating methods
/// that take effect only on pending invoices report whether a row changed.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> BillingResult<Option<Invoice>>;

    async fn find_by_number(&self, invoice_number: &str) -> BillingResult<Option<Invoice>>;

    async fn find_by_order(&self, order_id: &str) -> BillingResult<Option<Invoice>>;

    async fn exists_for_order(&self, order_id: &str) -> BillingResult<bool>;

    /// Counts invoices whose number starts with `prefix`.
    async fn count_by_number_prefix(&self, prefix: &str) -> BillingResult<i64>;

    async fn list(&self, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>>;

    /// Inserts a new invoice. A second invoice for the same order is a `Conflict`.
    async fn insert(&self, invoice: &Invoice) -> BillingResult<()>;

    /// Writes the mutable fields of a pending invoice.
    async fn update_pending(&self, invoice: &Invoice) -> BillingResult<bool>;

    /// Writes a pending invoice and swaps all of its promotion links for
    /// `link`, as one unit. `false` (nothing written) once it left `pending`.
    async fn replace_promotion(
        &self,
        invoice: &Invoice,
        link: &InvoicePromotion,
    ) -> BillingResult<bool>;

    /// `pending → paid`, conditional on the current status.
    async fn mark_paid(
        &self,
        id: &str,
        method: PaymentMethod,
        paid_at: DateTime<Utc>,
    ) -> BillingResult<bool>;

    /// `pending → cancelled`, conditional on the current status.
    async fn mark_cancelled(&self, id: &str) -> BillingResult<bool>;

    /// Removes a pending invoice. Returns the number of invoice rows deleted.
    async fn delete_pending(&self, id: &str) -> BillingResult<u64>;

    async fn attach_promotion(&self, link: &InvoicePromotion) -> BillingResult<()>;

    /// Removes every promotion link of an invoice.
    async fn clear_promotions(&self, invoice_id: &str) -> BillingResult<u64>;

    async fn statistics(&self) -> BillingResult<InvoiceStatistics>;

    /// Daily revenue of paid invoices with `invoice_date` in `[start, end]`.
    async fn revenue_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BillingResult<Vec<DailyRevenue>>;
}

// =============================================================================
// Points Ledger
// =============================================================================

/// Customer loyalty balances.
///
/// `award` and `redeem` are single atomic deltas. Calling either twice with
/// the same positive amount applies it twice; the caller guarantees
/// at-most-once per invoice and direction.
#[async_trait]
pub trait PointsLedger: Send + Sync {
    async fn customer(&self, customer_id: &str) -> BillingResult<Option<Customer>>;

    /// Adds points. No-op returning `None` for a blank id or non-positive amount.
    async fn award(&self, customer_id: &str, points: i64) -> BillingResult<Option<Customer>>;

    /// Subtracts points. No-op returning `None` for a blank id or non-positive amount.
    async fn redeem(&self, customer_id: &str, points: i64) -> BillingResult<Option<Customer>>;

    /// Current balance, `None` when the customer does not exist.
    async fn balance(&self, customer_id: &str) -> BillingResult<Option<i64>> {
        Ok(self.customer(customer_id).await?.map(|c| c.points))
    }

    /// Checks that `points` can be redeemed right now.
    async fn validate_redemption(&self, customer_id: &str, points: i64) -> BillingResult<()> {
        if points <= 0 {
            return Ok(());
        }
        let balance = self
            .balance(customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", customer_id))?;
        check_redemption(balance, points)
    }
}

// =============================================================================
// Promotion Gateway
// =============================================================================

/// Promotion lookups and usage accounting, owned outside billing.
#[async_trait]
pub trait PromotionGateway: Send + Sync {
    async fn get_by_id(&self, promotion_id: &str) -> BillingResult<Option<Promotion>>;

    async fn get_by_code(&self, code: &str) -> BillingResult<Option<Promotion>>;

    /// Records one more use. Fails with `PromotionLimitExceeded` at the cap.
    async fn increment_uses(&self, promotion_id: &str) -> BillingResult<Promotion>;

    /// Validates a code against an order amount and returns its discount.
    async fn validate(&self, code: &str, order_amount: Money) -> BillingResult<PromotionQuote> {
        let promotion = self
            .get_by_code(code.trim())
            .await?
            .ok_or_else(|| BillingError::not_found("Promotion", code))?;
        promotion.quote(order_amount, Utc::now())
    }
}

// =============================================================================
// Collaborator Lookups
// =============================================================================

/// Read-only access to orders.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn find_order(&self, order_id: &str) -> BillingResult<Option<Order>>;
}

/// Read-only access to platform users.
#[async_trait]
pub trait StaffLookup: Send + Sync {
    async fn find_user(&self, user_id: &str) -> BillingResult<Option<StaffUser>>;
}
