//! # Invoice Service
//!
//! Orchestrates the invoice lifecycle over the [`tavola_core::ports`] traits.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_invoice ──► PENDING ──┬── update_invoice / apply_promotion     │
//! │                        │       └── delete_invoice (row removed)         │
//! │                        │                                                │
//! │          mark_as_paid  │  cancel_invoice                                │
//! │              ┌─────────┴─────────┐                                      │
//! │              ▼                   ▼                                      │
//! │            PAID              CANCELLED                                  │
//! │                                                                         │
//! │   Every mutation on PAID or CANCELLED → InvalidStateTransition          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Points Timeline
//! ```text
//! create_invoice   validate redemption, size points_earned   (no balance change)
//! mark_as_paid     status → paid, then award + redeem        (best-effort)
//! cancel_invoice   nothing to undo
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::number::next_invoice_number;
use crate::settlement::{Settlement, SideEffect, SoftFailure};
use tavola_core::loyalty::points_earned;
use tavola_core::money::total_with_tax;
use tavola_core::ports::{InvoiceStore, OrderLookup, PointsLedger, PromotionGateway, StaffLookup};
use tavola_core::validation::{validate_date_range, validate_required, validate_search_query};
use tavola_core::{
    calculate_totals, BillingError, BillingResult, CreateInvoice, DailyRevenue, Invoice,
    InvoiceFilter, InvoicePatch, InvoicePromotion, InvoiceStatistics, Money, PaymentMethod,
    PaymentStatus, PromotionQuote, TaxRate, Totals, ValidationError,
};

// =============================================================================
// Dependencies
// =============================================================================

/// Everything the service talks to, injected as trait objects.
#[derive(Clone)]
pub struct BillingPorts {
    pub invoices: Arc<dyn InvoiceStore>,
    pub ledger: Arc<dyn PointsLedger>,
    pub promotions: Arc<dyn PromotionGateway>,
    pub orders: Arc<dyn OrderLookup>,
    pub staff: Arc<dyn StaffLookup>,
}

// =============================================================================
// Service
// =============================================================================

/// The invoice orchestrator.
///
/// Cheap to clone; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct InvoiceService {
    ports: BillingPorts,
    default_tax_rate: TaxRate,
}

impl InvoiceService {
    pub fn new(ports: BillingPorts) -> Self {
        InvoiceService {
            ports,
            default_tax_rate: TaxRate::zero(),
        }
    }

    /// Tax rate applied when a create request omits `tax_rate`.
    pub fn with_default_tax_rate(mut self, rate: TaxRate) -> Self {
        self.default_tax_rate = rate;
        self
    }

    pub fn default_tax_rate(&self) -> TaxRate {
        self.default_tax_rate
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Issues an invoice for an order.
    ///
    /// ## Steps
    /// ```text
    /// 1. order exists                      NotFound
    /// 2. staff exists, may issue           NotFound / Forbidden
    /// 3. no invoice for this order yet     Conflict
    /// 4. invoice number                    generated unless supplied
    /// 5. validate each promo code          NotFound / Validation / PromotionLimitExceeded
    /// 6. totals
    /// 7. redemption covered by balance     InsufficientBalance / NotFound
    /// 8. entity validation                 Validation
    /// 9. persist, record promotion uses, attach links
    /// ```
    pub async fn create_invoice(&self, data: CreateInvoice) -> BillingResult<Invoice> {
        let order_id = data.order_id.trim().to_string();
        let staff_id = data.staff_id.trim().to_string();
        validate_required("order_id", &order_id)?;
        validate_required("staff_id", &staff_id)?;

        // 1. Order
        let order = self
            .ports
            .orders
            .find_order(&order_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Order", &order_id))?;

        // 2. Issuer
        let staff = self
            .ports
            .staff
            .find_user(&staff_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Staff", &staff_id))?;

        if !staff.role.can_issue_invoices() || !staff.is_active {
            return Err(BillingError::Forbidden(format!(
                "User {} ({}) cannot issue invoices",
                staff.id,
                staff.role.as_str()
            )));
        }

        // 3. One invoice per order
        if self.ports.invoices.exists_for_order(&order_id).await? {
            return Err(BillingError::Conflict(format!(
                "Invoice already exists for order {}",
                order_id
            )));
        }

        // 4. Number
        let now = Utc::now();
        let invoice_number = match data
            .invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            Some(number) => number.to_string(),
            None => next_invoice_number(self.ports.invoices.as_ref(), now.date_naive()).await?,
        };

        // 5. Promotions
        let subtotal = Money::from_cents(data.subtotal_cents);
        let quotes = self.quote_codes(&data.promo_codes, subtotal).await?;

        // 6. Totals
        let mut errors: Vec<ValidationError> = Vec::new();

        let tax_rate = match data.tax_rate.map(TaxRate::try_from_percentage) {
            Some(Ok(rate)) => rate,
            Some(Err(e)) => {
                errors.push(e);
                TaxRate::zero()
            }
            None => self.default_tax_rate,
        };
        let manual_discount = Money::from_cents(data.discount_cents.unwrap_or(0));
        let discount = Money::checked_sum(
            quotes
                .iter()
                .map(|q| q.discount_amount)
                .chain(std::iter::once(manual_discount)),
        )
        .ok_or_else(|| ValidationError::out_of_range("discount_amount"));
        let totals = match discount.and_then(|d| calculate_totals(subtotal, tax_rate, d)) {
            Ok(totals) => totals,
            Err(e) => {
                errors.push(e);
                Totals {
                    subtotal,
                    tax: Money::zero(),
                    discount_amount: manual_discount,
                    total_amount: Money::zero(),
                }
            }
        };

        // 7. Points
        let customer_id = data
            .customer_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| order.customer_id.clone());

        if data.points_used > 0 {
            match &customer_id {
                Some(customer_id) => {
                    self.ports
                        .ledger
                        .validate_redemption(customer_id, data.points_used)
                        .await?
                }
                None => errors.push(ValidationError::Required {
                    field: "customer_id".to_string(),
                }),
            }
        }

        let earned = data
            .points_earned
            .unwrap_or_else(|| points_earned(Some(totals.total_amount)));

        // 8. Assemble + validate
        let payment_method = match data.payment_method.parse::<PaymentMethod>() {
            Ok(method) => method,
            Err(e) => {
                errors.push(e);
                PaymentMethod::Cash
            }
        };

        let mut invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            order_id,
            staff_id,
            customer_id,
            subtotal_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 0,
            points_used: data.points_used,
            points_earned: earned,
            payment_method,
            payment_status: PaymentStatus::Pending,
            notes: data.notes.filter(|n| !n.trim().is_empty()),
            invoice_date: now,
            paid_at: None,
            created_at: now,
            updated_at: now,
            promotions: Vec::new(),
        };
        invoice.set_totals(&totals);

        errors.extend(invoice.validate());
        if !errors.is_empty() {
            return Err(BillingError::from_field_errors(&errors));
        }

        // 9. Persist
        self.ports.invoices.insert(&invoice).await?;

        for quote in &quotes {
            if let Err(e) = self.record_promotion(&invoice.id, quote).await {
                warn!(
                    invoice_id = %invoice.id,
                    promotion = %quote.promotion.code,
                    error = %e,
                    "Promotion could not be recorded, discarding invoice"
                );
                self.discard(&invoice.id).await;
                return Err(e);
            }
        }

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            order_id = %invoice.order_id,
            total_cents = invoice.total_cents,
            promotions = quotes.len(),
            "Invoice created"
        );

        // 10. Reload
        self.load(&invoice.id).await
    }

    /// Validates promo codes in order, skipping blanks and repeats.
    async fn quote_codes(
        &self,
        codes: &[String],
        subtotal: Money,
    ) -> BillingResult<Vec<PromotionQuote>> {
        let mut seen = HashSet::new();
        let mut quotes = Vec::new();

        for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if !seen.insert(code.to_uppercase()) {
                continue;
            }
            quotes.push(self.ports.promotions.validate(code, subtotal).await?);
        }

        Ok(quotes)
    }

    /// Counts one use of a promotion, then links it to the invoice.
    async fn record_promotion(&self, invoice_id: &str, quote: &PromotionQuote) -> BillingResult<()> {
        self.ports
            .promotions
            .increment_uses(&quote.promotion.id)
            .await?;

        self.ports
            .invoices
            .attach_promotion(&InvoicePromotion {
                invoice_id: invoice_id.to_string(),
                promotion_id: quote.promotion.id.clone(),
                promotion_code: quote.promotion.code.clone(),
                discount_applied_cents: quote.discount_amount.cents(),
                created_at: Utc::now(),
            })
            .await
    }

    /// Removes a just-created invoice after a failed follow-up step.
    async fn discard(&self, invoice_id: &str) {
        let cleared = self.ports.invoices.clear_promotions(invoice_id).await;
        let deleted = self.ports.invoices.delete_pending(invoice_id).await;
        if let Err(e) = cleared.and(deleted) {
            warn!(invoice_id = %invoice_id, error = %e, "Failed to discard invoice");
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub async fn get_invoice(&self, id: &str) -> BillingResult<Invoice> {
        self.load(id).await
    }

    pub async fn get_invoice_by_number(&self, invoice_number: &str) -> BillingResult<Invoice> {
        self.ports
            .invoices
            .find_by_number(invoice_number)
            .await?
            .ok_or_else(|| BillingError::not_found("Invoice", invoice_number))
    }

    pub async fn get_invoice_by_order(&self, order_id: &str) -> BillingResult<Invoice> {
        self.ports
            .invoices
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Invoice for order", order_id))
    }

    /// Lists invoices, newest first.
    pub async fn list_invoices(&self, mut filter: InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        filter.search = match filter.search.as_deref() {
            Some(query) => validate_search_query(query)?,
            None => None,
        };

        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            validate_date_range(Some(start), Some(end))?;
        }

        self.ports.invoices.list(&filter).await
    }

    pub async fn get_invoice_statistics(&self) -> BillingResult<InvoiceStatistics> {
        self.ports.invoices.statistics().await
    }

    /// Daily paid revenue in `[start, end]`. Both bounds are required.
    pub async fn get_revenue_by_date_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> BillingResult<Vec<DailyRevenue>> {
        let (start, end) = validate_date_range(start, end)?;
        self.ports.invoices.revenue_by_date(start, end).await
    }

    // -------------------------------------------------------------------------
    // Pending-only mutations
    // -------------------------------------------------------------------------

    /// Merges a patch into a pending invoice.
    pub async fn update_invoice(&self, id: &str, patch: InvoicePatch) -> BillingResult<Invoice> {
        let mut invoice = self.load(id).await?;
        invoice.ensure_pending("update")?;

        patch.apply_to(&mut invoice)?;

        let errors = invoice.validate();
        if !errors.is_empty() {
            return Err(BillingError::from_field_errors(&errors));
        }

        if invoice.points_used > 0 {
            let customer_id = invoice.customer_id.as_deref().ok_or_else(|| {
                BillingError::from(ValidationError::Required {
                    field: "customer_id".to_string(),
                })
            })?;
            self.ports
                .ledger
                .validate_redemption(customer_id, invoice.points_used)
                .await?;
        }

        if !self.ports.invoices.update_pending(&invoice).await? {
            return Err(self.lost_transition(id, "update").await);
        }

        info!(invoice_id = %id, total_cents = invoice.total_cents, "Invoice updated");
        self.load(id).await
    }

    /// Deletes a pending invoice and its promotion links.
    pub async fn delete_invoice(&self, id: &str) -> BillingResult<()> {
        let invoice = self.load(id).await?;
        invoice.ensure_pending("delete")?;

        self.ports.invoices.clear_promotions(id).await?;

        if self.ports.invoices.delete_pending(id).await? == 0 {
            return Err(BillingError::Internal(format!(
                "Invoice {} could not be deleted",
                id
            )));
        }

        info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    /// Replaces the invoice's discount with one promotion.
    ///
    /// The promotion is validated against the current subtotal. Its use is
    /// counted before the invoice changes, so a capped promotion leaves the
    /// invoice untouched. Totals and links are written together.
    pub async fn apply_promotion(&self, id: &str, promotion_id: &str) -> BillingResult<Invoice> {
        let mut invoice = self.load(id).await?;
        invoice.ensure_pending("apply promotion")?;

        let promotion = self
            .ports
            .promotions
            .get_by_id(promotion_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Promotion", promotion_id))?;

        let quote = self
            .ports
            .promotions
            .validate(&promotion.code, invoice.subtotal())
            .await?;

        let total = total_with_tax(
            invoice.subtotal(),
            Money::from_cents(invoice.tax_cents),
            quote.discount_amount,
        )?;

        self.ports
            .promotions
            .increment_uses(&quote.promotion.id)
            .await?;

        invoice.discount_cents = quote.discount_amount.cents();
        invoice.total_cents = total.cents();
        let link = InvoicePromotion {
            invoice_id: id.to_string(),
            promotion_id: quote.promotion.id.clone(),
            promotion_code: quote.promotion.code.clone(),
            discount_applied_cents: quote.discount_amount.cents(),
            created_at: Utc::now(),
        };

        if !self.ports.invoices.replace_promotion(&invoice, &link).await? {
            warn!(
                invoice_id = %id,
                promotion = %quote.promotion.code,
                "Invoice left pending after promotion use was counted"
            );
            return Err(self.lost_transition(id, "apply promotion").await);
        }

        info!(
            invoice_id = %id,
            promotion = %quote.promotion.code,
            discount_cents = invoice.discount_cents,
            total_cents = invoice.total_cents,
            "Promotion applied"
        );

        self.load(id).await
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Settles a pending invoice.
    ///
    /// ```text
    /// 1. pending?                            InvalidStateTransition
    /// 2. optional promotion                  apply_promotion
    /// 3. pending → paid (conditional)        InvalidStateTransition if lost
    /// 4. award points_earned                 soft failure
    /// 5. redeem points_used                  soft failure
    /// ```
    ///
    /// The status flips before any points move, so a second payment attempt
    /// can never award or redeem again.
    pub async fn mark_as_paid(
        &self,
        id: &str,
        payment_method: PaymentMethod,
        promotion_id: Option<&str>,
    ) -> BillingResult<Settlement> {
        let invoice = self.load(id).await?;
        invoice.ensure_pending("mark as paid")?;

        if let Some(promotion_id) = promotion_id.map(str::trim).filter(|p| !p.is_empty()) {
            self.apply_promotion(id, promotion_id).await?;
        }

        if !self
            .ports
            .invoices
            .mark_paid(id, payment_method, Utc::now())
            .await?
        {
            return Err(self.lost_transition(id, "mark as paid").await);
        }

        let invoice = self.load(id).await?;
        info!(
            invoice_id = %id,
            invoice_number = %invoice.invoice_number,
            method = %payment_method,
            total_cents = invoice.total_cents,
            "Invoice paid"
        );

        let mut soft_failures = Vec::new();

        if let Some(customer_id) = invoice.customer_id.as_deref() {
            if invoice.points_earned > 0 {
                if let Err(e) = self.ports.ledger.award(customer_id, invoice.points_earned).await {
                    soft_failures.push(self.soft_failure(
                        &invoice,
                        SideEffect::AwardPoints,
                        customer_id,
                        invoice.points_earned,
                        e,
                    ));
                }
            }

            if invoice.points_used > 0 {
                if let Err(e) = self.ports.ledger.redeem(customer_id, invoice.points_used).await {
                    soft_failures.push(self.soft_failure(
                        &invoice,
                        SideEffect::RedeemPoints,
                        customer_id,
                        invoice.points_used,
                        e,
                    ));
                }
            }
        }

        Ok(Settlement {
            invoice,
            soft_failures,
        })
    }

    /// Cancels a pending invoice. No points move.
    pub async fn cancel_invoice(&self, id: &str) -> BillingResult<Invoice> {
        let invoice = self.load(id).await?;
        invoice.ensure_pending("cancel")?;

        if !self.ports.invoices.mark_cancelled(id).await? {
            return Err(self.lost_transition(id, "cancel").await);
        }

        info!(invoice_id = %id, "Invoice cancelled");
        self.load(id).await
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn load(&self, id: &str) -> BillingResult<Invoice> {
        self.ports
            .invoices
            .find_by_id(id)
            .await?
            .ok_or_else(|| BillingError::not_found("Invoice", id))
    }

    /// Error for a conditional update that matched no pending row.
    async fn lost_transition(&self, id: &str, action: &str) -> BillingError {
        match self.load(id).await {
            Ok(current) => BillingError::invalid_transition(id, current.payment_status, action),
            Err(e) => e,
        }
    }

    fn soft_failure(
        &self,
        invoice: &Invoice,
        effect: SideEffect,
        customer_id: &str,
        points: i64,
        error: BillingError,
    ) -> SoftFailure {
        warn!(
            invoice_id = %invoice.id,
            customer_id = %customer_id,
            points,
            effect = ?effect,
            error = %error,
            "Loyalty side effect failed, payment stands"
        );
        SoftFailure {
            effect,
            customer_id: customer_id.to_string(),
            points,
            message: error.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use tavola_core::{Customer, DiscountType, Order, Promotion, StaffUser, UserRole, UNLIMITED_USES};
    use tavola_db::{CustomerRepository, Database, DbConfig};

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    /// Ledger whose award/redeem can be switched to fail.
    struct FlakyLedger {
        inner: CustomerRepository,
        fail_award: bool,
        fail_redeem: bool,
    }

    #[async_trait]
    impl PointsLedger for FlakyLedger {
        async fn customer(&self, customer_id: &str) -> BillingResult<Option<Customer>> {
            self.inner.customer(customer_id).await
        }

        async fn award(&self, customer_id: &str, points: i64) -> BillingResult<Option<Customer>> {
            if self.fail_award {
                return Err(BillingError::Internal("ledger offline".to_string()));
            }
            self.inner.award(customer_id, points).await
        }

        async fn redeem(&self, customer_id: &str, points: i64) -> BillingResult<Option<Customer>> {
            if self.fail_redeem {
                return Err(BillingError::Internal("ledger offline".to_string()));
            }
            self.inner.redeem(customer_id, points).await
        }
    }

    struct Harness {
        db: Database,
        service: InvoiceService,
    }

    fn ports(db: &Database, ledger: Arc<dyn PointsLedger>) -> BillingPorts {
        BillingPorts {
            invoices: Arc::new(db.invoices()),
            ledger,
            promotions: Arc::new(db.promotions()),
            orders: Arc::new(db.orders()),
            staff: Arc::new(db.staff()),
        }
    }

    async fn seed(db: &Database) {
        let now = Utc::now();
        for (id, role) in [("waiter", UserRole::Waiter), ("chef", UserRole::Chef)] {
            db.staff()
                .insert(&StaffUser {
                    id: id.to_string(),
                    full_name: id.to_string(),
                    role,
                    is_active: true,
                })
                .await
                .unwrap();
        }
        for (id, points) in [("c-zero", 0), ("c-hundred", 100)] {
            db.customers()
                .insert(&Customer {
                    id: id.to_string(),
                    name: id.to_string(),
                    phone: None,
                    points,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        for (id, customer) in [
            ("o-1", Some("c-zero")),
            ("o-2", Some("c-hundred")),
            ("o-3", Some("c-hundred")),
            ("o-walkin", None),
        ] {
            db.orders()
                .insert(&Order {
                    id: id.to_string(),
                    customer_id: customer.map(str::to_string),
                    table_id: None,
                    status: "served".to_string(),
                    created_at: now,
                })
                .await
                .unwrap();
        }
    }

    async fn harness_with(fail_award: bool, fail_redeem: bool) -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        let ledger = Arc::new(FlakyLedger {
            inner: db.customers(),
            fail_award,
            fail_redeem,
        });
        let service = InvoiceService::new(ports(&db, ledger));
        Harness { db, service }
    }

    async fn harness() -> Harness {
        harness_with(false, false).await
    }

    async fn add_promotion(db: &Database, id: &str, code: &str, max_uses: i64, current_uses: i64) {
        let now = Utc::now();
        db.promotions()
            .insert(&Promotion {
                id: id.to_string(),
                code: code.to_string(),
                name: code.to_string(),
                discount_type: DiscountType::Percentage,
                discount_value: 1000,
                min_order_cents: 0,
                max_discount_cents: None,
                start_date: now - Duration::days(1),
                end_date: now + Duration::days(1),
                is_active: true,
                max_uses,
                current_uses,
            })
            .await
            .unwrap();
    }

    fn request(order_id: &str, subtotal_major: i64) -> CreateInvoice {
        CreateInvoice {
            order_id: order_id.to_string(),
            staff_id: "waiter".to_string(),
            subtotal_cents: Money::from_major(subtotal_major).cents(),
            payment_method: "cash".to_string(),
            ..Default::default()
        }
    }

    async fn balance(db: &Database, customer_id: &str) -> i64 {
        db.customers().balance(customer_id).await.unwrap().unwrap()
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_scenario_a_totals_and_points() {
        let h = harness().await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                tax_rate: Some(10.0),
                ..request("o-1", 500_000)
            })
            .await
            .unwrap();

        assert_eq!(invoice.tax_cents, Money::from_major(50_000).cents());
        assert_eq!(invoice.total_cents, Money::from_major(550_000).cents());
        assert_eq!(invoice.points_earned, 55);
        assert_eq!(invoice.customer_id.as_deref(), Some("c-zero"));
        assert_eq!(invoice.payment_status, PaymentStatus::Pending);
        // nothing moves before payment
        assert_eq!(balance(&h.db, "c-zero").await, 0);

        let settlement = h
            .service
            .mark_as_paid(&invoice.id, PaymentMethod::Card, None)
            .await
            .unwrap();
        assert!(settlement.is_clean());
        assert_eq!(settlement.invoice.payment_status, PaymentStatus::Paid);
        assert_eq!(settlement.invoice.payment_method, PaymentMethod::Card);
        assert!(settlement.invoice.paid_at.is_some());
        assert_eq!(balance(&h.db, "c-zero").await, 55);
    }

    #[tokio::test]
    async fn test_generated_invoice_numbers() {
        let h = harness().await;
        let first = h.service.create_invoice(request("o-1", 10)).await.unwrap();
        let second = h.service.create_invoice(request("o-2", 10)).await.unwrap();

        let prefix = crate::number::number_prefix(Utc::now().date_naive());
        assert_eq!(first.invoice_number, format!("{}0001", prefix));
        assert_eq!(second.invoice_number, format!("{}0002", prefix));

        let custom = h
            .service
            .create_invoice(CreateInvoice {
                invoice_number: Some("TABLE-7".to_string()),
                ..request("o-3", 10)
            })
            .await
            .unwrap();
        assert_eq!(custom.invoice_number, "TABLE-7");
    }

    #[tokio::test]
    async fn test_number_skips_gap_left_by_delete() {
        let h = harness().await;
        let first = h.service.create_invoice(request("o-1", 10)).await.unwrap();
        let second = h.service.create_invoice(request("o-2", 10)).await.unwrap();
        h.service.delete_invoice(&first.id).await.unwrap();

        let third = h.service.create_invoice(request("o-3", 10)).await.unwrap();
        assert_ne!(third.invoice_number, second.invoice_number);
    }

    #[tokio::test]
    async fn test_scenario_b_insufficient_points() {
        let h = harness().await;
        let err = h
            .service
            .create_invoice(CreateInvoice {
                points_used: 150,
                ..request("o-2", 100)
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BillingError::InsufficientBalance {
                available: 100,
                requested: 150
            }
        );
        assert!(h.db.invoices().find_by_order("o-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scenario_c_one_invoice_per_order() {
        let h = harness().await;
        h.service.create_invoice(request("o-1", 10)).await.unwrap();

        let err = h.service.create_invoice(request("o-1", 10)).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancelled_invoice_still_holds_order() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-1", 10)).await.unwrap();
        h.service.cancel_invoice(&invoice.id).await.unwrap();

        let err = h.service.create_invoice(request("o-1", 10)).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_missing_references() {
        let h = harness().await;

        let err = h.service.create_invoice(request("ghost", 10)).await.unwrap_err();
        assert_eq!(err, BillingError::not_found("Order", "ghost"));

        let err = h
            .service
            .create_invoice(CreateInvoice {
                staff_id: "nobody".to_string(),
                ..request("o-1", 10)
            })
            .await
            .unwrap_err();
        assert_eq!(err, BillingError::not_found("Staff", "nobody"));
    }

    #[tokio::test]
    async fn test_non_staff_cannot_issue() {
        let h = harness().await;
        let err = h
            .service
            .create_invoice(CreateInvoice {
                staff_id: "chef".to_string(),
                ..request("o-1", 10)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_validation_errors_are_joined() {
        let h = harness().await;
        let err = h
            .service
            .create_invoice(CreateInvoice {
                subtotal_cents: -100,
                payment_method: "cheque".to_string(),
                ..request("o-1", 0)
            })
            .await
            .unwrap_err();

        let BillingError::Validation(message) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(message.contains("payment_method"));
        assert!(message.contains("subtotal must not be negative"));
    }

    #[tokio::test]
    async fn test_extreme_amounts_are_validation_errors() {
        let h = harness().await;

        let err = h
            .service
            .create_invoice(CreateInvoice {
                discount_cents: Some(i64::MIN),
                ..request("o-1", 100)
            })
            .await
            .unwrap_err();
        let BillingError::Validation(message) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(message.contains("total_amount is out of range"));

        let err = h
            .service
            .create_invoice(CreateInvoice {
                subtotal_cents: i64::MAX,
                tax_rate: Some(10.0),
                ..request("o-1", 0)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
        assert!(h.db.invoices().find_by_order("o-1").await.unwrap().is_none());

        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();
        let err = h
            .service
            .update_invoice(
                &invoice.id,
                InvoicePatch {
                    discount_cents: Some(i64::MIN),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BillingError::Validation("total_amount is out of range".to_string())
        );
        let stored = h.service.get_invoice(&invoice.id).await.unwrap();
        assert_eq!(stored.total_cents, invoice.total_cents);
    }

    #[tokio::test]
    async fn test_tax_rate_with_three_decimals() {
        let h = harness().await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                tax_rate: Some(8.125),
                ..request("o-1", 1_000)
            })
            .await
            .unwrap();
        // 1,000.00 × 8.125% = 81.25
        assert_eq!(invoice.tax_cents, 8_125);
        assert_eq!(invoice.total_cents, 108_125);

        let err = h
            .service
            .create_invoice(CreateInvoice {
                tax_rate: Some(8.12345),
                ..request("o-2", 1_000)
            })
            .await
            .unwrap_err();
        let BillingError::Validation(message) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(message.contains("tax_rate has invalid format"));
    }

    #[tokio::test]
    async fn test_points_without_customer_rejected() {
        let h = harness().await;
        let err = h
            .service
            .create_invoice(CreateInvoice {
                points_used: 5,
                ..request("o-walkin", 10)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_explicit_points_earned_kept() {
        let h = harness().await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                points_earned: Some(3),
                ..request("o-1", 500_000)
            })
            .await
            .unwrap();
        assert_eq!(invoice.points_earned, 3);
    }

    #[tokio::test]
    async fn test_default_tax_rate() {
        let h = harness().await;
        let service = h.service.clone().with_default_tax_rate(TaxRate::from_percentage(10.0));
        let invoice = service.create_invoice(request("o-1", 1_000)).await.unwrap();
        assert_eq!(invoice.tax_cents, Money::from_major(100).cents());
    }

    #[tokio::test]
    async fn test_create_with_promo_codes() {
        let h = harness().await;
        add_promotion(&h.db, "p-ten", "TEN", UNLIMITED_USES, 0).await;

        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                promo_codes: vec!["TEN".to_string(), "ten".to_string(), " ".to_string()],
                discount_cents: Some(Money::from_major(5).cents()),
                ..request("o-1", 1_000)
            })
            .await
            .unwrap();

        // 10% of 1,000 plus the manual 5
        assert_eq!(invoice.discount_cents, Money::from_major(105).cents());
        assert_eq!(invoice.total_cents, Money::from_major(895).cents());
        assert_eq!(invoice.promotions.len(), 1);
        assert_eq!(invoice.promotions[0].promotion_code, "TEN");

        let promo = h.db.promotions().get_by_id("p-ten").await.unwrap().unwrap();
        assert_eq!(promo.current_uses, 1);
    }

    #[tokio::test]
    async fn test_create_with_exhausted_code() {
        let h = harness().await;
        add_promotion(&h.db, "p-cap", "CAPPED", 3, 3).await;

        let err = h
            .service
            .create_invoice(CreateInvoice {
                promo_codes: vec!["CAPPED".to_string()],
                ..request("o-1", 100)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PromotionLimitExceeded { .. }));
        assert!(!h.db.invoices().exists_for_order("o-1").await.unwrap());
    }

    // -------------------------------------------------------------------------
    // Promotions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_scenario_e_capped_promotion() {
        let h = harness().await;
        add_promotion(&h.db, "p-cap", "CAPPED", 3, 3).await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();

        let err = h.service.apply_promotion(&invoice.id, "p-cap").await.unwrap_err();
        assert_eq!(
            err,
            BillingError::PromotionLimitExceeded {
                code: "CAPPED".to_string(),
                max_uses: 3
            }
        );

        let unchanged = h.service.get_invoice(&invoice.id).await.unwrap();
        assert_eq!(unchanged.total_cents, invoice.total_cents);
        assert!(unchanged.promotions.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_f_unlimited_promotion() {
        let h = harness().await;
        add_promotion(&h.db, "p-open", "OPEN", UNLIMITED_USES, 999).await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();

        let updated = h.service.apply_promotion(&invoice.id, "p-open").await.unwrap();
        assert_eq!(updated.discount_cents, Money::from_major(10).cents());
        assert_eq!(updated.total_cents, Money::from_major(90).cents());

        let promo = h.db.promotions().get_by_id("p-open").await.unwrap().unwrap();
        assert_eq!(promo.current_uses, 1000);
    }

    #[tokio::test]
    async fn test_apply_promotion_replaces_links() {
        let h = harness().await;
        add_promotion(&h.db, "p-a", "AAA", UNLIMITED_USES, 0).await;
        add_promotion(&h.db, "p-b", "BBB", UNLIMITED_USES, 0).await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                promo_codes: vec!["AAA".to_string()],
                ..request("o-1", 100)
            })
            .await
            .unwrap();
        assert_eq!(invoice.promotions.len(), 1);

        let updated = h.service.apply_promotion(&invoice.id, "p-b").await.unwrap();
        assert_eq!(updated.promotions.len(), 1);
        assert_eq!(updated.promotions[0].promotion_id, "p-b");
    }

    #[tokio::test]
    async fn test_apply_unknown_promotion() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();
        let err = h.service.apply_promotion(&invoice.id, "ghost").await.unwrap_err();
        assert_eq!(err, BillingError::not_found("Promotion", "ghost"));
    }

    #[tokio::test]
    async fn test_mark_paid_with_promotion() {
        let h = harness().await;
        add_promotion(&h.db, "p-ten", "TEN", UNLIMITED_USES, 0).await;
        let invoice = h.service.create_invoice(request("o-1", 200)).await.unwrap();

        let settlement = h
            .service
            .mark_as_paid(&invoice.id, PaymentMethod::Transfer, Some("p-ten"))
            .await
            .unwrap();
        assert_eq!(settlement.invoice.total_cents, Money::from_major(180).cents());
        assert_eq!(settlement.invoice.payment_status, PaymentStatus::Paid);
    }

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_payment_moves_points_once() {
        let h = harness().await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                points_used: 40,
                ..request("o-2", 20_000)
            })
            .await
            .unwrap();
        assert_eq!(invoice.points_earned, 2);
        assert_eq!(balance(&h.db, "c-hundred").await, 100);

        h.service
            .mark_as_paid(&invoice.id, PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert_eq!(balance(&h.db, "c-hundred").await, 100 + 2 - 40);

        // scenario D: a second payment fails and moves nothing
        let err = h
            .service
            .mark_as_paid(&invoice.id, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BillingError::InvalidStateTransition {
                status: PaymentStatus::Paid,
                ..
            }
        ));
        assert_eq!(balance(&h.db, "c-hundred").await, 62);
    }

    #[tokio::test]
    async fn test_ledger_failures_do_not_block_payment() {
        let h = harness_with(true, true).await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                points_used: 10,
                ..request("o-2", 50_000)
            })
            .await
            .unwrap();

        let settlement = h
            .service
            .mark_as_paid(&invoice.id, PaymentMethod::Card, None)
            .await
            .unwrap();

        assert_eq!(settlement.invoice.payment_status, PaymentStatus::Paid);
        assert_eq!(settlement.soft_failures.len(), 2);
        let award = settlement.failure(SideEffect::AwardPoints).unwrap();
        assert_eq!(award.points, 5);
        assert!(award.message.contains("ledger offline"));
        assert!(settlement.failure(SideEffect::RedeemPoints).is_some());
        assert_eq!(balance(&h.db, "c-hundred").await, 100);
    }

    #[tokio::test]
    async fn test_award_failure_keeps_redeem() {
        let h = harness_with(true, false).await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                points_used: 10,
                ..request("o-2", 50_000)
            })
            .await
            .unwrap();

        let settlement = h
            .service
            .mark_as_paid(&invoice.id, PaymentMethod::Card, None)
            .await
            .unwrap();
        assert_eq!(settlement.soft_failures.len(), 1);
        assert_eq!(settlement.soft_failures[0].effect, SideEffect::AwardPoints);
        assert_eq!(balance(&h.db, "c-hundred").await, 90);
    }

    #[tokio::test]
    async fn test_walk_in_payment_moves_nothing() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-walkin", 90_000)).await.unwrap();
        assert_eq!(invoice.customer_id, None);

        let settlement = h
            .service
            .mark_as_paid(&invoice.id, PaymentMethod::EWallet, None)
            .await
            .unwrap();
        assert!(settlement.is_clean());
    }

    // -------------------------------------------------------------------------
    // State machine
    // -------------------------------------------------------------------------

    async fn assert_frozen(h: &Harness, id: &str, status: PaymentStatus) {
        add_promotion(&h.db, "p-late", "LATE", UNLIMITED_USES, 0).await;
        let before = h.service.get_invoice(id).await.unwrap();

        let results = vec![
            h.service
                .update_invoice(
                    id,
                    InvoicePatch {
                        notes: Some("late edit".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .map(|_| ()),
            h.service.delete_invoice(id).await,
            h.service.apply_promotion(id, "p-late").await.map(|_| ()),
            h.service
                .mark_as_paid(id, PaymentMethod::Cash, None)
                .await
                .map(|_| ()),
            h.service.cancel_invoice(id).await.map(|_| ()),
        ];

        for result in results {
            match result {
                Err(BillingError::InvalidStateTransition { status: s, .. }) => assert_eq!(s, status),
                other => panic!("expected InvalidStateTransition, got {other:?}"),
            }
        }

        let after = h.service.get_invoice(id).await.unwrap();
        assert_eq!(before, after);
        let promo = h.db.promotions().get_by_id("p-late").await.unwrap().unwrap();
        assert_eq!(promo.current_uses, 0);
    }

    #[tokio::test]
    async fn test_paid_invoice_is_frozen() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();
        h.service
            .mark_as_paid(&invoice.id, PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert_frozen(&h, &invoice.id, PaymentStatus::Paid).await;
    }

    #[tokio::test]
    async fn test_cancelled_invoice_is_frozen() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();
        let cancelled = h.service.cancel_invoice(&invoice.id).await.unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Cancelled);
        assert_eq!(cancelled.paid_at, None);
        assert_frozen(&h, &invoice.id, PaymentStatus::Cancelled).await;
    }

    #[tokio::test]
    async fn test_cancel_moves_no_points() {
        let h = harness().await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                points_used: 50,
                ..request("o-2", 100_000)
            })
            .await
            .unwrap();
        h.service.cancel_invoice(&invoice.id).await.unwrap();
        assert_eq!(balance(&h.db, "c-hundred").await, 100);
    }

    // -------------------------------------------------------------------------
    // Update / delete
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_update_recomputes_total() {
        let h = harness().await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                tax_rate: Some(10.0),
                ..request("o-1", 100)
            })
            .await
            .unwrap();

        let updated = h
            .service
            .update_invoice(
                &invoice.id,
                InvoicePatch {
                    discount_cents: Some(Money::from_major(20).cents()),
                    payment_method: Some("e-wallet".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.total_cents, Money::from_major(90).cents());
        assert_eq!(updated.payment_method, PaymentMethod::EWallet);
        // earned points are sized once at creation
        assert_eq!(updated.points_earned, invoice.points_earned);
    }

    #[tokio::test]
    async fn test_update_rejects_negative_total() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();
        let err = h
            .service
            .update_invoice(
                &invoice.id,
                InvoicePatch {
                    discount_cents: Some(Money::from_major(500).cents()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_checks_redemption() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-2", 100)).await.unwrap();
        let err = h
            .service
            .update_invoice(
                &invoice.id,
                InvoicePatch {
                    points_used: Some(500),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_delete_pending_invoice() {
        let h = harness().await;
        add_promotion(&h.db, "p-ten", "TEN", UNLIMITED_USES, 0).await;
        let invoice = h
            .service
            .create_invoice(CreateInvoice {
                promo_codes: vec!["TEN".to_string()],
                ..request("o-1", 100)
            })
            .await
            .unwrap();

        h.service.delete_invoice(&invoice.id).await.unwrap();
        assert!(matches!(
            h.service.get_invoice(&invoice.id).await,
            Err(BillingError::NotFound { .. })
        ));
        // the order is free again
        h.service.create_invoice(request("o-1", 100)).await.unwrap();
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_lookups() {
        let h = harness().await;
        let invoice = h.service.create_invoice(request("o-1", 100)).await.unwrap();

        let by_number = h
            .service
            .get_invoice_by_number(&invoice.invoice_number)
            .await
            .unwrap();
        assert_eq!(by_number.id, invoice.id);

        let by_order = h.service.get_invoice_by_order("o-1").await.unwrap();
        assert_eq!(by_order.id, invoice.id);

        assert!(matches!(
            h.service.get_invoice_by_order("o-2").await,
            Err(BillingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_statistics_and_revenue() {
        let h = harness().await;
        let a = h.service.create_invoice(request("o-1", 500_000)).await.unwrap();
        let b = h.service.create_invoice(request("o-2", 100)).await.unwrap();
        h.service.create_invoice(request("o-3", 100)).await.unwrap();
        h.service.mark_as_paid(&a.id, PaymentMethod::Cash, None).await.unwrap();
        h.service.cancel_invoice(&b.id).await.unwrap();

        let stats = h.service.get_invoice_statistics().await.unwrap();
        assert_eq!(stats.total_invoices, 3);
        assert_eq!(stats.paid_count, 1);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.cancelled_count, 1);
        assert_eq!(stats.total_revenue_cents, Money::from_major(500_000).cents());
        assert_eq!(stats.total_points_earned, 50);

        let today = Utc::now().date_naive();
        let series = h
            .service
            .get_revenue_by_date_range(Some(today), Some(today))
            .await
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].count, 1);

        let err = h
            .service
            .get_revenue_by_date_range(Some(today), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let h = harness().await;
        h.service
            .create_invoice(CreateInvoice {
                notes: Some("anniversary dinner".to_string()),
                ..request("o-1", 100)
            })
            .await
            .unwrap();
        h.service.create_invoice(request("o-2", 100)).await.unwrap();

        let found = h
            .service
            .list_invoices(InvoiceFilter {
                search: Some("  anniversary ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let by_customer = h
            .service
            .list_invoices(InvoiceFilter {
                customer_id: Some("c-hundred".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_customer.len(), 1);

        let bad_range = h
            .service
            .list_invoices(InvoiceFilter {
                start_date: Some(Utc::now().date_naive()),
                end_date: Some(Utc::now().date_naive() - Duration::days(1)),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad_range, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_settlement_serializes_effects() {
        let effect = serde_json::to_string(&SideEffect::RedeemPoints).unwrap();
        assert_eq!(effect, "\"redeem_points\"");
    }
}
