//! # Invoice Entity
//!
//! The validated, in-memory representation of a billing record.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │                   ┌──────────┐                                          │
//! │   create ───────► │ PENDING  │ ◄── update / apply promotion / delete    │
//! │                   └────┬─────┘                                          │
//! │                        │                                                │
//! │          mark_as_paid  │  cancel                                        │
//! │              ┌─────────┴─────────┐                                      │
//! │              ▼                   ▼                                      │
//! │         ┌────────┐         ┌───────────┐                                │
//! │         │  PAID  │         │ CANCELLED │   terminal: no edges out,      │
//! │         └────────┘         └───────────┘   no further mutation          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Invariant
//! `total_cents == subtotal_cents + tax_cents - discount_cents`, every
//! component non-negative.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{BillingError, BillingResult, ValidationError};
use crate::money::{total_with_tax, Money, Totals};
use crate::validation::{validate_notes, validate_required};

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Recorded, never processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "e-wallet"))]
    #[serde(rename = "e-wallet")]
    EWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
        PaymentMethod::EWallet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::EWallet => "e-wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Where the invoice is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Paid and cancelled have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_status".to_string(),
                allowed: PaymentStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// The billing record for exactly one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Human-facing number, `INV-YYYYMMDD-NNNN` unless supplied.
    pub invoice_number: String,
    pub order_id: String,
    /// Issuer; must hold a staff role.
    pub staff_id: String,
    /// Absent for walk-in orders.
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Points redeemed against this invoice (moved at payment).
    pub points_used: i64,
    /// Points the customer earns when this invoice is paid.
    pub points_earned: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub invoice_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Loaded separately from `invoice_promotions`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub promotions: Vec<InvoicePromotion>,
}

impl Invoice {
    #[inline]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.payment_status == PaymentStatus::Cancelled
    }

    /// Fails with `InvalidStateTransition` unless the invoice is pending.
    pub fn ensure_pending(&self, action: &str) -> BillingResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(BillingError::invalid_transition(
                &self.id,
                self.payment_status,
                action,
            ))
        }
    }

    /// Current money fields as a [`Totals`].
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: Money::from_cents(self.subtotal_cents),
            tax: Money::from_cents(self.tax_cents),
            discount_amount: Money::from_cents(self.discount_cents),
            total_amount: Money::from_cents(self.total_cents),
        }
    }

    /// Overwrites the money fields.
    pub fn set_totals(&mut self, totals: &Totals) {
        self.subtotal_cents = totals.subtotal.cents();
        self.tax_cents = totals.tax.cents();
        self.discount_cents = totals.discount_amount.cents();
        self.total_cents = totals.total_amount.cents();
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Checks every field rule and returns all violations.
    ///
    /// An empty list means the invoice may be persisted. The service joins
    /// a non-empty list into one [`BillingError::Validation`].
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("invoice_number", self.invoice_number.as_str()),
            ("order_id", self.order_id.as_str()),
            ("staff_id", self.staff_id.as_str()),
        ] {
            if let Err(e) = validate_required(field, value) {
                errors.push(e);
            }
        }

        for (field, value) in [
            ("subtotal", self.subtotal_cents),
            ("tax", self.tax_cents),
            ("discount_amount", self.discount_cents),
            ("total_amount", self.total_cents),
            ("points_used", self.points_used),
            ("points_earned", self.points_earned),
        ] {
            if value < 0 {
                errors.push(ValidationError::negative(field));
            }
        }

        if let Some(notes) = &self.notes {
            if let Err(e) = validate_notes(notes) {
                errors.push(e);
            }
        }

        errors
    }
}

// =============================================================================
// Invoice-Promotion Link
// =============================================================================

/// One promotion applied to one invoice, with the discount it contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoicePromotion {
    pub invoice_id: String,
    pub promotion_id: String,
    pub promotion_code: String,
    pub discount_applied_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Commands
// =============================================================================

/// Input for creating an invoice from an existing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateInvoice {
    pub order_id: String,
    pub staff_id: String,
    /// Defaults to the order's customer.
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Generated when absent.
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub subtotal_cents: i64,
    /// Percentage, e.g. `10` or `8.25`. Defaults to 0.
    #[serde(default)]
    pub tax_rate: Option<f64>,
    /// Manual discount on top of promotion discounts.
    #[serde(default)]
    pub discount_cents: Option<i64>,
    #[serde(default)]
    pub promo_codes: Vec<String>,
    #[serde(default)]
    pub points_used: i64,
    /// Computed from the total when absent.
    #[serde(default)]
    pub points_earned: Option<i64>,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of a pending invoice.
///
/// Any change to a money field recomputes `total_cents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoicePatch {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub subtotal_cents: Option<i64>,
    #[serde(default)]
    pub tax_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: Option<i64>,
    #[serde(default)]
    pub points_used: Option<i64>,
    #[serde(default)]
    pub points_earned: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InvoicePatch {
    /// Merges the patch into `invoice`, returning field errors for
    /// unparseable values and for totals outside the i64 range.
    pub fn apply_to(&self, invoice: &mut Invoice) -> Result<(), ValidationError> {
        if let Some(method) = &self.payment_method {
            invoice.payment_method = method.parse()?;
        }
        if let Some(customer_id) = &self.customer_id {
            invoice.customer_id = Some(customer_id.clone()).filter(|c| !c.trim().is_empty());
        }
        if let Some(notes) = &self.notes {
            invoice.notes = Some(notes.clone());
        }
        if let Some(points) = self.points_used {
            invoice.points_used = points;
        }
        if let Some(points) = self.points_earned {
            invoice.points_earned = points;
        }

        if self.touches_money() {
            let subtotal = Money::from_cents(self.subtotal_cents.unwrap_or(invoice.subtotal_cents));
            let tax = Money::from_cents(self.tax_cents.unwrap_or(invoice.tax_cents));
            let discount = Money::from_cents(self.discount_cents.unwrap_or(invoice.discount_cents));
            let total_amount = total_with_tax(subtotal, tax, discount)?;
            invoice.set_totals(&Totals {
                subtotal,
                tax,
                discount_amount: discount,
                total_amount,
            });
        }

        Ok(())
    }

    fn touches_money(&self) -> bool {
        self.subtotal_cents.is_some() || self.tax_cents.is_some() || self.discount_cents.is_some()
    }
}

// =============================================================================
// Listing Filter
// =============================================================================

/// Filters for listing invoices. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceFilter {
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_id: Option<String>,
    pub staff_id: Option<String>,
    /// Inclusive, compared against the invoice date.
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive, compared against the invoice date.
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
    /// Matches invoice number or notes.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
