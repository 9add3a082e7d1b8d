//! # Domain Types
//!
//! Supporting types around the invoice: tax rates, and the read-only views
//! of the collaborators billing depends on (customers, orders, staff).
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Order      │   │    StaffUser    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  points         │   │  customer_id?   │   │  role           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌───────────────────┐   ┌─────────────────┐     │
//! │  │    TaxRate      │   │ InvoiceStatistics │   │  DailyRevenue   │     │
//! │  │  ppm (u32)      │   │  counts, revenue  │   │  date, total    │     │
//! │  └─────────────────┘   └───────────────────┘   └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in millionths of the amount (parts per million).
///
/// ## Why Millionths?
/// 1% = 10_000 ppm, so 8.125% = 81_250 ppm. Any percentage with up to four
/// decimals is held exactly and tax is rounded once, on the final cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

/// ppm per whole percent.
const PPM_PER_PERCENT: f64 = 10_000.0;

impl TaxRate {
    /// Creates a tax rate from parts per million.
    #[inline]
    pub const fn from_ppm(ppm: u32) -> Self {
        TaxRate(ppm)
    }

    /// Creates a tax rate from basis points (825 bps = 8.25%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps.saturating_mul(100))
    }

    /// Creates a tax rate from a percentage (10.0 = 10%), rounding to the
    /// nearest millionth.
    ///
    /// Negative or non-finite input yields a zero rate. Use
    /// [`TaxRate::try_from_percentage`] for untrusted input.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return TaxRate(0);
        }
        TaxRate((pct * PPM_PER_PERCENT).round() as u32)
    }

    /// Parses a requested percentage without rounding it.
    ///
    /// ## Errors
    /// - negative or non-finite: `Negative`
    /// - more than four decimals, or too large for the representation:
    ///   `InvalidFormat`
    pub fn try_from_percentage(pct: f64) -> Result<Self, ValidationError> {
        if !pct.is_finite() || pct < 0.0 {
            return Err(ValidationError::negative("tax_rate"));
        }

        let scaled = pct * PPM_PER_PERCENT;
        if scaled > u32::MAX as f64 {
            return Err(ValidationError::InvalidFormat {
                field: "tax_rate".to_string(),
                reason: "too large".to_string(),
            });
        }

        let ppm = scaled.round();
        if (scaled - ppm).abs() > 1e-6 * scaled.max(1.0) {
            return Err(ValidationError::InvalidFormat {
                field: "tax_rate".to_string(),
                reason: "at most four decimal places".to_string(),
            });
        }

        Ok(TaxRate(ppm as u32))
    }

    /// Returns the rate in parts per million.
    #[inline]
    pub const fn ppm(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / PPM_PER_PERCENT
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a loyalty point balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Current loyalty balance. Never negative.
    pub points: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// The slice of an order billing needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Absent for walk-in orders.
    pub customer_id: Option<String>,
    pub table_id: Option<String>,
    pub status: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Staff
// =============================================================================

/// Platform user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Manager,
    Cashier,
    Waiter,
    Chef,
    Customer,
}

impl UserRole {
    /// Roles allowed to issue invoices.
    pub const INVOICE_ISSUERS: [UserRole; 3] =
        [UserRole::Waiter, UserRole::Cashier, UserRole::Manager];

    /// Whether this role may issue an invoice.
    pub fn can_issue_invoices(&self) -> bool {
        Self::INVOICE_ISSUERS.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Manager => "manager",
            UserRole::Cashier => "cashier",
            UserRole::Waiter => "waiter",
            UserRole::Chef => "chef",
            UserRole::Customer => "customer",
        }
    }
}

/// A platform user as seen by billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StaffUser {
    pub id: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
}

// =============================================================================
// Statistics
// =============================================================================

/// Aggregate view over all invoices.
///
/// Revenue, discount and points figures only count `paid` invoices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceStatistics {
    pub total_invoices: i64,
    pub pending_count: i64,
    pub paid_count: i64,
    pub cancelled_count: i64,
    pub total_revenue_cents: i64,
    pub total_discount_cents: i64,
    pub total_points_earned: i64,
    /// Integer mean of paid totals; 0 when nothing is paid.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub average_invoice_cents: i64,
}

impl InvoiceStatistics {
    /// Fills in the derived average from the paid aggregates.
    pub fn with_average(mut self) -> Self {
        self.average_invoice_cents = if self.paid_count > 0 {
            self.total_revenue_cents / self.paid_count
        } else {
            0
        };
        self
    }
}

/// Revenue of paid invoices for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyRevenue {
    /// `YYYY-MM-DD`
    pub date: String,
    pub total_cents: i64,
    pub count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
