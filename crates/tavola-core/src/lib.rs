//! # tavola-core: Pure Billing Logic for Tavola
//!
//! This crate is the **heart** of the billing & settlement engine. It holds
//! every money rule, invoice invariant and loyalty computation as pure
//! functions, plus the port traits the orchestrator is wired through.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola Billing Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    billing-api (axum)                           │   │
//! │  │    POST /invoices ─► PATCH /invoices/:id/paid ─► statistics     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                tavola-billing (InvoiceService)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ports                                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tavola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  invoice  │  │   money   │  │  loyalty  │  │ promotion │  │   │
//! │  │   │  Invoice  │  │   Money   │  │  earned   │  │ evaluate  │  │   │
//! │  │   │  Status   │  │  Totals   │  │  redeem?  │  │ discount  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │        tavola-db (SQLite repositories implementing ports)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type and the totals calculator
//! - [`invoice`] - Invoice entity, lifecycle states, patches and filters
//! - [`loyalty`] - Points earned and redemption checks
//! - [`promotion`] - Promotion rules and discount evaluation
//! - [`types`] - Tax rate, customers, orders, staff, statistics
//! - [`validation`] - Field-level validators
//! - [`ports`] - Traits the orchestrator depends on
//! - [`error`] - The billing error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use tavola_core::money::{calculate_totals, Money};
//! use tavola_core::types::TaxRate;
//!
//! let totals = calculate_totals(
//!     Money::from_major(500_000),
//!     TaxRate::from_percentage(10.0),
//!     Money::zero(),
//! )
//! .unwrap();
//! assert_eq!(totals.tax, Money::from_major(50_000));
//! assert_eq!(totals.total_amount, Money::from_major(550_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod loyalty;
pub mod money;
pub mod ports;
pub mod promotion;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{BillingError, BillingResult, ValidationError};
pub use invoice::*;
pub use money::{calculate_totals, Money, Totals};
pub use promotion::{DiscountType, Promotion, PromotionQuote};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of generated invoice numbers (`INV-YYYYMMDD-NNNN`).
pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// Amount of spend, in minor units, that earns one loyalty point.
///
/// ## Business Reason
/// One point per 10,000 currency units. Money is stored in hundredths,
/// so the threshold is 10,000 × 100 minor units.
pub const POINTS_EARN_UNIT_CENTS: i64 = 10_000 * 100;

/// Sentinel for promotions without a usage cap.
pub const UNLIMITED_USES: i64 = -1;

/// Upper bound for a single invoice listing page.
pub const MAX_LIST_LIMIT: i64 = 500;
