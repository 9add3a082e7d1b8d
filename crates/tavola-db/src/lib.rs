//! # tavola-db: Database Layer for Tavola Billing
//!
//! SQLite persistence for invoices, promotions and the loyalty ledger,
//! using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Tavola Billing Data Flow                          │
//! │                                                                         │
//! │  HTTP handler (POST /invoices)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceService (tavola-billing) ── holds Arc<dyn Port> ──┐            │
//! │                                                           │            │
//! │  ┌────────────────────────────────────────────────────────▼────────┐   │
//! │  │                     tavola-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo    │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ PromotionRepo  │    │              │  │   │
//! │  │   │               │    │ CustomerRepo   │    │              │  │   │
//! │  │   │               │    │ Order/StaffRepo│    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (tavola.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories, each implementing a `tavola_core::ports` trait
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tavola_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tavola.db")).await?;
//!
//! let invoice = db.invoices().find_by_number("INV-20261018-0001").await?;
//! let customer = db.customers().award("cust-1", 55).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::order::OrderRepository;
pub use repository::promotion::PromotionRepository;
pub use repository::staff::StaffRepository;
