//! # Tavola Billing API
//!
//! HTTP surface of the billing & settlement engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Billing API                                     │
//! │                                                                         │
//! │  client ──► axum Router ──► routes::invoices ──► InvoiceService         │
//! │                 │                                     │                 │
//! │                 │  TraceLayer                         ▼                 │
//! │                 │                              tavola-db (SQLite)       │
//! │                 ▼                                                       │
//! │   { success, data, message, code }                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./tavola.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `DEFAULT_TAX_RATE` - percentage applied when `tax_rate` is omitted (default: 0)
//! - `RUST_LOG` - log filter (default: info)

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResponse};
pub use routes::router;
pub use state::AppState;
