//! # tavola-billing: Invoice Orchestration
//!
//! Drives an invoice from creation to settlement, wiring the money
//! calculator, the invoice entity, the points ledger and the promotion
//! gateway together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   billing-api (HTTP)                                                   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌──────────────────────────────────────────────────────────────────┐ │
//! │   │                 tavola-billing (THIS CRATE)                      │ │
//! │   │                                                                  │ │
//! │   │   InvoiceService ──► number::next_invoice_number                 │ │
//! │   │        │         ──► Settlement { invoice, soft_failures }       │ │
//! │   │        │                                                         │ │
//! │   │        ▼                                                         │ │
//! │   │   BillingPorts (Arc<dyn ...>)                                    │ │
//! │   └────────┬─────────────────────────────────────────────────────────┘ │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   tavola-db repositories (production) / test doubles                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`service`] - The [`InvoiceService`] and its state machine
//! - [`number`] - `INV-YYYYMMDD-NNNN` number generation
//! - [`settlement`] - Payment outcome with soft-failed side effects

pub mod number;
pub mod service;
pub mod settlement;

pub use service::{BillingPorts, InvoiceService};
pub use settlement::{Settlement, SideEffect, SoftFailure};
