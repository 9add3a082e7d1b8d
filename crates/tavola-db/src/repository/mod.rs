//! # Repository Module
//!
//! Database repository implementations for Tavola billing.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories as Port Adapters                        │
//! │                                                                         │
//! │  InvoiceService (tavola-billing)                                       │
//! │       │                                                                 │
//! │       │  store.mark_paid(id, method, now)                              │
//! │       ▼                                                                 │
//! │  dyn InvoiceStore  ─────────────►  InvoiceRepository                   │
//! │  dyn PromotionGateway ──────────►  PromotionRepository                 │
//! │  dyn PointsLedger ──────────────►  CustomerRepository                  │
//! │  dyn OrderLookup ───────────────►  OrderRepository                     │
//! │  dyn StaffLookup ───────────────►  StaffRepository                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Check-then-act sequences are single conditional statements here:     │
//! │  • UPDATE ... WHERE payment_status = 'pending'                         │
//! │  • UPDATE ... WHERE max_uses = -1 OR current_uses < max_uses           │
//! │  • UPDATE ... WHERE points >= ?                                        │
//! │  • UNIQUE (order_id)                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices, promotion links, statistics
//! - [`PromotionRepository`](promotion::PromotionRepository) - Promotion lookup and usage counting
//! - [`CustomerRepository`](customer::CustomerRepository) - Loyalty point balances
//! - [`OrderRepository`](order::OrderRepository) - Orders billing reads
//! - [`StaffRepository`](staff::StaffRepository) - Platform users and roles

pub mod customer;
pub mod invoice;
pub mod order;
pub mod promotion;
pub mod staff;
