//! Shared application state.

use std::sync::Arc;

use tavola_billing::{BillingPorts, InvoiceService};
use tavola_core::TaxRate;
use tavola_db::Database;

/// Handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub invoices: InvoiceService,
}

impl AppState {
    /// Wires the invoice service to the SQLite repositories.
    pub fn new(db: Database, default_tax_rate: TaxRate) -> Self {
        let ports = BillingPorts {
            invoices: Arc::new(db.invoices()),
            ledger: Arc::new(db.customers()),
            promotions: Arc::new(db.promotions()),
            orders: Arc::new(db.orders()),
            staff: Arc::new(db.staff()),
        };

        AppState {
            invoices: InvoiceService::new(ports).with_default_tax_rate(default_tax_rate),
            db,
        }
    }
}
