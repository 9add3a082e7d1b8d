//! # Invoice Numbers
//!
//! ```text
//! INV-20261018-0007
//! ─┬─ ────┬─── ──┬─
//!  │      │      └── per-day sequence, zero-padded to 4 digits
//!  │      └───────── invoice date (UTC)
//!  └──────────────── fixed prefix
//! ```
//!
//! The sequence is `count(numbers with today's prefix) + 1`, bumped past any
//! number already taken (a deleted invoice leaves a gap in the count).
//! Callers may always supply their own number instead.

use chrono::NaiveDate;

use tavola_core::ports::InvoiceStore;
use tavola_core::{BillingError, BillingResult, INVOICE_NUMBER_PREFIX};

/// Upper bound on probing past taken numbers.
const MAX_PROBES: i64 = 32;

/// `INV-YYYYMMDD-` for a date.
pub fn number_prefix(date: NaiveDate) -> String {
    format!("{}-{}-", INVOICE_NUMBER_PREFIX, date.format("%Y%m%d"))
}

/// Formats a full invoice number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use tavola_billing::number::format_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
/// assert_eq!(format_number(day, 7), "INV-20261018-0007");
/// ```
pub fn format_number(date: NaiveDate, seq: i64) -> String {
    format!("{}{:04}", number_prefix(date), seq)
}

/// Next free invoice number for `date`.
pub async fn next_invoice_number(store: &dyn InvoiceStore, date: NaiveDate) -> BillingResult<String> {
    let issued = store.count_by_number_prefix(&number_prefix(date)).await?;

    for seq in (issued + 1)..=(issued + MAX_PROBES) {
        let candidate = format_number(date, seq);
        if store.find_by_number(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    Err(BillingError::Conflict(format!(
        "No free invoice number for {}",
        date
    )))
}
