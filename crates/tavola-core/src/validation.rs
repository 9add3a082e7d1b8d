//! # Validation Module
//!
//! Field-level validators shared by the invoice entity, the service and the
//! HTTP layer.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (billing-api)                                           │
//! │  └── Deserialization, query parameter presence                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Invoice::validate + THIS MODULE                              │
//! │  └── Business field rules, collected as a list                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on money and points                             │
//! │  └── UNIQUE (order_id), UNIQUE (invoice_number)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of free-text invoice notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Maximum length of a search query.
pub const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Fails when `value` is empty after trimming.
///
/// ## Example
/// ```rust
/// use tavola_core::validation::validate_required;
///
/// assert!(validate_required("order_id", "ord-1").is_ok());
/// assert!(validate_required("order_id", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Invoice notes must stay under [`MAX_NOTES_LEN`] characters.
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query, or `None` when it is blank.
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(Some(query.to_string()).filter(|q| !q.is_empty()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Fails when `value` is negative.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::negative(field));
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Requires both bounds of a date range and checks their order.
///
/// ```text
/// (None, _) | (_, None)  → "start_date is required" / "end_date is required"
/// start > end            → InvalidFormat
/// ```
pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ValidationResult<(NaiveDate, NaiveDate)> {
    let start = start.ok_or_else(|| ValidationError::required("start_date"))?;
    let end = end.ok_or_else(|| ValidationError::required("end_date"))?;

    if start > end {
        return Err(ValidationError::InvalidFormat {
            field: "start_date".to_string(),
            reason: format!("{} is after end_date {}", start, end),
        });
    }

    Ok((start, end))
}

/// Parses a `YYYY-MM-DD` date parameter.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
