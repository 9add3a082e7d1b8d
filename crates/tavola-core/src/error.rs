//! # Error Types
//!
//! Domain-specific error types for the billing engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tavola-core errors (this file)                                        │
//! │  ├── BillingError     - Every failure an operation can report          │
//! │  └── ValidationError  - One violated field rule                        │
//! │                                                                         │
//! │  tavola-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, converted to BillingError   │
//! │                                                                         │
//! │  billing-api errors (in app)                                           │
//! │  └── ApiError         - HTTP status + JSON envelope                    │
//! │                                                                         │
//! │  Flow: ValidationError → BillingError → ApiError → Client              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers branch on the variant, never on the message text.

use thiserror::Error;

use crate::invoice::PaymentStatus;

// =============================================================================
// Billing Error
// =============================================================================

/// Errors raised by billing operations.
///
/// Every variant except [`BillingError::Internal`] is a client-visible
/// (4xx-equivalent) failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// A referenced entity (order, staff, customer, invoice, promotion) is missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The staff reference resolves to a user without a staff role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Field-level validation failed. Messages are joined into one string.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A second invoice for the same order, or a duplicate invoice number.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The invoice is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Paying an invoice that is already paid or cancelled
    /// - Cancelling twice, or cancelling a paid invoice
    /// - Updating, deleting or re-discounting a settled invoice
    #[error("Invoice {invoice_id} is {status}, cannot {action}")]
    InvalidStateTransition {
        invoice_id: String,
        status: PaymentStatus,
        action: String,
    },

    /// Points redemption exceeds the customer's balance.
    #[error("Customer has only {available} points, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    /// The promotion already reached its `max_uses`.
    #[error("Promotion {code} has reached its usage limit ({max_uses})")]
    PromotionLimitExceeded { code: String, max_uses: i64 },

    /// Unexpected persistence or infrastructure failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidStateTransition error.
    pub fn invalid_transition(
        invoice_id: impl Into<String>,
        status: PaymentStatus,
        action: impl Into<String>,
    ) -> Self {
        BillingError::InvalidStateTransition {
            invoice_id: invoice_id.into(),
            status,
            action: action.into(),
        }
    }

    /// Creates a Validation error from a list of field errors.
    pub fn from_field_errors(errors: &[ValidationError]) -> Self {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        BillingError::Validation(joined)
    }

    /// Machine-readable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::NotFound { .. } => "NOT_FOUND",
            BillingError::Forbidden(_) => "FORBIDDEN",
            BillingError::Validation(_) => "VALIDATION_ERROR",
            BillingError::Conflict(_) => "CONFLICT",
            BillingError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            BillingError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            BillingError::PromotionLimitExceeded { .. } => "PROMOTION_LIMIT_EXCEEDED",
            BillingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is the caller's (4xx) rather than the system's (5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, BillingError::Internal(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single violated field rule.
///
/// The invoice validator collects these into a list instead of failing on
/// the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Arithmetic on the value left the representable range.
    #[error("{field} is out of range")]
    OutOfRange { field: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn negative(field: &str) -> Self {
        ValidationError::Negative {
            field: field.to_string(),
        }
    }

    pub fn out_of_range(field: &str) -> Self {
        ValidationError::OutOfRange {
            field: field.to_string(),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with BillingError.
pub type BillingResult<T> = Result<T, BillingError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_message() {
        let err = BillingError::InsufficientBalance {
            available: 120,
            requested: 500,
        };
        assert_eq!(err.to_string(), "Customer has only 120 points, requested 500");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = BillingError::invalid_transition("inv-1", PaymentStatus::Paid, "cancel");
        assert_eq!(err.to_string(), "Invoice inv-1 is paid, cannot cancel");
        assert_eq!(err.code(), "INVALID_STATE_TRANSITION");
    }

    #[test]
    fn test_field_errors_are_joined() {
        let err = BillingError::from_field_errors(&[
            ValidationError::required("invoice_number"),
            ValidationError::negative("subtotal"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: invoice_number is required, subtotal must not be negative"
        );
    }

    #[test]
    fn test_only_internal_is_server_error() {
        assert!(!BillingError::Internal("disk full".into()).is_client_error());
        assert!(BillingError::not_found("Order", "o-1").is_client_error());
        assert!(BillingError::Conflict("dup".into()).is_client_error());
    }
}
