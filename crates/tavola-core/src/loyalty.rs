//! # Loyalty Points
//!
//! Pure arithmetic of the points ledger. Balance mutations live behind the
//! [`PointsLedger`](crate::ports::PointsLedger) port.
//!
//! ## Policy
//! ```text
//! earned  = floor(total / 10,000 currency units)     (fixed rate)
//! redeem  = allowed while 0 < requested <= balance
//!           trivially valid when requested <= 0
//! ```

use crate::error::{BillingError, BillingResult};
use crate::money::Money;
use crate::POINTS_EARN_UNIT_CENTS;

/// Points earned for a paid total. Zero for missing or non-positive totals.
///
/// ## Example
/// ```rust
/// use tavola_core::loyalty::points_earned;
/// use tavola_core::money::Money;
///
/// assert_eq!(points_earned(Some(Money::from_major(550_000))), 55);
/// assert_eq!(points_earned(Some(Money::from_major(9_999))), 0);
/// assert_eq!(points_earned(None), 0);
/// ```
pub fn points_earned(total: Option<Money>) -> i64 {
    match total {
        Some(total) if total.is_positive() => total.cents() / POINTS_EARN_UNIT_CENTS,
        _ => 0,
    }
}

/// Checks a redemption request against a known balance.
pub fn check_redemption(balance: i64, requested: i64) -> BillingResult<()> {
    if requested <= 0 || balance >= requested {
        return Ok(());
    }
    Err(BillingError::InsufficientBalance {
        available: balance,
        requested,
    })
}

/// Whether an award/redeem call would actually move points.
///
/// Mirrors the ledger's no-op rule: a customer id and a positive amount.
pub fn is_movement(customer_id: &str, points: i64) -> bool {
    !customer_id.trim().is_empty() && points > 0
}

// =============================================================================
// Unit Tests
// =============================================================================
