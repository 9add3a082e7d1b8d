//! # Money Module
//!
//! The `Money` type and the totals calculator used by every invoice.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:   0.1 + 0.2 = 0.30000000000000004  ❌                     │
//! │                                                                         │
//! │  OUR SOLUTION: integer hundredths ("cents")                             │
//! │    round2(x) is exact because x is already a whole number of cents.    │
//! │    Tax is the only division, rounded half up once.                     │
//! │    Sums that leave the i64 range are reported, never wrapped.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tavola_core::money::Money;
//!
//! let subtotal = Money::from_major(500_000);
//! assert_eq!(subtotal.cents(), 50_000_000);
//! let total = subtotal + Money::from_cents(50);
//! assert_eq!(total.to_string(), "500000.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in hundredths of the currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate values may go negative before validation
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - No currency tag: the platform is single-currency
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from hundredths.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(12).cents(), 1200);
    /// ```
    #[inline]
    pub const fn from_major(units: i64) -> Self {
        Money(units.saturating_mul(100))
    }

    /// Returns the value in hundredths.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the hundredths portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Subtraction that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums an iterator, `None` as soon as the running total overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Calculates tax, rounding half up on the hundredths.
    ///
    /// ## Implementation
    /// Integer math: `(amount * ppm + 500_000) / 1_000_000`. The +500_000 is
    /// the half-unit that turns truncation into round-half-up for
    /// non-negative amounts, which is `round2(amount * rate / 100)`.
    /// `None` when the tax does not fit in an i64.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::money::Money;
    /// use tavola_core::types::TaxRate;
    ///
    /// let amount = Money::from_cents(1000);
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).unwrap().cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Option<Money> {
        self.scale(rate.ppm() as i128, PPM).map(Money)
    }

    /// Returns `bps / 10000` of the amount, rounded half up.
    ///
    /// Used for percentage promotions (1000 bps = 10%). Rates above 100%
    /// are capped at 100%, so the result always fits.
    pub fn percentage(&self, bps: u32) -> Money {
        let bps = bps.min(BPS as u32);
        Money(self.scale(bps as i128, BPS).unwrap_or(self.0))
    }

    fn scale(&self, numerator: i128, denominator: i128) -> Option<i64> {
        // i128 keeps large subtotals from overflowing
        let scaled = (self.0 as i128 * numerator + denominator / 2) / denominator;
        i64::try_from(scaled).ok()
    }
}

const BPS: i128 = 10_000;
const PPM: i128 = 1_000_000;

// =============================================================================
// Totals Calculator
// =============================================================================

/// The derived money fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

/// Computes tax, discount and final total from a subtotal.
///
/// ```text
/// tax   = round2(subtotal × taxRate / 100)
/// total = round2(subtotal + tax − discount)
/// ```
///
/// Pure. Non-negative inputs are the caller's responsibility; the invoice
/// validator rejects negative results separately.
///
/// ## Errors
/// `OutOfRange` when the tax or the total does not fit in an i64.
pub fn calculate_totals(
    subtotal: Money,
    tax_rate: TaxRate,
    discount_amount: Money,
) -> Result<Totals, ValidationError> {
    let tax = subtotal
        .calculate_tax(tax_rate)
        .ok_or_else(|| ValidationError::out_of_range("tax"))?;
    Ok(Totals {
        subtotal,
        tax,
        discount_amount,
        total_amount: total_with_tax(subtotal, tax, discount_amount)?,
    })
}

/// Recomputes the total for an explicit tax amount (no rate involved).
pub fn total_with_tax(
    subtotal: Money,
    tax: Money,
    discount_amount: Money,
) -> Result<Money, ValidationError> {
    subtotal
        .checked_add(tax)
        .and_then(|gross| gross.checked_sub(discount_amount))
        .ok_or_else(|| ValidationError::out_of_range("total_amount"))
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal rendering, e.g. `550000.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
