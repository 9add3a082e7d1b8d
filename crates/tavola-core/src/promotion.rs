//! # Promotions
//!
//! Discount rules and their evaluation against an order amount.
//!
//! ## Evaluation Order
//! ```text
//! evaluate(order_amount, now)
//!      │
//!      ├── is_active == false?          → Validation
//!      ├── now outside [start, end]?    → Validation
//!      ├── order_amount < min_order?    → Validation
//!      ├── max_uses reached?            → PromotionLimitExceeded
//!      │
//!      ▼
//!   discount = percentage(order) | fixed
//!            capped by max_discount, then by the order amount
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{BillingError, BillingResult};
use crate::money::Money;
use crate::UNLIMITED_USES;

/// How `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` is in basis points (1000 = 10%).
    Percentage,
    /// `discount_value` is an amount in hundredths.
    Fixed,
}

/// A discount rule with a validity window and a usage cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Promotion {
    pub id: String,
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_cents: i64,
    pub max_discount_cents: Option<i64>,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// `-1` means unlimited.
    pub max_uses: i64,
    pub current_uses: i64,
}

/// Outcome of a successful promotion validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionQuote {
    pub discount_amount: Money,
    pub promotion: Promotion,
}

impl Promotion {
    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.max_uses == UNLIMITED_USES
    }

    /// Whether another use would exceed `max_uses`.
    pub fn is_exhausted(&self) -> bool {
        !self.is_unlimited() && self.current_uses >= self.max_uses
    }

    /// Whether `now` falls inside the validity window (inclusive).
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Raw discount for an amount, before the order-amount cap.
    fn raw_discount(&self, order_amount: Money) -> Money {
        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let bps = self.discount_value.clamp(0, 10_000) as u32;
                order_amount.percentage(bps)
            }
            DiscountType::Fixed => Money::from_cents(self.discount_value.max(0)),
        };

        match self.max_discount_cents {
            Some(cap) => discount.min(Money::from_cents(cap.max(0))),
            None => discount,
        }
    }

    /// Validates the promotion for an order amount and returns its discount.
    pub fn evaluate(&self, order_amount: Money, now: DateTime<Utc>) -> BillingResult<Money> {
        if !self.is_active {
            return Err(BillingError::Validation(format!(
                "Promotion {} is not active",
                self.code
            )));
        }

        if !self.is_within_window(now) {
            return Err(BillingError::Validation(format!(
                "Promotion {} is not valid at this time",
                self.code
            )));
        }

        if order_amount.cents() < self.min_order_cents {
            return Err(BillingError::Validation(format!(
                "Order amount {} is below the minimum {} for promotion {}",
                order_amount,
                Money::from_cents(self.min_order_cents),
                self.code
            )));
        }

        if self.is_exhausted() {
            return Err(BillingError::PromotionLimitExceeded {
                code: self.code.clone(),
                max_uses: self.max_uses,
            });
        }

        Ok(self.raw_discount(order_amount).min(order_amount).max(Money::zero()))
    }

    /// [`evaluate`](Self::evaluate) packaged as a quote.
    pub fn quote(&self, order_amount: Money, now: DateTime<Utc>) -> BillingResult<PromotionQuote> {
        let discount_amount = self.evaluate(order_amount, now)?;
        Ok(PromotionQuote {
            discount_amount,
            promotion: self.clone(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
