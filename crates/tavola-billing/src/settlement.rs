//! # Settlement Outcome
//!
//! Paying an invoice has one primary effect (the status flip) and up to two
//! secondary ones (awarding earned points, redeeming used points). The
//! secondary effects are best-effort: they never undo the payment, and
//! their failures are reported here instead of being swallowed.
//!
//! ```text
//! mark_as_paid ──► Settlement
//!                  ├── invoice            (status = paid)
//!                  └── soft_failures[]
//!                       ├── { effect: award_points,  customer_id, points, message }
//!                       └── { effect: redeem_points, customer_id, points, message }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use tavola_core::Invoice;

/// A secondary effect of settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    AwardPoints,
    RedeemPoints,
}

/// A secondary effect that failed after the invoice was already paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SoftFailure {
    pub effect: SideEffect,
    pub customer_id: String,
    pub points: i64,
    pub message: String,
}

/// Result of a successful payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub invoice: Invoice,
    #[serde(default)]
    pub soft_failures: Vec<SoftFailure>,
}

impl Settlement {
    /// Whether every side effect went through.
    pub fn is_clean(&self) -> bool {
        self.soft_failures.is_empty()
    }

    /// The failure for one effect, if any.
    pub fn failure(&self, effect: SideEffect) -> Option<&SoftFailure> {
        self.soft_failures.iter().find(|f| f.effect == effect)
    }
}
