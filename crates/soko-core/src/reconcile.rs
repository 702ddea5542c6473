//! # Drawer Reconciliation
//!
//! Pure math behind the Z-report produced when a shift closes.
//!
//! ## The Cash Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  expected_cash = starting_float + cash_tendered - change_given          │
//! │                                                                         │
//! │  cash_tendered is the RAW cash customers handed over, BEFORE netting   │
//! │  out change. Because payments store tendered and change separately,    │
//! │  the equivalent identity over net amounts also holds:                  │
//! │                                                                         │
//! │  expected_cash = starting_float + Σ cash_payment.amount                 │
//! │                                                                         │
//! │  (amount = tendered - change). Change is subtracted exactly once.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A non-zero variance is a reported figure, not an error: the shift closes
//! either way and the Z-report carries the signed difference.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{PaymentMethod, SaleRecord};

// =============================================================================
// Drawer Totals
// =============================================================================

/// Aggregate figures over every sale attached to a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DrawerTotals {
    /// Net amount applied to sales, grouped by payment method.
    pub payment_totals: BTreeMap<PaymentMethod, Money>,

    /// Raw cash handed over by customers, before change.
    pub cash_tendered: Money,

    /// Change handed back to customers.
    pub change_given: Money,

    /// Σ sale totals.
    pub gross_sales: Money,

    /// Σ line revenue minus line cost, at listed prices.
    pub gross_profit: Money,

    pub sale_count: u32,
}

impl DrawerTotals {
    /// Folds the attached sales of a shift into drawer totals.
    pub fn accumulate(sales: &[SaleRecord]) -> Self {
        let mut totals = DrawerTotals::default();

        for record in sales {
            totals.sale_count += 1;
            totals.gross_sales += record.sale.total();
            totals.change_given += record.sale.change();

            for line in &record.lines {
                totals.gross_profit += line.gross_profit();
            }

            for payment in &record.payments {
                *totals
                    .payment_totals
                    .entry(payment.method)
                    .or_insert_with(Money::zero) += payment.amount();

                if payment.method == PaymentMethod::Cash {
                    totals.cash_tendered +=
                        Money::from_cents(payment.tendered_cents.unwrap_or(payment.amount_cents));
                }
            }
        }

        totals
    }

    /// Net total for one method (zero when the method never appeared).
    pub fn for_method(&self, method: PaymentMethod) -> Money {
        self.payment_totals
            .get(&method)
            .copied()
            .unwrap_or_else(Money::zero)
    }
}

/// What the drawer should hold at close.
pub fn expected_cash(starting_float: Money, totals: &DrawerTotals) -> Money {
    starting_float + totals.cash_tendered - totals.change_given
}

// =============================================================================
// Z-Report
// =============================================================================

/// The final, immutable reconciliation report for a closed shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZReport {
    pub shift_id: String,
    pub shift_number: String,
    pub operator_id: String,
    pub operator_name: String,

    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,

    pub starting_float: Money,
    pub sale_count: u32,
    pub gross_sales: Money,
    pub gross_profit: Money,

    /// Net amounts per payment method.
    pub payment_totals: BTreeMap<PaymentMethod, Money>,

    pub cash_tendered: Money,
    pub change_given: Money,

    pub expected_cash: Money,
    pub counted_cash: Money,

    /// counted - expected, signed. Zero means the drawer balanced.
    pub variance: Money,
}

impl ZReport {
    /// True when the drawer balanced to the cent.
    pub fn is_balanced(&self) -> bool {
        self.variance.is_zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
