//! # Shift Ledger
//!
//! The operator's working-period state machine and the Z-report it produces.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shift Lifecycle                                    │
//! │                                                                         │
//! │   no-shift ──start(float)──► active ──close(counted)──► closed         │
//! │                                │ ▲                      (terminal)      │
//! │                                ▼ │                                      │
//! │                          commit_sale attaches                           │
//! │                          sales while active                             │
//! │                                                                         │
//! │  • start rejects while the operator already has an active shift        │
//! │  • close with no active shift rejects                                  │
//! │  • a closed shift is never reopened; the close UPDATE is guarded       │
//! │    by status = 'active' in SQL                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Closing folds every attached sale into [`DrawerTotals`] and derives
//! `expected_cash = starting_float + cash_tendered - change_given` from the
//! RAW tendered figures. A non-zero variance is reported on the Z-report,
//! not raised - the shift closes either way.

use chrono::Utc;
use tracing::{info, warn};

use soko_core::validation::validate_float_cents;
use soko_core::{expected_cash, DrawerTotals, Money, Operator, Shift, ZReport};
use soko_db::{Database, DbError};

use crate::error::{EngineError, EngineResult};

/// Owns the shift state machine and drawer reconciliation at close.
#[derive(Debug, Clone)]
pub struct ShiftLedger {
    db: Database,
}

impl ShiftLedger {
    /// Creates a new ShiftLedger.
    pub fn new(db: Database) -> Self {
        ShiftLedger { db }
    }

    /// Opens a shift: `no-shift → active`.
    ///
    /// One active shift per operator; a second `start` while active fails
    /// with [`EngineError::ShiftAlreadyActive`].
    pub async fn start(
        &self,
        operator: &Operator,
        starting_float: Money,
        number_prefix: &str,
    ) -> EngineResult<Shift> {
        validate_float_cents(starting_float.cents())?;

        let shift = self
            .db
            .shifts()
            .open(operator, starting_float, number_prefix)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => {
                    EngineError::ShiftAlreadyActive(operator.id.clone())
                }
                other => EngineError::Persistence(other),
            })?;

        Ok(shift)
    }

    /// True while the operator has an open shift. Callers gate logout on
    /// this.
    pub async fn has_active(&self, operator_id: &str) -> EngineResult<bool> {
        Ok(self
            .db
            .shifts()
            .active_for_operator(operator_id)
            .await?
            .is_some())
    }

    /// The operator's active shift, if any.
    pub async fn active(&self, operator_id: &str) -> EngineResult<Option<Shift>> {
        Ok(self.db.shifts().active_for_operator(operator_id).await?)
    }

    /// Closes the operator's active shift: `active → closed` (terminal).
    ///
    /// Folds the attached sales into drawer totals, derives the expected
    /// cash, and finalizes the shift row. The returned Z-report is the
    /// shift's final, immutable account.
    pub async fn close(&self, operator: &Operator, counted_cash: Money) -> EngineResult<ZReport> {
        let shift = self
            .db
            .shifts()
            .active_for_operator(&operator.id)
            .await?
            .ok_or(EngineError::NoActiveShift)?;

        let records = self.db.sales().records_for_shift(&shift.id).await?;
        let totals = DrawerTotals::accumulate(&records);

        let expected = expected_cash(shift.starting_float(), &totals);
        let variance = counted_cash - expected;
        let closed_at = Utc::now();

        let payment_totals_json =
            serde_json::to_string(&totals.payment_totals).map_err(DbError::from)?;

        self.db
            .shifts()
            .close(
                &shift.id,
                closed_at,
                expected,
                counted_cash,
                variance,
                &payment_totals_json,
            )
            .await?;

        if variance.is_zero() {
            info!(
                shift_id = %shift.id,
                number = %shift.number,
                sales = totals.sale_count,
                expected = %expected,
                "Shift closed; drawer balanced"
            );
        } else {
            // Reported, not raised: the operator sees the signed figure.
            warn!(
                shift_id = %shift.id,
                number = %shift.number,
                sales = totals.sale_count,
                expected = %expected,
                counted = %counted_cash,
                variance = %variance,
                "Shift closed with cash variance"
            );
        }

        let starting_float = shift.starting_float();
        Ok(ZReport {
            shift_id: shift.id,
            shift_number: shift.number,
            operator_id: shift.operator_id,
            operator_name: shift.operator_name,
            opened_at: shift.opened_at,
            closed_at,
            starting_float,
            sale_count: totals.sale_count,
            gross_sales: totals.gross_sales,
            gross_profit: totals.gross_profit,
            payment_totals: totals.payment_totals,
            cash_tendered: totals.cash_tendered,
            change_given: totals.change_given,
            expected_cash: expected,
            counted_cash,
            variance,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use soko_db::DbConfig;
    use soko_core::Role;

    fn operator() -> Operator {
        Operator {
            id: "op-1".to_string(),
            name: "Amina".to_string(),
            role: Role::Cashier,
        }
    }

    async fn ledger() -> ShiftLedger {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        ShiftLedger::new(db)
    }

    #[tokio::test]
    async fn test_start_then_has_active() {
        let ledger = ledger().await;
        assert!(!ledger.has_active("op-1").await.unwrap());

        let shift = ledger
            .start(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();
        assert!(shift.is_active());
        assert!(ledger.has_active("op-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let ledger = ledger().await;
        ledger
            .start(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();

        let err = ledger
            .start(&operator(), Money::from_cents(100_000), "SHF-")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ShiftAlreadyActive(_)));
    }

    #[tokio::test]
    async fn test_close_without_shift_rejected() {
        let ledger = ledger().await;
        let err = ledger
            .close(&operator(), Money::from_cents(500_000))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoActiveShift));
    }

    #[tokio::test]
    async fn test_empty_shift_reconciles_to_float() {
        let ledger = ledger().await;
        ledger
            .start(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();

        let report = ledger
            .close(&operator(), Money::from_cents(500_000))
            .await
            .unwrap();

        assert_eq!(report.sale_count, 0);
        assert_eq!(report.expected_cash.cents(), 500_000);
        assert!(report.is_balanced());
        assert!(!ledger.has_active("op-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_negative_variance_still_closes() {
        let ledger = ledger().await;
        ledger
            .start(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();

        // Drawer is short by 25.00
        let report = ledger
            .close(&operator(), Money::from_cents(497_500))
            .await
            .unwrap();

        assert_eq!(report.variance.cents(), -2_500);
        assert!(!report.is_balanced());
        assert!(!ledger.has_active("op-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_negative_float_rejected() {
        let ledger = ledger().await;
        let err = ledger
            .start(&operator(), Money::from_cents(-1), "SHF-")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
