//! # Shift Repository
//!
//! Persistence for the operator shift state machine:
//! `no-shift → active → closed` (terminal). State transitions are guarded
//! in SQL so a stale caller cannot reopen or double-close a shift.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::next_document_number;
use soko_core::{Money, Operator, Shift, ShiftStatus};

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a new shift for an operator.
    ///
    /// Rejects if the operator already has an active shift - one shift per
    /// operator is the unit of cash accountability.
    pub async fn open(
        &self,
        operator: &Operator,
        starting_float: Money,
        number_prefix: &str,
    ) -> DbResult<Shift> {
        if let Some(existing) = self.active_for_operator(&operator.id).await? {
            return Err(DbError::UniqueViolation {
                field: format!("active shift for operator (existing: {})", existing.id),
            });
        }

        let mut tx = self.pool.begin().await?;

        let seq = next_document_number(&mut tx, "shift").await?;
        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            number: format!("{number_prefix}{seq:06}"),
            operator_id: operator.id.clone(),
            operator_name: operator.name.clone(),
            starting_float_cents: starting_float.cents(),
            status: ShiftStatus::Active,
            opened_at: Utc::now(),
            closed_at: None,
            expected_cash_cents: None,
            counted_cash_cents: None,
            variance_cents: None,
            payment_totals_json: None,
        };

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, number, operator_id, operator_name, starting_float_cents,
                status, opened_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.number)
        .bind(&shift.operator_id)
        .bind(&shift.operator_name)
        .bind(shift.starting_float_cents)
        .bind(shift.status)
        .bind(shift.opened_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            shift_id = %shift.id,
            number = %shift.number,
            operator = %shift.operator_id,
            float = %starting_float,
            "Shift opened"
        );

        Ok(shift)
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, number, operator_id, operator_name,
                   starting_float_cents, status, opened_at, closed_at,
                   expected_cash_cents, counted_cash_cents, variance_cents,
                   payment_totals_json
            FROM shifts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Gets the active shift for an operator, if any.
    pub async fn active_for_operator(&self, operator_id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, number, operator_id, operator_name,
                   starting_float_cents, status, opened_at, closed_at,
                   expected_cash_cents, counted_cash_cents, variance_cents,
                   payment_totals_json
            FROM shifts
            WHERE operator_id = ?1 AND status = 'active'
            ORDER BY opened_at DESC
            LIMIT 1
            "#,
        )
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Gets the active shift on this terminal, if any. Single-terminal
    /// engine: at most one shift is ever active.
    pub async fn active(&self) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, number, operator_id, operator_name,
                   starting_float_cents, status, opened_at, closed_at,
                   expected_cash_cents, counted_cash_cents, variance_cents,
                   payment_totals_json
            FROM shifts
            WHERE status = 'active'
            ORDER BY opened_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Finalizes a shift. Guarded by `status = 'active'`: a closed shift
    /// stays closed, and closing twice is reported as not-found.
    #[allow(clippy::too_many_arguments)]
    pub async fn close(
        &self,
        shift_id: &str,
        closed_at: DateTime<Utc>,
        expected_cash: Money,
        counted_cash: Money,
        variance: Money,
        payment_totals_json: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                status = 'closed',
                closed_at = ?2,
                expected_cash_cents = ?3,
                counted_cash_cents = ?4,
                variance_cents = ?5,
                payment_totals_json = ?6
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(shift_id)
        .bind(closed_at)
        .bind(expected_cash.cents())
        .bind(counted_cash.cents())
        .bind(variance.cents())
        .bind(payment_totals_json)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shift (active)", shift_id));
        }

        debug!(shift_id = %shift_id, variance = %variance, "Shift closed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use soko_core::Role;

    fn operator() -> Operator {
        Operator {
            id: "op-1".to_string(),
            name: "Amina".to_string(),
            role: Role::Cashier,
        }
    }

    #[tokio::test]
    async fn test_open_and_query_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.shifts();

        let shift = repo
            .open(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();
        assert!(shift.is_active());
        assert_eq!(shift.number, "SHF-000001");

        let active = repo.active_for_operator("op-1").await.unwrap();
        assert_eq!(active.unwrap().id, shift.id);
    }

    #[tokio::test]
    async fn test_second_open_rejected_while_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.shifts();

        repo.open(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();

        let err = repo
            .open(&operator(), Money::from_cents(100_000), "SHF-")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.shifts();

        let shift = repo
            .open(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap();

        repo.close(
            &shift.id,
            Utc::now(),
            Money::from_cents(500_000),
            Money::from_cents(500_000),
            Money::zero(),
            "{}",
        )
        .await
        .unwrap();

        let closed = repo.get_by_id(&shift.id).await.unwrap().unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        assert_eq!(closed.variance_cents, Some(0));

        // Second close reports not-found (no active shift with this id)
        let err = repo
            .close(
                &shift.id,
                Utc::now(),
                Money::zero(),
                Money::zero(),
                Money::zero(),
                "{}",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
