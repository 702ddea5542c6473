//! # Working-Cart Store
//!
//! Durable snapshot of the in-progress cart. Rewritten wholesale
//! (clear-then-rewrite, one transaction) on every cart mutation so a crash
//! or restart rehydrates the cart exactly as the operator left it.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use soko_core::CartLine;

/// Store for the working-cart snapshot.
#[derive(Debug, Clone)]
pub struct CartStore {
    pool: SqlitePool,
}

impl CartStore {
    /// Creates a new CartStore.
    pub fn new(pool: SqlitePool) -> Self {
        CartStore { pool }
    }

    /// Replaces the stored snapshot with the current cart.
    ///
    /// Clear-then-rewrite inside one transaction: a reader never sees a
    /// half-written cart, and an empty `lines` slice clears the snapshot.
    pub async fn save(&self, lines: &[CartLine]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM working_cart")
            .execute(&mut *tx)
            .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO working_cart (
                    position, product_id, name, quantity,
                    unit_price_cents, pricing_mode, unit_cost_cents, kind
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.pricing_mode)
            .bind(line.unit_cost_cents)
            .bind(line.kind)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(lines = lines.len(), "Working cart persisted");
        Ok(())
    }

    /// Loads the stored snapshot, in cart order.
    pub async fn load(&self) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT product_id, name, quantity, unit_price_cents,
                   pricing_mode, unit_cost_cents, kind
            FROM working_cart
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Drops the snapshot (after a successful commit).
    pub async fn clear(&self) -> DbResult<()> {
        sqlx::query("DELETE FROM working_cart")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
