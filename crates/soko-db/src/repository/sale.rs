//! # Sale Repository
//!
//! Database operations for sales, sale lines and payments.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. COMMIT (one transaction, driven by the pipeline)                   │
//! │     └── insert_sale_tx() + insert_line_tx()× + insert_payment_tx()×    │
//! │         (+ stock decrement, loyalty adjustment, outbox enqueue)        │
//! │                                                                         │
//! │  2. SYNC                                                               │
//! │     └── mark_synced() once the remote ledger acknowledges              │
//! │                                                                         │
//! │  Sales are never updated otherwise and never deleted.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use soko_core::{Payment, Sale, SaleLine, SaleRecord};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, invoice_number, shift_id, cashier_id, customer_id,
                   subtotal_cents, discount_cents, tax_cents, total_cents,
                   change_cents, points_earned, points_redeemed, synced,
                   created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all lines for a sale, insertion order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot, quantity,
                   unit_price_cents, unit_cost_cents, pricing_mode, kind,
                   created_at
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets all payments for a sale, insertion order.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, sale_id, method, amount_cents, tendered_cents,
                   change_cents, reference, created_at
            FROM payments
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Loads the full composed record for a sale.
    pub async fn get_record(&self, sale_id: &str) -> DbResult<Option<SaleRecord>> {
        let Some(sale) = self.get_by_id(sale_id).await? else {
            return Ok(None);
        };

        let lines = self.get_lines(sale_id).await?;
        let payments = self.get_payments(sale_id).await?;

        Ok(Some(SaleRecord {
            sale,
            lines,
            payments,
        }))
    }

    /// Loads the full records of every sale attached to a shift, in
    /// commit order. This is what the shift close folds over.
    pub async fn records_for_shift(&self, shift_id: &str) -> DbResult<Vec<SaleRecord>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, invoice_number, shift_id, cashier_id, customer_id,
                   subtotal_cents, discount_cents, tax_cents, total_cents,
                   change_cents, points_earned, points_redeemed, synced,
                   created_at
            FROM sales
            WHERE shift_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(sales.len());
        for sale in sales {
            let lines = self.get_lines(&sale.id).await?;
            let payments = self.get_payments(&sale.id).await?;
            records.push(SaleRecord {
                sale,
                lines,
                payments,
            });
        }

        Ok(records)
    }

    /// Counts sales attached to a shift.
    pub async fn count_for_shift(&self, shift_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE shift_id = ?1")
            .bind(shift_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Flips the `synced` flag after a remote acknowledgment. The only
    /// post-commit mutation a sale ever sees.
    pub async fn mark_synced(&self, sale_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET synced = 1 WHERE id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        debug!(sale_id = %sale_id, "Sale marked synced");
        Ok(())
    }
}

// =============================================================================
// Transaction-scoped inserts (used by the commit pipeline)
// =============================================================================

/// Inserts a sale row inside the caller's transaction.
pub async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, invoice_number, shift_id, cashier_id, customer_id,
            subtotal_cents, discount_cents, tax_cents, total_cents,
            change_cents, points_earned, points_redeemed, synced, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.invoice_number)
    .bind(&sale.shift_id)
    .bind(&sale.cashier_id)
    .bind(&sale.customer_id)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.change_cents)
    .bind(sale.points_earned)
    .bind(sale.points_redeemed)
    .bind(sale.synced)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a sale line inside the caller's transaction.
///
/// ## Snapshot Pattern
/// Product details (name, price, cost) are copied onto the line, preserving
/// sale history even if the product changes later.
pub async fn insert_line_tx(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_lines (
            id, sale_id, product_id, name_snapshot, quantity,
            unit_price_cents, unit_cost_cents, pricing_mode, kind, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.product_id)
    .bind(&line.name_snapshot)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.unit_cost_cents)
    .bind(line.pricing_mode)
    .bind(line.kind)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a payment inside the caller's transaction.
pub async fn insert_payment_tx(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, sale_id, method, amount_cents, tendered_cents,
            change_cents, reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.method)
    .bind(payment.amount_cents)
    .bind(payment.tendered_cents)
    .bind(payment.change_cents)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Generates a new sale line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}
