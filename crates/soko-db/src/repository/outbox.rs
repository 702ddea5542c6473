//! # Sale Outbox Repository
//!
//! The durable FIFO of sales committed while disconnected.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  OFFLINE COMMIT                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. INSERT INTO sales / sale_lines / payments ...               │   │
//! │  │  2. INSERT OR IGNORE INTO sale_outbox (sale_id, payload)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Sale and queue entry land together or not at all             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          SYNC AGENT (offline→online transition)                 │   │
//! │  │  1. SELECT * FROM sale_outbox ORDER BY rowid  (FIFO)            │   │
//! │  │  2. Deliver each to the remote ledger, sequentially             │   │
//! │  │  3. Ack: DELETE the row, flip sales.synced                      │   │
//! │  │  4. Failure: attempts += 1, last_error, row stays queued        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                        │
//! │  • The sale is never lost (it's in the local DB)                       │
//! │  • Enqueue is idempotent on sale id (INSERT OR IGNORE)                 │
//! │  • Interrupted sweep? Undeleted rows are simply retried later          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use soko_core::QueuedSale;

/// Repository for the offline sale outbox.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Queues a sale for later delivery (pool variant, used when an online
    /// push fails after the commit transaction already landed).
    ///
    /// Returns true if a row was inserted, false if the sale was already
    /// queued. Never overwrites an existing entry.
    pub async fn enqueue(&self, sale_id: &str, payload: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        enqueue_tx(&mut conn, sale_id, payload).await
    }

    /// Lists queued sales in original creation (insertion) order.
    pub async fn pending(&self) -> DbResult<Vec<QueuedSale>> {
        let entries = sqlx::query_as::<_, QueuedSale>(
            r#"
            SELECT sale_id, payload, attempts, last_error, created_at,
                   attempted_at
            FROM sale_outbox
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts queued sales (drives the UI pending badge).
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_outbox")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Removes an entry after the remote ledger acknowledged the sale.
    pub async fn delete(&self, sale_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM sale_outbox WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        debug!(sale_id = %sale_id, "Outbox entry delivered and removed");
        Ok(())
    }

    /// Records a failed delivery attempt; the entry stays queued.
    pub async fn mark_failed(&self, sale_id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sale_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE sale_id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Queues a sale inside the caller's transaction (the offline commit path).
///
/// `INSERT OR IGNORE` keyed on sale id: re-queueing the same sale is a
/// no-op, so an existing entry is never overwritten.
pub async fn enqueue_tx(
    conn: &mut SqliteConnection,
    sale_id: &str,
    payload: &str,
) -> DbResult<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO sale_outbox (sale_id, payload, attempts, created_at)
        VALUES (?1, ?2, 0, ?3)
        "#,
    )
    .bind(sale_id)
    .bind(payload)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        debug!(sale_id = %sale_id, "Sale queued for sync");
    }

    Ok(inserted)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_enqueue_is_idempotent_on_sale_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.outbox();

        assert!(outbox.enqueue("s1", "{\"v\":1}").await.unwrap());
        // Second enqueue with a different payload is ignored, not an error
        assert!(!outbox.enqueue("s1", "{\"v\":2}").await.unwrap());

        let pending = outbox.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, "{\"v\":1}");
    }

    #[tokio::test]
    async fn test_pending_preserves_fifo_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.outbox();

        for id in ["s1", "s2", "s3"] {
            outbox.enqueue(id, "{}").await.unwrap();
        }

        let ids: Vec<String> = outbox
            .pending()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.sale_id)
            .collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.outbox();

        outbox.enqueue("s1", "{}").await.unwrap();
        outbox.enqueue("s2", "{}").await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 2);

        outbox.delete("s1").await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_entry_queued() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.outbox();

        outbox.enqueue("s1", "{}").await.unwrap();
        outbox.mark_failed("s1", "connection refused").await.unwrap();

        let pending = outbox.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("connection refused"));
        assert!(pending[0].attempted_at.is_some());
    }
}
