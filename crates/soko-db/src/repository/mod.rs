//! # Repository Implementations
//!
//! One repository per aggregate, all sharing the same pool. Mutations that
//! must be atomic with the commit pipeline are exposed as `*_tx` free
//! functions taking a `&mut SqliteConnection`, so the engine can run them
//! inside one transaction.

pub mod cart;
pub mod customer;
pub mod outbox;
pub mod product;
pub mod sale;
pub mod shift;

use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Issues the next value of a named document counter, inside the caller's
/// transaction. Counters back human-readable invoice and shift numbers;
/// timestamps are not used as identifiers.
pub async fn next_document_number(conn: &mut SqliteConnection, counter: &str) -> DbResult<i64> {
    // The counter rows are seeded by the initial migration; keep this safe
    // against a missing row anyway.
    sqlx::query("INSERT OR IGNORE INTO document_counters (name, next_value) VALUES (?1, 1)")
        .bind(counter)
        .execute(&mut *conn)
        .await?;

    let value: i64 =
        sqlx::query_scalar("SELECT next_value FROM document_counters WHERE name = ?1")
            .bind(counter)
            .fetch_one(&mut *conn)
            .await?;

    sqlx::query("UPDATE document_counters SET next_value = next_value + 1 WHERE name = ?1")
        .bind(counter)
        .execute(&mut *conn)
        .await?;

    Ok(value)
}
