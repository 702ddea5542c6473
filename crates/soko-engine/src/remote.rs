//! # Remote Ledger
//!
//! The single logical remote operation the engine depends on: submit a
//! committed sale, receive an acknowledgment. Anything other than an ack is
//! a retry-later failure.
//!
//! ## Idempotency Contract
//! A sweep can be interrupted after the remote accepted a sale but before
//! the local outbox entry was deleted; the sale is then re-delivered on the
//! next sweep. Implementations MUST therefore deduplicate on `sale.id`
//! (accept and re-acknowledge a sale they already hold).

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

use soko_core::SaleRecord;

// =============================================================================
// Errors
// =============================================================================

/// A failed remote submission.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network-level failure; worth retrying.
    #[error("Remote unreachable: {0}")]
    Unreachable(String),

    /// One delivery attempt exceeded its bounded timeout.
    #[error("Delivery timed out after {0} seconds")]
    Timeout(u64),

    /// The remote refused the sale; retrying the same payload is pointless
    /// within this sweep, but the entry stays queued for a later one.
    #[error("Remote rejected sale {sale_id}: {reason}")]
    Rejected { sale_id: String, reason: String },
}

impl RemoteError {
    /// True if the failure is transient and worth retrying within a sweep.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Unreachable(_) | RemoteError::Timeout(_))
    }
}

// =============================================================================
// Trait
// =============================================================================

/// The remote ledger the engine appends committed sales to.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
    /// Submits one sale. `Ok(())` means acknowledged receipt; the caller
    /// may then flip the sale's `synced` flag and drop any outbox entry.
    async fn submit(&self, record: &SaleRecord) -> Result<(), RemoteError>;
}

// =============================================================================
// In-Memory Ledger (tests, local development)
// =============================================================================

/// A remote ledger living in process memory. Honors the idempotency
/// contract and can be flipped unreachable to exercise offline paths.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    accepted_ids: HashSet<String>,
    accepted_order: Vec<String>,
    reachable: bool,
    submissions: u64,
}

impl InMemoryLedger {
    /// A reachable, empty ledger.
    pub fn new() -> Self {
        InMemoryLedger {
            inner: Mutex::new(InMemoryState {
                reachable: true,
                ..Default::default()
            }),
        }
    }

    /// Simulates the remote endpoint dropping off the network.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().expect("ledger mutex poisoned").reachable = reachable;
    }

    /// Sale ids accepted so far, in arrival order (duplicates collapsed).
    pub fn accepted(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("ledger mutex poisoned")
            .accepted_order
            .clone()
    }

    /// Total submit calls, including duplicates and failures.
    pub fn submissions(&self) -> u64 {
        self.inner.lock().expect("ledger mutex poisoned").submissions
    }
}

#[async_trait]
impl RemoteLedger for InMemoryLedger {
    async fn submit(&self, record: &SaleRecord) -> Result<(), RemoteError> {
        let mut state = self.inner.lock().expect("ledger mutex poisoned");
        state.submissions += 1;

        if !state.reachable {
            return Err(RemoteError::Unreachable("simulated outage".to_string()));
        }

        // Idempotent on sale id: a re-delivered sale is re-acknowledged.
        if state.accepted_ids.insert(record.sale.id.clone()) {
            state.accepted_order.push(record.sale.id.clone());
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
