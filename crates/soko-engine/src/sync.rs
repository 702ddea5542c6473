//! # Sync Agent
//!
//! Delivers outboxed sales to the remote ledger when connectivity returns.
//!
//! ## Sweep Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Agent Flow                                   │
//! │                                                                         │
//! │  watch channel: offline ──────► online                                  │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        ONE SWEEP                                │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * FROM sale_outbox ORDER BY rowid   (FIFO)           │   │
//! │  │  2. For each entry, SEQUENTIALLY:                               │   │
//! │  │     ├── deliver to the remote ledger                            │   │
//! │  │     │   (bounded per-item timeout, bounded exponential          │   │
//! │  │     │    backoff; the remote dedups on sale id)                 │   │
//! │  │     ├── ack     → flip sales.synced, DELETE the row             │   │
//! │  │     └── failure → attempts += 1, last_error, row stays          │   │
//! │  │  3. Return { delivered, failed }                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  GUARANTEES:                                                            │
//! │  • Sequential, creation-order delivery (stable downstream chronology)  │
//! │  • Item failures are counted, never raised; only a dead local store    │
//! │    aborts a sweep                                                      │
//! │  • Interruptible mid-batch (shutdown, process death): undelivered      │
//! │    rows stay queued; a delivered-but-undeleted row is re-delivered     │
//! │    and re-acknowledged (remote is idempotent on sale id)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use soko_core::SaleRecord;
use soko_db::Database;

use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncError;
use crate::remote::{RemoteError, RemoteLedger};
use crate::settings::SyncSettings;

// =============================================================================
// Sweep Report
// =============================================================================

/// Outcome of one sweep over the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries acknowledged by the remote and removed from the queue.
    pub delivered: u32,
    /// Entries that stayed queued for a later sweep.
    pub failed: u32,
}

// =============================================================================
// Sweep
// =============================================================================

/// Sweeps the outbox once: sequential FIFO delivery of every queued sale.
///
/// Per-item delivery failures are recorded on the entry and counted; only
/// local store failures abort the sweep. Safe to cancel between items -
/// undeleted entries are simply retried on the next sweep.
pub async fn sweep_outbox(
    db: &Database,
    remote: &dyn RemoteLedger,
    settings: &SyncSettings,
) -> Result<SyncReport, SyncError> {
    let outbox = db.outbox();
    let entries = outbox.pending().await?;

    if entries.is_empty() {
        debug!("Outbox empty; nothing to sync");
        return Ok(SyncReport::default());
    }

    info!(count = entries.len(), "Sweeping sale outbox");
    let mut report = SyncReport::default();

    for entry in entries {
        let record: SaleRecord = match serde_json::from_str(&entry.payload) {
            Ok(record) => record,
            Err(e) => {
                // A payload that no longer parses cannot be delivered; keep
                // it queued and visible rather than dropping a sale.
                warn!(sale_id = %entry.sale_id, error = %e, "Corrupt outbox payload");
                outbox
                    .mark_failed(&entry.sale_id, &format!("corrupt payload: {e}"))
                    .await?;
                report.failed += 1;
                continue;
            }
        };

        match deliver(remote, &record, settings).await {
            Ok(()) => {
                // Flip the flag first: if the delete is interrupted, the
                // next sweep re-delivers and the remote re-acknowledges.
                db.sales().mark_synced(&entry.sale_id).await?;
                outbox.delete(&entry.sale_id).await?;
                report.delivered += 1;
            }
            Err(e) => {
                debug!(sale_id = %entry.sale_id, error = %e, "Delivery failed; entry stays queued");
                outbox.mark_failed(&entry.sale_id, &e.to_string()).await?;
                report.failed += 1;
            }
        }
    }

    info!(
        delivered = report.delivered,
        failed = report.failed,
        "Sweep complete"
    );

    Ok(report)
}

/// Delivers one sale: bounded per-attempt timeout, bounded exponential
/// backoff across attempts. Gives up (entry stays queued) once the backoff
/// budget for this sweep is spent or the remote rejects outright.
async fn deliver(
    remote: &dyn RemoteLedger,
    record: &SaleRecord,
    settings: &SyncSettings,
) -> Result<(), RemoteError> {
    let item_timeout = Duration::from_secs(settings.item_timeout_secs);
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(200))
        .with_max_elapsed_time(Some(Duration::from_secs(settings.max_retry_elapsed_secs)))
        .build();

    backoff::future::retry(policy, || async move {
        match tokio::time::timeout(item_timeout, remote.submit(record)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_retryable() => Err(backoff::Error::transient(e)),
            Ok(Err(e)) => Err(backoff::Error::permanent(e)),
            Err(_) => Err(backoff::Error::transient(RemoteError::Timeout(
                settings.item_timeout_secs,
            ))),
        }
    })
    .await
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Background task that sweeps the outbox on every offline→online
/// transition. Runs off the UI thread; spawn with [`SyncAgent::run`].
pub struct SyncAgent {
    db: Database,
    remote: Arc<dyn RemoteLedger>,
    settings: SyncSettings,

    /// Connectivity transitions from the monitor.
    connectivity_rx: watch::Receiver<bool>,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping the agent.
#[derive(Clone)]
pub struct SyncAgentHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SyncAgentHandle {
    /// Triggers graceful shutdown. A sweep in flight is cancelled between
    /// items; queued entries are untouched.
    pub async fn shutdown(&self) {
        // An already-stopped agent is fine.
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl SyncAgent {
    /// Creates a new agent subscribed to the connectivity monitor, and a
    /// handle for stopping it.
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteLedger>,
        settings: SyncSettings,
        connectivity: &ConnectivityMonitor,
    ) -> (Self, SyncAgentHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let agent = SyncAgent {
            db,
            remote,
            settings,
            connectivity_rx: connectivity.subscribe(),
            shutdown_rx,
        };

        (agent, SyncAgentHandle { shutdown_tx })
    }

    /// Runs the agent loop. Spawn this as a background task.
    pub async fn run(mut self) {
        info!("Sync agent starting");

        // Catch-up sweep: entries may be waiting from a previous run.
        let initially_online = *self.connectivity_rx.borrow_and_update();
        if initially_online && !self.sweep_or_shutdown().await {
            info!("Sync agent stopped");
            return;
        }

        loop {
            tokio::select! {
                changed = self.connectivity_rx.changed() => {
                    if changed.is_err() {
                        // Monitor dropped; nothing will ever wake us again.
                        break;
                    }
                    let online = *self.connectivity_rx.borrow_and_update();
                    if online && !self.sweep_or_shutdown().await {
                        break;
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    break;
                }
            }
        }

        info!("Sync agent stopped");
    }

    /// Runs one sweep, racing it against shutdown. Returns false when the
    /// agent should stop. Cancelling mid-sweep leaves undelivered entries
    /// queued for the next online transition.
    async fn sweep_or_shutdown(&mut self) -> bool {
        tokio::select! {
            result = sweep_outbox(&self.db, self.remote.as_ref(), &self.settings) => {
                if let Err(e) = result {
                    error!(error = %e, "Outbox sweep aborted");
                }
                true
            }

            _ = self.shutdown_rx.recv() => {
                info!("Sync agent shutting down mid-sweep");
                false
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use soko_core::{Money, Operator, Payment, PaymentMethod, Role, Sale, Shift};
    use soko_db::repository::sale as sale_repo;
    use soko_db::DbConfig;

    use crate::remote::InMemoryLedger;

    /// Fast-failing sweep settings so failure tests don't sit in backoff.
    fn fast_settings() -> SyncSettings {
        SyncSettings {
            item_timeout_secs: 1,
            max_retry_elapsed_secs: 0,
        }
    }

    fn operator() -> Operator {
        Operator {
            id: "op-1".to_string(),
            name: "Amina".to_string(),
            role: Role::Cashier,
        }
    }

    async fn open_shift(db: &Database) -> Shift {
        db.shifts()
            .open(&operator(), Money::from_cents(500_000), "SHF-")
            .await
            .unwrap()
    }

    /// Inserts a minimal unsynced sale and queues it, the way an offline
    /// commit does.
    async fn commit_offline(db: &Database, shift_id: &str, sale_id: &str, seq: i64) -> SaleRecord {
        let now = Utc::now();
        let sale = Sale {
            id: sale_id.to_string(),
            invoice_number: format!("INV-{seq:06}"),
            shift_id: shift_id.to_string(),
            cashier_id: "op-1".to_string(),
            customer_id: soko_core::WALK_IN_CUSTOMER_ID.to_string(),
            subtotal_cents: 10_000,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 10_000,
            change_cents: 0,
            points_earned: 0,
            points_redeemed: 0,
            synced: false,
            created_at: now,
        };
        let record = SaleRecord {
            sale,
            lines: vec![],
            payments: vec![Payment {
                id: format!("pay-{sale_id}"),
                sale_id: sale_id.to_string(),
                method: PaymentMethod::Cash,
                amount_cents: 10_000,
                tendered_cents: Some(10_000),
                change_cents: Some(0),
                reference: None,
                created_at: now,
            }],
        };

        let mut tx = db.pool().begin().await.unwrap();
        sale_repo::insert_sale_tx(&mut tx, &record.sale).await.unwrap();
        for payment in &record.payments {
            sale_repo::insert_payment_tx(&mut tx, payment).await.unwrap();
        }
        let payload = serde_json::to_string(&record).unwrap();
        soko_db::repository::outbox::enqueue_tx(&mut tx, sale_id, &payload)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        record
    }

    #[tokio::test]
    async fn test_sweep_delivers_in_fifo_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shift = open_shift(&db).await;

        commit_offline(&db, &shift.id, "s1", 1).await;
        commit_offline(&db, &shift.id, "s2", 2).await;
        commit_offline(&db, &shift.id, "s3", 3).await;

        let ledger = InMemoryLedger::new();
        let report = sweep_outbox(&db, &ledger, &fast_settings()).await.unwrap();

        assert_eq!(report, SyncReport { delivered: 3, failed: 0 });
        assert_eq!(ledger.accepted(), vec!["s1", "s2", "s3"]);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);

        let sale = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert!(sale.synced);
    }

    #[tokio::test]
    async fn test_failed_delivery_stays_queued() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shift = open_shift(&db).await;
        commit_offline(&db, &shift.id, "s1", 1).await;

        let ledger = InMemoryLedger::new();
        ledger.set_reachable(false);

        let report = sweep_outbox(&db, &ledger, &fast_settings()).await.unwrap();
        assert_eq!(report, SyncReport { delivered: 0, failed: 1 });

        let pending = db.outbox().pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].attempts >= 1);
        assert!(pending[0].last_error.is_some());

        // The sale itself is untouched
        let sale = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert!(!sale.synced);

        // Next sweep, remote back up: the entry finally delivers
        ledger.set_reachable(true);
        let report = sweep_outbox(&db, &ledger, &fast_settings()).await.unwrap();
        assert_eq!(report, SyncReport { delivered: 1, failed: 0 });
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shift = open_shift(&db).await;

        // s0 has a corrupt payload; s2 is fine
        db.outbox().enqueue("s0", "not json").await.unwrap();
        commit_offline(&db, &shift.id, "s2", 2).await;

        let ledger = InMemoryLedger::new();
        let report = sweep_outbox(&db, &ledger, &fast_settings()).await.unwrap();

        assert_eq!(report, SyncReport { delivered: 1, failed: 1 });
        assert_eq!(ledger.accepted(), vec!["s2"]);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_redelivery_after_interrupted_ack_is_deduped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shift = open_shift(&db).await;
        let record = commit_offline(&db, &shift.id, "s1", 1).await;

        // Simulate an interrupted previous sweep: the remote already holds
        // the sale but the local entry was never deleted.
        let ledger = InMemoryLedger::new();
        ledger.submit(&record).await.unwrap();

        let report = sweep_outbox(&db, &ledger, &fast_settings()).await.unwrap();
        assert_eq!(report, SyncReport { delivered: 1, failed: 0 });
        // Accepted once, not twice
        assert_eq!(ledger.accepted(), vec!["s1"]);
        assert_eq!(ledger.submissions(), 2);
    }

    #[tokio::test]
    async fn test_agent_sweeps_on_online_transition() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shift = open_shift(&db).await;
        commit_offline(&db, &shift.id, "s1", 1).await;

        let connectivity = ConnectivityMonitor::new(false);
        let remote: Arc<dyn RemoteLedger> = Arc::new(InMemoryLedger::new());
        let (agent, handle) = SyncAgent::new(
            db.clone(),
            Arc::clone(&remote),
            fast_settings(),
            &connectivity,
        );
        let task = tokio::spawn(agent.run());

        connectivity.set_online(true);

        // Wait for the sweep to drain the queue
        for _ in 0..100 {
            if db.outbox().count_pending().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);

        let sale = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert!(sale.synced);

        handle.shutdown().await;
        task.await.unwrap();
    }
}
