//! # Engine Facade
//!
//! The single object the presentation layer talks to.
//!
//! ## Surface
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Engine Facade                                    │
//! │                                                                         │
//! │  CART            add_product / set_quantity / remove_line / clear      │
//! │                  every mutation mirrors into the durable cart store    │
//! │  QUOTE           quote(discount) - live, pure, recomputed per edit     │
//! │  COMMIT          commit_sale(...) → CommittedSale                      │
//! │  SHIFT           start_shift / end_shift → ZReport / has_active_shift  │
//! │  SYNC            pending_sync_count / is_online / attempt_sync /       │
//! │                  spawn_sync_agent                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-operator, single-device model: mutating calls are issued serially
//! by one UI thread. The cart mutex exists so the facade is `Send + Sync`
//! for the async runtime, not because concurrent writers are expected.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use soko_core::{cart_totals, CartLine, CartTotals, Discount, Money, Operator, Shift, ZReport};
use soko_db::Database;

use crate::cart::Cart;
use crate::checkout::{self, CommitRequest, CommittedSale, Tender};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{EngineError, EngineResult, SyncError};
use crate::remote::RemoteLedger;
use crate::settings::Settings;
use crate::shift::ShiftLedger;
use crate::sync::{sweep_outbox, SyncAgent, SyncAgentHandle, SyncReport};

/// The transaction & reconciliation engine.
pub struct Engine {
    db: Database,
    settings: Settings,
    connectivity: ConnectivityMonitor,
    remote: Arc<dyn RemoteLedger>,
    shifts: ShiftLedger,
    cart: Mutex<Cart>,
}

impl Engine {
    /// Builds the engine, rehydrating the working cart a previous run left
    /// in the durable store.
    pub async fn new(
        db: Database,
        settings: Settings,
        connectivity: ConnectivityMonitor,
        remote: Arc<dyn RemoteLedger>,
    ) -> EngineResult<Self> {
        let lines = db.cart().load().await?;
        if !lines.is_empty() {
            info!(lines = lines.len(), "Working cart rehydrated");
        }

        Ok(Engine {
            shifts: ShiftLedger::new(db.clone()),
            cart: Mutex::new(Cart::from_lines(lines)),
            db,
            settings,
            connectivity,
            remote,
        })
    }

    /// The engine's configuration.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The connectivity monitor (feed OS network probe events in here).
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Adds a product to the cart (merging quantities for a repeated
    /// product) and persists the snapshot.
    pub async fn add_product(&self, product_id: &str, quantity: i64) -> EngineResult<()> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;

        let mut cart = self.cart.lock().await;
        cart.add_product(&product, quantity)?;
        self.persist_cart(&cart).await;
        Ok(())
    }

    /// Sets a line's quantity (zero removes it) and persists the snapshot.
    pub async fn set_quantity(&self, product_id: &str, quantity: i64) -> EngineResult<()> {
        let mut cart = self.cart.lock().await;
        cart.set_quantity(product_id, quantity)?;
        self.persist_cart(&cart).await;
        Ok(())
    }

    /// Removes a line and persists the snapshot.
    pub async fn remove_line(&self, product_id: &str) -> EngineResult<()> {
        let mut cart = self.cart.lock().await;
        cart.remove_line(product_id)?;
        self.persist_cart(&cart).await;
        Ok(())
    }

    /// Empties the cart and persists the (now empty) snapshot.
    pub async fn clear_cart(&self) {
        let mut cart = self.cart.lock().await;
        cart.clear();
        self.persist_cart(&cart).await;
    }

    /// The current cart lines, in the order they were added.
    pub async fn cart_lines(&self) -> Vec<CartLine> {
        self.cart.lock().await.snapshot()
    }

    /// Mirrors the cart into the durable store. A store failure degrades
    /// to in-memory only: logged here, retried on the next mutation.
    async fn persist_cart(&self, cart: &Cart) {
        if let Err(e) = self.db.cart().save(cart.lines()).await {
            warn!(error = %e, "Working-cart save failed; will retry on next mutation");
        }
    }

    // -------------------------------------------------------------------------
    // Quote & commit
    // -------------------------------------------------------------------------

    /// Live totals for the current cart under the given discount. Pure and
    /// deterministic - the UI calls this on every edit.
    pub async fn quote(&self, discount: Option<Discount>) -> CartTotals {
        let cart = self.cart.lock().await;
        cart_totals(cart.lines(), discount, self.settings.vat_rate())
    }

    /// Commits the current cart as a sale. On success the cart is consumed:
    /// cleared in memory and in the durable store.
    pub async fn commit_sale(
        &self,
        operator: &Operator,
        customer_id: &str,
        discount: Option<Discount>,
        tenders: Vec<Tender>,
    ) -> EngineResult<CommittedSale> {
        let mut cart = self.cart.lock().await;

        let request = CommitRequest {
            lines: cart.snapshot(),
            customer_id: customer_id.to_string(),
            discount,
            tenders,
        };

        let committed = checkout::commit_sale(
            &self.db,
            &self.settings,
            &self.connectivity,
            &self.remote,
            operator,
            request,
        )
        .await?;

        cart.clear();
        self.persist_cart(&cart).await;

        Ok(committed)
    }

    // -------------------------------------------------------------------------
    // Shifts
    // -------------------------------------------------------------------------

    /// Opens a shift for the operator with the given drawer float.
    pub async fn start_shift(
        &self,
        operator: &Operator,
        starting_float: Money,
    ) -> EngineResult<Shift> {
        self.shifts
            .start(
                operator,
                starting_float,
                &self.settings.documents.shift_prefix,
            )
            .await
    }

    /// Closes the operator's active shift and returns the Z-report.
    pub async fn end_shift(
        &self,
        operator: &Operator,
        counted_cash: Money,
    ) -> EngineResult<ZReport> {
        self.shifts.close(operator, counted_cash).await
    }

    /// True while the operator has an open shift (callers gate logout on
    /// this).
    pub async fn has_active_shift(&self, operator_id: &str) -> EngineResult<bool> {
        self.shifts.has_active(operator_id).await
    }

    // -------------------------------------------------------------------------
    // Sync
    // -------------------------------------------------------------------------

    /// Number of sales waiting for remote acknowledgment (the UI badge).
    pub async fn pending_sync_count(&self) -> EngineResult<i64> {
        Ok(self.db.outbox().count_pending().await?)
    }

    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Runs one outbox sweep on the caller's task (manual "sync now").
    /// The background agent normally does this on online transitions.
    pub async fn attempt_sync(&self) -> Result<SyncReport, SyncError> {
        sweep_outbox(&self.db, self.remote.as_ref(), &self.settings.sync).await
    }

    /// Spawns the background sync agent and returns its shutdown handle.
    pub fn spawn_sync_agent(&self) -> SyncAgentHandle {
        let (agent, handle) = SyncAgent::new(
            self.db.clone(),
            Arc::clone(&self.remote),
            self.settings.sync,
            &self.connectivity,
        );
        tokio::spawn(agent.run());
        handle
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
