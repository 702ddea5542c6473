//! # soko-engine: Transaction & Reconciliation Engine
//!
//! The orchestration crate of Soko POS: everything between the presentation
//! layer and the stores.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Soko POS Data Flow                               │
//! │                                                                         │
//! │  Presentation layer (external)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ★ soko-engine (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  quote ──► Engine facade ──► commit_sale ──► one SQLite tx      │   │
//! │  │                │                  │                             │   │
//! │  │                │                  ├── online → RemoteLedger     │   │
//! │  │                │                  └── offline → sale_outbox     │   │
//! │  │                │                                  │             │   │
//! │  │           ShiftLedger                        SyncAgent          │   │
//! │  │           (Z-report)                   (offline→online sweep)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  soko-db (repositories, outbox, cart store) ──► SQLite                 │
//! │  soko-core (pure pricing / loyalty / reconciliation math)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The [`Engine`] facade the presentation layer drives
//! - [`cart`] - In-memory working cart (mirrored into the durable store)
//! - [`checkout`] - The sale commit pipeline (one transaction per commit)
//! - [`shift`] - Shift state machine and cash-drawer reconciliation
//! - [`sync`] - Outbox sweep + background sync agent
//! - [`connectivity`] - Online/offline watch channel
//! - [`remote`] - The injected remote ledger contract
//! - [`settings`] - TOML configuration with defaults
//! - [`error`] - Engine error taxonomy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod remote;
pub mod settings;
pub mod shift;
pub mod sync;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::Cart;
pub use checkout::{commit_sale, CommitRequest, CommittedSale, Tender};
pub use connectivity::ConnectivityMonitor;
pub use engine::Engine;
pub use error::{EngineError, EngineResult, SyncError};
pub use remote::{InMemoryLedger, RemoteError, RemoteLedger};
pub use settings::Settings;
pub use shift::ShiftLedger;
pub use sync::{sweep_outbox, SyncAgent, SyncAgentHandle, SyncReport};
