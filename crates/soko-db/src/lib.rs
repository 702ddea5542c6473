//! # soko-db: Database Layer for Soko POS
//!
//! This crate provides database access for the Soko POS engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Soko POS Data Flow                               │
//! │                                                                         │
//! │  Engine operation (commit_sale, end_shift, sync sweep)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     soko-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  product/sale │    │  (embedded)  │  │   │
//! │  │   │               │    │  customer     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  shift/outbox │    │ 001_init.sql │  │   │
//! │  │   │ WAL + FKs     │    │  cart store   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                     SQLite Database (soko.db)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use soko_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/soko.db")).await?;
//! let pending = db.outbox().count_pending().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cart::CartStore;
pub use repository::customer::CustomerRepository;
pub use repository::outbox::OutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::shift::ShiftRepository;
