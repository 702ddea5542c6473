//! # Engine Error Types
//!
//! The taxonomy the presentation layer sees:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EngineError (commit/shift failures, surfaced to the operator)          │
//! │  ├── NoActiveShift / InsufficientPayment / InvalidDiscount / ...        │
//! │  │     Abort the operation with ZERO side effects.                      │
//! │  └── Persistence(DbError)                                               │
//! │        Local store trouble; the cart save path logs and retries on      │
//! │        the next mutation instead of surfacing this.                     │
//! │                                                                         │
//! │  SyncError (remote delivery failures)                                   │
//! │        Silent from the operator's perspective beyond the pending        │
//! │        count; entries stay queued until a future sweep succeeds.        │
//! │                                                                         │
//! │  A non-zero cash variance at shift close is NOT an error - it is a      │
//! │  signed figure on the Z-report and the shift closes regardless.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use soko_core::Money;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to the operator by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Commits require an open shift.
    #[error("No active shift; open a shift before committing sales")]
    NoActiveShift,

    /// The operator already runs an open shift.
    #[error("Operator {0} already has an active shift")]
    ShiftAlreadyActive(String),

    /// Payments (including redeemed points) don't cover the total.
    #[error("Insufficient payment: {paid} paid against {due} due")]
    InsufficientPayment { due: Money, paid: Money },

    /// Discount outside the configured bounds.
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),

    /// A payment is malformed: zero amounts, non-cash overpayment,
    /// redemption beyond the allowed cap, points on a walk-in sale.
    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    /// Committing an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Referenced customer does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A cart edit broke a cart rule (size cap, merge overflow).
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// Input shape validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] soko_core::ValidationError),

    /// Local durable store failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] soko_db::DbError),
}

impl From<soko_core::CoreError> for EngineError {
    fn from(err: soko_core::CoreError) -> Self {
        use soko_core::CoreError;
        match err {
            CoreError::CustomerNotFound(id) => EngineError::CustomerNotFound(id),
            CoreError::ProductNotFound(id) => EngineError::ProductNotFound(id),
            CoreError::CartTooLarge { max } => {
                EngineError::InvalidCart(format!("cart cannot have more than {max} lines"))
            }
            CoreError::Validation(v) => EngineError::Validation(v),
        }
    }
}

/// Errors from the sync sweep. Individual delivery failures are counted,
/// not raised; only a dead local store aborts a sweep.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local outbox store is unavailable.
    #[error("Local store unavailable: {0}")]
    Store(#[from] soko_db::DbError),
}

// =============================================================================
// Unit Tests
// =============================================================================
