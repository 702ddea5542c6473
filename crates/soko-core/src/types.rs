//! # Domain Types
//!
//! Core domain types used throughout Soko POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  invoice_number │   │  sale_id (FK)   │       │
//! │  │  price_cents    │   │  total_cents    │   │  method         │       │
//! │  │  pricing_mode   │   │  shift_id (FK)  │   │  tendered/change│       │
//! │  │  kind / stock   │   │  synced flag    │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Shift       │   │    Customer     │   │   QueuedSale    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  float / status │   │  loyalty_points │   │  sale snapshot  │       │
//! │  │  expected cash  │   │  walk-in const  │   │  attempts/error │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every document has:
//! - `id`: UUID v4 - immutable, used for database relations and sync dedup
//! - Business number: (invoice_number, shift number) - human-readable,
//!   issued from a durable counter, shown on receipts and Z-reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1600 bps = 16% (the standard VAT rate the engine ships configured with)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRate(u32);

impl VatRate {
    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Creates a VAT rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        VatRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::zero()
    }
}

// =============================================================================
// Pricing Mode
// =============================================================================

/// Whether a listed price already contains VAT or VAT is added on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Listed price includes VAT (shelf-price model).
    Inclusive,
    /// VAT is added on top of the listed price.
    Exclusive,
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::Inclusive
    }
}

// =============================================================================
// Product Kind
// =============================================================================

/// Whether a product carries tracked inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Physical stock; selling decrements the stock level.
    Stocked,
    /// A service; unlimited availability, never touches stock.
    Service,
}

impl Default for ProductKind {
    fn default() -> Self {
        ProductKind::Stocked
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment towards a sale was made.
///
/// `Points` is the loyalty pseudo-payment: redeemed points converted to
/// currency value at the configured rate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash. The only method that produces change.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Mobile money (M-Pesa and friends); carries a transaction reference.
    MobileMoney,
    /// Redeemed loyalty points.
    Points,
}

impl PaymentMethod {
    /// True for methods that must match the amount due exactly (no change).
    pub fn is_exact_tender(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Shift Status
// =============================================================================

/// The lifecycle state of an operator shift.
/// `Closed` is terminal; a closed shift is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Active,
    Closed,
}

// =============================================================================
// Operator
// =============================================================================

/// Operator role, supplied by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Manager,
    Owner,
}

/// The authenticated operator issuing engine operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub role: Role,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog record consumed by the engine.
/// The engine mutates only `stock`; everything else is peripheral CRUD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown to the cashier and on documents.
    pub name: String,

    /// Listed price in cents.
    pub price_cents: i64,

    /// Whether the listed price includes VAT.
    pub pricing_mode: PricingMode,

    /// Unit cost in cents (for profit reporting).
    pub cost_cents: i64,

    /// Stocked or service.
    pub kind: ProductKind,

    /// Current stock level. Meaningless for services.
    pub stock: i64,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the listed price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True if selling this product decrements stock.
    #[inline]
    pub fn tracks_stock(&self) -> bool {
        matches!(self.kind, ProductKind::Stocked)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// The id of the anonymous walk-in customer record.
///
/// Walk-in sales never earn or redeem loyalty points. The row is seeded by
/// the initial migration so the foreign key always resolves.
pub const WALK_IN_CUSTOMER_ID: &str = "00000000-0000-0000-0000-000000000001";

/// A customer record consumed by the engine.
/// The engine mutates only `loyalty_points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,

    /// Current loyalty point balance.
    pub loyalty_points: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// True for the anonymous walk-in record.
    #[inline]
    pub fn is_walk_in(&self) -> bool {
        self.id == WALK_IN_CUSTOMER_ID
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the working cart.
///
/// Uses the snapshot pattern: product data is frozen at the moment the line
/// is added, so a concurrent catalog edit cannot change a cart mid-checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Quantity in the cart. Always positive.
    pub quantity: i64,

    /// Listed price in cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Whether the frozen price includes VAT.
    pub pricing_mode: PricingMode,

    /// Unit cost in cents at time of adding (for profit reporting).
    pub unit_cost_cents: i64,

    /// Stocked or service (drives the stock decrement at commit).
    pub kind: ProductKind,
}

impl CartLine {
    /// Builds a cart line by snapshotting a product.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            unit_price_cents: product.price_cents,
            pricing_mode: product.pricing_mode,
            unit_cost_cents: product.cost_cents,
            kind: product.kind,
        }
    }

    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale. Immutable once created - the only field that ever
/// changes afterwards is `synced`, flipped true on remote acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// Human-readable document number, e.g. `INV-000042`.
    pub invoice_number: String,

    /// The shift this sale belongs to. A sale belongs to exactly one shift.
    pub shift_id: String,

    pub cashier_id: String,
    pub customer_id: String,

    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,

    /// Change handed back across all cash payments.
    pub change_cents: i64,

    pub points_earned: i64,
    pub points_redeemed: i64,

    /// True once the remote ledger has acknowledged this sale.
    pub synced: bool,

    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line item on a committed sale (frozen cart-line snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,

    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    pub pricing_mode: PricingMode,
    pub kind: ProductKind,

    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    /// Revenue minus cost for this line, at listed prices.
    pub fn gross_profit(&self) -> Money {
        Money::from_cents((self.unit_price_cents - self.unit_cost_cents) * self.quantity)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a sale. A sale holds 1..N payments (split tender).
///
/// For cash, `tendered_cents` is the RAW amount the customer handed over and
/// `change_cents` what went back; `amount_cents` is the net applied to the
/// sale (`tendered - change`). Reconciliation needs the raw figure, so it is
/// stored, not derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,

    /// Amount applied to the sale, in cents.
    pub amount_cents: i64,

    /// For cash: amount the customer handed over.
    pub tendered_cents: Option<i64>,

    /// For cash: change returned to the customer.
    pub change_cents: Option<i64>,

    /// External reference (mobile-money code, card auth, etc.).
    pub reference: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale Record (composed)
// =============================================================================

/// A sale with its lines and payments - the full immutable snapshot the
/// outbox queues and the shift ledger folds over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    pub payments: Vec<Payment>,
}

// =============================================================================
// Shift
// =============================================================================

/// One operator's continuous working session; the unit of cash
/// accountability. Created by `start`, finalized exactly once by `close`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: String,

    /// Human-readable shift number, e.g. `SHF-000007`.
    pub number: String,

    pub operator_id: String,
    pub operator_name: String,

    /// Cash placed in the drawer before the shift began.
    pub starting_float_cents: i64,

    pub status: ShiftStatus,

    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,

    /// Set at close: what the drawer should hold.
    pub expected_cash_cents: Option<i64>,

    /// Set at close: what the drawer actually held.
    pub counted_cash_cents: Option<i64>,

    /// Set at close: counted minus expected (signed).
    pub variance_cents: Option<i64>,

    /// Set at close: per-method payment totals as JSON.
    pub payment_totals_json: Option<String>,
}

impl Shift {
    #[inline]
    pub fn starting_float(&self) -> Money {
        Money::from_cents(self.starting_float_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.status, ShiftStatus::Active)
    }
}

// =============================================================================
// Queued Sale (outbox entry)
// =============================================================================

/// A sale committed while disconnected, held durably until the remote
/// ledger acknowledges it, then deleted. Keyed by sale id - enqueueing the
/// same sale twice is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QueuedSale {
    /// The sale's id (also the remote dedup key).
    pub sale_id: String,

    /// Full `SaleRecord` snapshot as JSON.
    pub payload: String,

    /// Number of delivery attempts so far.
    pub attempts: i64,

    /// Last delivery error, if any.
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,

    /// When delivery was last attempted.
    pub attempted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vat_rate_from_bps() {
        let rate = VatRate::from_bps(1600);
        assert_eq!(rate.bps(), 1600);
        assert!((rate.percentage() - 16.0).abs() < 0.001);
    }

    #[test]
    fn test_vat_rate_from_percentage() {
        assert_eq!(VatRate::from_percentage(16.0).bps(), 1600);
        assert_eq!(VatRate::from_percentage(8.25).bps(), 825);
    }

    #[test]
    fn test_exact_tender_methods() {
        assert!(!PaymentMethod::Cash.is_exact_tender());
        assert!(PaymentMethod::Card.is_exact_tender());
        assert!(PaymentMethod::MobileMoney.is_exact_tender());
        assert!(PaymentMethod::Points.is_exact_tender());
    }

    #[test]
    fn test_sale_line_gross_profit() {
        let line = SaleLine {
            id: "l1".into(),
            sale_id: "s1".into(),
            product_id: "p1".into(),
            name_snapshot: "Soda 500ml".into(),
            quantity: 3,
            unit_price_cents: 5000,
            unit_cost_cents: 3500,
            pricing_mode: PricingMode::Inclusive,
            kind: ProductKind::Stocked,
            created_at: Utc::now(),
        };
        assert_eq!(line.gross_profit().cents(), 4500);
    }
}
