//! # Pricing Engine
//!
//! Pure computation of per-line and cart-level VAT/discount breakdowns.
//!
//! ## Rounding Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUND ONCE, AT THE EDGE                                                │
//! │                                                                         │
//! │  The cart is requoted on every edit. If each quote rounded its         │
//! │  intermediates, repeated quoting could drift:                          │
//! │                                                                         │
//! │    inclusive 116.00 -> base 100.00 -> +16% -> 116.00   ✓ stable        │
//! │    inclusive 99.99  -> base 86.1982.. (NOT 86.20 mid-calculation)      │
//! │                                                                         │
//! │  Intermediates here are i128 fixed-point with four guard digits        │
//! │  below one cent. Cent rounding (half-up) happens exactly once, on      │
//! │  the output fields. The published identities then hold exactly:        │
//! │                                                                         │
//! │    taxable = subtotal - discount                                       │
//! │    total   = taxable + tax                                             │
//! │    0 <= discount <= subtotal                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything in this module is deterministic and side-effect free: the UI
//! calls [`cart_totals`] live while quantities and the discount change.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{CartLine, PricingMode, VatRate};

// =============================================================================
// Discount
// =============================================================================

/// A cart-level discount. The amount is always clamped to `[0, subtotal]` -
/// a discount can never make the taxable amount negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the subtotal, in basis points (1000 = 10%).
    Percent { bps: u32 },
    /// Fixed amount off, in cents.
    Fixed { cents: i64 },
}

// =============================================================================
// Output Shapes
// =============================================================================

/// Per-unit tax breakdown of a listed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Price before VAT.
    pub base_price: Money,
    /// VAT portion. For inclusive prices, `base_price + vat_amount` gives
    /// back the listed price exactly.
    pub vat_amount: Money,
}

/// Cart-level totals. All five fields are rounded to cents; the identities
/// from the module docs hold exactly on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub taxable_amount: Money,
    pub tax: Money,
    pub total: Money,
}

impl CartTotals {
    /// Totals of an empty cart.
    pub fn empty() -> Self {
        CartTotals {
            subtotal: Money::zero(),
            discount_amount: Money::zero(),
            taxable_amount: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
        }
    }
}

// =============================================================================
// Fixed-Point Internals
// =============================================================================

/// Guard scale: intermediate amounts carry four extra digits below a cent.
const GUARD: i128 = 10_000;

/// Divides with half-up rounding. Denominator must be positive; amounts in
/// this module are non-negative, negatives round away from zero for
/// symmetry.
fn div_round(n: i128, d: i128) -> i128 {
    if n >= 0 {
        (n + d / 2) / d
    } else {
        (n - d / 2) / d
    }
}

/// Base (pre-VAT) unit price at guard scale.
fn base_scaled(unit_price_cents: i64, mode: PricingMode, rate: VatRate) -> i128 {
    let unit = unit_price_cents as i128 * GUARD;
    match mode {
        PricingMode::Exclusive => unit,
        // base = listed / (1 + rate), carried out at guard precision
        PricingMode::Inclusive => div_round(unit * 10_000, 10_000 + rate.bps() as i128),
    }
}

/// Rounds a guard-scale amount to whole cents.
fn to_cents(scaled: i128) -> Money {
    Money::from_cents(div_round(scaled, GUARD) as i64)
}

// =============================================================================
// Price Breakdown
// =============================================================================

/// Splits a listed unit price into base price and VAT portion.
///
/// Inclusive: `base = price / (1 + rate)`, `vat = price - base`.
/// Exclusive: `base = price`, `vat = base × rate`.
/// A zero rate collapses both branches to `{base: price, vat: 0}`.
///
/// ## Example
/// ```rust
/// use soko_core::money::Money;
/// use soko_core::pricing::price_breakdown;
/// use soko_core::types::{PricingMode, VatRate};
///
/// let b = price_breakdown(Money::from_cents(11600), PricingMode::Inclusive, VatRate::from_bps(1600));
/// assert_eq!(b.base_price.cents(), 10000); // 100.00
/// assert_eq!(b.vat_amount.cents(), 1600);  // 16.00
/// ```
pub fn price_breakdown(unit_price: Money, mode: PricingMode, rate: VatRate) -> PriceBreakdown {
    match mode {
        PricingMode::Inclusive => {
            let base = to_cents(base_scaled(unit_price.cents(), mode, rate));
            PriceBreakdown {
                base_price: base,
                // Derived by subtraction so the two halves always sum back
                // to the listed price.
                vat_amount: unit_price - base,
            }
        }
        PricingMode::Exclusive => PriceBreakdown {
            base_price: unit_price,
            vat_amount: unit_price.vat_on(rate),
        },
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Computes the full cart quote.
///
/// `subtotal = Σ base(line) × quantity`. The discount is applied to the
/// subtotal, clamped to `[0, subtotal]`; VAT is charged on what remains.
/// Lines may mix inclusive and exclusive pricing.
pub fn cart_totals(lines: &[CartLine], discount: Option<Discount>, rate: VatRate) -> CartTotals {
    if lines.is_empty() {
        return CartTotals::empty();
    }

    let subtotal_s: i128 = lines
        .iter()
        .map(|l| base_scaled(l.unit_price_cents, l.pricing_mode, rate) * l.quantity as i128)
        .sum();

    let discount_s: i128 = match discount {
        None => 0,
        Some(Discount::Percent { bps }) => div_round(subtotal_s * bps as i128, 10_000),
        Some(Discount::Fixed { cents }) => cents.max(0) as i128 * GUARD,
    };
    let discount_s = discount_s.clamp(0, subtotal_s);

    let subtotal = to_cents(subtotal_s);
    // Re-clamp after rounding so the cent-level identity cannot be off by
    // a rounding step.
    let discount_amount = to_cents(discount_s).clamp(Money::zero(), subtotal);
    let taxable_amount = subtotal - discount_amount;
    let tax = taxable_amount.vat_on(rate);

    CartTotals {
        subtotal,
        discount_amount,
        taxable_amount,
        tax,
        total: taxable_amount + tax,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductKind;

    fn line(price_cents: i64, qty: i64, mode: PricingMode) -> CartLine {
        CartLine {
            product_id: "p1".into(),
            name: "Test item".into(),
            quantity: qty,
            unit_price_cents: price_cents,
            pricing_mode: mode,
            unit_cost_cents: 0,
            kind: ProductKind::Stocked,
        }
    }

    #[test]
    fn inclusive_breakdown_recovers_base() {
        // 116.00 inclusive at 16% -> base 100.00, VAT 16.00
        let b = price_breakdown(
            Money::from_cents(11600),
            PricingMode::Inclusive,
            VatRate::from_bps(1600),
        );
        assert_eq!(b.base_price.cents(), 10000);
        assert_eq!(b.vat_amount.cents(), 1600);
    }

    #[test]
    fn inclusive_halves_sum_to_listed_price() {
        // Awkward amounts must still satisfy base + vat == listed
        for cents in [1, 99, 999, 9999, 123_456, 7_777_777] {
            let listed = Money::from_cents(cents);
            let b = price_breakdown(listed, PricingMode::Inclusive, VatRate::from_bps(1600));
            assert_eq!(b.base_price + b.vat_amount, listed, "price {cents}");
            // base × 1.16 lands back on the listed price within a cent
            let rebuilt = b.base_price + b.base_price.vat_on(VatRate::from_bps(1600));
            assert!((rebuilt.cents() - cents).abs() <= 1, "price {cents}");
        }
    }

    #[test]
    fn exclusive_breakdown() {
        let b = price_breakdown(
            Money::from_cents(10000),
            PricingMode::Exclusive,
            VatRate::from_bps(1600),
        );
        assert_eq!(b.base_price.cents(), 10000);
        assert_eq!(b.vat_amount.cents(), 1600);
    }

    #[test]
    fn zero_rate_collapses_both_modes() {
        for mode in [PricingMode::Inclusive, PricingMode::Exclusive] {
            let b = price_breakdown(Money::from_cents(12345), mode, VatRate::zero());
            assert_eq!(b.base_price.cents(), 12345);
            assert_eq!(b.vat_amount.cents(), 0);
        }
    }

    #[test]
    fn cart_totals_exclusive_with_percent_discount() {
        // One line {100.00 × 2, exclusive}, 10% discount, 16% VAT
        let totals = cart_totals(
            &[line(10000, 2, PricingMode::Exclusive)],
            Some(Discount::Percent { bps: 1000 }),
            VatRate::from_bps(1600),
        );
        assert_eq!(totals.subtotal.cents(), 20000); // 200.00
        assert_eq!(totals.discount_amount.cents(), 2000); // 20.00
        assert_eq!(totals.taxable_amount.cents(), 18000); // 180.00
        assert_eq!(totals.tax.cents(), 2880); // 28.80
        assert_eq!(totals.total.cents(), 20880); // 208.80
    }

    #[test]
    fn fixed_discount_clamps_to_subtotal() {
        let totals = cart_totals(
            &[line(5000, 1, PricingMode::Exclusive)],
            Some(Discount::Fixed { cents: 99999 }),
            VatRate::from_bps(1600),
        );
        assert_eq!(totals.discount_amount, totals.subtotal);
        assert_eq!(totals.taxable_amount.cents(), 0);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn negative_fixed_discount_is_treated_as_zero() {
        let totals = cart_totals(
            &[line(5000, 1, PricingMode::Exclusive)],
            Some(Discount::Fixed { cents: -100 }),
            VatRate::from_bps(1600),
        );
        assert_eq!(totals.discount_amount.cents(), 0);
    }

    #[test]
    fn identities_hold_for_mixed_carts() {
        let lines = vec![
            line(11600, 3, PricingMode::Inclusive),
            line(9999, 1, PricingMode::Inclusive),
            line(2500, 7, PricingMode::Exclusive),
        ];
        for discount in [
            None,
            Some(Discount::Percent { bps: 1250 }),
            Some(Discount::Fixed { cents: 5001 }),
        ] {
            let t = cart_totals(&lines, discount, VatRate::from_bps(1600));
            assert_eq!(t.taxable_amount, t.subtotal - t.discount_amount);
            assert_eq!(t.total, t.taxable_amount + t.tax);
            assert!(t.discount_amount >= Money::zero());
            assert!(t.discount_amount <= t.subtotal);
        }
    }

    #[test]
    fn quoting_is_idempotent() {
        let lines = vec![
            line(11600, 2, PricingMode::Inclusive),
            line(3333, 5, PricingMode::Exclusive),
        ];
        let discount = Some(Discount::Percent { bps: 500 });
        let rate = VatRate::from_bps(1600);

        let first = cart_totals(&lines, discount, rate);
        for _ in 0..100 {
            assert_eq!(cart_totals(&lines, discount, rate), first);
        }
    }

    #[test]
    fn empty_cart_quotes_to_zero() {
        let t = cart_totals(&[], Some(Discount::Percent { bps: 1000 }), VatRate::from_bps(1600));
        assert_eq!(t, CartTotals::empty());
    }
}
