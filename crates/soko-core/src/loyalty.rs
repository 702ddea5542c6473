//! # Loyalty Math
//!
//! Pure earn/redeem arithmetic for the loyalty program. The engine decides
//! *whether* loyalty applies (program enabled, customer is not the walk-in
//! record); this module only computes amounts.

use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Rules
// =============================================================================

/// Loyalty accrual and redemption rules, supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyRules {
    /// Whether the program is active at all.
    pub enabled: bool,

    /// Cents of spend that earn one point.
    pub earn_per_cents: i64,

    /// Currency value of one redeemed point, in cents.
    pub redeem_value_cents: i64,

    /// Maximum share of a sale total redeemable with points, in basis
    /// points (5000 = 50%).
    pub max_redeem_bps: u32,
}

impl Default for LoyaltyRules {
    fn default() -> Self {
        // One point per 100.00 spent, each point worth 1.00 back,
        // at most half a sale payable with points.
        LoyaltyRules {
            enabled: true,
            earn_per_cents: 10_000,
            redeem_value_cents: 100,
            max_redeem_bps: 5000,
        }
    }
}

// =============================================================================
// Computations
// =============================================================================

/// Currency value of `points` at the configured redemption rate.
pub fn redemption_value(points: i64, rules: &LoyaltyRules) -> Money {
    Money::from_cents(points.max(0) * rules.redeem_value_cents)
}

/// Maximum points redeemable on a sale, capped by both the customer's
/// balance and the configured share of the sale total.
pub fn max_redeemable_points(balance: i64, total: Money, rules: &LoyaltyRules) -> i64 {
    if !rules.enabled || rules.redeem_value_cents <= 0 {
        return 0;
    }
    let cap_value = total.percent_bps(rules.max_redeem_bps);
    let cap_points = cap_value.cents() / rules.redeem_value_cents;
    balance.max(0).min(cap_points)
}

/// Points earned on a sale: `floor((total - redeemed_value) / earn_per_cents)`.
/// Redeemed value does not itself earn points.
pub fn points_earned(total: Money, redeemed_value: Money, rules: &LoyaltyRules) -> i64 {
    if !rules.enabled || rules.earn_per_cents <= 0 {
        return 0;
    }
    let earning_base = (total - redeemed_value).max(Money::zero());
    earning_base.cents() / rules.earn_per_cents
}

/// New balance after a sale: `current - redeemed + earned`.
pub fn new_balance(current: i64, redeemed: i64, earned: i64) -> i64 {
    current - redeemed + earned
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> LoyaltyRules {
        LoyaltyRules::default()
    }

    #[test]
    fn test_redemption_value() {
        assert_eq!(redemption_value(25, &rules()).cents(), 2500);
        assert_eq!(redemption_value(0, &rules()).cents(), 0);
        assert_eq!(redemption_value(-5, &rules()).cents(), 0);
    }

    #[test]
    fn test_max_redeemable_capped_by_balance() {
        // Sale of 1000.00: half is redeemable (500.00 = 500 points),
        // but the customer only has 80 points.
        let max = max_redeemable_points(80, Money::from_cents(100_000), &rules());
        assert_eq!(max, 80);
    }

    #[test]
    fn test_max_redeemable_capped_by_sale_share() {
        // Sale of 100.00: half is 50.00 = 50 points, balance is plenty.
        let max = max_redeemable_points(10_000, Money::from_cents(10_000), &rules());
        assert_eq!(max, 50);
    }

    #[test]
    fn test_max_redeemable_disabled_program() {
        let mut r = rules();
        r.enabled = false;
        assert_eq!(max_redeemable_points(100, Money::from_cents(10_000), &r), 0);
    }

    #[test]
    fn test_points_earned_floors() {
        // 250.00 spent at one point per 100.00 -> 2 points
        assert_eq!(points_earned(Money::from_cents(25_000), Money::zero(), &rules()), 2);
        // 99.99 -> 0 points
        assert_eq!(points_earned(Money::from_cents(9_999), Money::zero(), &rules()), 0);
    }

    #[test]
    fn test_points_earned_excludes_redeemed_value() {
        // 300.00 total, 150.00 of it paid with points -> earn on 150.00 -> 1
        let earned = points_earned(
            Money::from_cents(30_000),
            Money::from_cents(15_000),
            &rules(),
        );
        assert_eq!(earned, 1);
    }

    #[test]
    fn test_new_balance() {
        assert_eq!(new_balance(120, 50, 3), 73);
    }
}
