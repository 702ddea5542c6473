//! # Validation Module
//!
//! Input validation shared by the engine's entry points. Business rules live
//! in the commit pipeline; these are the shape checks that run before any
//! rule is consulted.
//!
//! ## Usage
//! ```rust
//! use soko_core::validation::{validate_quantity, validate_price_cents};
//!
//! validate_quantity(5).unwrap();
//! validate_price_cents(11600).unwrap();
//! ```

use crate::error::ValidationError;
use crate::pricing::Discount;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart-line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents. Zero-value payments are rejected.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a starting float in cents. Zero is allowed (cashless drawer).
pub fn validate_float_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "starting float".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a VAT rate in basis points (0% to 100%).
pub fn validate_vat_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "vat_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a discount against the configured bounds.
///
/// ## Rules
/// - Percent discounts: 0..=max_percent_bps
/// - Fixed discounts: 0..=max_fixed_cents
///
/// The clamp-to-subtotal rule is separate and lives in the pricing engine;
/// this check is about what the operator is ALLOWED to grant.
pub fn validate_discount(
    discount: &Discount,
    max_percent_bps: u32,
    max_fixed_cents: i64,
) -> ValidationResult<()> {
    match discount {
        Discount::Percent { bps } => {
            if *bps > max_percent_bps {
                return Err(ValidationError::OutOfRange {
                    field: "discount percent (bps)".to_string(),
                    min: 0,
                    max: max_percent_bps as i64,
                });
            }
        }
        Discount::Fixed { cents } => {
            if *cents < 0 || *cents > max_fixed_cents {
                return Err(ValidationError::OutOfRange {
                    field: "discount amount".to_string(),
                    min: 0,
                    max: max_fixed_cents,
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of unique lines).
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-1).is_err());
    }

    #[test]
    fn test_validate_discount_percent_bounds() {
        // Max 50%
        assert!(validate_discount(&Discount::Percent { bps: 5000 }, 5000, 0).is_ok());
        assert!(validate_discount(&Discount::Percent { bps: 5001 }, 5000, 0).is_err());
    }

    #[test]
    fn test_validate_discount_fixed_bounds() {
        assert!(validate_discount(&Discount::Fixed { cents: 10_000 }, 0, 10_000).is_ok());
        assert!(validate_discount(&Discount::Fixed { cents: 10_001 }, 0, 10_000).is_err());
        assert!(validate_discount(&Discount::Fixed { cents: -1 }, 0, 10_000).is_err());
    }

    #[test]
    fn test_validate_vat_rate_bps() {
        assert!(validate_vat_rate_bps(0).is_ok());
        assert!(validate_vat_rate_bps(1600).is_ok());
        assert!(validate_vat_rate_bps(10_000).is_ok());
        assert!(validate_vat_rate_bps(10_001).is_err());
    }
}
