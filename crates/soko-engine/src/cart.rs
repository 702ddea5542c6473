//! # Cart State
//!
//! The in-memory working cart. The [`Engine`](crate::engine::Engine) owns
//! one of these behind a mutex and mirrors every mutation into the durable
//! working-cart store so a restart rehydrates it.
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding the same product merges)
//! - Quantity is always > 0 (setting 0 removes the line)
//! - Maximum lines: 100, maximum quantity per line: 999 (soko-core)

use soko_core::validation::{validate_cart_size, validate_quantity};
use soko_core::{CartLine, CoreError, Product};

/// The working cart.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Rebuilds a cart from a persisted snapshot.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Cart { lines }
    }

    /// The lines, in the order they were added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Clones the lines (for quoting and persistence).
    pub fn snapshot(&self) -> Vec<CartLine> {
        self.lines.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of unique lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds a product, merging into an existing line when present.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> Result<(), CoreError> {
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let merged = line.quantity + quantity;
            validate_quantity(merged)?;
            line.quantity = merged;
            return Ok(());
        }

        validate_cart_size(self.lines.len())?;
        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> Result<(), CoreError> {
        if quantity == 0 {
            return self.remove_line(product_id);
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line by product id.
    pub fn remove_line(&mut self, product_id: &str) -> Result<(), CoreError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == before {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }
        Ok(())
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
