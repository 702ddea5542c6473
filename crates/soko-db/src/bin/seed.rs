//! # Seed Data Generator
//!
//! Populates the database with development products and customers.
//!
//! ## Usage
//! ```bash
//! cargo run -p soko-db --bin seed
//!
//! # Specify database path
//! cargo run -p soko-db --bin seed -- --db ./data/soko.db
//! ```
//!
//! Prices are VAT-inclusive cents; a few service items (no stock tracking)
//! are included so the commit pipeline's stock branch can be exercised.

use chrono::Utc;
use std::env;
use tracing::info;
use uuid::Uuid;

use soko_core::{Customer, PricingMode, Product, ProductKind};
use soko_db::{Database, DbConfig};

/// (sku, name, price_cents, cost_cents, kind, stock)
const PRODUCTS: &[(&str, &str, i64, i64, ProductKind, i64)] = &[
    ("BEV-001", "Soda 500ml", 8000, 5500, ProductKind::Stocked, 48),
    ("BEV-002", "Drinking Water 1L", 6000, 3800, ProductKind::Stocked, 64),
    ("BEV-003", "Mango Juice 300ml", 9500, 6200, ProductKind::Stocked, 30),
    ("GRO-001", "Maize Flour 2kg", 17500, 14800, ProductKind::Stocked, 25),
    ("GRO-002", "Long Grain Rice 1kg", 19900, 16000, ProductKind::Stocked, 18),
    ("GRO-003", "Cooking Oil 1L", 32500, 27900, ProductKind::Stocked, 12),
    ("GRO-004", "Sugar 1kg", 15500, 13200, ProductKind::Stocked, 22),
    ("DRY-001", "Fresh Milk 500ml", 6500, 5000, ProductKind::Stocked, 40),
    ("DRY-002", "Eggs Tray (30)", 45000, 39000, ProductKind::Stocked, 8),
    ("SVC-001", "Phone Charging", 3000, 0, ProductKind::Service, 0),
    ("SVC-002", "Document Printing (per page)", 1000, 200, ProductKind::Service, 0),
];

/// (name, phone, starting points)
const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Wanjiku Kamau", "+254700111222", 120),
    ("Otieno Odhiambo", "+254722333444", 35),
    ("Fatuma Hassan", "+254733555666", 0),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "soko.db".to_string());
    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .expect("failed to open database");

    let now = Utc::now();

    for (sku, name, price_cents, cost_cents, kind, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            price_cents: *price_cents,
            pricing_mode: PricingMode::Inclusive,
            cost_cents: *cost_cents,
            kind: *kind,
            stock: *stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match db.products().insert(&product).await {
            Ok(()) => info!(sku = %product.sku, "Product seeded"),
            Err(e) => info!(sku = %product.sku, error = %e, "Skipped (already seeded?)"),
        }
    }

    for (name, phone, points) in CUSTOMERS {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            loyalty_points: *points,
            created_at: now,
            updated_at: now,
        };

        match db.customers().insert(&customer).await {
            Ok(()) => info!(name = %customer.name, "Customer seeded"),
            Err(e) => info!(name = %customer.name, error = %e, "Skipped (already seeded?)"),
        }
    }

    info!("Seed complete");
}

/// Parses `--db <path>` from the command line.
fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
