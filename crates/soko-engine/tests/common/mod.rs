//! Shared harness for the engine integration tests: an in-memory database,
//! an in-memory remote ledger, and a seeded catalog.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use soko_core::{Customer, Money, Operator, PricingMode, Product, ProductKind, Role};
use soko_db::{Database, DbConfig};
use soko_engine::settings::SyncSettings;
use soko_engine::{ConnectivityMonitor, Engine, InMemoryLedger, RemoteLedger, Settings};

pub struct Harness {
    pub db: Database,
    pub engine: Engine,
    pub remote: Arc<InMemoryLedger>,
    pub connectivity: ConnectivityMonitor,
}

/// Settings with the default business rules but a fast-failing sync sweep,
/// so offline tests don't sit in backoff.
pub fn test_settings() -> Settings {
    Settings {
        sync: SyncSettings {
            item_timeout_secs: 1,
            max_retry_elapsed_secs: 0,
        },
        ..Settings::default()
    }
}

/// Builds an engine over a fresh in-memory database.
pub async fn harness(initially_online: bool) -> Harness {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let remote = Arc::new(InMemoryLedger::new());
    let connectivity = ConnectivityMonitor::new(initially_online);

    let engine = Engine::new(
        db.clone(),
        test_settings(),
        connectivity.clone(),
        Arc::clone(&remote) as Arc<dyn RemoteLedger>,
    )
    .await
    .unwrap();

    Harness {
        db,
        engine,
        remote,
        connectivity,
    }
}

pub fn operator() -> Operator {
    Operator {
        id: "op-1".to_string(),
        name: "Amina".to_string(),
        role: Role::Cashier,
    }
}

pub fn product(
    id: &str,
    price_cents: i64,
    pricing_mode: PricingMode,
    kind: ProductKind,
    stock: i64,
) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        sku: format!("SKU-{id}"),
        name: format!("Product {id}"),
        price_cents,
        pricing_mode,
        cost_cents: price_cents / 2,
        kind,
        stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn customer(id: &str, loyalty_points: i64) -> Customer {
    let now = Utc::now();
    Customer {
        id: id.to_string(),
        name: "Wanjiku".to_string(),
        phone: Some("+254700000001".to_string()),
        loyalty_points,
        created_at: now,
        updated_at: now,
    }
}

pub fn cents(cents: i64) -> Money {
    Money::from_cents(cents)
}
