//! End-to-end commit pipeline tests: pricing, tender, loyalty, stock, and
//! the zero-side-effects guarantee on validation failures.

mod common;

use common::{cents, customer, harness, operator, product};
use soko_core::{Discount, PricingMode, ProductKind, WALK_IN_CUSTOMER_ID};
use soko_engine::{EngineError, Tender};

#[tokio::test]
async fn online_cash_sale_commits_and_syncs() {
    let h = harness(true).await;
    let op = operator();

    // 100.00 exclusive, stock 50
    h.db.products()
        .insert(&product("p1", 10_000, PricingMode::Exclusive, ProductKind::Stocked, 50))
        .await
        .unwrap();

    h.engine.start_shift(&op, cents(500_000)).await.unwrap();
    h.engine.add_product("p1", 2).await.unwrap();

    // Scenario: 200.00 subtotal, 10% discount, 16% VAT -> 208.80 due
    let committed = h
        .engine
        .commit_sale(
            &op,
            WALK_IN_CUSTOMER_ID,
            Some(Discount::Percent { bps: 1000 }),
            vec![Tender::Cash {
                tendered: cents(25_000),
            }],
        )
        .await
        .unwrap();

    assert_eq!(committed.totals.subtotal.cents(), 20_000);
    assert_eq!(committed.totals.discount_amount.cents(), 2_000);
    assert_eq!(committed.totals.taxable_amount.cents(), 18_000);
    assert_eq!(committed.totals.tax.cents(), 2_880);
    assert_eq!(committed.totals.total.cents(), 20_880);
    assert_eq!(committed.record.sale.change_cents, 4_120);
    assert_eq!(committed.record.sale.invoice_number, "INV-000001");
    assert!(!committed.queued_offline);

    // Online branch: pushed and acknowledged immediately
    assert!(committed.record.sale.synced);
    assert_eq!(h.remote.accepted(), vec![committed.record.sale.id.clone()]);
    assert_eq!(h.engine.pending_sync_count().await.unwrap(), 0);

    // Stock decremented by the committed quantity
    let p = h.db.products().get_by_id("p1").await.unwrap().unwrap();
    assert_eq!(p.stock, 48);

    // Cash payment keeps the raw tendered figure for reconciliation
    let payments = h
        .db
        .sales()
        .get_payments(&committed.record.sale.id)
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_cents, 20_880);
    assert_eq!(payments[0].tendered_cents, Some(25_000));
    assert_eq!(payments[0].change_cents, Some(4_120));

    // The cart is consumed by the commit
    assert!(h.engine.cart_lines().await.is_empty());
}

#[tokio::test]
async fn loyalty_redeem_and_earn_update_balance() {
    let h = harness(true).await;
    let op = operator();

    h.db.products()
        .insert(&product("p1", 10_000, PricingMode::Exclusive, ProductKind::Stocked, 50))
        .await
        .unwrap();
    h.db.customers().insert(&customer("cust-1", 200)).await.unwrap();

    h.engine.start_shift(&op, cents(500_000)).await.unwrap();
    h.engine.add_product("p1", 2).await.unwrap();

    // 208.80 due: 50 points (50.00) + cash 158.80 exact
    let committed = h
        .engine
        .commit_sale(
            &op,
            "cust-1",
            Some(Discount::Percent { bps: 1000 }),
            vec![
                Tender::Points { points: 50 },
                Tender::Cash {
                    tendered: cents(15_880),
                },
            ],
        )
        .await
        .unwrap();

    assert_eq!(committed.record.sale.points_redeemed, 50);
    // Earned on total minus redeemed value: floor(158.80 / 100.00) = 1
    assert_eq!(committed.record.sale.points_earned, 1);

    let cust = h.db.customers().get_by_id("cust-1").await.unwrap().unwrap();
    assert_eq!(cust.loyalty_points, 200 - 50 + 1);
}

#[tokio::test]
async fn service_lines_never_touch_stock() {
    let h = harness(true).await;
    let op = operator();

    h.db.products()
        .insert(&product("svc", 5_000, PricingMode::Inclusive, ProductKind::Service, 0))
        .await
        .unwrap();

    h.engine.start_shift(&op, cents(0)).await.unwrap();
    h.engine.add_product("svc", 3).await.unwrap();

    let committed = h
        .engine
        .commit_sale(
            &op,
            WALK_IN_CUSTOMER_ID,
            None,
            vec![Tender::Cash {
                tendered: cents(15_000),
            }],
        )
        .await
        .unwrap();
    assert_eq!(committed.record.sale.total_cents, 15_000);

    let p = h.db.products().get_by_id("svc").await.unwrap().unwrap();
    assert_eq!(p.stock, 0);
}

#[tokio::test]
async fn commit_without_shift_has_no_side_effects() {
    let h = harness(true).await;
    let op = operator();

    h.db.products()
        .insert(&product("p1", 10_000, PricingMode::Exclusive, ProductKind::Stocked, 50))
        .await
        .unwrap();
    h.engine.add_product("p1", 1).await.unwrap();

    let err = h
        .engine
        .commit_sale(
            &op,
            WALK_IN_CUSTOMER_ID,
            None,
            vec![Tender::Cash {
                tendered: cents(20_000),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoActiveShift));

    // Nothing mutated, cart intact
    let p = h.db.products().get_by_id("p1").await.unwrap().unwrap();
    assert_eq!(p.stock, 50);
    assert_eq!(h.engine.cart_lines().await.len(), 1);
    assert_eq!(h.engine.pending_sync_count().await.unwrap(), 0);
    assert!(h.remote.accepted().is_empty());
}

#[tokio::test]
async fn insufficient_payment_has_no_side_effects() {
    let h = harness(true).await;
    let op = operator();

    h.db.products()
        .insert(&product("p1", 10_000, PricingMode::Exclusive, ProductKind::Stocked, 50))
        .await
        .unwrap();
    h.db.customers().insert(&customer("cust-1", 200)).await.unwrap();

    h.engine.start_shift(&op, cents(500_000)).await.unwrap();
    h.engine.add_product("p1", 2).await.unwrap();

    // 232.00 due, only 100.00 tendered
    let err = h
        .engine
        .commit_sale(
            &op,
            "cust-1",
            None,
            vec![Tender::Cash {
                tendered: cents(10_000),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientPayment { .. }));

    let p = h.db.products().get_by_id("p1").await.unwrap().unwrap();
    assert_eq!(p.stock, 50);
    let cust = h.db.customers().get_by_id("cust-1").await.unwrap().unwrap();
    assert_eq!(cust.loyalty_points, 200);
    assert_eq!(h.db.sales().count_for_shift("any").await.unwrap(), 0);
}

#[tokio::test]
async fn discount_beyond_bounds_rejected() {
    let h = harness(true).await;
    let op = operator();

    h.db.products()
        .insert(&product("p1", 10_000, PricingMode::Exclusive, ProductKind::Stocked, 50))
        .await
        .unwrap();

    h.engine.start_shift(&op, cents(500_000)).await.unwrap();
    h.engine.add_product("p1", 1).await.unwrap();

    // Default bounds allow at most 50%
    let err = h
        .engine
        .commit_sale(
            &op,
            WALK_IN_CUSTOMER_ID,
            Some(Discount::Percent { bps: 7_500 }),
            vec![Tender::Cash {
                tendered: cents(20_000),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDiscount(_)));

    let p = h.db.products().get_by_id("p1").await.unwrap().unwrap();
    assert_eq!(p.stock, 50);
}

#[tokio::test]
async fn invoice_numbers_are_sequential() {
    let h = harness(true).await;
    let op = operator();

    h.db.products()
        .insert(&product("p1", 10_000, PricingMode::Exclusive, ProductKind::Stocked, 50))
        .await
        .unwrap();
    h.engine.start_shift(&op, cents(0)).await.unwrap();

    for expected in ["INV-000001", "INV-000002", "INV-000003"] {
        h.engine.add_product("p1", 1).await.unwrap();
        let committed = h
            .engine
            .commit_sale(
                &op,
                WALK_IN_CUSTOMER_ID,
                None,
                vec![Tender::Cash {
                    tendered: cents(11_600),
                }],
            )
            .await
            .unwrap();
        assert_eq!(committed.record.sale.invoice_number, expected);
    }
}
