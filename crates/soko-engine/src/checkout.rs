//! # Sale Commit Pipeline
//!
//! Turns a validated cart into an immutable, durably-recorded sale.
//!
//! ## Pipeline Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Sale Commit Pipeline                                │
//! │                                                                         │
//! │  1. GUARDS (zero side effects on failure)                              │
//! │     ├── active shift?            → NoActiveShift                       │
//! │     ├── cart non-empty?          → EmptyCart                           │
//! │     ├── discount within bounds?  → InvalidDiscount                     │
//! │     └── customer exists?         → CustomerNotFound                    │
//! │                                                                         │
//! │  2. PRICE                                                              │
//! │     └── cart_totals(lines, discount, vat)                              │
//! │                                                                         │
//! │  3. SETTLE TENDER                                                      │
//! │     ├── points capped by balance and sale share                        │
//! │     ├── non-cash must cover exactly (no change)                        │
//! │     └── cash change = tendered - remaining due                         │
//! │                                                                         │
//! │  4. ONE TRANSACTION                                                    │
//! │     ├── invoice number from durable counter                            │
//! │     ├── sale + lines + payments inserted                               │
//! │     ├── stock decremented (stocked lines only)                         │
//! │     ├── loyalty balance adjusted                                       │
//! │     └── offline? outbox entry in the SAME transaction                  │
//! │                                                                         │
//! │  5. PERSISTENCE BRANCH (exactly one per commit)                        │
//! │     ├── online  → push to remote ledger, ack flips `synced`            │
//! │     │            (push failure degrades to an outbox enqueue)          │
//! │     └── offline → already queued in step 4                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use soko_core::validation::{validate_discount, validate_payment_amount, validate_quantity};
use soko_core::{
    cart_totals, loyalty, CartLine, CartTotals, Customer, Discount, Money, Operator, Payment,
    PaymentMethod, Sale, SaleLine, SaleRecord, Shift,
};
use soko_db::repository::{customer, next_document_number, outbox, product, sale};
use soko_db::Database;

use crate::connectivity::ConnectivityMonitor;
use crate::error::{EngineError, EngineResult};
use crate::remote::RemoteLedger;
use crate::settings::Settings;

// =============================================================================
// Tender
// =============================================================================

/// One payment instruction from the tender screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tender {
    /// Cash handed over. May exceed the remaining due; the surplus comes
    /// back as change.
    Cash { tendered: Money },
    /// Card payment, must match the amount it covers exactly.
    Card {
        amount: Money,
        reference: Option<String>,
    },
    /// Mobile money, must match exactly; carries the transaction code.
    MobileMoney {
        amount: Money,
        reference: Option<String>,
    },
    /// Loyalty points to redeem.
    Points { points: i64 },
}

/// Everything the pipeline needs to commit one sale.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub lines: Vec<CartLine>,
    pub customer_id: String,
    pub discount: Option<Discount>,
    pub tenders: Vec<Tender>,
}

/// A successfully committed sale.
#[derive(Debug, Clone)]
pub struct CommittedSale {
    pub record: SaleRecord,
    pub totals: CartTotals,
    /// True when the sale went to the offline outbox instead of the
    /// remote ledger.
    pub queued_offline: bool,
}

// =============================================================================
// Settled tender (internal)
// =============================================================================

/// The tender list after sufficiency checks, ready to become payment rows.
#[derive(Debug)]
struct SettledTender {
    payments: Vec<PaymentDraft>,
    change: Money,
    points_redeemed: i64,
    points_value: Money,
}

#[derive(Debug)]
struct PaymentDraft {
    method: PaymentMethod,
    amount: Money,
    tendered: Option<Money>,
    change: Option<Money>,
    reference: Option<String>,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Commits a sale. See the module docs for the stage breakdown.
///
/// Guard failures abort with zero side effects; the mutating stages run in
/// one SQLite transaction.
pub async fn commit_sale(
    db: &Database,
    settings: &Settings,
    connectivity: &ConnectivityMonitor,
    remote: &Arc<dyn RemoteLedger>,
    operator: &Operator,
    request: CommitRequest,
) -> EngineResult<CommittedSale> {
    // --- Stage 1: guards --------------------------------------------------
    let shift = db
        .shifts()
        .active_for_operator(&operator.id)
        .await?
        .ok_or(EngineError::NoActiveShift)?;

    if request.lines.is_empty() {
        return Err(EngineError::EmptyCart);
    }
    for line in &request.lines {
        validate_quantity(line.quantity)?;
    }

    if let Some(discount) = &request.discount {
        validate_discount(
            discount,
            settings.discount.max_percent_bps,
            settings.discount.max_fixed_cents,
        )
        .map_err(|e| EngineError::InvalidDiscount(e.to_string()))?;
    }

    let customer = db
        .customers()
        .get_by_id(&request.customer_id)
        .await?
        .ok_or_else(|| EngineError::CustomerNotFound(request.customer_id.clone()))?;

    // --- Stage 2: price ---------------------------------------------------
    let totals = cart_totals(&request.lines, request.discount, settings.vat_rate());

    // --- Stage 3: settle tender -------------------------------------------
    let settled = settle_tender(&request.tenders, totals.total, &customer, settings)?;

    let loyalty_applies = settings.loyalty.enabled && !customer.is_walk_in();
    let points_earned = if loyalty_applies {
        loyalty::points_earned(totals.total, settled.points_value, &settings.loyalty)
    } else {
        0
    };

    // The persistence branch is decided once per commit, up front, so the
    // offline outbox entry can join the same transaction.
    let online = connectivity.is_online();
    let now = Utc::now();

    // --- Stage 4: one transaction -----------------------------------------
    let mut tx = db.pool().begin().await.map_err(soko_db::DbError::from)?;

    let seq = next_document_number(&mut tx, "invoice").await?;
    let invoice_number = format!("{}{seq:06}", settings.documents.invoice_prefix);

    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        invoice_number,
        shift_id: shift.id.clone(),
        cashier_id: operator.id.clone(),
        customer_id: customer.id.clone(),
        subtotal_cents: totals.subtotal.cents(),
        discount_cents: totals.discount_amount.cents(),
        tax_cents: totals.tax.cents(),
        total_cents: totals.total.cents(),
        change_cents: settled.change.cents(),
        points_earned,
        points_redeemed: settled.points_redeemed,
        synced: false,
        created_at: now,
    };

    sale::insert_sale_tx(&mut tx, &sale).await?;

    let mut lines = Vec::with_capacity(request.lines.len());
    for cart_line in &request.lines {
        let line = SaleLine {
            id: sale::generate_line_id(),
            sale_id: sale.id.clone(),
            product_id: cart_line.product_id.clone(),
            name_snapshot: cart_line.name.clone(),
            quantity: cart_line.quantity,
            unit_price_cents: cart_line.unit_price_cents,
            unit_cost_cents: cart_line.unit_cost_cents,
            pricing_mode: cart_line.pricing_mode,
            kind: cart_line.kind,
            created_at: now,
        };
        sale::insert_line_tx(&mut tx, &line).await?;

        if cart_line.kind == soko_core::ProductKind::Stocked {
            product::decrement_stock_tx(&mut tx, &cart_line.product_id, cart_line.quantity)
                .await?;
        }

        lines.push(line);
    }

    let mut payments = Vec::with_capacity(settled.payments.len());
    for draft in settled.payments {
        let payment = Payment {
            id: sale::generate_payment_id(),
            sale_id: sale.id.clone(),
            method: draft.method,
            amount_cents: draft.amount.cents(),
            tendered_cents: draft.tendered.map(|m| m.cents()),
            change_cents: draft.change.map(|m| m.cents()),
            reference: draft.reference,
            created_at: now,
        };
        sale::insert_payment_tx(&mut tx, &payment).await?;
        payments.push(payment);
    }

    if settled.points_redeemed > 0 || points_earned > 0 {
        customer::adjust_points_tx(&mut tx, &customer.id, settled.points_redeemed, points_earned)
            .await?;
    }

    let record = SaleRecord {
        sale,
        lines,
        payments,
    };

    if !online {
        let payload = serde_json::to_string(&record).map_err(soko_db::DbError::from)?;
        outbox::enqueue_tx(&mut tx, &record.sale.id, &payload).await?;
    }

    tx.commit().await.map_err(soko_db::DbError::from)?;

    info!(
        sale_id = %record.sale.id,
        invoice = %record.sale.invoice_number,
        total = %totals.total,
        change = %settled.change,
        online,
        "Sale committed"
    );

    // --- Stage 5: persistence branch --------------------------------------
    let mut record = record;
    let mut queued_offline = !online;

    if online {
        match remote.submit(&record).await {
            Ok(()) => {
                db.sales().mark_synced(&record.sale.id).await?;
                record.sale.synced = true;
            }
            Err(e) => {
                // Degrade to the outbox; the sweep will retry later. The
                // operator only ever sees the pending count move.
                warn!(sale_id = %record.sale.id, error = %e, "Remote push failed; queued for sync");
                let payload =
                    serde_json::to_string(&record).map_err(soko_db::DbError::from)?;
                db.outbox().enqueue(&record.sale.id, &payload).await?;
                queued_offline = true;
            }
        }
    }

    Ok(CommittedSale {
        record,
        totals,
        queued_offline,
    })
}

// =============================================================================
// Tender settlement
// =============================================================================

/// Checks payment sufficiency and produces payment drafts.
///
/// Rules:
/// - Non-cash methods (card, mobile money, points) must together cover at
///   most the total; they never produce change.
/// - Points are capped by the customer's balance and by the configured
///   share of the sale total, and require a loyalty-eligible customer.
/// - Cash covers whatever remains; surplus cash comes back as change.
fn settle_tender(
    tenders: &[Tender],
    total: Money,
    customer: &Customer,
    settings: &Settings,
) -> EngineResult<SettledTender> {
    if tenders.is_empty() {
        return Err(EngineError::InsufficientPayment {
            due: total,
            paid: Money::zero(),
        });
    }

    let mut cash_tendered = Money::zero();
    let mut cash_seen = false;
    let mut non_cash = Money::zero();
    let mut points_redeemed: i64 = 0;
    let mut drafts: Vec<PaymentDraft> = Vec::with_capacity(tenders.len());

    for tender in tenders {
        match tender {
            Tender::Cash { tendered } => {
                validate_payment_amount(tendered.cents())?;
                cash_tendered += *tendered;
                cash_seen = true;
            }
            Tender::Card { amount, reference } => {
                validate_payment_amount(amount.cents())?;
                non_cash += *amount;
                drafts.push(PaymentDraft {
                    method: PaymentMethod::Card,
                    amount: *amount,
                    tendered: None,
                    change: None,
                    reference: reference.clone(),
                });
            }
            Tender::MobileMoney { amount, reference } => {
                validate_payment_amount(amount.cents())?;
                non_cash += *amount;
                drafts.push(PaymentDraft {
                    method: PaymentMethod::MobileMoney,
                    amount: *amount,
                    tendered: None,
                    change: None,
                    reference: reference.clone(),
                });
            }
            Tender::Points { points } => {
                if *points <= 0 {
                    return Err(EngineError::InvalidPayment(
                        "points redemption must be positive".to_string(),
                    ));
                }
                points_redeemed += points;
            }
        }
    }

    // Points: eligibility and caps, then valued as a pseudo-payment.
    let mut points_value = Money::zero();
    if points_redeemed > 0 {
        if !settings.loyalty.enabled || customer.is_walk_in() {
            return Err(EngineError::InvalidPayment(
                "loyalty redemption is not available on this sale".to_string(),
            ));
        }

        let cap = loyalty::max_redeemable_points(customer.loyalty_points, total, &settings.loyalty);
        if points_redeemed > cap {
            return Err(EngineError::InvalidPayment(format!(
                "cannot redeem {points_redeemed} points; at most {cap} allowed on this sale"
            )));
        }

        points_value = loyalty::redemption_value(points_redeemed, &settings.loyalty);
        non_cash += points_value;
        drafts.push(PaymentDraft {
            method: PaymentMethod::Points,
            amount: points_value,
            tendered: None,
            change: None,
            reference: None,
        });
    }

    // Non-cash never overpays: there is no change to give back on it.
    if non_cash > total {
        return Err(EngineError::InvalidPayment(format!(
            "non-cash payments ({non_cash}) exceed the amount due ({total})"
        )));
    }

    let due_after_non_cash = total - non_cash;
    let paid = non_cash + cash_tendered;
    if paid < total {
        return Err(EngineError::InsufficientPayment { due: total, paid });
    }

    let mut change = Money::zero();
    if cash_seen {
        if due_after_non_cash.is_zero() {
            return Err(EngineError::InvalidPayment(
                "nothing left to pay in cash; remove the cash tender".to_string(),
            ));
        }

        change = cash_tendered - due_after_non_cash;
        drafts.push(PaymentDraft {
            method: PaymentMethod::Cash,
            // Net amount applied to the sale; the raw figure is kept in
            // `tendered` for drawer reconciliation.
            amount: due_after_non_cash,
            tendered: Some(cash_tendered),
            change: Some(change),
            reference: None,
        });
    }

    Ok(SettledTender {
        payments: drafts,
        change,
        points_redeemed,
        points_value,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn customer(points: i64) -> Customer {
        let now = Utc::now();
        Customer {
            id: "cust-1".to_string(),
            name: "Wanjiku".to_string(),
            phone: None,
            loyalty_points: points,
            created_at: now,
            updated_at: now,
        }
    }

    fn walk_in() -> Customer {
        let now = Utc::now();
        Customer {
            id: soko_core::WALK_IN_CUSTOMER_ID.to_string(),
            name: "Walk-in customer".to_string(),
            phone: None,
            loyalty_points: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn cash_change_is_surplus_over_due() {
        // Due 1200.00, tendered 1500.00 -> change 300.00, net 1200.00
        let settled = settle_tender(
            &[Tender::Cash {
                tendered: Money::from_cents(150_000),
            }],
            Money::from_cents(120_000),
            &walk_in(),
            &settings(),
        )
        .unwrap();

        assert_eq!(settled.change.cents(), 30_000);
        assert_eq!(settled.payments.len(), 1);
        assert_eq!(settled.payments[0].amount.cents(), 120_000);
        assert_eq!(settled.payments[0].tendered.unwrap().cents(), 150_000);
    }

    #[test]
    fn underpayment_is_rejected() {
        let err = settle_tender(
            &[Tender::Cash {
                tendered: Money::from_cents(100_000),
            }],
            Money::from_cents(120_000),
            &walk_in(),
            &settings(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InsufficientPayment { .. }));
    }

    #[test]
    fn non_cash_overpayment_is_rejected() {
        let err = settle_tender(
            &[Tender::Card {
                amount: Money::from_cents(130_000),
                reference: None,
            }],
            Money::from_cents(120_000),
            &walk_in(),
            &settings(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidPayment(_)));
    }

    #[test]
    fn split_tender_cash_covers_remainder() {
        // 208.80 due: 100.00 mobile money + 150.00 cash -> change 41.20
        let settled = settle_tender(
            &[
                Tender::MobileMoney {
                    amount: Money::from_cents(10_000),
                    reference: Some("QX12ABCDE".to_string()),
                },
                Tender::Cash {
                    tendered: Money::from_cents(15_000),
                },
            ],
            Money::from_cents(20_880),
            &walk_in(),
            &settings(),
        )
        .unwrap();

        assert_eq!(settled.change.cents(), 4_120);
        let cash = settled
            .payments
            .iter()
            .find(|p| p.method == PaymentMethod::Cash)
            .unwrap();
        assert_eq!(cash.amount.cents(), 10_880);
    }

    #[test]
    fn points_capped_by_balance() {
        // 30 points held; asking for 40 must fail even though the sale
        // share cap would allow it.
        let err = settle_tender(
            &[
                Tender::Points { points: 40 },
                Tender::Cash {
                    tendered: Money::from_cents(100_000),
                },
            ],
            Money::from_cents(100_000),
            &customer(30),
            &settings(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidPayment(_)));
    }

    #[test]
    fn points_rejected_for_walk_in() {
        let err = settle_tender(
            &[
                Tender::Points { points: 5 },
                Tender::Cash {
                    tendered: Money::from_cents(100_000),
                },
            ],
            Money::from_cents(100_000),
            &walk_in(),
            &settings(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidPayment(_)));
    }

    #[test]
    fn points_value_counts_toward_sufficiency() {
        // 100.00 due, 50 points = 50.00, cash 50.00 exact -> no change
        let settled = settle_tender(
            &[
                Tender::Points { points: 50 },
                Tender::Cash {
                    tendered: Money::from_cents(5_000),
                },
            ],
            Money::from_cents(10_000),
            &customer(200),
            &settings(),
        )
        .unwrap();

        assert_eq!(settled.points_redeemed, 50);
        assert_eq!(settled.points_value.cents(), 5_000);
        assert_eq!(settled.change.cents(), 0);
    }

    #[test]
    fn cash_with_nothing_due_is_rejected() {
        let err = settle_tender(
            &[
                Tender::Card {
                    amount: Money::from_cents(10_000),
                    reference: None,
                },
                Tender::Cash {
                    tendered: Money::from_cents(1_000),
                },
            ],
            Money::from_cents(10_000),
            &walk_in(),
            &settings(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidPayment(_)));
    }

    #[test]
    fn empty_tender_list_is_insufficient() {
        let err = settle_tender(&[], Money::from_cents(100), &walk_in(), &settings())
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientPayment { .. }));
    }
}
