//! Concurrency tests: row locks on items and banks, and numbering retries.

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{Ledger, date};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tokio::sync::Barrier;
use tradebook_core::lifecycle::{DocumentKind, DocumentStatus, LifecycleError, Settlement};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_db::{LifecycleCoordinator, StoreError};
use tradebook_db::entities::{fifo_mappings, sea_orm_active_enums::JournalStatus};
use tradebook_db::repositories::{CreateCashDocumentInput, CreateSaleInput, SaleLineInput};
use tradebook_shared::{LedgerConfig, NumberingConfig};

#[tokio::test]
async fn test_concurrent_sales_never_oversell() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let ledger = Arc::new(ledger);
    let item = ledger.item("hot-item").await;
    ledger
        .fifo()
        .opening_balance(item.id, dec!(10), dec!(5), date(2026, 7, 1))
        .await
        .unwrap();

    let mut drafts = Vec::new();
    for _ in 0..20 {
        let sale = ledger
            .coordinator
            .create_sale(CreateSaleInput {
                sale_date: date(2026, 7, 2),
                settlement: Settlement::Credit,
                bank_id: None,
                tax_rate: dec!(0),
                tax_inclusive: false,
                description: None,
                lines: vec![SaleLineInput {
                    item_id: item.id,
                    quantity: dec!(1),
                    unit_price: dec!(9),
                }],
            })
            .await
            .unwrap();
        drafts.push(sale.header.id);
    }

    let barrier = Arc::new(Barrier::new(drafts.len()));
    let handles = drafts.into_iter().map(|id| {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            ledger.coordinator.confirm(DocumentKind::Sale, id).await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let confirmed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(confirmed, 10);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                err,
                StoreError::Lifecycle(LifecycleError::InsufficientStock { .. })
            ),
            "unexpected error: {err}"
        );
    }

    assert_eq!(ledger.item_state(item.id).await.stock, dec!(0));
    assert_eq!(ledger.fifo().valuation(item.id).await.unwrap().quantity, dec!(0));
    let drawn: Decimal = fifo_mappings::Entity::find()
        .filter(fifo_mappings::Column::ItemId.eq(item.id))
        .all(&ledger.db)
        .await
        .unwrap()
        .iter()
        .map(|m| m.quantity_consumed)
        .sum();
    assert_eq!(drawn, dec!(10));
}

#[tokio::test]
async fn test_concurrent_confirms_of_one_sale_apply_once() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let ledger = Arc::new(ledger);
    let item = ledger.item("single-sale").await;
    ledger
        .fifo()
        .opening_balance(item.id, dec!(10), dec!(5), date(2026, 7, 1))
        .await
        .unwrap();

    let sale = ledger
        .coordinator
        .create_sale(CreateSaleInput {
            sale_date: date(2026, 7, 2),
            settlement: Settlement::Credit,
            bank_id: None,
            tax_rate: dec!(0),
            tax_inclusive: false,
            description: None,
            lines: vec![SaleLineInput {
                item_id: item.id,
                quantity: dec!(2),
                unit_price: dec!(9),
            }],
        })
        .await
        .unwrap();
    let sale_id = sale.header.id;
    let detail_id = sale.lines[0].id;

    let barrier = Arc::new(Barrier::new(2));
    let handles = (0..2).map(|_| {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            ledger.coordinator.confirm(DocumentKind::Sale, sale_id).await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(errors.len(), 1);
    assert!(
        matches!(
            errors[0],
            StoreError::Lifecycle(LifecycleError::InvalidTransition {
                from: DocumentStatus::Confirmed,
                ..
            })
        ),
        "unexpected error: {}",
        errors[0]
    );

    let entries = ledger
        .journal()
        .entries_for(Origin::new(OriginKind::Sale, sale_id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, JournalStatus::Posted);

    let drawn: Decimal = ledger
        .fifo()
        .mappings_for(Origin::new(OriginKind::SaleDetail, detail_id))
        .await
        .unwrap()
        .iter()
        .map(|m| m.quantity_consumed)
        .sum();
    assert_eq!(drawn, dec!(2));

    assert_eq!(ledger.item_state(item.id).await.stock, dec!(8));
    assert_eq!(ledger.fifo().valuation(item.id).await.unwrap().quantity, dec!(8));
}

#[tokio::test]
async fn test_concurrent_cash_confirms_keep_the_balance_exact() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let ledger = Arc::new(ledger);
    let bank = ledger.bank("Busy", dec!(1000)).await;

    let mut drafts = Vec::new();
    for day in 1..=25 {
        let doc = ledger
            .coordinator
            .create_cash_in(CreateCashDocumentInput {
                transaction_date: date(2026, 8, day),
                bank_id: bank.id,
                account_id: ledger.accounts.other_income,
                amount: dec!(10),
                description: None,
            })
            .await
            .unwrap();
        drafts.push(doc.id);
    }

    let barrier = Arc::new(Barrier::new(drafts.len()));
    let handles = drafts.into_iter().map(|id| {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            ledger.coordinator.confirm(DocumentKind::CashIn, id).await
        })
    });
    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let cash = ledger.cash();
    assert_eq!(cash.bank(bank.id).await.unwrap().current_balance, dec!(1250));
    assert!(cash.reconcile(bank.id).await.unwrap().is_consistent());

    let snapshots: Vec<_> = cash
        .movements(bank.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.balance)
        .collect();
    let expected: Vec<_> = (1..=25).map(|n| dec!(1000) + Decimal::from(n * 10)).collect();
    assert_eq!(snapshots, expected);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_numbers() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let bank_id = ledger.bank("Numbered", dec!(0)).await.id;
    let income = ledger.accounts.other_income;

    // Every collision costs one attempt, so allow one per competing writer.
    let config = LedgerConfig {
        numbering: NumberingConfig {
            max_attempts: 25,
            ..NumberingConfig::default()
        },
        ..ledger.config.clone()
    };
    let coordinator = Arc::new(LifecycleCoordinator::new(ledger.db.clone(), config));

    let barrier = Arc::new(Barrier::new(20));
    let handles = (0..20).map(|_| {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            coordinator
                .create_cash_in(CreateCashDocumentInput {
                    transaction_date: date(2027, 2, 14),
                    bank_id,
                    account_id: income,
                    amount: dec!(1),
                    description: None,
                })
                .await
        })
    });

    let numbers: Vec<String> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().number)
        .collect();
    let distinct: HashSet<_> = numbers.iter().collect();
    assert_eq!(distinct.len(), numbers.len());
    assert!(numbers.iter().all(|n| n.starts_with("CIN-20270214-")));
}
