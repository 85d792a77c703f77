//! Cost layer tests against a live database.
//!
//! Covers oldest-first consumption through confirmed sales, estimated
//! shortfalls, exact restoration on unconfirm and revocation of layers
//! that were already drawn from.

#![allow(clippy::unwrap_used)]

mod common;

use common::{Ledger, date};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tradebook_core::fifo::FifoError;
use tradebook_core::lifecycle::{DocumentKind, DocumentStatus, Settlement};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_db::StoreError;
use tradebook_db::entities::{fifo_mappings, sale_details, sea_orm_active_enums::ProfitStatus};
use tradebook_db::repositories::{
    CreatePurchaseInput, CreateSaleInput, PurchaseLineInput, SaleLineInput, SaleWithLines,
};
use uuid::Uuid;

/// Item with layers 10@100 (oldest) and 5@120.
async fn stocked_item(ledger: &Ledger) -> Uuid {
    let item = ledger.item("widget").await;
    let fifo = ledger.fifo();
    fifo.opening_balance(item.id, dec!(10), dec!(100), date(2026, 1, 1))
        .await
        .unwrap();
    fifo.opening_balance(item.id, dec!(5), dec!(120), date(2026, 1, 5))
        .await
        .unwrap();
    item.id
}

async fn credit_sale(
    ledger: &Ledger,
    item_id: Uuid,
    quantity: rust_decimal::Decimal,
    sale_date: chrono::NaiveDate,
) -> SaleWithLines {
    ledger
        .coordinator
        .create_sale(CreateSaleInput {
            sale_date,
            settlement: Settlement::Credit,
            bank_id: None,
            tax_rate: dec!(0),
            tax_inclusive: false,
            description: None,
            lines: vec![SaleLineInput {
                item_id,
                quantity,
                unit_price: dec!(150),
            }],
        })
        .await
        .unwrap()
}

async fn mappings(ledger: &Ledger, detail_id: Uuid) -> Vec<fifo_mappings::Model> {
    ledger
        .fifo()
        .mappings_for(Origin::new(OriginKind::SaleDetail, detail_id))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sale_consumes_oldest_layer_first() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let item_id = stocked_item(&ledger).await;

    let sale = credit_sale(&ledger, item_id, dec!(12), date(2026, 1, 10)).await;
    let status = ledger
        .coordinator
        .confirm(DocumentKind::Sale, sale.header.id)
        .await
        .unwrap();
    assert_eq!(status, DocumentStatus::Confirmed);

    let detail = &sale.lines[0];
    let mut drawn: Vec<_> = mappings(&ledger, detail.id)
        .await
        .into_iter()
        .map(|m| (m.unit_cost, m.quantity_consumed, m.is_estimated))
        .collect();
    drawn.sort();
    assert_eq!(
        drawn,
        vec![(dec!(100), dec!(10), false), (dec!(120), dec!(2), false)]
    );

    let layers = ledger.fifo().layers(item_id).await.unwrap();
    assert_eq!(layers.len(), 1, "first layer is depleted");
    assert_eq!(layers[0].unit_cost, dec!(120));
    assert_eq!(layers[0].remaining_quantity, dec!(3));

    let costed = sale_details::Entity::find_by_id(detail.id)
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(costed.cost_total, Some(dec!(1240)));
    assert_eq!(costed.profit, Some(dec!(560)));
    assert_eq!(costed.profit_status, Some(ProfitStatus::Realized));

    assert_eq!(ledger.item_state(item_id).await.stock, dec!(3));
}

#[tokio::test]
async fn test_consuming_past_the_layers_records_an_estimated_shortfall() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let item_id = stocked_item(&ledger).await;
    let origin = Origin::new(OriginKind::SaleDetail, Uuid::new_v4());

    let allocation = ledger
        .fifo()
        .consume(item_id, dec!(20), date(2026, 1, 10), origin)
        .await
        .unwrap();

    assert!(allocation.is_estimated());
    assert_eq!(allocation.quantity, dec!(20));
    assert_eq!(allocation.shortfall_quantity(), dec!(5));

    let rows = ledger.fifo().mappings_for(origin).await.unwrap();
    let estimated: Vec<_> = rows.iter().filter(|m| m.is_estimated).collect();
    assert_eq!(estimated.len(), 1);
    assert_eq!(estimated[0].quantity_consumed, dec!(5));
    assert_eq!(estimated[0].stock_movement_id, None);

    let valuation = ledger.fifo().valuation(item_id).await.unwrap();
    assert_eq!(valuation.quantity, dec!(0), "no layer goes negative");
}

#[tokio::test]
async fn test_back_dated_sale_beyond_dated_layers_is_unrealized() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let item_id = stocked_item(&ledger).await;

    // Only the first layer exists on Jan 3; nominal stock is still 15.
    let sale = credit_sale(&ledger, item_id, dec!(12), date(2026, 1, 3)).await;
    ledger
        .coordinator
        .confirm(DocumentKind::Sale, sale.header.id)
        .await
        .unwrap();

    let detail = sale_details::Entity::find_by_id(sale.lines[0].id)
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.profit_status, Some(ProfitStatus::Unrealized));

    let rows = mappings(&ledger, detail.id).await;
    let shortfall: rust_decimal::Decimal = rows
        .iter()
        .filter(|m| m.is_estimated)
        .map(|m| m.quantity_consumed)
        .sum();
    assert_eq!(shortfall, dec!(2));
}

#[tokio::test]
async fn test_unconfirm_restores_layers_exactly() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let item_id = stocked_item(&ledger).await;
    let before: Vec<_> = ledger
        .fifo()
        .layers(item_id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| (l.id, l.remaining_quantity))
        .collect();

    let sale = credit_sale(&ledger, item_id, dec!(12), date(2026, 1, 10)).await;
    let id = sale.header.id;
    ledger.coordinator.confirm(DocumentKind::Sale, id).await.unwrap();
    let status = ledger.coordinator.unconfirm(DocumentKind::Sale, id).await.unwrap();
    assert_eq!(status, DocumentStatus::Draft);

    let after: Vec<_> = ledger
        .fifo()
        .layers(item_id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| (l.id, l.remaining_quantity))
        .collect();
    assert_eq!(before, after);

    let left = fifo_mappings::Entity::find()
        .filter(fifo_mappings::Column::ItemId.eq(item_id))
        .all(&ledger.db)
        .await
        .unwrap();
    assert!(left.is_empty(), "no residual mappings");
    assert_eq!(ledger.item_state(item_id).await.stock, dec!(15));

    let detail = sale_details::Entity::find_by_id(sale.lines[0].id)
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.cost_total, None);
    assert_eq!(detail.profit_status, None);

    // The same draft confirms again to the same cost.
    ledger.coordinator.confirm(DocumentKind::Sale, id).await.unwrap();
    let total: rust_decimal::Decimal = mappings(&ledger, detail.id)
        .await
        .iter()
        .map(|m| m.total_cost)
        .sum();
    assert_eq!(total, dec!(1240));
}

#[tokio::test]
async fn test_purchase_unconfirm_rejected_once_its_layer_is_drawn() {
    let Some(ledger) = Ledger::new().await else {
        return;
    };
    let item = ledger.item("gadget").await;
    let purchase = ledger
        .coordinator
        .create_purchase(CreatePurchaseInput {
            purchase_date: date(2026, 2, 1),
            settlement: Settlement::Credit,
            bank_id: None,
            tax_rate: dec!(0),
            tax_inclusive: false,
            description: None,
            lines: vec![PurchaseLineInput {
                item_id: item.id,
                quantity: dec!(4),
                unit_cost: dec!(25),
            }],
        })
        .await
        .unwrap();
    ledger
        .coordinator
        .confirm(DocumentKind::Purchase, purchase.header.id)
        .await
        .unwrap();

    let sale = credit_sale(&ledger, item.id, dec!(1), date(2026, 2, 2)).await;
    ledger
        .coordinator
        .confirm(DocumentKind::Sale, sale.header.id)
        .await
        .unwrap();

    let err = ledger
        .coordinator
        .unconfirm(DocumentKind::Purchase, purchase.header.id)
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::Fifo(FifoError::LayerAlreadyConsumed { .. })),
        "unexpected error: {err}"
    );
    assert_eq!(
        ledger
            .coordinator
            .status(DocumentKind::Purchase, purchase.header.id)
            .await
            .unwrap(),
        DocumentStatus::Confirmed
    );

    // Once the sale is undone the purchase can be too.
    ledger
        .coordinator
        .unconfirm(DocumentKind::Sale, sale.header.id)
        .await
        .unwrap();
    ledger
        .coordinator
        .unconfirm(DocumentKind::Purchase, purchase.header.id)
        .await
        .unwrap();
    assert_eq!(ledger.item_state(item.id).await.stock, dec!(0));
    assert!(ledger.fifo().layers(item.id).await.unwrap().is_empty());
}
