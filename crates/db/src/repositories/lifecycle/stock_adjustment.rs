//! Stock adjustments.
//!
//! Each line carries a signed quantity. Increases receive a layer at the
//! line's unit cost; decreases draw from layers like a sale. The value
//! moved is posted between inventory and the document's counter account.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use tradebook_core::lifecycle::{
    DocumentAction, DocumentKind, LifecycleError, StockAdjustmentCost, non_negative,
    nonzero_quantity, number_prefix,
};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::{LedgerConfig, round_money};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::DocumentStatus as DbDocumentStatus;
use crate::entities::{stock_adjustment_details, stock_adjustments};
use crate::repositories::error::StoreError;
use crate::repositories::fifo;
use crate::repositories::numbering::insert_numbered;

use super::DocumentWithLines;
use super::document::lock_for;
use super::effects::{move_stock, per_item, post, posting_accounts, require_lines, undo};

/// A stock adjustment line.
#[derive(Debug, Clone)]
pub struct AdjustmentLineInput {
    /// Item adjusted.
    pub item_id: Uuid,
    /// Signed quantity; never zero.
    pub quantity_delta: Decimal,
    /// Unit cost of the new layer; required for increases.
    pub unit_cost: Option<Decimal>,
}

/// Input for creating a stock adjustment draft.
#[derive(Debug, Clone)]
pub struct CreateStockAdjustmentInput {
    /// Adjustment date.
    pub adjustment_date: NaiveDate,
    /// Counter account for the inventory value moved.
    pub account_id: Uuid,
    /// Description.
    pub description: Option<String>,
    /// Lines.
    pub lines: Vec<AdjustmentLineInput>,
}

/// A stock adjustment with its lines.
pub type StockAdjustmentWithLines =
    DocumentWithLines<stock_adjustments::Model, stock_adjustment_details::Model>;

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreateStockAdjustmentInput,
) -> Result<StockAdjustmentWithLines, StoreError> {
    require_lines(DocumentKind::StockAdjustment, &input.lines)?;
    for line in &input.lines {
        nonzero_quantity(line.quantity_delta)?;
        if line.quantity_delta.is_sign_positive() {
            let cost = line.unit_cost.ok_or(LifecycleError::UnitCostRequired(line.item_id))?;
            non_negative(cost)?;
        }
    }

    let id = Uuid::new_v4();
    let header = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::StockAdjustment),
        input.adjustment_date,
        stock_adjustments::Column::Number,
        |number| stock_adjustments::ActiveModel {
            id: Set(id),
            number: Set(number),
            adjustment_date: Set(input.adjustment_date),
            account_id: Set(input.account_id),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            ..Default::default()
        },
    )
    .await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        let unit_cost = line.unit_cost.filter(|_| line.quantity_delta.is_sign_positive());
        let row = stock_adjustment_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            stock_adjustment_id: Set(id),
            item_id: Set(line.item_id),
            quantity_delta: Set(line.quantity_delta),
            unit_cost: Set(unit_cost),
            cost_total: Set(None),
        }
        .insert(txn)
        .await?;
        lines.push(row);
    }

    info!(
        stock_adjustment_id = %id,
        number = %header.number,
        lines = lines.len(),
        "Stock adjustment drafted"
    );
    Ok(DocumentWithLines { header, lines })
}

async fn lines(
    txn: &DatabaseTransaction,
    stock_adjustment_id: Uuid,
) -> Result<Vec<stock_adjustment_details::Model>, StoreError> {
    Ok(stock_adjustment_details::Entity::find()
        .filter(stock_adjustment_details::Column::StockAdjustmentId.eq(stock_adjustment_id))
        .order_by_asc(stock_adjustment_details::Column::Id)
        .all(txn)
        .await?)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<stock_adjustments::Model, StoreError> {
    let (doc, next) =
        lock_for::<stock_adjustments::Model>(txn, id, DocumentAction::Confirm).await?;
    let details = lines(txn, id).await?;

    let deltas = per_item(details.iter().map(|d| (d.item_id, d.quantity_delta)));
    move_stock(txn, &deltas).await?;

    let mut cost = StockAdjustmentCost::default();
    for detail in details {
        let origin = Origin::new(OriginKind::StockAdjustmentDetail, detail.id);
        let line_cost = if detail.quantity_delta.is_sign_positive() {
            let unit_cost = detail
                .unit_cost
                .ok_or(LifecycleError::UnitCostRequired(detail.item_id))?;
            fifo::receive(
                txn,
                detail.item_id,
                detail.quantity_delta,
                unit_cost,
                doc.adjustment_date,
                origin,
            )
            .await?;
            let value = round_money(detail.quantity_delta * unit_cost);
            cost.increase += value;
            value
        } else {
            let allocation = fifo::consume(
                txn,
                detail.item_id,
                -detail.quantity_delta,
                doc.adjustment_date,
                origin,
                config.shortfall_cost,
            )
            .await?;
            cost.decrease += allocation.total_cost;
            allocation.total_cost
        };

        let mut active: stock_adjustment_details::ActiveModel = detail.into();
        active.cost_total = Set(Some(line_cost));
        active.update(txn).await?;
    }

    let accounts = posting_accounts(txn, config).await?;
    let journal_lines = accounts.stock_adjustment(doc.account_id, cost);
    let entry_id = if journal_lines.is_empty() {
        None
    } else {
        let entry = post(
            txn,
            config,
            doc.adjustment_date,
            Origin::new(OriginKind::StockAdjustment, id),
            format!("Stock adjustment {}", doc.number),
            journal_lines,
        )
        .await?;
        Some(entry.id)
    };

    let number = doc.number.clone();
    let mut active: stock_adjustments::ActiveModel = doc.into();
    active.journal_entry_id = Set(entry_id);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(
        stock_adjustment_id = %id,
        number = %number,
        increase = %cost.increase,
        decrease = %cost.decrease,
        "Stock adjustment confirmed"
    );
    Ok(doc)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<stock_adjustments::Model, StoreError> {
    let (doc, next) =
        lock_for::<stock_adjustments::Model>(txn, id, DocumentAction::Unconfirm).await?;
    let details = lines(txn, id).await?;

    // A decrease may have drawn from a layer an increase on this document
    // created, so every draw goes back before any receipt is revoked.
    let (increases, decreases): (Vec<_>, Vec<_>) = details
        .iter()
        .partition(|d| d.quantity_delta.is_sign_positive());
    for detail in decreases {
        fifo::restore(txn, Origin::new(OriginKind::StockAdjustmentDetail, detail.id)).await?;
    }
    for detail in increases {
        fifo::revoke_receipt(txn, Origin::new(OriginKind::StockAdjustmentDetail, detail.id))
            .await?;
    }
    let deltas = per_item(details.iter().map(|d| (d.item_id, -d.quantity_delta)));
    move_stock(txn, &deltas).await?;
    for detail in details {
        let mut active: stock_adjustment_details::ActiveModel = detail.into();
        active.cost_total = Set(None);
        active.update(txn).await?;
    }

    undo(txn, config, Origin::new(OriginKind::StockAdjustment, id)).await?;

    let number = doc.number.clone();
    let mut active: stock_adjustments::ActiveModel = doc.into();
    active.journal_entry_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(stock_adjustment_id = %id, number = %number, "Stock adjustment unconfirmed");
    Ok(doc)
}
