//! Purchase returns.
//!
//! Goods going back to the supplier leave stock through the FIFO engine
//! like a sale. The supplier credits the net invoice price; any gap to the
//! FIFO cost lands on inventory variance.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use tradebook_core::lifecycle::{
    DocumentAction, DocumentKind, LifecycleError, Settlement, TaxBreakdown, check_returnable,
    number_prefix, positive_quantity,
};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::LedgerConfig;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::DocumentStatus as DbDocumentStatus;
use crate::entities::{purchase_details, purchase_return_details, purchase_returns, purchases};
use crate::repositories::error::StoreError;
use crate::repositories::fifo;
use crate::repositories::numbering::insert_numbered;

use super::document::{lock, lock_for};
use super::effects::{
    ensure_bank, line_total, move_stock, per_item, post, posting_accounts, record_cash,
    require_lines, settlement_bank, undo,
};
use super::{DocumentWithLines, ReturnLineInput, purchase};

/// Input for creating a purchase return draft.
#[derive(Debug, Clone)]
pub struct CreatePurchaseReturnInput {
    /// Purchase the goods came from; must be confirmed.
    pub purchase_id: Uuid,
    /// Return date; also the date layers are consumed as of.
    pub return_date: NaiveDate,
    /// Refunded in cash or offset against the payable.
    pub settlement: Settlement,
    /// Bank receiving a cash refund.
    pub bank_id: Option<Uuid>,
    /// Description.
    pub description: Option<String>,
    /// Lines, each pointing at a purchase line.
    pub lines: Vec<ReturnLineInput>,
}

/// A purchase return with its lines.
pub type PurchaseReturnWithLines =
    DocumentWithLines<purchase_returns::Model, purchase_return_details::Model>;

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreatePurchaseReturnInput,
) -> Result<PurchaseReturnWithLines, StoreError> {
    require_lines(DocumentKind::PurchaseReturn, &input.lines)?;
    if input.settlement == Settlement::Cash {
        let bank_id = input.bank_id.ok_or(LifecycleError::BankRequired)?;
        ensure_bank(txn, bank_id).await?;
    }

    let source = confirmed_purchase(txn, input.purchase_id, false).await?;
    let bought = purchase_lines(txn, input.purchase_id).await?;
    let requested = input.lines.iter().map(|l| (l.detail_id, l.quantity));
    check_lines(txn, input.purchase_id, &bought, requested).await?;

    let mut totals = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        let detail = source_line(&bought, line.detail_id, input.purchase_id)?;
        totals.push(line_total(line.quantity, detail.unit_cost));
    }
    let tax = TaxBreakdown::compute(totals.iter().sum(), source.tax_rate, source.tax_inclusive)?;

    let id = Uuid::new_v4();
    let header = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::PurchaseReturn),
        input.return_date,
        purchase_returns::Column::Number,
        |number| purchase_returns::ActiveModel {
            id: Set(id),
            number: Set(number),
            purchase_id: Set(input.purchase_id),
            return_date: Set(input.return_date),
            settlement: Set(input.settlement.into()),
            bank_id: Set(input.bank_id),
            tax_rate: Set(tax.rate),
            tax_inclusive: Set(tax.inclusive),
            subtotal: Set(tax.subtotal),
            tax_amount: Set(tax.tax),
            total: Set(tax.total),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            ..Default::default()
        },
    )
    .await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for (line, total) in input.lines.iter().zip(totals) {
        let detail = source_line(&bought, line.detail_id, input.purchase_id)?;
        let row = purchase_return_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            purchase_return_id: Set(id),
            purchase_detail_id: Set(detail.id),
            item_id: Set(detail.item_id),
            quantity: Set(line.quantity),
            unit_price: Set(detail.unit_cost),
            line_total: Set(total),
            cost_total: Set(None),
        }
        .insert(txn)
        .await?;
        lines.push(row);
    }

    info!(
        purchase_return_id = %id,
        number = %header.number,
        purchase_id = %input.purchase_id,
        "Purchase return drafted"
    );
    Ok(DocumentWithLines { header, lines })
}

async fn lines(
    txn: &DatabaseTransaction,
    purchase_return_id: Uuid,
) -> Result<Vec<purchase_return_details::Model>, StoreError> {
    Ok(purchase_return_details::Entity::find()
        .filter(purchase_return_details::Column::PurchaseReturnId.eq(purchase_return_id))
        .order_by_asc(purchase_return_details::Column::Id)
        .all(txn)
        .await?)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<purchase_returns::Model, StoreError> {
    let (ret, next) = lock_for::<purchase_returns::Model>(txn, id, DocumentAction::Confirm).await?;
    confirmed_purchase(txn, ret.purchase_id, true).await?;

    let details = lines(txn, id).await?;
    let bought = purchase_lines(txn, ret.purchase_id).await?;
    let requested = details.iter().map(|d| (d.purchase_detail_id, d.quantity));
    check_lines(txn, ret.purchase_id, &bought, requested).await?;

    let withdrawn = per_item(details.iter().map(|d| (d.item_id, -d.quantity)));
    move_stock(txn, &withdrawn).await?;

    let mut cost = Decimal::ZERO;
    for detail in details {
        let allocation = fifo::consume(
            txn,
            detail.item_id,
            detail.quantity,
            ret.return_date,
            Origin::new(OriginKind::PurchaseReturnDetail, detail.id),
            config.shortfall_cost,
        )
        .await?;
        cost += allocation.total_cost;

        let mut active: purchase_return_details::ActiveModel = detail.into();
        active.cost_total = Set(Some(allocation.total_cost));
        active.update(txn).await?;
    }

    let tax = TaxBreakdown::compute(ret.subtotal, ret.tax_rate, ret.tax_inclusive)?;
    let settlement = Settlement::from(ret.settlement);
    let bank = settlement_bank(txn, ret.bank_id.filter(|_| settlement == Settlement::Cash)).await?;
    let accounts = posting_accounts(txn, config).await?;
    let debit_account =
        settlement.account(bank.as_ref().map(|b| b.account_id), accounts.payable)?;

    let origin = Origin::new(OriginKind::PurchaseReturn, id);
    let entry = post(
        txn,
        config,
        ret.return_date,
        origin,
        format!("Purchase return {}", ret.number),
        accounts.purchase_return(debit_account, &tax, cost),
    )
    .await?;
    if let Some(bank) = &bank {
        record_cash(
            txn,
            bank.id,
            origin,
            ret.return_date,
            tax.total,
            Decimal::ZERO,
            format!("Purchase return {}", ret.number),
        )
        .await?;
    }

    let number = ret.number.clone();
    let mut active: purchase_returns::ActiveModel = ret.into();
    active.journal_entry_id = Set(Some(entry.id));
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let ret = active.update(txn).await?;

    info!(
        purchase_return_id = %id,
        number = %number,
        total = %tax.total,
        cost = %cost,
        "Purchase return confirmed"
    );
    Ok(ret)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<purchase_returns::Model, StoreError> {
    let (ret, next) =
        lock_for::<purchase_returns::Model>(txn, id, DocumentAction::Unconfirm).await?;

    let details = lines(txn, id).await?;
    for detail in &details {
        fifo::restore(txn, Origin::new(OriginKind::PurchaseReturnDetail, detail.id)).await?;
    }
    let restock = per_item(details.iter().map(|d| (d.item_id, d.quantity)));
    move_stock(txn, &restock).await?;
    for detail in details {
        let mut active: purchase_return_details::ActiveModel = detail.into();
        active.cost_total = Set(None);
        active.update(txn).await?;
    }

    undo(txn, config, Origin::new(OriginKind::PurchaseReturn, id)).await?;

    let number = ret.number.clone();
    let mut active: purchase_returns::ActiveModel = ret.into();
    active.journal_entry_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let ret = active.update(txn).await?;

    info!(purchase_return_id = %id, number = %number, "Purchase return unconfirmed");
    Ok(ret)
}

async fn confirmed_purchase(
    txn: &DatabaseTransaction,
    purchase_id: Uuid,
    for_update: bool,
) -> Result<purchases::Model, StoreError> {
    let source: purchases::Model = if for_update {
        lock(txn, purchase_id).await?
    } else {
        purchases::Entity::find_by_id(purchase_id)
            .one(txn)
            .await?
            .ok_or_else(|| StoreError::not_found(DocumentKind::Purchase.as_str(), purchase_id))?
    };
    if source.status != DbDocumentStatus::Confirmed {
        return Err(LifecycleError::SourceNotConfirmed {
            document: DocumentKind::Purchase,
            id: purchase_id,
        }
        .into());
    }
    Ok(source)
}

async fn purchase_lines(
    txn: &DatabaseTransaction,
    purchase_id: Uuid,
) -> Result<HashMap<Uuid, purchase_details::Model>, StoreError> {
    Ok(purchase::lines(txn, purchase_id)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect())
}

async fn check_lines(
    txn: &DatabaseTransaction,
    purchase_id: Uuid,
    bought: &HashMap<Uuid, purchase_details::Model>,
    requested: impl Iterator<Item = (Uuid, Decimal)>,
) -> Result<(), StoreError> {
    let mut per_line: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for (detail_id, quantity) in requested {
        positive_quantity(quantity)?;
        *per_line.entry(detail_id).or_insert(Decimal::ZERO) += quantity;
    }

    for (detail_id, quantity) in per_line {
        let source = source_line(bought, detail_id, purchase_id)?;
        let returned = purchase::returned_quantity(txn, detail_id).await?;
        check_returnable(detail_id, source.quantity, returned, quantity)?;
    }
    Ok(())
}

fn source_line(
    bought: &HashMap<Uuid, purchase_details::Model>,
    detail_id: Uuid,
    purchase_id: Uuid,
) -> Result<&purchase_details::Model, LifecycleError> {
    bought.get(&detail_id).ok_or(LifecycleError::DetailNotInSource {
        detail_id,
        document: DocumentKind::Purchase,
        source_id: purchase_id,
    })
}
