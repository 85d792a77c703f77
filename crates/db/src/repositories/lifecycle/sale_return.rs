//! Sale returns.
//!
//! Returned goods re-enter stock as a fresh layer priced at the average
//! FIFO cost the sale line was charged, so the cost of goods sold comes
//! back out at the value it went in.

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
use tradebook_shared::{LedgerConfig, round_money, round_unit_cost};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::DocumentStatus as DbDocumentStatus;
use crate::entities::{sale_details, sale_return_details, sale_returns, sales};
use crate::repositories::error::StoreError;
use crate::repositories::fifo;
use crate::repositories::numbering::insert_numbered;

use super::document::{lock, lock_for};
use super::effects::{
    ensure_bank, line_total, move_stock, per_item, post, posting_accounts, record_cash,
    require_lines, settlement_bank, undo,
};
use super::{DocumentWithLines, ReturnLineInput, sale};

/// Input for creating a sale return draft.
#[derive(Debug, Clone)]
pub struct CreateSaleReturnInput {
    /// Sale the goods came from; must be confirmed.
    pub sale_id: Uuid,
    /// Return date; also the date of the layers it creates.
    pub return_date: NaiveDate,
    /// Refund in cash or credit the receivable.
    pub settlement: Settlement,
    /// Bank paying a cash refund.
    pub bank_id: Option<Uuid>,
    /// Description.
    pub description: Option<String>,
    /// Lines, each pointing at a sale line.
    pub lines: Vec<ReturnLineInput>,
}

/// A sale return with its lines.
pub type SaleReturnWithLines = DocumentWithLines<sale_returns::Model, sale_return_details::Model>;

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreateSaleReturnInput,
) -> Result<SaleReturnWithLines, StoreError> {
    require_lines(DocumentKind::SaleReturn, &input.lines)?;
    if input.settlement == Settlement::Cash {
        let bank_id = input.bank_id.ok_or(LifecycleError::BankRequired)?;
        ensure_bank(txn, bank_id).await?;
    }

    let source = confirmed_sale(txn, input.sale_id, false).await?;
    let sold = sale_lines(txn, input.sale_id).await?;
    let requested = input.lines.iter().map(|l| (l.detail_id, l.quantity));
    check_lines(txn, input.sale_id, &sold, requested).await?;

    let mut totals = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        let detail = source_line(&sold, line.detail_id, input.sale_id)?;
        totals.push(line_total(line.quantity, detail.unit_price));
    }
    let tax = TaxBreakdown::compute(totals.iter().sum(), source.tax_rate, source.tax_inclusive)?;

    let id = Uuid::new_v4();
    let header = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::SaleReturn),
        input.return_date,
        sale_returns::Column::Number,
        |number| sale_returns::ActiveModel {
            id: Set(id),
            number: Set(number),
            sale_id: Set(input.sale_id),
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
        let detail = source_line(&sold, line.detail_id, input.sale_id)?;
        let row = sale_return_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            sale_return_id: Set(id),
            sale_detail_id: Set(detail.id),
            item_id: Set(detail.item_id),
            quantity: Set(line.quantity),
            unit_price: Set(detail.unit_price),
            line_total: Set(total),
            unit_cost: Set(None),
        }
        .insert(txn)
        .await?;
        lines.push(row);
    }

    info!(
        sale_return_id = %id,
        number = %header.number,
        sale_id = %input.sale_id,
        "Sale return drafted"
    );
    Ok(DocumentWithLines { header, lines })
}

async fn lines(
    txn: &DatabaseTransaction,
    sale_return_id: Uuid,
) -> Result<Vec<sale_return_details::Model>, StoreError> {
    Ok(sale_return_details::Entity::find()
        .filter(sale_return_details::Column::SaleReturnId.eq(sale_return_id))
        .order_by_asc(sale_return_details::Column::Id)
        .all(txn)
        .await?)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<sale_returns::Model, StoreError> {
    let (ret, next) = lock_for::<sale_returns::Model>(txn, id, DocumentAction::Confirm).await?;
    confirmed_sale(txn, ret.sale_id, true).await?;

    let details = lines(txn, id).await?;
    let sold = sale_lines(txn, ret.sale_id).await?;
    let requested = details.iter().map(|d| (d.sale_detail_id, d.quantity));
    check_lines(txn, ret.sale_id, &sold, requested).await?;

    let mut cost = Decimal::ZERO;
    for detail in &details {
        let source = source_line(&sold, detail.sale_detail_id, ret.sale_id)?;
        let unit_cost = source
            .cost_total
            .map_or(Decimal::ZERO, |total| round_unit_cost(total / source.quantity));
        fifo::receive(
            txn,
            detail.item_id,
            detail.quantity,
            unit_cost,
            ret.return_date,
            Origin::new(OriginKind::SaleReturnDetail, detail.id),
        )
        .await?;
        cost += round_money(detail.quantity * unit_cost);

        let mut active: sale_return_details::ActiveModel = detail.clone().into();
        active.unit_cost = Set(Some(unit_cost));
        active.update(txn).await?;
    }
    let restock = per_item(details.iter().map(|d| (d.item_id, d.quantity)));
    move_stock(txn, &restock).await?;

    let tax = TaxBreakdown::compute(ret.subtotal, ret.tax_rate, ret.tax_inclusive)?;
    let settlement = Settlement::from(ret.settlement);
    let bank = settlement_bank(txn, ret.bank_id.filter(|_| settlement == Settlement::Cash)).await?;
    let accounts = posting_accounts(txn, config).await?;
    let credit_account =
        settlement.account(bank.as_ref().map(|b| b.account_id), accounts.receivable)?;

    let origin = Origin::new(OriginKind::SaleReturn, id);
    let entry = post(
        txn,
        config,
        ret.return_date,
        origin,
        format!("Sale return {}", ret.number),
        accounts.sale_return(credit_account, &tax, cost),
    )
    .await?;
    if let Some(bank) = &bank {
        record_cash(
            txn,
            bank.id,
            origin,
            ret.return_date,
            Decimal::ZERO,
            tax.total,
            format!("Sale return {}", ret.number),
        )
        .await?;
    }

    let number = ret.number.clone();
    let mut active: sale_returns::ActiveModel = ret.into();
    active.journal_entry_id = Set(Some(entry.id));
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let ret = active.update(txn).await?;

    info!(
        sale_return_id = %id,
        number = %number,
        total = %tax.total,
        cost = %cost,
        "Sale return confirmed"
    );
    Ok(ret)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<sale_returns::Model, StoreError> {
    let (ret, next) = lock_for::<sale_returns::Model>(txn, id, DocumentAction::Unconfirm).await?;

    let details = lines(txn, id).await?;
    for detail in &details {
        fifo::revoke_receipt(txn, Origin::new(OriginKind::SaleReturnDetail, detail.id)).await?;
    }
    let withdrawn = per_item(details.iter().map(|d| (d.item_id, -d.quantity)));
    move_stock(txn, &withdrawn).await?;
    for detail in details {
        let mut active: sale_return_details::ActiveModel = detail.into();
        active.unit_cost = Set(None);
        active.update(txn).await?;
    }

    undo(txn, config, Origin::new(OriginKind::SaleReturn, id)).await?;

    let number = ret.number.clone();
    let mut active: sale_returns::ActiveModel = ret.into();
    active.journal_entry_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let ret = active.update(txn).await?;

    info!(sale_return_id = %id, number = %number, "Sale return unconfirmed");
    Ok(ret)
}

/// Loads the source sale, locking it when `for_update`; it must be confirmed.
async fn confirmed_sale(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
    for_update: bool,
) -> Result<sales::Model, StoreError> {
    let source: sales::Model = if for_update {
        lock(txn, sale_id).await?
    } else {
        sales::Entity::find_by_id(sale_id)
            .one(txn)
            .await?
            .ok_or_else(|| StoreError::not_found(DocumentKind::Sale.as_str(), sale_id))?
    };
    if source.status != DbDocumentStatus::Confirmed {
        return Err(LifecycleError::SourceNotConfirmed {
            document: DocumentKind::Sale,
            id: sale_id,
        }
        .into());
    }
    Ok(source)
}

async fn sale_lines(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
) -> Result<HashMap<Uuid, sale_details::Model>, StoreError> {
    Ok(sale::lines(txn, sale_id)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect())
}

/// Checks each requested quantity against what is still returnable.
async fn check_lines(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
    sold: &HashMap<Uuid, sale_details::Model>,
    requested: impl Iterator<Item = (Uuid, Decimal)>,
) -> Result<(), StoreError> {
    let mut per_line: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for (detail_id, quantity) in requested {
        positive_quantity(quantity)?;
        *per_line.entry(detail_id).or_insert(Decimal::ZERO) += quantity;
    }

    for (detail_id, quantity) in per_line {
        let source = source_line(sold, detail_id, sale_id)?;
        let returned = sale::returned_quantity(txn, detail_id).await?;
        check_returnable(detail_id, source.quantity, returned, quantity)?;
    }
    Ok(())
}

fn source_line(
    sold: &HashMap<Uuid, sale_details::Model>,
    detail_id: Uuid,
    sale_id: Uuid,
) -> Result<&sale_details::Model, LifecycleError> {
    sold.get(&detail_id).ok_or(LifecycleError::DetailNotInSource {
        detail_id,
        document: DocumentKind::Sale,
        source_id: sale_id,
    })
}
