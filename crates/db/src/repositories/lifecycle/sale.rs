//! Sales.
//!
//! Confirming a sale draws each line's quantity from the item's layers,
//! records the line's cost and profit, takes the goods off nominal stock
//! and posts revenue, output tax and cost of goods sold. A cash sale also
//! records the money coming into its bank.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::info;
use tradebook_core::lifecycle::{
    DocumentAction, DocumentKind, LifecycleError, Settlement, TaxBreakdown,
    line_profit, non_negative, number_prefix, positive_quantity,
};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::LedgerConfig;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::{DocumentStatus as DbDocumentStatus, ProfitStatus};
use crate::entities::{
    payment_details, payments, sale_details, sale_return_details, sale_returns, sales,
};
use crate::repositories::error::StoreError;
use crate::repositories::fifo;
use crate::repositories::numbering::insert_numbered;

use super::DocumentWithLines;
use super::document::{self, lock_for};
use super::effects::{
    ensure_bank, line_total, move_stock, per_item, post, posting_accounts, record_cash,
    require_lines, settlement_bank, undo,
};

/// A sale line.
#[derive(Debug, Clone)]
pub struct SaleLineInput {
    /// Item sold.
    pub item_id: Uuid,
    /// Quantity sold.
    pub quantity: Decimal,
    /// Unit price as entered (tax-inclusive for inclusive documents).
    pub unit_price: Decimal,
}

/// Input for creating a sale draft.
#[derive(Debug, Clone)]
pub struct CreateSaleInput {
    /// Sale date; also the date layers are consumed as of.
    pub sale_date: NaiveDate,
    /// Cash or credit.
    pub settlement: Settlement,
    /// Bank receiving the money for a cash sale.
    pub bank_id: Option<Uuid>,
    /// Tax percentage.
    pub tax_rate: Decimal,
    /// Whether prices include tax.
    pub tax_inclusive: bool,
    /// Description.
    pub description: Option<String>,
    /// Lines.
    pub lines: Vec<SaleLineInput>,
}

/// A sale with its lines.
pub type SaleWithLines = DocumentWithLines<sales::Model, sale_details::Model>;

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreateSaleInput,
) -> Result<SaleWithLines, StoreError> {
    require_lines(DocumentKind::Sale, &input.lines)?;
    if input.settlement == Settlement::Cash {
        let bank_id = input.bank_id.ok_or(LifecycleError::BankRequired)?;
        ensure_bank(txn, bank_id).await?;
    }

    let mut totals = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        positive_quantity(line.quantity)?;
        non_negative(line.unit_price)?;
        totals.push(line_total(line.quantity, line.unit_price));
    }
    let tax = TaxBreakdown::compute(totals.iter().sum(), input.tax_rate, input.tax_inclusive)?;

    let id = Uuid::new_v4();
    let header = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::Sale),
        input.sale_date,
        sales::Column::Number,
        |number| sales::ActiveModel {
            id: Set(id),
            number: Set(number),
            sale_date: Set(input.sale_date),
            settlement: Set(input.settlement.into()),
            bank_id: Set(input.bank_id),
            tax_rate: Set(tax.rate),
            tax_inclusive: Set(tax.inclusive),
            subtotal: Set(tax.subtotal),
            tax_amount: Set(tax.tax),
            total: Set(tax.total),
            paid_amount: Set(Decimal::ZERO),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            ..Default::default()
        },
    )
    .await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for (line, total) in input.lines.iter().zip(totals) {
        let detail = sale_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            sale_id: Set(id),
            item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(total),
            cost_total: Set(None),
            profit: Set(None),
            profit_status: Set(None),
        }
        .insert(txn)
        .await?;
        lines.push(detail);
    }

    info!(sale_id = %id, number = %header.number, total = %header.total, "Sale drafted");
    Ok(DocumentWithLines { header, lines })
}

pub(super) async fn lines(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
) -> Result<Vec<sale_details::Model>, StoreError> {
    Ok(sale_details::Entity::find()
        .filter(sale_details::Column::SaleId.eq(sale_id))
        .order_by_asc(sale_details::Column::Id)
        .all(txn)
        .await?)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<sales::Model, StoreError> {
    let (sale, next) = lock_for::<sales::Model>(txn, id, DocumentAction::Confirm).await?;
    let details = lines(txn, id).await?;

    let required = per_item(details.iter().map(|d| (d.item_id, -d.quantity)));
    move_stock(txn, &required).await?;

    let tax = TaxBreakdown::compute(sale.subtotal, sale.tax_rate, sale.tax_inclusive)?;
    let mut cost = Decimal::ZERO;
    let mut estimated = 0usize;
    for detail in details {
        let origin = Origin::new(OriginKind::SaleDetail, detail.id);
        let allocation = fifo::consume(
            txn,
            detail.item_id,
            detail.quantity,
            sale.sale_date,
            origin,
            config.shortfall_cost,
        )
        .await?;
        let (profit, status) = line_profit(
            tax.line_net(detail.line_total),
            allocation.total_cost,
            allocation.is_estimated(),
        );
        cost += allocation.total_cost;
        if allocation.is_estimated() {
            estimated += 1;
        }

        let mut active: sale_details::ActiveModel = detail.into();
        active.cost_total = Set(Some(allocation.total_cost));
        active.profit = Set(Some(profit));
        active.profit_status = Set(Some(ProfitStatus::from(status)));
        active.update(txn).await?;
    }

    let settlement = Settlement::from(sale.settlement);
    let bank = settlement_bank(txn, sale.bank_id.filter(|_| settlement == Settlement::Cash)).await?;
    let accounts = posting_accounts(txn, config).await?;
    let debit_account =
        settlement.account(bank.as_ref().map(|b| b.account_id), accounts.receivable)?;

    let origin = Origin::new(OriginKind::Sale, id);
    let entry = post(
        txn,
        config,
        sale.sale_date,
        origin,
        format!("Sale {}", sale.number),
        accounts.sale(debit_account, &tax, cost),
    )
    .await?;
    if let Some(bank) = &bank {
        record_cash(
            txn,
            bank.id,
            origin,
            sale.sale_date,
            tax.total,
            Decimal::ZERO,
            format!("Sale {}", sale.number),
        )
        .await?;
    }

    let number = sale.number.clone();
    let mut active: sales::ActiveModel = sale.into();
    active.journal_entry_id = Set(Some(entry.id));
    if bank.is_some() {
        active.paid_amount = Set(tax.total);
    }
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let sale = active.update(txn).await?;

    info!(
        sale_id = %id,
        number = %number,
        total = %tax.total,
        cost = %cost,
        estimated_lines = estimated,
        "Sale confirmed"
    );
    Ok(sale)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<sales::Model, StoreError> {
    let (sale, next) = lock_for::<sales::Model>(txn, id, DocumentAction::Unconfirm).await?;
    ensure_no_dependents(txn, id, true).await?;

    let details = lines(txn, id).await?;
    for detail in &details {
        fifo::restore(txn, Origin::new(OriginKind::SaleDetail, detail.id)).await?;
    }
    let restock = per_item(details.iter().map(|d| (d.item_id, d.quantity)));
    move_stock(txn, &restock).await?;
    for detail in details {
        let mut active: sale_details::ActiveModel = detail.into();
        active.cost_total = Set(None);
        active.profit = Set(None);
        active.profit_status = Set(None);
        active.update(txn).await?;
    }

    undo(txn, config, Origin::new(OriginKind::Sale, id)).await?;

    let number = sale.number.clone();
    let mut active: sales::ActiveModel = sale.into();
    active.journal_entry_id = Set(None);
    active.paid_amount = Set(Decimal::ZERO);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let sale = active.update(txn).await?;

    info!(sale_id = %id, number = %number, "Sale unconfirmed");
    Ok(sale)
}

pub(super) async fn delete_draft(txn: &DatabaseTransaction, id: Uuid) -> Result<(), StoreError> {
    ensure_no_dependents(txn, id, false).await?;
    document::delete_draft::<sales::Model>(txn, id).await
}

/// Rejects while returns or payments reference the sale; with
/// `confirmed_only` drafts and cancelled documents are ignored.
async fn ensure_no_dependents(
    txn: &DatabaseTransaction,
    id: Uuid,
    confirmed_only: bool,
) -> Result<(), StoreError> {
    let mut returns = sale_returns::Entity::find().filter(sale_returns::Column::SaleId.eq(id));
    if confirmed_only {
        returns = returns.filter(sale_returns::Column::Status.eq(DbDocumentStatus::Confirmed));
    }
    if returns.count(txn).await? > 0 {
        return Err(has_dependents(id, DocumentKind::SaleReturn));
    }

    let mut paid = payment_details::Entity::find()
        .join(JoinType::InnerJoin, payment_details::Relation::Payments.def())
        .filter(payment_details::Column::SaleId.eq(id));
    if confirmed_only {
        paid = paid.filter(payments::Column::Status.eq(DbDocumentStatus::Confirmed));
    }
    if paid.count(txn).await? > 0 {
        return Err(has_dependents(id, DocumentKind::Payment));
    }
    Ok(())
}

fn has_dependents(id: Uuid, dependent: DocumentKind) -> StoreError {
    LifecycleError::HasDependents {
        document: DocumentKind::Sale,
        id,
        dependent,
    }
    .into()
}

/// Quantity of a sale line already taken back by confirmed returns.
pub(super) async fn returned_quantity(
    txn: &DatabaseTransaction,
    sale_detail_id: Uuid,
) -> Result<Decimal, StoreError> {
    let rows: Vec<Decimal> = sale_return_details::Entity::find()
        .select_only()
        .column(sale_return_details::Column::Quantity)
        .join(
            JoinType::InnerJoin,
            sale_return_details::Relation::SaleReturns.def(),
        )
        .filter(sale_return_details::Column::SaleDetailId.eq(sale_detail_id))
        .filter(sale_returns::Column::Status.eq(DbDocumentStatus::Confirmed))
        .into_tuple()
        .all(txn)
        .await?;
    Ok(rows.into_iter().sum())
}
