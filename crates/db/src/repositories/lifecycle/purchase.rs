//! Purchases.
//!
//! Every purchase line becomes a cost layer at its net-of-tax unit cost.
//! Unconfirming deletes those layers again, which is only possible while
//! nothing has been drawn from them.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::info;
use tradebook_core::lifecycle::{
    DocumentAction, DocumentKind, LifecycleError, Settlement, TaxBreakdown, non_negative,
    number_prefix, positive_quantity,
};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::{LedgerConfig, round_unit_cost};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::DocumentStatus as DbDocumentStatus;
use crate::entities::{
    payment_details, payments, purchase_details, purchase_return_details, purchase_returns,
    purchases,
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

/// A purchase line.
#[derive(Debug, Clone)]
pub struct PurchaseLineInput {
    /// Item bought.
    pub item_id: Uuid,
    /// Quantity received.
    pub quantity: Decimal,
    /// Unit cost as invoiced (tax-inclusive for inclusive documents).
    pub unit_cost: Decimal,
}

/// Input for creating a purchase draft.
#[derive(Debug, Clone)]
pub struct CreatePurchaseInput {
    /// Purchase date; also the date of the layers it creates.
    pub purchase_date: NaiveDate,
    /// Cash or credit.
    pub settlement: Settlement,
    /// Bank paying for a cash purchase.
    pub bank_id: Option<Uuid>,
    /// Tax percentage.
    pub tax_rate: Decimal,
    /// Whether costs include tax.
    pub tax_inclusive: bool,
    /// Description.
    pub description: Option<String>,
    /// Lines.
    pub lines: Vec<PurchaseLineInput>,
}

/// A purchase with its lines.
pub type PurchaseWithLines = DocumentWithLines<purchases::Model, purchase_details::Model>;

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreatePurchaseInput,
) -> Result<PurchaseWithLines, StoreError> {
    require_lines(DocumentKind::Purchase, &input.lines)?;
    if input.settlement == Settlement::Cash {
        let bank_id = input.bank_id.ok_or(LifecycleError::BankRequired)?;
        ensure_bank(txn, bank_id).await?;
    }

    let mut totals = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        positive_quantity(line.quantity)?;
        non_negative(line.unit_cost)?;
        totals.push(line_total(line.quantity, line.unit_cost));
    }
    let tax = TaxBreakdown::compute(totals.iter().sum(), input.tax_rate, input.tax_inclusive)?;

    let id = Uuid::new_v4();
    let header = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::Purchase),
        input.purchase_date,
        purchases::Column::Number,
        |number| purchases::ActiveModel {
            id: Set(id),
            number: Set(number),
            purchase_date: Set(input.purchase_date),
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
        let detail = purchase_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            purchase_id: Set(id),
            item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            unit_cost: Set(line.unit_cost),
            line_total: Set(total),
        }
        .insert(txn)
        .await?;
        lines.push(detail);
    }

    info!(purchase_id = %id, number = %header.number, total = %header.total, "Purchase drafted");
    Ok(DocumentWithLines { header, lines })
}

pub(super) async fn lines(
    txn: &DatabaseTransaction,
    purchase_id: Uuid,
) -> Result<Vec<purchase_details::Model>, StoreError> {
    Ok(purchase_details::Entity::find()
        .filter(purchase_details::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(purchase_details::Column::Id)
        .all(txn)
        .await?)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<purchases::Model, StoreError> {
    let (purchase, next) = lock_for::<purchases::Model>(txn, id, DocumentAction::Confirm).await?;
    let details = lines(txn, id).await?;
    let tax = TaxBreakdown::compute(purchase.subtotal, purchase.tax_rate, purchase.tax_inclusive)?;

    for detail in &details {
        let unit_cost = round_unit_cost(tax.line_net(detail.line_total) / detail.quantity);
        fifo::receive(
            txn,
            detail.item_id,
            detail.quantity,
            unit_cost,
            purchase.purchase_date,
            Origin::new(OriginKind::PurchaseDetail, detail.id),
        )
        .await?;
    }
    let received = per_item(details.iter().map(|d| (d.item_id, d.quantity)));
    move_stock(txn, &received).await?;

    let settlement = Settlement::from(purchase.settlement);
    let bank =
        settlement_bank(txn, purchase.bank_id.filter(|_| settlement == Settlement::Cash)).await?;
    let accounts = posting_accounts(txn, config).await?;
    let credit_account = settlement.account(bank.as_ref().map(|b| b.account_id), accounts.payable)?;

    let origin = Origin::new(OriginKind::Purchase, id);
    let entry = post(
        txn,
        config,
        purchase.purchase_date,
        origin,
        format!("Purchase {}", purchase.number),
        accounts.purchase(credit_account, &tax),
    )
    .await?;
    if let Some(bank) = &bank {
        record_cash(
            txn,
            bank.id,
            origin,
            purchase.purchase_date,
            Decimal::ZERO,
            tax.total,
            format!("Purchase {}", purchase.number),
        )
        .await?;
    }

    let number = purchase.number.clone();
    let mut active: purchases::ActiveModel = purchase.into();
    active.journal_entry_id = Set(Some(entry.id));
    if bank.is_some() {
        active.paid_amount = Set(tax.total);
    }
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let purchase = active.update(txn).await?;

    info!(purchase_id = %id, number = %number, total = %tax.total, "Purchase confirmed");
    Ok(purchase)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<purchases::Model, StoreError> {
    let (purchase, next) = lock_for::<purchases::Model>(txn, id, DocumentAction::Unconfirm).await?;
    ensure_no_dependents(txn, id, true).await?;

    let details = lines(txn, id).await?;
    for detail in &details {
        fifo::revoke_receipt(txn, Origin::new(OriginKind::PurchaseDetail, detail.id)).await?;
    }
    let withdrawn = per_item(details.iter().map(|d| (d.item_id, -d.quantity)));
    move_stock(txn, &withdrawn).await?;

    undo(txn, config, Origin::new(OriginKind::Purchase, id)).await?;

    let number = purchase.number.clone();
    let mut active: purchases::ActiveModel = purchase.into();
    active.journal_entry_id = Set(None);
    active.paid_amount = Set(Decimal::ZERO);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let purchase = active.update(txn).await?;

    info!(purchase_id = %id, number = %number, "Purchase unconfirmed");
    Ok(purchase)
}

pub(super) async fn delete_draft(txn: &DatabaseTransaction, id: Uuid) -> Result<(), StoreError> {
    ensure_no_dependents(txn, id, false).await?;
    document::delete_draft::<purchases::Model>(txn, id).await
}

async fn ensure_no_dependents(
    txn: &DatabaseTransaction,
    id: Uuid,
    confirmed_only: bool,
) -> Result<(), StoreError> {
    let mut returns =
        purchase_returns::Entity::find().filter(purchase_returns::Column::PurchaseId.eq(id));
    if confirmed_only {
        returns = returns.filter(purchase_returns::Column::Status.eq(DbDocumentStatus::Confirmed));
    }
    if returns.count(txn).await? > 0 {
        return Err(has_dependents(id, DocumentKind::PurchaseReturn));
    }

    let mut paid = payment_details::Entity::find()
        .join(JoinType::InnerJoin, payment_details::Relation::Payments.def())
        .filter(payment_details::Column::PurchaseId.eq(id));
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
        document: DocumentKind::Purchase,
        id,
        dependent,
    }
    .into()
}

/// Quantity of a purchase line already sent back by confirmed returns.
pub(super) async fn returned_quantity(
    txn: &DatabaseTransaction,
    purchase_detail_id: Uuid,
) -> Result<Decimal, StoreError> {
    let rows: Vec<Decimal> = purchase_return_details::Entity::find()
        .select_only()
        .column(purchase_return_details::Column::Quantity)
        .join(
            JoinType::InnerJoin,
            purchase_return_details::Relation::PurchaseReturns.def(),
        )
        .filter(purchase_return_details::Column::PurchaseDetailId.eq(purchase_detail_id))
        .filter(purchase_returns::Column::Status.eq(DbDocumentStatus::Confirmed))
        .into_tuple()
        .all(txn)
        .await?;
    Ok(rows.into_iter().sum())
}
