//! Cash in and cash out: money moving through a bank against one GL
//! account, without goods.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use tracing::info;
use tradebook_core::lifecycle::posting::{cash_in, cash_out};
use tradebook_core::lifecycle::{DocumentAction, DocumentKind, LifecycleError, number_prefix};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::LedgerConfig;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::DocumentStatus as DbDocumentStatus;
use crate::entities::{cash_ins, cash_outs};
use crate::repositories::cash::lock_bank;
use crate::repositories::error::StoreError;
use crate::repositories::numbering::insert_numbered;

use super::document::lock_for;
use super::effects::{ensure_bank, post, record_cash, undo};

/// Input for creating a cash in or cash out draft.
#[derive(Debug, Clone)]
pub struct CreateCashDocumentInput {
    /// Transaction date.
    pub transaction_date: NaiveDate,
    /// Bank the money moves through.
    pub bank_id: Uuid,
    /// Counter account: income for cash in, expense for cash out.
    pub account_id: Uuid,
    /// Amount; must be positive.
    pub amount: Decimal,
    /// Description.
    pub description: Option<String>,
}

async fn validate(
    txn: &DatabaseTransaction,
    input: &CreateCashDocumentInput,
) -> Result<(), StoreError> {
    if input.amount <= Decimal::ZERO {
        return Err(LifecycleError::InvalidAmount(input.amount).into());
    }
    ensure_bank(txn, input.bank_id).await
}

pub(super) async fn create_cash_in(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreateCashDocumentInput,
) -> Result<cash_ins::Model, StoreError> {
    validate(txn, &input).await?;
    let id = Uuid::new_v4();
    let doc = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::CashIn),
        input.transaction_date,
        cash_ins::Column::Number,
        |number| cash_ins::ActiveModel {
            id: Set(id),
            number: Set(number),
            transaction_date: Set(input.transaction_date),
            bank_id: Set(input.bank_id),
            account_id: Set(input.account_id),
            amount: Set(input.amount),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            cash_movement_id: Set(None),
            ..Default::default()
        },
    )
    .await?;
    info!(cash_in_id = %id, number = %doc.number, amount = %doc.amount, "Cash in drafted");
    Ok(doc)
}

pub(super) async fn confirm_cash_in(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<cash_ins::Model, StoreError> {
    let (doc, next) = lock_for::<cash_ins::Model>(txn, id, DocumentAction::Confirm).await?;
    let bank = lock_bank(txn, doc.bank_id).await?;
    let origin = Origin::new(OriginKind::CashIn, id);
    let description = doc
        .description
        .clone()
        .unwrap_or_else(|| format!("Cash in {}", doc.number));

    let entry = post(
        txn,
        config,
        doc.transaction_date,
        origin,
        description.clone(),
        cash_in(bank.account_id, doc.account_id, doc.amount),
    )
    .await?;
    let movement = record_cash(
        txn,
        bank.id,
        origin,
        doc.transaction_date,
        doc.amount,
        Decimal::ZERO,
        description,
    )
    .await?;

    let mut active: cash_ins::ActiveModel = doc.into();
    active.journal_entry_id = Set(Some(entry.id));
    active.cash_movement_id = Set(movement.map(|m| m.id));
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(cash_in_id = %id, number = %doc.number, amount = %doc.amount, "Cash in confirmed");
    Ok(doc)
}

pub(super) async fn unconfirm_cash_in(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<cash_ins::Model, StoreError> {
    let (doc, next) = lock_for::<cash_ins::Model>(txn, id, DocumentAction::Unconfirm).await?;
    undo(txn, config, Origin::new(OriginKind::CashIn, id)).await?;

    let mut active: cash_ins::ActiveModel = doc.into();
    active.journal_entry_id = Set(None);
    active.cash_movement_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(cash_in_id = %id, number = %doc.number, "Cash in unconfirmed");
    Ok(doc)
}

pub(super) async fn create_cash_out(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreateCashDocumentInput,
) -> Result<cash_outs::Model, StoreError> {
    validate(txn, &input).await?;
    let id = Uuid::new_v4();
    let doc = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::CashOut),
        input.transaction_date,
        cash_outs::Column::Number,
        |number| cash_outs::ActiveModel {
            id: Set(id),
            number: Set(number),
            transaction_date: Set(input.transaction_date),
            bank_id: Set(input.bank_id),
            account_id: Set(input.account_id),
            amount: Set(input.amount),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            cash_movement_id: Set(None),
            ..Default::default()
        },
    )
    .await?;
    info!(cash_out_id = %id, number = %doc.number, amount = %doc.amount, "Cash out drafted");
    Ok(doc)
}

pub(super) async fn confirm_cash_out(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<cash_outs::Model, StoreError> {
    let (doc, next) = lock_for::<cash_outs::Model>(txn, id, DocumentAction::Confirm).await?;
    let bank = lock_bank(txn, doc.bank_id).await?;
    let origin = Origin::new(OriginKind::CashOut, id);
    let description = doc
        .description
        .clone()
        .unwrap_or_else(|| format!("Cash out {}", doc.number));

    let entry = post(
        txn,
        config,
        doc.transaction_date,
        origin,
        description.clone(),
        cash_out(bank.account_id, doc.account_id, doc.amount),
    )
    .await?;
    let movement = record_cash(
        txn,
        bank.id,
        origin,
        doc.transaction_date,
        Decimal::ZERO,
        doc.amount,
        description,
    )
    .await?;

    let mut active: cash_outs::ActiveModel = doc.into();
    active.journal_entry_id = Set(Some(entry.id));
    active.cash_movement_id = Set(movement.map(|m| m.id));
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(cash_out_id = %id, number = %doc.number, amount = %doc.amount, "Cash out confirmed");
    Ok(doc)
}

pub(super) async fn unconfirm_cash_out(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<cash_outs::Model, StoreError> {
    let (doc, next) = lock_for::<cash_outs::Model>(txn, id, DocumentAction::Unconfirm).await?;
    undo(txn, config, Origin::new(OriginKind::CashOut, id)).await?;

    let mut active: cash_outs::ActiveModel = doc.into();
    active.journal_entry_id = Set(None);
    active.cash_movement_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(cash_out_id = %id, number = %doc.number, "Cash out unconfirmed");
    Ok(doc)
}
