//! Bank-to-bank transfers.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use tracing::info;
use tradebook_core::lifecycle::posting::transfer;
use tradebook_core::lifecycle::{DocumentAction, DocumentKind, LifecycleError, number_prefix};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::LedgerConfig;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::DocumentStatus as DbDocumentStatus;
use crate::entities::transfers;
use crate::repositories::cash::lock_banks;
use crate::repositories::error::StoreError;
use crate::repositories::numbering::insert_numbered;

use super::document::lock_for;
use super::effects::{ensure_bank, post, record_cash, undo};

/// Input for creating a transfer draft.
#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    /// Transfer date.
    pub transfer_date: NaiveDate,
    /// Bank the money leaves.
    pub from_bank_id: Uuid,
    /// Bank the money enters.
    pub to_bank_id: Uuid,
    /// Amount; must be positive.
    pub amount: Decimal,
    /// Description.
    pub description: Option<String>,
}

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreateTransferInput,
) -> Result<transfers::Model, StoreError> {
    if input.from_bank_id == input.to_bank_id {
        return Err(LifecycleError::SameBank(input.from_bank_id).into());
    }
    if input.amount <= Decimal::ZERO {
        return Err(LifecycleError::InvalidAmount(input.amount).into());
    }
    ensure_bank(txn, input.from_bank_id).await?;
    ensure_bank(txn, input.to_bank_id).await?;

    let id = Uuid::new_v4();
    let doc = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::Transfer),
        input.transfer_date,
        transfers::Column::Number,
        |number| transfers::ActiveModel {
            id: Set(id),
            number: Set(number),
            transfer_date: Set(input.transfer_date),
            from_bank_id: Set(input.from_bank_id),
            to_bank_id: Set(input.to_bank_id),
            amount: Set(input.amount),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            ..Default::default()
        },
    )
    .await?;
    info!(transfer_id = %id, number = %doc.number, amount = %doc.amount, "Transfer drafted");
    Ok(doc)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<transfers::Model, StoreError> {
    let (doc, next) = lock_for::<transfers::Model>(txn, id, DocumentAction::Confirm).await?;
    let banks = lock_banks(txn, &[doc.from_bank_id, doc.to_bank_id]).await?;
    let account_of = |bank_id: Uuid| {
        banks
            .iter()
            .find(|b| b.id == bank_id)
            .map(|b| b.account_id)
            .ok_or_else(|| StoreError::not_found("bank", bank_id))
    };
    let from_account = account_of(doc.from_bank_id)?;
    let to_account = account_of(doc.to_bank_id)?;

    let origin = Origin::new(OriginKind::Transfer, id);
    let description = doc
        .description
        .clone()
        .unwrap_or_else(|| format!("Transfer {}", doc.number));
    let entry = post(
        txn,
        config,
        doc.transfer_date,
        origin,
        description.clone(),
        transfer(from_account, to_account, doc.amount),
    )
    .await?;
    record_cash(
        txn,
        doc.from_bank_id,
        origin,
        doc.transfer_date,
        Decimal::ZERO,
        doc.amount,
        description.clone(),
    )
    .await?;
    record_cash(
        txn,
        doc.to_bank_id,
        origin,
        doc.transfer_date,
        doc.amount,
        Decimal::ZERO,
        description,
    )
    .await?;

    let mut active: transfers::ActiveModel = doc.into();
    active.journal_entry_id = Set(Some(entry.id));
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(
        transfer_id = %id,
        number = %doc.number,
        from_bank_id = %doc.from_bank_id,
        to_bank_id = %doc.to_bank_id,
        amount = %doc.amount,
        "Transfer confirmed"
    );
    Ok(doc)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<transfers::Model, StoreError> {
    let (doc, next) = lock_for::<transfers::Model>(txn, id, DocumentAction::Unconfirm).await?;
    lock_banks(txn, &[doc.from_bank_id, doc.to_bank_id]).await?;
    undo(txn, config, Origin::new(OriginKind::Transfer, id)).await?;

    let mut active: transfers::ActiveModel = doc.into();
    active.journal_entry_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let doc = active.update(txn).await?;

    info!(transfer_id = %id, number = %doc.number, "Transfer unconfirmed");
    Ok(doc)
}
