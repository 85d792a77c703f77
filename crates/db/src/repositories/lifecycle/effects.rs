//! Ledger effects shared by the document kinds.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseTransaction, EntityTrait};
use tracing::debug;
use tradebook_core::cash::CashError;
use tradebook_core::ledger::JournalLine;
use tradebook_core::lifecycle::{DocumentKind, LifecycleError, PostingAccounts, check_stock};
use tradebook_core::origin::Origin;
use tradebook_shared::{LedgerConfig, round_money};
use uuid::Uuid;

use crate::entities::{banks, cash_movements, journal_entries};
use crate::repositories::account::resolve_posting_accounts;
use crate::repositories::cash::{self, RecordCashInput};
use crate::repositories::error::StoreError;
use crate::repositories::item::{lock_items, shift_stock};
use crate::repositories::journal::{self, PostJournalInput};

/// Resolves the configured posting accounts inside the transaction.
pub(super) async fn posting_accounts(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
) -> Result<PostingAccounts, StoreError> {
    resolve_posting_accounts(txn, &config.posting_accounts).await
}

/// Posts the document's journal entry.
pub(super) async fn post(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    entry_date: NaiveDate,
    origin: Origin,
    description: String,
    lines: Vec<JournalLine>,
) -> Result<journal_entries::Model, StoreError> {
    let posted = journal::post(
        txn,
        &config.numbering,
        PostJournalInput {
            entry_date,
            origin: Some(origin),
            description,
            lines,
        },
    )
    .await?;
    Ok(posted.entry)
}

/// Records a bank movement; nothing is recorded for a zero amount.
pub(super) async fn record_cash(
    txn: &DatabaseTransaction,
    bank_id: Uuid,
    origin: Origin,
    movement_date: NaiveDate,
    debit: Decimal,
    credit: Decimal,
    description: String,
) -> Result<Option<cash_movements::Model>, StoreError> {
    if debit.is_zero() && credit.is_zero() {
        return Ok(None);
    }
    let movement = cash::record(
        txn,
        RecordCashInput {
            bank_id,
            origin,
            movement_date,
            debit,
            credit,
            description,
        },
    )
    .await?;
    Ok(Some(movement))
}

/// Reverses every journal entry and cash movement `origin` produced.
pub(super) async fn undo(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    origin: Origin,
) -> Result<(), StoreError> {
    let entries = journal::reverse_for_origin(txn, &config.numbering, origin).await?;
    let movements = cash::reverse_for_origin(txn, origin).await?;
    debug!(
        %origin,
        entries = entries.len(),
        movements = movements.len(),
        "Ledger effects reversed"
    );
    Ok(())
}

/// Locks the settlement bank of a cash-settled document.
pub(super) async fn settlement_bank(
    txn: &DatabaseTransaction,
    bank_id: Option<Uuid>,
) -> Result<Option<banks::Model>, StoreError> {
    match bank_id {
        Some(id) => Ok(Some(cash::lock_bank(txn, id).await?)),
        None => Ok(None),
    }
}

/// Checks that a bank exists.
pub(super) async fn ensure_bank<C: ConnectionTrait>(conn: &C, bank_id: Uuid) -> Result<(), StoreError> {
    banks::Entity::find_by_id(bank_id)
        .one(conn)
        .await?
        .ok_or(CashError::BankNotFound(bank_id))?;
    Ok(())
}

/// `quantity × price`, rounded to cents.
pub(super) fn line_total(quantity: Decimal, price: Decimal) -> Decimal {
    round_money(quantity * price)
}

/// Sums quantities per item; iteration order is the lock order.
pub(super) fn per_item(lines: impl IntoIterator<Item = (Uuid, Decimal)>) -> BTreeMap<Uuid, Decimal> {
    let mut totals = BTreeMap::new();
    for (item_id, quantity) in lines {
        *totals.entry(item_id).or_insert(Decimal::ZERO) += quantity;
    }
    totals
}

/// Applies per-item nominal stock deltas, rejecting any that would go negative.
pub(super) async fn move_stock(
    txn: &DatabaseTransaction,
    deltas: &BTreeMap<Uuid, Decimal>,
) -> Result<(), StoreError> {
    let ids: Vec<Uuid> = deltas.keys().copied().collect();
    let items = lock_items(txn, &ids).await?;

    for (item_id, delta) in deltas {
        let item = items
            .get(item_id)
            .ok_or_else(|| StoreError::not_found("item", *item_id))?;
        if delta.is_sign_negative() {
            check_stock(*item_id, -*delta, item.stock)?;
        }
        if !delta.is_zero() {
            shift_stock(txn, item, *delta).await?;
        }
    }
    Ok(())
}

/// Rejects a document without lines.
pub(super) fn require_lines<T>(kind: DocumentKind, lines: &[T]) -> Result<(), LifecycleError> {
    if lines.is_empty() {
        return Err(LifecycleError::NoLines(kind));
    }
    Ok(())
}
