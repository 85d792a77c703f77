//! Payments and overpayments.
//!
//! A receipt settles confirmed sales and a disbursement settles confirmed
//! purchases, each line at most up to the document's outstanding amount.
//! Whatever a receipt brings in beyond its lines is held as a pending
//! overpayment until it is refunded or taken to income.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{info, warn};
use tradebook_core::lifecycle::{
    DocumentAction, DocumentKind, LifecycleError, OverpaymentAction, OverpaymentStatus,
    PaymentDirection, check_outstanding, number_prefix, split_payment,
};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::LedgerConfig;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::{
    DocumentStatus as DbDocumentStatus, OverpaymentStatus as DbOverpaymentStatus,
};
use crate::entities::{overpayments, payment_details, payments, purchases, sales};
use crate::repositories::cash::lock_bank;
use crate::repositories::error::StoreError;
use crate::repositories::numbering::insert_numbered;

use super::DocumentWithLines;
use super::document::{lock, lock_for};
use super::effects::{ensure_bank, post, posting_accounts, record_cash, undo};

/// A payment line settling one sale or purchase.
#[derive(Debug, Clone)]
pub struct PaymentLineInput {
    /// Sale for a receipt, purchase for a disbursement.
    pub document_id: Uuid,
    /// Amount applied to the document.
    pub amount: Decimal,
}

/// Input for creating a payment draft.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Receipt from a customer or disbursement to a supplier.
    pub direction: PaymentDirection,
    /// Bank the money moves through.
    pub bank_id: Uuid,
    /// Amount received or paid.
    pub amount: Decimal,
    /// Description.
    pub description: Option<String>,
    /// Lines.
    pub lines: Vec<PaymentLineInput>,
}

/// A payment with its lines.
pub type PaymentWithLines = DocumentWithLines<payments::Model, payment_details::Model>;

pub(super) async fn create(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    input: CreatePaymentInput,
) -> Result<PaymentWithLines, StoreError> {
    for line in &input.lines {
        if line.amount <= Decimal::ZERO {
            return Err(LifecycleError::InvalidAmount(line.amount).into());
        }
    }
    let applied: Decimal = input.lines.iter().map(|l| l.amount).sum();
    let split = split_payment(input.direction, input.amount, applied)?;
    ensure_bank(txn, input.bank_id).await?;

    for line in &input.lines {
        let exists = match input.direction {
            PaymentDirection::Receipt => {
                sales::Entity::find_by_id(line.document_id).one(txn).await?.is_some()
            }
            PaymentDirection::Disbursement => {
                purchases::Entity::find_by_id(line.document_id).one(txn).await?.is_some()
            }
        };
        if !exists {
            return Err(StoreError::not_found(
                input.direction.settles().as_str(),
                line.document_id,
            ));
        }
    }

    let id = Uuid::new_v4();
    let header = insert_numbered(
        txn,
        &config.numbering,
        number_prefix(DocumentKind::Payment),
        input.payment_date,
        payments::Column::Number,
        |number| payments::ActiveModel {
            id: Set(id),
            number: Set(number),
            payment_date: Set(input.payment_date),
            direction: Set(input.direction.into()),
            bank_id: Set(input.bank_id),
            amount: Set(input.amount),
            applied_amount: Set(split.applied),
            description: Set(input.description.clone()),
            status: Set(DbDocumentStatus::Draft),
            journal_entry_id: Set(None),
            ..Default::default()
        },
    )
    .await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for line in &input.lines {
        let (sale_id, purchase_id) = match input.direction {
            PaymentDirection::Receipt => (Some(line.document_id), None),
            PaymentDirection::Disbursement => (None, Some(line.document_id)),
        };
        let row = payment_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            payment_id: Set(id),
            sale_id: Set(sale_id),
            purchase_id: Set(purchase_id),
            amount: Set(line.amount),
        }
        .insert(txn)
        .await?;
        lines.push(row);
    }

    info!(
        payment_id = %id,
        number = %header.number,
        amount = %header.amount,
        applied = %split.applied,
        "Payment drafted"
    );
    Ok(DocumentWithLines { header, lines })
}

async fn lines(
    txn: &DatabaseTransaction,
    payment_id: Uuid,
) -> Result<Vec<payment_details::Model>, StoreError> {
    Ok(payment_details::Entity::find()
        .filter(payment_details::Column::PaymentId.eq(payment_id))
        .order_by_asc(payment_details::Column::Id)
        .all(txn)
        .await?)
}

/// Amount per settled document, keyed in lock order.
fn per_document(
    direction: PaymentDirection,
    details: &[payment_details::Model],
) -> Result<BTreeMap<Uuid, Decimal>, LifecycleError> {
    let mut totals = BTreeMap::new();
    for detail in details {
        let document_id = match (direction, detail.sale_id, detail.purchase_id) {
            (PaymentDirection::Receipt, Some(id), None)
            | (PaymentDirection::Disbursement, None, Some(id)) => id,
            _ => return Err(LifecycleError::PaymentDirectionMismatch),
        };
        *totals.entry(document_id).or_insert(Decimal::ZERO) += detail.amount;
    }
    Ok(totals)
}

/// Moves `paid_amount` of every settled document by `sign × amount`.
///
/// Raising checks each amount against the outstanding balance of a
/// confirmed document.
async fn settle(
    txn: &DatabaseTransaction,
    direction: PaymentDirection,
    amounts: &BTreeMap<Uuid, Decimal>,
    raise: bool,
) -> Result<(), StoreError> {
    let kind = direction.settles();
    for (&document_id, &amount) in amounts {
        match direction {
            PaymentDirection::Receipt => {
                let sale: sales::Model = lock(txn, document_id).await?;
                let paid = next_paid(
                    kind,
                    document_id,
                    sale.status,
                    sale.total,
                    sale.paid_amount,
                    amount,
                    raise,
                )?;
                let mut active: sales::ActiveModel = sale.into();
                active.paid_amount = Set(paid);
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await?;
            }
            PaymentDirection::Disbursement => {
                let purchase: purchases::Model = lock(txn, document_id).await?;
                let paid = next_paid(
                    kind,
                    document_id,
                    purchase.status,
                    purchase.total,
                    purchase.paid_amount,
                    amount,
                    raise,
                )?;
                let mut active: purchases::ActiveModel = purchase.into();
                active.paid_amount = Set(paid);
                active.updated_at = Set(Utc::now().into());
                active.update(txn).await?;
            }
        }
    }
    Ok(())
}

fn next_paid(
    kind: DocumentKind,
    id: Uuid,
    status: DbDocumentStatus,
    total: Decimal,
    paid: Decimal,
    amount: Decimal,
    raise: bool,
) -> Result<Decimal, LifecycleError> {
    if !raise {
        return Ok((paid - amount).max(Decimal::ZERO));
    }
    if status != DbDocumentStatus::Confirmed {
        return Err(LifecycleError::SourceNotConfirmed { document: kind, id });
    }
    check_outstanding(kind, id, total, paid, amount)?;
    Ok(paid + amount)
}

pub(super) async fn confirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<payments::Model, StoreError> {
    let (payment, next) = lock_for::<payments::Model>(txn, id, DocumentAction::Confirm).await?;
    let direction = PaymentDirection::from(payment.direction);
    let details = lines(txn, id).await?;
    let amounts = per_document(direction, &details)?;
    let applied: Decimal = amounts.values().copied().sum();
    let split = split_payment(direction, payment.amount, applied)?;

    settle(txn, direction, &amounts, true).await?;

    let bank = lock_bank(txn, payment.bank_id).await?;
    let accounts = posting_accounts(txn, config).await?;
    let (journal_lines, debit, credit) = match direction {
        PaymentDirection::Receipt => (
            accounts.payment_receipt(bank.account_id, split.applied, split.excess),
            payment.amount,
            Decimal::ZERO,
        ),
        PaymentDirection::Disbursement => (
            accounts.payment_disbursement(bank.account_id, payment.amount),
            Decimal::ZERO,
            payment.amount,
        ),
    };

    let origin = Origin::new(OriginKind::Payment, id);
    let description = format!("Payment {}", payment.number);
    let entry = post(
        txn,
        config,
        payment.payment_date,
        origin,
        description.clone(),
        journal_lines,
    )
    .await?;
    record_cash(txn, bank.id, origin, payment.payment_date, debit, credit, description).await?;

    if split.has_excess() {
        overpayments::ActiveModel {
            id: Set(Uuid::new_v4()),
            payment_id: Set(id),
            amount: Set(split.excess),
            status: Set(DbOverpaymentStatus::Pending),
            journal_entry_id: Set(None),
            cash_movement_id: Set(None),
            resolved_at: Set(None),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        info!(payment_id = %id, excess = %split.excess, "Overpayment held");
    }

    let mut active: payments::ActiveModel = payment.into();
    active.journal_entry_id = Set(Some(entry.id));
    active.applied_amount = Set(split.applied);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(txn).await?;

    info!(
        payment_id = %id,
        number = %payment.number,
        amount = %payment.amount,
        applied = %split.applied,
        "Payment confirmed"
    );
    Ok(payment)
}

pub(super) async fn unconfirm(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    id: Uuid,
) -> Result<payments::Model, StoreError> {
    let (payment, next) = lock_for::<payments::Model>(txn, id, DocumentAction::Unconfirm).await?;
    let direction = PaymentDirection::from(payment.direction);

    let held = overpayments::Entity::find()
        .filter(overpayments::Column::PaymentId.eq(id))
        .lock_exclusive()
        .one(txn)
        .await?;
    if let Some(held) = held {
        let status = OverpaymentStatus::from(held.status);
        if status != OverpaymentStatus::Pending {
            warn!(payment_id = %id, %status, "Unconfirm blocked by resolved overpayment");
            return Err(LifecycleError::OverpaymentResolved {
                payment_id: id,
                status,
            }
            .into());
        }
        overpayments::Entity::delete_by_id(held.id).exec(txn).await?;
    }

    let details = lines(txn, id).await?;
    let amounts = per_document(direction, &details)?;
    settle(txn, direction, &amounts, false).await?;

    lock_bank(txn, payment.bank_id).await?;
    undo(txn, config, Origin::new(OriginKind::Payment, id)).await?;

    let mut active: payments::ActiveModel = payment.into();
    active.journal_entry_id = Set(None);
    active.status = Set(next.into());
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(txn).await?;

    info!(payment_id = %id, number = %payment.number, "Payment unconfirmed");
    Ok(payment)
}

async fn lock_overpayment(
    txn: &DatabaseTransaction,
    overpayment_id: Uuid,
    action: OverpaymentAction,
) -> Result<(overpayments::Model, OverpaymentStatus), StoreError> {
    let held = overpayments::Entity::find_by_id(overpayment_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| StoreError::not_found("overpayment", overpayment_id))?;
    let next = OverpaymentStatus::from(held.status).transition(overpayment_id, action)?;
    Ok((held, next))
}

pub(super) async fn refund(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    overpayment_id: Uuid,
    bank_id: Uuid,
    refund_date: NaiveDate,
) -> Result<overpayments::Model, StoreError> {
    let (held, next) = lock_overpayment(txn, overpayment_id, OverpaymentAction::Refund).await?;
    let bank = lock_bank(txn, bank_id).await?;
    let accounts = posting_accounts(txn, config).await?;

    let origin = Origin::new(OriginKind::Overpayment, overpayment_id);
    let description = format!("Overpayment refund for payment {}", held.payment_id);
    let entry = post(
        txn,
        config,
        refund_date,
        origin,
        description.clone(),
        accounts.overpayment_refund(bank.account_id, held.amount),
    )
    .await?;
    let movement = record_cash(
        txn,
        bank.id,
        origin,
        refund_date,
        Decimal::ZERO,
        held.amount,
        description,
    )
    .await?;

    let mut active: overpayments::ActiveModel = held.into();
    active.status = Set(next.into());
    active.journal_entry_id = Set(Some(entry.id));
    active.cash_movement_id = Set(movement.map(|m| m.id));
    active.resolved_at = Set(Some(Utc::now().into()));
    let held = active.update(txn).await?;

    info!(overpayment_id = %overpayment_id, bank_id = %bank_id, amount = %held.amount, "Overpayment refunded");
    Ok(held)
}

pub(super) async fn convert_to_income(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    overpayment_id: Uuid,
    entry_date: NaiveDate,
) -> Result<overpayments::Model, StoreError> {
    let (held, next) =
        lock_overpayment(txn, overpayment_id, OverpaymentAction::ConvertToIncome).await?;
    let accounts = posting_accounts(txn, config).await?;

    let entry = post(
        txn,
        config,
        entry_date,
        Origin::new(OriginKind::Overpayment, overpayment_id),
        format!("Overpayment of payment {} taken to income", held.payment_id),
        accounts.overpayment_to_income(held.amount),
    )
    .await?;

    let mut active: overpayments::ActiveModel = held.into();
    active.status = Set(next.into());
    active.journal_entry_id = Set(Some(entry.id));
    active.resolved_at = Set(Some(Utc::now().into()));
    let held = active.update(txn).await?;

    info!(overpayment_id = %overpayment_id, amount = %held.amount, "Overpayment converted to income");
    Ok(held)
}
