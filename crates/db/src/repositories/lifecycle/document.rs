//! Operations every document header shares: row locking, status moves,
//! cancel and delete.

use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QuerySelect, Select, Set,
};
use tracing::info;
use tradebook_core::lifecycle::{DocumentAction, DocumentKind, DocumentStatus, ensure_deletable};
use uuid::Uuid;

use crate::entities::{
    cash_ins, cash_outs, payments, purchase_returns, purchases, sale_returns, sales,
    stock_adjustments, transfers,
};
use crate::repositories::error::StoreError;

/// A document header row.
pub(crate) trait DocumentRow: Sized + Send + Sync {
    type Entity: EntityTrait<Model = Self>;
    type Active: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send;

    const KIND: DocumentKind;

    fn id(&self) -> Uuid;
    fn status(&self) -> DocumentStatus;
    fn find(id: Uuid) -> Select<Self::Entity>;
    fn set_status(active: &mut Self::Active, status: DocumentStatus);
}

macro_rules! document_row {
    ($module:ident, $kind:expr) => {
        impl DocumentRow for $module::Model {
            type Entity = $module::Entity;
            type Active = $module::ActiveModel;

            const KIND: DocumentKind = $kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn status(&self) -> DocumentStatus {
                self.status.into()
            }

            fn find(id: Uuid) -> Select<Self::Entity> {
                $module::Entity::find_by_id(id)
            }

            fn set_status(active: &mut Self::Active, status: DocumentStatus) {
                active.status = Set(status.into());
                active.updated_at = Set(Utc::now().into());
            }
        }
    };
}

document_row!(sales, DocumentKind::Sale);
document_row!(purchases, DocumentKind::Purchase);
document_row!(sale_returns, DocumentKind::SaleReturn);
document_row!(purchase_returns, DocumentKind::PurchaseReturn);
document_row!(cash_ins, DocumentKind::CashIn);
document_row!(cash_outs, DocumentKind::CashOut);
document_row!(transfers, DocumentKind::Transfer);
document_row!(stock_adjustments, DocumentKind::StockAdjustment);
document_row!(payments, DocumentKind::Payment);

/// Locks a document `FOR UPDATE`.
pub(crate) async fn lock<D: DocumentRow>(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> Result<D, StoreError> {
    D::find(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| StoreError::not_found(D::KIND.as_str(), id))
}

/// Locks a document and checks that `action` applies to its current status.
///
/// Returns the row and the status it moves to.
pub(crate) async fn lock_for<D: DocumentRow>(
    txn: &DatabaseTransaction,
    id: Uuid,
    action: DocumentAction,
) -> Result<(D, DocumentStatus), StoreError> {
    let doc: D = lock(txn, id).await?;
    let next = doc.status().transition(D::KIND, id, action)?;
    Ok((doc, next))
}

/// `draft → cancelled`.
pub(crate) async fn cancel<D>(txn: &DatabaseTransaction, id: Uuid) -> Result<D, StoreError>
where
    D: DocumentRow + IntoActiveModel<D::Active>,
{
    let (doc, next) = lock_for::<D>(txn, id, DocumentAction::Cancel).await?;
    let mut active = doc.into_active_model();
    D::set_status(&mut active, next);
    Ok(active.update(txn).await?)
}

/// Deletes a draft; lines go with it through `ON DELETE CASCADE`.
pub(crate) async fn delete_draft<D>(txn: &DatabaseTransaction, id: Uuid) -> Result<(), StoreError>
where
    D: DocumentRow + IntoActiveModel<D::Active>,
{
    let doc: D = lock(txn, id).await?;
    ensure_deletable(D::KIND, id, doc.status())?;
    let deleted = doc.id();
    doc.into_active_model().delete(txn).await?;
    info!(document = %D::KIND, id = %deleted, "Draft deleted");
    Ok(())
}

/// Current status of a document, without locking it.
pub(crate) async fn status_of<D, C>(conn: &C, id: Uuid) -> Result<DocumentStatus, StoreError>
where
    D: DocumentRow,
    C: ConnectionTrait,
{
    D::find(id)
        .one(conn)
        .await?
        .map(|doc| doc.status())
        .ok_or_else(|| StoreError::not_found(D::KIND.as_str(), id))
}
