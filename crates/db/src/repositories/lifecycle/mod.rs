//! Transaction lifecycle coordinator.
//!
//! Every business document moves `draft → confirmed ⇄ draft` or
//! `draft → cancelled`. Confirming applies all of the document's effects in
//! one database transaction:
//! - nominal stock and FIFO layers
//! - a balanced journal entry
//! - cash movements with running balances
//! - outstanding balances on settled invoices
//!
//! Unconfirming undoes them exactly: consumptions are restored, layers
//! revoked, and journal entries and cash movements reversed.

mod cash_document;
mod document;
mod effects;
mod payment;
mod purchase;
mod purchase_return;
mod sale;
mod sale_return;
mod stock_adjustment;
mod transfer;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tradebook_core::lifecycle::{DocumentKind, DocumentStatus};
use tradebook_shared::LedgerConfig;
use uuid::Uuid;

use crate::entities::{
    cash_ins, cash_outs, overpayments, payments, purchase_returns, purchases, sale_returns, sales,
    stock_adjustments, transfers,
};
use crate::repositories::error::StoreError;

pub use cash_document::CreateCashDocumentInput;
pub use payment::{CreatePaymentInput, PaymentLineInput, PaymentWithLines};
pub use purchase::{CreatePurchaseInput, PurchaseLineInput, PurchaseWithLines};
pub use purchase_return::{CreatePurchaseReturnInput, PurchaseReturnWithLines};
pub use sale::{CreateSaleInput, SaleLineInput, SaleWithLines};
pub use sale_return::{CreateSaleReturnInput, SaleReturnWithLines};
pub use stock_adjustment::{
    AdjustmentLineInput, CreateStockAdjustmentInput, StockAdjustmentWithLines,
};
pub use transfer::CreateTransferInput;

/// A document header with its lines.
#[derive(Debug, Clone)]
pub struct DocumentWithLines<H, L> {
    /// Header row.
    pub header: H,
    /// Lines in insertion order.
    pub lines: Vec<L>,
}

/// A return line pointing at a line of the source sale or purchase.
#[derive(Debug, Clone, Copy)]
pub struct ReturnLineInput {
    /// Sale or purchase line being returned.
    pub detail_id: Uuid,
    /// Quantity returned.
    pub quantity: Decimal,
}

/// Creates, confirms, unconfirms, cancels and deletes business documents.
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator {
    db: DatabaseConnection,
    config: LedgerConfig,
}

impl LifecycleCoordinator {
    /// Creates a new coordinator.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Creates a sale draft.
    pub async fn create_sale(&self, input: CreateSaleInput) -> Result<SaleWithLines, StoreError> {
        let txn = self.db.begin().await?;
        let created = sale::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a purchase draft.
    pub async fn create_purchase(
        &self,
        input: CreatePurchaseInput,
    ) -> Result<PurchaseWithLines, StoreError> {
        let txn = self.db.begin().await?;
        let created = purchase::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a sale return draft against a confirmed sale.
    pub async fn create_sale_return(
        &self,
        input: CreateSaleReturnInput,
    ) -> Result<SaleReturnWithLines, StoreError> {
        let txn = self.db.begin().await?;
        let created = sale_return::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a purchase return draft against a confirmed purchase.
    pub async fn create_purchase_return(
        &self,
        input: CreatePurchaseReturnInput,
    ) -> Result<PurchaseReturnWithLines, StoreError> {
        let txn = self.db.begin().await?;
        let created = purchase_return::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a cash in draft.
    pub async fn create_cash_in(
        &self,
        input: CreateCashDocumentInput,
    ) -> Result<cash_ins::Model, StoreError> {
        let txn = self.db.begin().await?;
        let created = cash_document::create_cash_in(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a cash out draft.
    pub async fn create_cash_out(
        &self,
        input: CreateCashDocumentInput,
    ) -> Result<cash_outs::Model, StoreError> {
        let txn = self.db.begin().await?;
        let created = cash_document::create_cash_out(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a transfer draft.
    pub async fn create_transfer(
        &self,
        input: CreateTransferInput,
    ) -> Result<transfers::Model, StoreError> {
        let txn = self.db.begin().await?;
        let created = transfer::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a stock adjustment draft.
    pub async fn create_stock_adjustment(
        &self,
        input: CreateStockAdjustmentInput,
    ) -> Result<StockAdjustmentWithLines, StoreError> {
        let txn = self.db.begin().await?;
        let created = stock_adjustment::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Creates a payment draft.
    pub async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<PaymentWithLines, StoreError> {
        let txn = self.db.begin().await?;
        let created = payment::create(&txn, &self.config, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Confirms a draft and applies its effects.
    ///
    /// # Errors
    ///
    /// Fails without side effects on any rule violation: wrong status,
    /// insufficient stock, an unbalanced or invalid posting, an unknown bank.
    pub async fn confirm(&self, kind: DocumentKind, id: Uuid) -> Result<DocumentStatus, StoreError> {
        let txn = self.db.begin().await?;
        let status = confirm_in(&txn, &self.config, kind, id).await?;
        txn.commit().await?;
        Ok(status)
    }

    /// Returns a confirmed document to draft, undoing its effects.
    pub async fn unconfirm(
        &self,
        kind: DocumentKind,
        id: Uuid,
    ) -> Result<DocumentStatus, StoreError> {
        let txn = self.db.begin().await?;
        let status = unconfirm_in(&txn, &self.config, kind, id).await?;
        txn.commit().await?;
        Ok(status)
    }

    /// Cancels a draft.
    pub async fn cancel(&self, kind: DocumentKind, id: Uuid) -> Result<DocumentStatus, StoreError> {
        let txn = self.db.begin().await?;
        let status = match kind {
            DocumentKind::Sale => document::cancel::<sales::Model>(&txn, id).await?.status,
            DocumentKind::Purchase => document::cancel::<purchases::Model>(&txn, id).await?.status,
            DocumentKind::SaleReturn => {
                document::cancel::<sale_returns::Model>(&txn, id).await?.status
            }
            DocumentKind::PurchaseReturn => {
                document::cancel::<purchase_returns::Model>(&txn, id).await?.status
            }
            DocumentKind::CashIn => document::cancel::<cash_ins::Model>(&txn, id).await?.status,
            DocumentKind::CashOut => document::cancel::<cash_outs::Model>(&txn, id).await?.status,
            DocumentKind::Transfer => document::cancel::<transfers::Model>(&txn, id).await?.status,
            DocumentKind::StockAdjustment => {
                document::cancel::<stock_adjustments::Model>(&txn, id).await?.status
            }
            DocumentKind::Payment => document::cancel::<payments::Model>(&txn, id).await?.status,
        };
        txn.commit().await?;
        Ok(status.into())
    }

    /// Deletes a draft with its lines.
    pub async fn delete_draft(&self, kind: DocumentKind, id: Uuid) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        match kind {
            DocumentKind::Sale => sale::delete_draft(&txn, id).await?,
            DocumentKind::Purchase => purchase::delete_draft(&txn, id).await?,
            DocumentKind::SaleReturn => document::delete_draft::<sale_returns::Model>(&txn, id).await?,
            DocumentKind::PurchaseReturn => {
                document::delete_draft::<purchase_returns::Model>(&txn, id).await?;
            }
            DocumentKind::CashIn => document::delete_draft::<cash_ins::Model>(&txn, id).await?,
            DocumentKind::CashOut => document::delete_draft::<cash_outs::Model>(&txn, id).await?,
            DocumentKind::Transfer => document::delete_draft::<transfers::Model>(&txn, id).await?,
            DocumentKind::StockAdjustment => {
                document::delete_draft::<stock_adjustments::Model>(&txn, id).await?;
            }
            DocumentKind::Payment => document::delete_draft::<payments::Model>(&txn, id).await?,
        }
        txn.commit().await?;
        Ok(())
    }

    /// Current status of a document.
    pub async fn status(&self, kind: DocumentKind, id: Uuid) -> Result<DocumentStatus, StoreError> {
        let db = &self.db;
        match kind {
            DocumentKind::Sale => document::status_of::<sales::Model, _>(db, id).await,
            DocumentKind::Purchase => document::status_of::<purchases::Model, _>(db, id).await,
            DocumentKind::SaleReturn => document::status_of::<sale_returns::Model, _>(db, id).await,
            DocumentKind::PurchaseReturn => {
                document::status_of::<purchase_returns::Model, _>(db, id).await
            }
            DocumentKind::CashIn => document::status_of::<cash_ins::Model, _>(db, id).await,
            DocumentKind::CashOut => document::status_of::<cash_outs::Model, _>(db, id).await,
            DocumentKind::Transfer => document::status_of::<transfers::Model, _>(db, id).await,
            DocumentKind::StockAdjustment => {
                document::status_of::<stock_adjustments::Model, _>(db, id).await
            }
            DocumentKind::Payment => document::status_of::<payments::Model, _>(db, id).await,
        }
    }

    /// Refunds a pending overpayment through `bank_id`.
    pub async fn refund_overpayment(
        &self,
        overpayment_id: Uuid,
        bank_id: Uuid,
        refund_date: NaiveDate,
    ) -> Result<overpayments::Model, StoreError> {
        let txn = self.db.begin().await?;
        let resolved = payment::refund(&txn, &self.config, overpayment_id, bank_id, refund_date).await?;
        txn.commit().await?;
        Ok(resolved)
    }

    /// Takes a pending overpayment to other income.
    pub async fn convert_overpayment_to_income(
        &self,
        overpayment_id: Uuid,
        entry_date: NaiveDate,
    ) -> Result<overpayments::Model, StoreError> {
        let txn = self.db.begin().await?;
        let resolved = payment::convert_to_income(&txn, &self.config, overpayment_id, entry_date).await?;
        txn.commit().await?;
        Ok(resolved)
    }

    /// The overpayment a confirmed receipt left behind, if any.
    pub async fn overpayment_for(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<overpayments::Model>, StoreError> {
        Ok(overpayments::Entity::find()
            .filter(overpayments::Column::PaymentId.eq(payment_id))
            .one(&self.db)
            .await?)
    }
}

async fn confirm_in(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    kind: DocumentKind,
    id: Uuid,
) -> Result<DocumentStatus, StoreError> {
    let status = match kind {
        DocumentKind::Sale => sale::confirm(txn, config, id).await?.status,
        DocumentKind::Purchase => purchase::confirm(txn, config, id).await?.status,
        DocumentKind::SaleReturn => sale_return::confirm(txn, config, id).await?.status,
        DocumentKind::PurchaseReturn => purchase_return::confirm(txn, config, id).await?.status,
        DocumentKind::CashIn => cash_document::confirm_cash_in(txn, config, id).await?.status,
        DocumentKind::CashOut => cash_document::confirm_cash_out(txn, config, id).await?.status,
        DocumentKind::Transfer => transfer::confirm(txn, config, id).await?.status,
        DocumentKind::StockAdjustment => stock_adjustment::confirm(txn, config, id).await?.status,
        DocumentKind::Payment => payment::confirm(txn, config, id).await?.status,
    };
    Ok(status.into())
}

async fn unconfirm_in(
    txn: &DatabaseTransaction,
    config: &LedgerConfig,
    kind: DocumentKind,
    id: Uuid,
) -> Result<DocumentStatus, StoreError> {
    let status = match kind {
        DocumentKind::Sale => sale::unconfirm(txn, config, id).await?.status,
        DocumentKind::Purchase => purchase::unconfirm(txn, config, id).await?.status,
        DocumentKind::SaleReturn => sale_return::unconfirm(txn, config, id).await?.status,
        DocumentKind::PurchaseReturn => purchase_return::unconfirm(txn, config, id).await?.status,
        DocumentKind::CashIn => cash_document::unconfirm_cash_in(txn, config, id).await?.status,
        DocumentKind::CashOut => cash_document::unconfirm_cash_out(txn, config, id).await?.status,
        DocumentKind::Transfer => transfer::unconfirm(txn, config, id).await?.status,
        DocumentKind::StockAdjustment => stock_adjustment::unconfirm(txn, config, id).await?.status,
        DocumentKind::Payment => payment::unconfirm(txn, config, id).await?.status,
    };
    Ok(status.into())
}
