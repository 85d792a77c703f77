//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Crate-level functions taking a `&DatabaseTransaction` let the lifecycle
//! coordinator compose several repositories inside one transaction.

pub mod account;
pub mod cash;
pub mod error;
pub mod fifo;
pub mod item;
pub mod journal;
pub mod lifecycle;
pub mod numbering;

pub use account::{AccountRepository, CreateAccountInput};
pub use cash::{CashRepository, CreateBankInput, RecordCashInput};
pub use error::StoreError;
pub use fifo::FifoRepository;
pub use item::ItemRepository;
pub use journal::{JournalEntryWithDetails, JournalRepository, PostJournalInput};
pub use lifecycle::{
    AdjustmentLineInput, CreateCashDocumentInput, CreatePaymentInput, CreatePurchaseInput,
    CreatePurchaseReturnInput, CreateSaleInput, CreateSaleReturnInput, CreateStockAdjustmentInput,
    CreateTransferInput, DocumentWithLines, LifecycleCoordinator, PaymentLineInput,
    PaymentWithLines, PurchaseLineInput, PurchaseWithLines, PurchaseReturnWithLines,
    ReturnLineInput, SaleLineInput, SaleReturnWithLines, SaleWithLines, StockAdjustmentWithLines,
};
