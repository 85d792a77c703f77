//! `SeaORM` active enums mapped to the Postgres enum types.
//!
//! Each enum converts to and from its counterpart in `tradebook-core`, so
//! repositories hand the pure logic its own types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tradebook_core::{ledger, lifecycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "journal_status")]
pub enum JournalStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "document_status")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "settlement_type")]
pub enum SettlementType {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "credit")]
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_direction")]
pub enum PaymentDirection {
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "disbursement")]
    Disbursement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "overpayment_status")]
pub enum OverpaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "refunded")]
    Refunded,
    #[sea_orm(string_value = "converted_to_income")]
    ConvertedToIncome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "profit_status")]
pub enum ProfitStatus {
    #[sea_orm(string_value = "realized")]
    Realized,
    #[sea_orm(string_value = "unrealized")]
    Unrealized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "bank_type")]
pub enum BankType {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "bank")]
    Bank,
}

// ============================================================
// CONVERSIONS TO AND FROM CORE TYPES
// ============================================================

impl From<AccountType> for ledger::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Income => Self::Income,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<ledger::AccountType> for AccountType {
    fn from(value: ledger::AccountType) -> Self {
        match value {
            ledger::AccountType::Asset => Self::Asset,
            ledger::AccountType::Liability => Self::Liability,
            ledger::AccountType::Equity => Self::Equity,
            ledger::AccountType::Income => Self::Income,
            ledger::AccountType::Expense => Self::Expense,
        }
    }
}

impl From<JournalStatus> for ledger::JournalStatus {
    fn from(value: JournalStatus) -> Self {
        match value {
            JournalStatus::Draft => Self::Draft,
            JournalStatus::Posted => Self::Posted,
            JournalStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<DocumentStatus> for lifecycle::DocumentStatus {
    fn from(value: DocumentStatus) -> Self {
        match value {
            DocumentStatus::Draft => Self::Draft,
            DocumentStatus::Confirmed => Self::Confirmed,
            DocumentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<lifecycle::DocumentStatus> for DocumentStatus {
    fn from(value: lifecycle::DocumentStatus) -> Self {
        match value {
            lifecycle::DocumentStatus::Draft => Self::Draft,
            lifecycle::DocumentStatus::Confirmed => Self::Confirmed,
            lifecycle::DocumentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<SettlementType> for lifecycle::Settlement {
    fn from(value: SettlementType) -> Self {
        match value {
            SettlementType::Cash => Self::Cash,
            SettlementType::Credit => Self::Credit,
        }
    }
}

impl From<lifecycle::Settlement> for SettlementType {
    fn from(value: lifecycle::Settlement) -> Self {
        match value {
            lifecycle::Settlement::Cash => Self::Cash,
            lifecycle::Settlement::Credit => Self::Credit,
        }
    }
}

impl From<PaymentDirection> for lifecycle::PaymentDirection {
    fn from(value: PaymentDirection) -> Self {
        match value {
            PaymentDirection::Receipt => Self::Receipt,
            PaymentDirection::Disbursement => Self::Disbursement,
        }
    }
}

impl From<lifecycle::PaymentDirection> for PaymentDirection {
    fn from(value: lifecycle::PaymentDirection) -> Self {
        match value {
            lifecycle::PaymentDirection::Receipt => Self::Receipt,
            lifecycle::PaymentDirection::Disbursement => Self::Disbursement,
        }
    }
}

impl From<OverpaymentStatus> for lifecycle::OverpaymentStatus {
    fn from(value: OverpaymentStatus) -> Self {
        match value {
            OverpaymentStatus::Pending => Self::Pending,
            OverpaymentStatus::Refunded => Self::Refunded,
            OverpaymentStatus::ConvertedToIncome => Self::ConvertedToIncome,
        }
    }
}

impl From<lifecycle::OverpaymentStatus> for OverpaymentStatus {
    fn from(value: lifecycle::OverpaymentStatus) -> Self {
        match value {
            lifecycle::OverpaymentStatus::Pending => Self::Pending,
            lifecycle::OverpaymentStatus::Refunded => Self::Refunded,
            lifecycle::OverpaymentStatus::ConvertedToIncome => Self::ConvertedToIncome,
        }
    }
}

impl From<lifecycle::ProfitStatus> for ProfitStatus {
    fn from(value: lifecycle::ProfitStatus) -> Self {
        match value {
            lifecycle::ProfitStatus::Realized => Self::Realized,
            lifecycle::ProfitStatus::Unrealized => Self::Unrealized,
        }
    }
}
