//! Origin references.
//!
//! Every layer, FIFO mapping, journal entry and cash movement records the
//! document (or document line) that caused it as an `(origin_type, origin_id)`
//! pair. Unconfirming a document finds its effects through that pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of document or document line an effect originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// Sale header.
    Sale,
    /// Sale line.
    SaleDetail,
    /// Purchase header.
    Purchase,
    /// Purchase line.
    PurchaseDetail,
    /// Sale return header.
    SaleReturn,
    /// Sale return line.
    SaleReturnDetail,
    /// Purchase return header.
    PurchaseReturn,
    /// Purchase return line.
    PurchaseReturnDetail,
    /// Cash received into a bank.
    CashIn,
    /// Cash paid out of a bank.
    CashOut,
    /// Bank-to-bank transfer.
    Transfer,
    /// Stock adjustment header.
    StockAdjustment,
    /// Stock adjustment line.
    StockAdjustmentDetail,
    /// Payment against sales or purchases.
    Payment,
    /// Resolution of a customer overpayment.
    Overpayment,
    /// Opening stock for an item.
    OpeningBalance,
    /// Journal entry posted directly, without a business document.
    ManualJournal,
}

impl OriginKind {
    /// Returns the persisted string for this origin kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::SaleDetail => "sale_detail",
            Self::Purchase => "purchase",
            Self::PurchaseDetail => "purchase_detail",
            Self::SaleReturn => "sale_return",
            Self::SaleReturnDetail => "sale_return_detail",
            Self::PurchaseReturn => "purchase_return",
            Self::PurchaseReturnDetail => "purchase_return_detail",
            Self::CashIn => "cash_in",
            Self::CashOut => "cash_out",
            Self::Transfer => "transfer",
            Self::StockAdjustment => "stock_adjustment",
            Self::StockAdjustmentDetail => "stock_adjustment_detail",
            Self::Payment => "payment",
            Self::Overpayment => "overpayment",
            Self::OpeningBalance => "opening_balance",
            Self::ManualJournal => "manual_journal",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown origin kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown origin kind: {0}")]
pub struct UnknownOriginKind(pub String);

impl FromStr for OriginKind {
    type Err = UnknownOriginKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sale" => Self::Sale,
            "sale_detail" => Self::SaleDetail,
            "purchase" => Self::Purchase,
            "purchase_detail" => Self::PurchaseDetail,
            "sale_return" => Self::SaleReturn,
            "sale_return_detail" => Self::SaleReturnDetail,
            "purchase_return" => Self::PurchaseReturn,
            "purchase_return_detail" => Self::PurchaseReturnDetail,
            "cash_in" => Self::CashIn,
            "cash_out" => Self::CashOut,
            "transfer" => Self::Transfer,
            "stock_adjustment" => Self::StockAdjustment,
            "stock_adjustment_detail" => Self::StockAdjustmentDetail,
            "payment" => Self::Payment,
            "overpayment" => Self::Overpayment,
            "opening_balance" => Self::OpeningBalance,
            "manual_journal" => Self::ManualJournal,
            other => return Err(UnknownOriginKind(other.to_string())),
        })
    }
}

/// A reference to the document or line that caused a ledger effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Kind of the originating record.
    pub kind: OriginKind,
    /// Id of the originating record.
    pub id: Uuid,
}

impl Origin {
    /// Creates a new origin reference.
    #[must_use]
    pub const fn new(kind: OriginKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OriginKind; 17] = [
        OriginKind::Sale,
        OriginKind::SaleDetail,
        OriginKind::Purchase,
        OriginKind::PurchaseDetail,
        OriginKind::SaleReturn,
        OriginKind::SaleReturnDetail,
        OriginKind::PurchaseReturn,
        OriginKind::PurchaseReturnDetail,
        OriginKind::CashIn,
        OriginKind::CashOut,
        OriginKind::Transfer,
        OriginKind::StockAdjustment,
        OriginKind::StockAdjustmentDetail,
        OriginKind::Payment,
        OriginKind::Overpayment,
        OriginKind::OpeningBalance,
        OriginKind::ManualJournal,
    ];

    #[test]
    fn test_parse_matches_as_str() {
        for kind in ALL {
            assert_eq!(kind.as_str().parse::<OriginKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(
            "invoice".parse::<OriginKind>(),
            Err(UnknownOriginKind("invoice".to_string()))
        );
    }

    #[test]
    fn test_display() {
        let id = Uuid::nil();
        assert_eq!(
            Origin::new(OriginKind::SaleDetail, id).to_string(),
            format!("sale_detail:{id}")
        );
    }
}
