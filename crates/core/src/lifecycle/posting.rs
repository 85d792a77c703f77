//! Posting rules.
//!
//! Each business event maps to a fixed set of journal lines. Lines whose
//! amount is zero are dropped; everything else is one line per effect,
//! never netted against another line on the same account.
//!
//! | Event | Debit | Credit |
//! |---|---|---|
//! | Sale | settlement = total; COGS = cost | revenue = net; tax payable = tax; inventory = cost |
//! | Purchase | inventory = net; tax receivable = tax | settlement = total |
//! | Sale return | sales returns = net; tax payable = tax; inventory = cost | settlement = total; COGS = cost |
//! | Purchase return | settlement = total; variance = cost - net | tax receivable = tax; inventory = cost; variance = net - cost |
//! | Cash in | bank | counter account |
//! | Cash out | counter account | bank |
//! | Transfer | destination bank | source bank |
//! | Stock adjustment | inventory (+); counter (-) | counter (+); inventory (-) |
//! | Payment receipt | bank = amount | receivable = applied; deposits = excess |
//! | Payment disbursement | payable | bank |
//! | Overpayment refund | deposits | bank |
//! | Overpayment to income | deposits | other income |

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::{JournalLine, drop_zero_lines};

use super::tax::TaxBreakdown;

/// Ids of the fixed accounts the posting rules hit.
///
/// Resolved from the configured account codes inside the posting transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingAccounts {
    /// Accounts receivable.
    pub receivable: Uuid,
    /// Accounts payable.
    pub payable: Uuid,
    /// Sales revenue.
    pub sales_revenue: Uuid,
    /// Sales returns (contra-revenue).
    pub sales_returns: Uuid,
    /// Output tax.
    pub tax_payable: Uuid,
    /// Input tax.
    pub tax_receivable: Uuid,
    /// Inventory asset.
    pub inventory: Uuid,
    /// Cost of goods sold.
    pub cogs: Uuid,
    /// Inventory variance.
    pub inventory_variance: Uuid,
    /// Customer deposits liability.
    pub customer_deposits: Uuid,
    /// Other income.
    pub other_income: Uuid,
}

/// Inventory value moved by a stock adjustment, split by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockAdjustmentCost {
    /// Value received onto new layers.
    pub increase: Decimal,
    /// FIFO cost consumed from existing layers.
    pub decrease: Decimal,
}

impl PostingAccounts {
    /// Sale confirmation. `settlement` is the bank's GL account for a cash
    /// sale, the receivable account for a credit sale.
    #[must_use]
    pub fn sale(&self, settlement: Uuid, tax: &TaxBreakdown, cost: Decimal) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(settlement, tax.total),
            JournalLine::credit(self.sales_revenue, tax.net).with_memo("Sales revenue"),
            JournalLine::credit(self.tax_payable, tax.tax).with_memo("Output tax"),
            JournalLine::debit(self.cogs, cost).with_memo("Cost of goods sold"),
            JournalLine::credit(self.inventory, cost).with_memo("Inventory"),
        ])
    }

    /// Purchase confirmation.
    #[must_use]
    pub fn purchase(&self, settlement: Uuid, tax: &TaxBreakdown) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(self.inventory, tax.net).with_memo("Inventory"),
            JournalLine::debit(self.tax_receivable, tax.tax).with_memo("Input tax"),
            JournalLine::credit(settlement, tax.total),
        ])
    }

    /// Sale return confirmation; `cost` is the value put back on layers.
    #[must_use]
    pub fn sale_return(&self, settlement: Uuid, tax: &TaxBreakdown, cost: Decimal) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(self.sales_returns, tax.net).with_memo("Sales returns"),
            JournalLine::debit(self.tax_payable, tax.tax).with_memo("Output tax"),
            JournalLine::credit(settlement, tax.total),
            JournalLine::debit(self.inventory, cost).with_memo("Inventory"),
            JournalLine::credit(self.cogs, cost).with_memo("Cost of goods sold"),
        ])
    }

    /// Purchase return confirmation; `cost` is the FIFO cost consumed.
    ///
    /// The goods leave inventory at their FIFO cost while the supplier
    /// credits the net price; the difference goes to inventory variance.
    #[must_use]
    pub fn purchase_return(
        &self,
        settlement: Uuid,
        tax: &TaxBreakdown,
        cost: Decimal,
    ) -> Vec<JournalLine> {
        let loss = (cost - tax.net).max(Decimal::ZERO);
        let gain = (tax.net - cost).max(Decimal::ZERO);
        drop_zero_lines(vec![
            JournalLine::debit(settlement, tax.total),
            JournalLine::credit(self.tax_receivable, tax.tax).with_memo("Input tax"),
            JournalLine::credit(self.inventory, cost).with_memo("Inventory"),
            JournalLine::debit(self.inventory_variance, loss).with_memo("Inventory variance"),
            JournalLine::credit(self.inventory_variance, gain).with_memo("Inventory variance"),
        ])
    }

    /// Stock adjustment confirmation against the document's counter account.
    #[must_use]
    pub fn stock_adjustment(&self, counter: Uuid, cost: StockAdjustmentCost) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(self.inventory, cost.increase).with_memo("Stock increase"),
            JournalLine::credit(counter, cost.increase),
            JournalLine::debit(counter, cost.decrease),
            JournalLine::credit(self.inventory, cost.decrease).with_memo("Stock decrease"),
        ])
    }

    /// Customer receipt: the applied part settles receivables, the excess is
    /// held as a customer deposit.
    #[must_use]
    pub fn payment_receipt(&self, bank: Uuid, applied: Decimal, excess: Decimal) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(bank, applied + excess),
            JournalLine::credit(self.receivable, applied).with_memo("Receivable settled"),
            JournalLine::credit(self.customer_deposits, excess).with_memo("Overpayment"),
        ])
    }

    /// Supplier disbursement.
    #[must_use]
    pub fn payment_disbursement(&self, bank: Uuid, amount: Decimal) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(self.payable, amount).with_memo("Payable settled"),
            JournalLine::credit(bank, amount),
        ])
    }

    /// Overpayment refunded through a bank.
    #[must_use]
    pub fn overpayment_refund(&self, bank: Uuid, amount: Decimal) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(self.customer_deposits, amount).with_memo("Overpayment refund"),
            JournalLine::credit(bank, amount),
        ])
    }

    /// Overpayment recognized as other income.
    #[must_use]
    pub fn overpayment_to_income(&self, amount: Decimal) -> Vec<JournalLine> {
        drop_zero_lines(vec![
            JournalLine::debit(self.customer_deposits, amount).with_memo("Overpayment to income"),
            JournalLine::credit(self.other_income, amount),
        ])
    }
}

/// Cash received: debit the bank, credit the document's account.
#[must_use]
pub fn cash_in(bank: Uuid, counter: Uuid, amount: Decimal) -> Vec<JournalLine> {
    drop_zero_lines(vec![
        JournalLine::debit(bank, amount),
        JournalLine::credit(counter, amount),
    ])
}

/// Cash paid: debit the document's account, credit the bank.
#[must_use]
pub fn cash_out(bank: Uuid, counter: Uuid, amount: Decimal) -> Vec<JournalLine> {
    drop_zero_lines(vec![
        JournalLine::debit(counter, amount),
        JournalLine::credit(bank, amount),
    ])
}

/// Transfer: debit the destination bank, credit the source bank.
#[must_use]
pub fn transfer(from_bank: Uuid, to_bank: Uuid, amount: Decimal) -> Vec<JournalLine> {
    drop_zero_lines(vec![
        JournalLine::debit(to_bank, amount),
        JournalLine::credit(from_bank, amount),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::ledger::{JournalTotals, validate_lines};

    pub(super) fn accounts() -> PostingAccounts {
        PostingAccounts {
            receivable: Uuid::new_v4(),
            payable: Uuid::new_v4(),
            sales_revenue: Uuid::new_v4(),
            sales_returns: Uuid::new_v4(),
            tax_payable: Uuid::new_v4(),
            tax_receivable: Uuid::new_v4(),
            inventory: Uuid::new_v4(),
            cogs: Uuid::new_v4(),
            inventory_variance: Uuid::new_v4(),
            customer_deposits: Uuid::new_v4(),
            other_income: Uuid::new_v4(),
        }
    }

    fn amount_on(lines: &[JournalLine], account: Uuid) -> (Decimal, Decimal) {
        lines
            .iter()
            .filter(|l| l.account_id == account)
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), l| (d + l.debit, c + l.credit))
    }

    #[test]
    fn test_credit_sale_with_fifo_cost() {
        let acc = accounts();
        let tax = TaxBreakdown::compute(dec!(1000000), dec!(11), true).unwrap();
        let lines = acc.sale(acc.receivable, &tax, dec!(1240));

        assert_eq!(amount_on(&lines, acc.receivable), (dec!(1000000), Decimal::ZERO));
        let revenue = amount_on(&lines, acc.sales_revenue).1;
        let output_tax = amount_on(&lines, acc.tax_payable).1;
        assert_eq!(revenue + output_tax, dec!(1000000));
        assert_eq!(amount_on(&lines, acc.cogs), (dec!(1240), Decimal::ZERO));
        assert_eq!(amount_on(&lines, acc.inventory), (Decimal::ZERO, dec!(1240)));
        assert!(validate_lines(&lines).is_ok());
    }

    #[test]
    fn test_zero_tax_and_cost_lines_dropped() {
        let acc = accounts();
        let tax = TaxBreakdown::compute(dec!(500), Decimal::ZERO, false).unwrap();
        let lines = acc.sale(acc.receivable, &tax, Decimal::ZERO);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_purchase() {
        let acc = accounts();
        let bank = Uuid::new_v4();
        let tax = TaxBreakdown::compute(dec!(1000), dec!(11), false).unwrap();
        let lines = acc.purchase(bank, &tax);
        assert_eq!(amount_on(&lines, acc.inventory), (dec!(1000), Decimal::ZERO));
        assert_eq!(amount_on(&lines, acc.tax_receivable), (dec!(110), Decimal::ZERO));
        assert_eq!(amount_on(&lines, bank), (Decimal::ZERO, dec!(1110)));
    }

    #[test]
    fn test_purchase_return_variance_both_ways() {
        let acc = accounts();
        let tax = TaxBreakdown::compute(dec!(300), dec!(10), false).unwrap();

        let loss = acc.purchase_return(acc.payable, &tax, dec!(320));
        assert_eq!(amount_on(&loss, acc.inventory_variance), (dec!(20), Decimal::ZERO));
        assert!(validate_lines(&loss).is_ok());

        let gain = acc.purchase_return(acc.payable, &tax, dec!(250));
        assert_eq!(amount_on(&gain, acc.inventory_variance), (Decimal::ZERO, dec!(50)));
        assert!(validate_lines(&gain).is_ok());

        let exact = acc.purchase_return(acc.payable, &tax, dec!(300));
        assert_eq!(amount_on(&exact, acc.inventory_variance), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn test_sale_return_restores_inventory() {
        let acc = accounts();
        let tax = TaxBreakdown::compute(dec!(200), dec!(11), false).unwrap();
        let lines = acc.sale_return(acc.receivable, &tax, dec!(120));
        assert_eq!(amount_on(&lines, acc.sales_returns), (dec!(200), Decimal::ZERO));
        assert_eq!(amount_on(&lines, acc.receivable), (Decimal::ZERO, dec!(222)));
        assert_eq!(amount_on(&lines, acc.inventory), (dec!(120), Decimal::ZERO));
        assert_eq!(amount_on(&lines, acc.cogs), (Decimal::ZERO, dec!(120)));
        assert!(JournalTotals::of(&lines).is_balanced());
    }

    #[test]
    fn test_payment_receipt_with_excess() {
        let acc = accounts();
        let bank = Uuid::new_v4();
        let lines = acc.payment_receipt(bank, dec!(900), dec!(100));
        assert_eq!(amount_on(&lines, bank), (dec!(1000), Decimal::ZERO));
        assert_eq!(amount_on(&lines, acc.receivable), (Decimal::ZERO, dec!(900)));
        assert_eq!(amount_on(&lines, acc.customer_deposits), (Decimal::ZERO, dec!(100)));
    }

    #[test]
    fn test_stock_adjustment_both_directions() {
        let acc = accounts();
        let counter = Uuid::new_v4();
        let lines = acc.stock_adjustment(
            counter,
            StockAdjustmentCost {
                increase: dec!(50),
                decrease: dec!(80),
            },
        );
        assert_eq!(lines.len(), 4);
        assert_eq!(amount_on(&lines, acc.inventory), (dec!(50), dec!(80)));
        assert_eq!(amount_on(&lines, counter), (dec!(80), dec!(50)));
    }

    #[test]
    fn test_bank_pairs() {
        let (bank, other) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(cash_in(bank, other, dec!(10))[0], JournalLine::debit(bank, dec!(10)));
        assert_eq!(cash_out(bank, other, dec!(10))[1], JournalLine::credit(bank, dec!(10)));
        let t = transfer(bank, other, dec!(10));
        assert_eq!(t[0], JournalLine::debit(other, dec!(10)));
        assert_eq!(t[1], JournalLine::credit(bank, dec!(10)));
    }

    #[test]
    fn test_overpayment_resolutions() {
        let acc = accounts();
        let bank = Uuid::new_v4();
        let refund = acc.overpayment_refund(bank, dec!(75));
        assert_eq!(amount_on(&refund, acc.customer_deposits), (dec!(75), Decimal::ZERO));
        assert_eq!(amount_on(&refund, bank), (Decimal::ZERO, dec!(75)));

        let income = acc.overpayment_to_income(dec!(75));
        assert_eq!(amount_on(&income, acc.other_income), (Decimal::ZERO, dec!(75)));
    }
}
