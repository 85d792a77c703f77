//! Property-based tests for posting rules.
//!
//! - Property 1: Every posting rule produces a balanced entry
//! - Property 2: Settlement side carries the document total

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::posting::{PostingAccounts, StockAdjustmentCost, cash_in, cash_out, transfer};
use super::tax::TaxBreakdown;
use crate::ledger::{JournalLine, JournalTotals, validate_lines};

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn maybe_zero() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn rate() -> impl Strategy<Value = Decimal> {
    prop_oneof![Just(Decimal::ZERO), Just(Decimal::from(11)), (0i64..2500i64).prop_map(|r| Decimal::new(r, 2))]
}

fn accounts() -> PostingAccounts {
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

fn balanced(lines: &[JournalLine]) -> bool {
    lines.is_empty() || validate_lines(lines).is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1.1: sale, purchase and both returns balance for any
    /// subtotal, rate, tax mode and cost.
    #[test]
    fn prop_trade_documents_balance(
        subtotal in amount(),
        rate in rate(),
        inclusive in any::<bool>(),
        cost in maybe_zero(),
    ) {
        let acc = accounts();
        let bank = Uuid::new_v4();
        let tax = TaxBreakdown::compute(subtotal, rate, inclusive).unwrap();

        prop_assert!(balanced(&acc.sale(acc.receivable, &tax, cost)));
        prop_assert!(balanced(&acc.purchase(bank, &tax)));
        prop_assert!(balanced(&acc.sale_return(bank, &tax, cost)));
        prop_assert!(balanced(&acc.purchase_return(acc.payable, &tax, cost)));
    }

    /// Property 1.2: cash, transfer, adjustment and payment rules balance.
    #[test]
    fn prop_cash_documents_balance(
        amount in amount(),
        excess in maybe_zero(),
        increase in maybe_zero(),
        decrease in maybe_zero(),
    ) {
        let acc = accounts();
        let (bank, other) = (Uuid::new_v4(), Uuid::new_v4());

        prop_assert!(balanced(&cash_in(bank, other, amount)));
        prop_assert!(balanced(&cash_out(bank, other, amount)));
        prop_assert!(balanced(&transfer(bank, other, amount)));
        let adjustment_cost = StockAdjustmentCost { increase, decrease };
        prop_assert!(balanced(&acc.stock_adjustment(other, adjustment_cost)));
        prop_assert!(balanced(&acc.payment_receipt(bank, amount, excess)));
        prop_assert!(balanced(&acc.payment_disbursement(bank, amount)));
        prop_assert!(balanced(&acc.overpayment_refund(bank, amount)));
        prop_assert!(balanced(&acc.overpayment_to_income(amount)));
    }

    /// Property 2: the settlement account is debited (sale) or credited
    /// (purchase) with exactly the document total.
    #[test]
    fn prop_settlement_carries_total(
        subtotal in amount(),
        rate in rate(),
        inclusive in any::<bool>(),
    ) {
        let acc = accounts();
        let tax = TaxBreakdown::compute(subtotal, rate, inclusive).unwrap();
        prop_assert_eq!(tax.net + tax.tax, tax.total);

        let sale = acc.sale(acc.receivable, &tax, Decimal::ZERO);
        let on_receivable: Vec<JournalLine> =
            sale.into_iter().filter(|l| l.account_id == acc.receivable).collect();
        prop_assert_eq!(JournalTotals::of(&on_receivable).debit, tax.total);

        let purchase = acc.purchase(acc.payable, &tax);
        let on_payable: Vec<JournalLine> =
            purchase.into_iter().filter(|l| l.account_id == acc.payable).collect();
        prop_assert_eq!(JournalTotals::of(&on_payable).credit, tax.total);
    }
}
