//! Domain models for business transactions and their line items.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::domain::common::*;
use crate::domain::sales_tax::SalesTax;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub kind: TransactionKind,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Base-currency units per unit of `currency`.
    #[serde(default = "Transaction::default_exchange_rate")]
    pub exchange_rate: f64,
    /// Bank, card, or clearing account for cash-type kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_account_id: Option<Uuid>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub journal_lines: Vec<JournalLine>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<Difference>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_template_id: Option<Uuid>,
    /// Revaluations booked against the open balance, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revaluations: Vec<RevaluationMark>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, date: NaiveDate, currency: impl Into<CurrencyCode>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: None,
            kind,
            status: TransactionStatus::Draft,
            contact_id: None,
            date,
            due_date: None,
            currency: currency.into(),
            exchange_rate: 1.0,
            payment_account_id: None,
            line_items: Vec::new(),
            journal_lines: Vec::new(),
            allocations: Vec::new(),
            difference: None,
            amount: 0.0,
            balance: 0.0,
            memo: None,
            recurring_template_id: None,
            revaluations: Vec::new(),
        }
    }

    pub fn default_exchange_rate() -> f64 {
        1.0
    }

    pub fn with_contact(mut self, contact_id: Uuid) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_payment_account(mut self, account_id: Uuid) -> Self {
        self.payment_account_id = Some(account_id);
        self
    }

    pub fn with_exchange_rate(mut self, rate: f64) -> Self {
        self.exchange_rate = rate;
        self
    }

    pub fn with_line(mut self, line: LineItem) -> Self {
        self.line_items.push(line);
        self
    }

    pub fn with_journal_line(mut self, line: JournalLine) -> Self {
        self.journal_lines.push(line);
        self
    }

    pub fn with_allocation(mut self, target_id: Uuid, amount: f64) -> Self {
        self.allocations.push(Allocation { target_id, amount });
        self
    }

    pub fn subtotal(&self) -> f64 {
        round_money(self.line_items.iter().map(|line| line.amount).sum())
    }

    pub fn tax_total(&self) -> f64 {
        round_money(self.line_items.iter().map(|line| line.tax_amount).sum())
    }

    pub fn applied_total(&self) -> f64 {
        round_money(self.allocations.iter().map(|a| a.amount).sum())
    }

    pub fn difference_amount(&self) -> f64 {
        self.difference.as_ref().map(|d| d.amount).unwrap_or(0.0)
    }

    /// Document total in the transaction currency.
    pub fn total(&self) -> f64 {
        match self.kind {
            TransactionKind::JournalEntry => {
                round_money(self.journal_lines.iter().map(|line| line.debit).sum())
            }
            kind if kind.is_payment() => round_money(self.applied_total() + self.difference_amount()),
            _ => round_money(self.subtotal() + self.tax_total()),
        }
    }

    /// Rate the open balance is carried at in the base currency.
    pub fn carrying_rate(&self) -> f64 {
        self.revaluations
            .last()
            .map(|mark| mark.rate)
            .unwrap_or(self.exchange_rate)
    }

    pub fn is_revalued_by(&self, journal_id: Uuid) -> bool {
        self.revaluations.iter().any(|mark| mark.journal_id == journal_id)
    }

    pub fn is_open_item(&self) -> bool {
        self.kind.is_open_item()
    }

    pub fn is_posted(&self) -> bool {
        !matches!(self.status, TransactionStatus::Draft | TransactionStatus::Void)
    }

    /// Derives the payment status of a posted transaction from `balance`.
    pub fn refresh_status(&mut self) {
        if !self.is_posted() {
            return;
        }
        if !self.is_open_item() {
            self.status = TransactionStatus::Posted;
            return;
        }
        self.status = if self.balance <= BALANCE_TOLERANCE {
            TransactionStatus::Paid
        } else if self.balance < self.amount - BALANCE_TOLERANCE {
            TransactionStatus::PartiallyPaid
        } else {
            TransactionStatus::Posted
        };
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        match &self.number {
            Some(number) => format!("{} {} [{}]", self.kind, number, self.status),
            None => format!("{} {} [{}]", self.kind, self.id, self.status),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionKind {
    Invoice,
    Bill,
    Expense,
    Cheque,
    Deposit,
    SalesReceipt,
    CustomerPayment,
    BillPayment,
    JournalEntry,
}

impl TransactionKind {
    /// Kinds that leave a balance owed until payments are applied.
    pub fn is_open_item(self) -> bool {
        matches!(self, TransactionKind::Invoice | TransactionKind::Bill)
    }

    pub fn is_payment(self) -> bool {
        matches!(
            self,
            TransactionKind::CustomerPayment | TransactionKind::BillPayment
        )
    }

    /// Kinds that move money through a bank, card, or clearing account.
    pub fn requires_payment_account(self) -> bool {
        matches!(
            self,
            TransactionKind::Expense
                | TransactionKind::Cheque
                | TransactionKind::Deposit
                | TransactionKind::SalesReceipt
                | TransactionKind::CustomerPayment
                | TransactionKind::BillPayment
        )
    }

    /// The kind of open item a payment of this kind settles.
    pub fn settles(self) -> Option<TransactionKind> {
        match self {
            TransactionKind::CustomerPayment => Some(TransactionKind::Invoice),
            TransactionKind::BillPayment => Some(TransactionKind::Bill),
            _ => None,
        }
    }

    pub fn number_prefix(self) -> &'static str {
        match self {
            TransactionKind::Invoice => "INV",
            TransactionKind::Bill => "BILL",
            TransactionKind::Expense => "EXP",
            TransactionKind::Cheque => "CHQ",
            TransactionKind::Deposit => "DEP",
            TransactionKind::SalesReceipt => "SR",
            TransactionKind::CustomerPayment => "PMT",
            TransactionKind::BillPayment => "BP",
            TransactionKind::JournalEntry => "JE",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Invoice => "Invoice",
            TransactionKind::Bill => "Bill",
            TransactionKind::Expense => "Expense",
            TransactionKind::Cheque => "Cheque",
            TransactionKind::Deposit => "Deposit",
            TransactionKind::SalesReceipt => "Sales Receipt",
            TransactionKind::CustomerPayment => "Payment",
            TransactionKind::BillPayment => "Bill Payment",
            TransactionKind::JournalEntry => "Journal Entry",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Enumerates the lifecycle state of a transaction.
pub enum TransactionStatus {
    #[default]
    Draft,
    Posted,
    PartiallyPaid,
    Paid,
    Void,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Draft => "Draft",
            TransactionStatus::Posted => "Posted",
            TransactionStatus::PartiallyPaid => "Partially Paid",
            TransactionStatus::Paid => "Paid",
            TransactionStatus::Void => "Void",
        };
        f.write_str(label)
    }
}

/// A priced line on an invoice, bill, expense, receipt, or deposit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub account_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "LineItem::default_quantity")]
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_tax_id: Option<Uuid>,
    #[serde(default)]
    pub tax_amount: f64,
}

impl LineItem {
    pub fn new(account_id: Uuid, quantity: f64, unit_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            description: None,
            quantity,
            unit_price,
            amount: round_money(quantity * unit_price),
            sales_tax_id: None,
            tax_amount: 0.0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tax(mut self, tax: &SalesTax) -> Self {
        self.sales_tax_id = Some(tax.id);
        self.tax_amount = tax.tax_on(self.amount);
        self
    }

    fn default_quantity() -> f64 {
        1.0
    }

    /// Restores `amount = quantity * unit_price` and the tax on it.
    pub fn recompute(&mut self, tax: Option<&SalesTax>) {
        self.amount = round_money(self.quantity * self.unit_price);
        self.tax_amount = tax.map(|t| t.tax_on(self.amount)).unwrap_or(0.0);
    }

    pub fn is_reconciled(&self, tax: Option<&SalesTax>) -> bool {
        let expected_tax = tax.map(|t| t.tax_on(self.amount)).unwrap_or(0.0);
        approx_eq(
            self.amount,
            round_money(self.quantity * self.unit_price),
            BALANCE_TOLERANCE,
        ) && approx_eq(self.tax_amount, expected_tax, BALANCE_TOLERANCE)
    }
}

/// One explicit debit or credit line of a manual journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalLine {
    pub account_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
}

impl JournalLine {
    pub fn debit(account_id: Uuid, amount: f64) -> Self {
        Self {
            account_id,
            contact_id: None,
            description: None,
            debit: amount,
            credit: 0.0,
        }
    }

    pub fn credit(account_id: Uuid, amount: f64) -> Self {
        Self {
            account_id,
            contact_id: None,
            description: None,
            debit: 0.0,
            credit: amount,
        }
    }
}

/// Portion of a payment applied to one invoice or bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub target_id: Uuid,
    pub amount: f64,
}

/// One revaluation of an open item: the journal that booked it, the rate
/// the balance was marked to, and the open balance at that moment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RevaluationMark {
    pub journal_id: Uuid,
    pub rate: f64,
    pub balance: f64,
}

/// Signed remainder between a payment's bank amount and its applied total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Difference {
    pub account_id: Uuid,
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn totals_include_tax() {
        let tax = SalesTax::new("GST", 5.0, Uuid::new_v4());
        let txn = Transaction::new(TransactionKind::Invoice, date(), "USD")
            .with_line(LineItem::new(Uuid::new_v4(), 3.0, 10.0).with_tax(&tax))
            .with_line(LineItem::new(Uuid::new_v4(), 1.0, 5.5));
        assert_eq!(txn.subtotal(), 35.5);
        assert_eq!(txn.tax_total(), 1.5);
        assert_eq!(txn.total(), 37.0);
    }

    #[test]
    fn payment_total_is_applied_plus_difference() {
        let mut txn = Transaction::new(TransactionKind::BillPayment, date(), "USD")
            .with_allocation(Uuid::new_v4(), 40.0)
            .with_allocation(Uuid::new_v4(), 60.0);
        txn.difference = Some(Difference {
            account_id: Uuid::new_v4(),
            amount: -2.5,
        });
        assert_eq!(txn.total(), 97.5);
    }

    #[test]
    fn refresh_status_tracks_balance() {
        let mut txn = Transaction::new(TransactionKind::Invoice, date(), "USD");
        txn.status = TransactionStatus::Posted;
        txn.amount = 100.0;
        txn.balance = 40.0;
        txn.refresh_status();
        assert_eq!(txn.status, TransactionStatus::PartiallyPaid);
        txn.balance = 0.0;
        txn.refresh_status();
        assert_eq!(txn.status, TransactionStatus::Paid);

        let mut draft = Transaction::new(TransactionKind::Invoice, date(), "USD");
        draft.refresh_status();
        assert_eq!(draft.status, TransactionStatus::Draft);
    }

    #[test]
    fn recompute_restores_line_invariants() {
        let tax = SalesTax::new("VAT", 20.0, Uuid::new_v4());
        let mut line = LineItem::new(Uuid::new_v4(), 2.0, 12.5);
        line.amount = 999.0;
        line.sales_tax_id = Some(tax.id);
        assert!(!line.is_reconciled(Some(&tax)));
        line.recompute(Some(&tax));
        assert_eq!(line.amount, 25.0);
        assert_eq!(line.tax_amount, 5.0);
        assert!(line.is_reconciled(Some(&tax)));
    }
}
