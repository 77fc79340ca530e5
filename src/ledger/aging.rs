//! Aging of open invoices and bills by days past due.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{round_money, Company, Transaction, TransactionKind};

use super::allocation::balance_as_of;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Days1To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Over90,
    ];

    /// The one place open balances are assigned to a bucket.
    pub fn classify(days_overdue: i64) -> Self {
        match days_overdue {
            i64::MIN..=0 => AgingBucket::Current,
            1..=30 => AgingBucket::Days1To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgingBucket::Current => "Current",
            AgingBucket::Days1To30 => "1-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Over90 => "90+",
        };
        f.write_str(label)
    }
}

/// Which open items an aging report covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AgingSide {
    #[default]
    Receivable,
    Payable,
}

impl AgingSide {
    pub fn open_kind(self) -> TransactionKind {
        match self {
            AgingSide::Receivable => TransactionKind::Invoice,
            AgingSide::Payable => TransactionKind::Bill,
        }
    }
}

impl std::str::FromStr for AgingSide {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "receivable" | "ar" | "receivables" => Ok(AgingSide::Receivable),
            "payable" | "ap" | "payables" => Ok(AgingSide::Payable),
            other => Err(format!("unknown aging side `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgingItem {
    pub transaction_id: Uuid,
    pub number: Option<String>,
    pub contact_id: Option<Uuid>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub bucket: AgingBucket,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgingSchedule {
    pub as_of: NaiveDate,
    pub side: AgingSide,
    /// Totals indexed like [`AgingBucket::ALL`].
    pub buckets: [f64; 5],
    pub items: Vec<AgingItem>,
}

impl AgingSchedule {
    fn empty(side: AgingSide, as_of: NaiveDate) -> Self {
        Self {
            as_of,
            side,
            buckets: [0.0; 5],
            items: Vec::new(),
        }
    }

    fn push(&mut self, txn: &Transaction, balance: f64) {
        let due_date = txn.due_date.unwrap_or(txn.date);
        let days_overdue = (self.as_of - due_date).num_days();
        let bucket = AgingBucket::classify(days_overdue);
        let slot = &mut self.buckets[bucket.index()];
        *slot = round_money(*slot + balance);
        self.items.push(AgingItem {
            transaction_id: txn.id,
            number: txn.number.clone(),
            contact_id: txn.contact_id,
            date: txn.date,
            due_date,
            days_overdue,
            bucket,
            balance,
        });
    }

    pub fn bucket(&self, bucket: AgingBucket) -> f64 {
        self.buckets[bucket.index()]
    }

    pub fn total(&self) -> f64 {
        round_money(self.buckets.iter().sum())
    }
}

/// Items of `side` still open at the end of `as_of`, with the balance they had then.
fn open_items<'a>(
    company: &'a Company,
    side: AgingSide,
    as_of: NaiveDate,
) -> impl Iterator<Item = (&'a Transaction, f64)> {
    company
        .transactions
        .iter()
        .filter(move |txn| txn.kind == side.open_kind())
        .map(move |txn| (txn, balance_as_of(company, txn, as_of)))
        .filter(|(_, balance)| *balance > 0.0)
}

/// Aging of every open invoice (or bill) as of `as_of`.
pub fn aging_report(company: &Company, side: AgingSide, as_of: NaiveDate) -> AgingSchedule {
    let mut schedule = AgingSchedule::empty(side, as_of);
    for (txn, balance) in open_items(company, side, as_of) {
        schedule.push(txn, balance);
    }
    schedule.items.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    schedule
}

/// Aging restricted to one contact's open items.
pub fn aging_for_contact(
    company: &Company,
    contact_id: Uuid,
    side: AgingSide,
    as_of: NaiveDate,
) -> AgingSchedule {
    let mut schedule = AgingSchedule::empty(side, as_of);
    for (txn, balance) in
        open_items(company, side, as_of).filter(|(txn, _)| txn.contact_id == Some(contact_id))
    {
        schedule.push(txn, balance);
    }
    schedule.items.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, LineItem};
    use crate::ledger::posting::LedgerWriter;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn classify_partitions_every_day_count() {
        let expected = [
            (-5, AgingBucket::Current),
            (0, AgingBucket::Current),
            (1, AgingBucket::Days1To30),
            (30, AgingBucket::Days1To30),
            (31, AgingBucket::Days31To60),
            (60, AgingBucket::Days31To60),
            (61, AgingBucket::Days61To90),
            (90, AgingBucket::Days61To90),
            (91, AgingBucket::Over90),
            (10_000, AgingBucket::Over90),
        ];
        for (days, bucket) in expected {
            assert_eq!(AgingBucket::classify(days), bucket, "days = {days}");
        }
        for days in -10..200 {
            let hits = AgingBucket::ALL
                .iter()
                .filter(|b| **b == AgingBucket::classify(days))
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn schedule_total_matches_open_balances() {
        let mut company = Company::with_default_chart("Aging", "USD");
        let customer = company.add_contact(Contact::customer("Soylent"));
        let sales = company.account_by_name("Sales").unwrap().id;
        let invoices = [
            (date(1, 10), date(2, 9), 100.0),
            (date(3, 1), date(3, 31), 250.0),
            (date(6, 1), date(7, 1), 75.5),
        ];
        let mut open_total = 0.0;
        for (issued, due, amount) in invoices {
            let txn = Transaction::new(TransactionKind::Invoice, issued, "USD")
                .with_contact(customer)
                .with_due_date(due)
                .with_line(LineItem::new(sales, 1.0, amount));
            let id = txn.id;
            company.transactions.push(txn);
            LedgerWriter::commit(&mut company, id).unwrap();
            open_total += amount;
        }

        let schedule = aging_report(&company, AgingSide::Receivable, date(6, 15));
        assert_eq!(schedule.items.len(), 3);
        assert_eq!(schedule.total(), round_money(open_total));
        assert_eq!(schedule.bucket(AgingBucket::Over90), 100.0);
        assert_eq!(schedule.bucket(AgingBucket::Days61To90), 250.0);
        assert_eq!(schedule.bucket(AgingBucket::Current), 75.5);

        let scoped = aging_for_contact(&company, customer, AgingSide::Receivable, date(2, 1));
        assert_eq!(scoped.items.len(), 1);
        assert_eq!(scoped.total(), 100.0);
        assert!(aging_report(&company, AgingSide::Payable, date(6, 15))
            .items
            .is_empty());
    }

    #[test]
    fn invoice_paid_after_the_report_date_still_ages() {
        let mut company = Company::with_default_chart("Aging", "USD");
        let customer = company.add_contact(Contact::customer("Soylent"));
        let sales = company.account_by_name("Sales").unwrap().id;
        let invoice = Transaction::new(TransactionKind::Invoice, date(1, 15), "USD")
            .with_contact(customer)
            .with_due_date(date(1, 15))
            .with_line(LineItem::new(sales, 1.0, 100.0));
        let invoice_id = invoice.id;
        company.transactions.push(invoice);
        LedgerWriter::commit(&mut company, invoice_id).unwrap();

        let mut payment = Transaction::new(TransactionKind::CustomerPayment, date(2, 15), "USD")
            .with_contact(customer)
            .with_allocation(invoice_id, 100.0);
        payment.status = crate::domain::TransactionStatus::Posted;
        company.transactions.push(payment);
        if let Some(txn) = company.transaction_mut(invoice_id) {
            txn.balance = 0.0;
        }

        let before = aging_report(&company, AgingSide::Receivable, date(2, 10));
        assert_eq!(before.total(), 100.0);
        assert_eq!(before.bucket(AgingBucket::Days1To30), 100.0);
        let after = aging_report(&company, AgingSide::Receivable, date(2, 20));
        assert!(after.items.is_empty());
    }
}
