//! Account balances, registers, and the trial balance, all derived from posted entries.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    round_money, AccountClass, AccountType, Company, LedgerEntry, BALANCE_TOLERANCE,
};

fn within(entry: &LedgerEntry, as_of: Option<NaiveDate>) -> bool {
    as_of.map_or(true, |limit| entry.date <= limit)
}

/// Raw debit and credit totals for an account up to `as_of`.
pub fn account_totals(company: &Company, account_id: Uuid, as_of: Option<NaiveDate>) -> (f64, f64) {
    company
        .entries
        .iter()
        .filter(|entry| entry.account_id == account_id && within(entry, as_of))
        .fold((0.0, 0.0), |(debit, credit), entry| {
            (debit + entry.debit, credit + entry.credit)
        })
}

/// Balance of an account signed by its normal side; unknown accounts read as zero.
pub fn account_balance(company: &Company, account_id: Uuid, as_of: Option<NaiveDate>) -> f64 {
    let Some(account) = company.account(account_id) else {
        return 0.0;
    };
    let (debit, credit) = account_totals(company, account_id, as_of);
    account.signed_balance(debit, credit)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegisterLine {
    pub entry_id: Uuid,
    pub transaction_id: Uuid,
    pub number: Option<String>,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Register {
    pub account_id: Uuid,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub lines: Vec<RegisterLine>,
}

/// Lists an account's entries in `[from, to]` with a running balance.
///
/// Lines are ordered by date, then document number, then posting order.
pub fn register(
    company: &Company,
    account_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Register {
    let normal_debit = company
        .account(account_id)
        .map(|account| account.account_type.class())
        .map_or(true, |class| {
            matches!(class, AccountClass::Asset | AccountClass::Expense)
        });
    let signed = |entry: &LedgerEntry| {
        if normal_debit {
            entry.net()
        } else {
            -entry.net()
        }
    };

    let mut opening = 0.0;
    let mut selected: Vec<(usize, &LedgerEntry)> = Vec::new();
    for (index, entry) in company.entries.iter().enumerate() {
        if entry.account_id != account_id {
            continue;
        }
        if from.is_some_and(|start| entry.date < start) {
            opening += signed(entry);
            continue;
        }
        if to.is_some_and(|end| entry.date > end) {
            continue;
        }
        selected.push((index, entry));
    }

    let number_of = |entry: &LedgerEntry| {
        company
            .transaction(entry.transaction_id)
            .and_then(|txn| txn.number.clone())
    };
    let mut keyed: Vec<_> = selected
        .into_iter()
        .map(|(index, entry)| (entry.date, number_of(entry), index, entry))
        .collect();
    keyed.sort_by(|a, b| (a.0, &a.1, a.2).cmp(&(b.0, &b.1, b.2)));

    let opening_balance = round_money(opening);
    let mut running = opening_balance;
    let lines = keyed
        .into_iter()
        .map(|(date, number, _, entry)| {
            running = round_money(running + signed(entry));
            RegisterLine {
                entry_id: entry.id,
                transaction_id: entry.transaction_id,
                number,
                date,
                description: entry.description.clone(),
                debit: entry.debit,
                credit: entry.credit,
                balance: running,
            }
        })
        .collect();

    Register {
        account_id,
        opening_balance,
        closing_balance: running,
        lines,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrialBalanceRow {
    pub account_id: Uuid,
    pub code: Option<String>,
    pub name: String,
    pub account_type: AccountType,
    pub debit: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrialBalance {
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: f64,
    pub total_credit: f64,
}

impl TrialBalance {
    pub fn is_balanced(&self) -> bool {
        (self.total_debit - self.total_credit).abs() <= BALANCE_TOLERANCE
    }
}

/// Every account with activity, its net shown on the debit or credit column.
pub fn trial_balance(company: &Company, as_of: Option<NaiveDate>) -> TrialBalance {
    let mut rows = Vec::new();
    let mut total_debit = 0.0;
    let mut total_credit = 0.0;
    for account in &company.accounts {
        let (debit, credit) = account_totals(company, account.id, as_of);
        let net = round_money(debit - credit);
        if net == 0.0 {
            continue;
        }
        let (debit, credit) = if net > 0.0 { (net, 0.0) } else { (0.0, -net) };
        total_debit += debit;
        total_credit += credit;
        rows.push(TrialBalanceRow {
            account_id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            account_type: account.account_type,
            debit,
            credit,
        });
    }
    rows.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.name.cmp(&b.name)));
    TrialBalance {
        as_of,
        rows,
        total_debit: round_money(total_debit),
        total_credit: round_money(total_credit),
    }
}

fn is_control(company: &Company, account_id: Uuid, types: &[AccountType]) -> bool {
    company
        .account(account_id)
        .is_some_and(|account| types.contains(&account.account_type))
}

/// Net receivable-minus-payable activity for a contact on the AR and AP accounts.
pub fn contact_balance(company: &Company, contact_id: Uuid, as_of: Option<NaiveDate>) -> f64 {
    let controls = [AccountType::AccountsReceivable, AccountType::AccountsPayable];
    round_money(
        company
            .entries
            .iter()
            .filter(|entry| entry.contact_id == Some(contact_id) && within(entry, as_of))
            .filter(|entry| is_control(company, entry.account_id, &controls))
            .map(LedgerEntry::net)
            .sum(),
    )
}

/// Receivable activity for a contact dated strictly before `before`.
pub fn receivable_before(company: &Company, contact_id: Uuid, before: NaiveDate) -> f64 {
    round_money(
        company
            .entries
            .iter()
            .filter(|entry| entry.contact_id == Some(contact_id) && entry.date < before)
            .filter(|entry| {
                is_control(company, entry.account_id, &[AccountType::AccountsReceivable])
            })
            .map(LedgerEntry::net)
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, JournalLine, LineItem, Transaction, TransactionKind};
    use crate::ledger::posting::LedgerWriter;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn commit(company: &mut Company, mut txn: Transaction) -> Uuid {
        txn.number = Some(company.next_number(txn.kind));
        let id = txn.id;
        company.transactions.push(txn);
        LedgerWriter::commit(company, id).unwrap();
        id
    }

    fn seeded() -> (Company, Uuid) {
        let mut company = Company::with_default_chart("Balances", "USD");
        let customer = company.add_contact(Contact::customer("Initech"));
        let cash = company.account_by_name("Cash").unwrap().id;
        let equity = company.account_by_name("Owner's Equity").unwrap().id;
        let sales = company.account_by_name("Sales").unwrap().id;
        commit(
            &mut company,
            Transaction::new(TransactionKind::JournalEntry, date(1), "USD")
                .with_journal_line(JournalLine::debit(cash, 1_000.0))
                .with_journal_line(JournalLine::credit(equity, 1_000.0)),
        );
        commit(
            &mut company,
            Transaction::new(TransactionKind::Invoice, date(5), "USD")
                .with_contact(customer)
                .with_line(LineItem::new(sales, 2.0, 150.0)),
        );
        commit(
            &mut company,
            Transaction::new(TransactionKind::SalesReceipt, date(9), "USD")
                .with_payment_account(cash)
                .with_line(LineItem::new(sales, 1.0, 80.0)),
        );
        (company, customer)
    }

    #[test]
    fn balances_follow_normal_side() {
        let (company, _) = seeded();
        let cash = company.account_by_name("Cash").unwrap().id;
        let sales = company.account_by_name("Sales").unwrap().id;
        assert_eq!(account_balance(&company, cash, None), 1_080.0);
        assert_eq!(account_balance(&company, sales, None), 380.0);
        assert_eq!(account_balance(&company, cash, Some(date(5))), 1_000.0);
    }

    #[test]
    fn register_carries_opening_and_running_balance() {
        let (company, _) = seeded();
        let cash = company.account_by_name("Cash").unwrap().id;
        let register = register(&company, cash, Some(date(2)), None);
        assert_eq!(register.opening_balance, 1_000.0);
        assert_eq!(register.lines.len(), 1);
        assert_eq!(register.lines[0].balance, 1_080.0);
        assert_eq!(register.closing_balance, 1_080.0);
    }

    #[test]
    fn trial_balance_is_balanced() {
        let (company, _) = seeded();
        let trial = trial_balance(&company, None);
        assert!(trial.is_balanced());
        assert_eq!(trial.total_debit, 1_380.0);
    }

    #[test]
    fn contact_balance_tracks_receivable() {
        let (company, customer) = seeded();
        assert_eq!(contact_balance(&company, customer, None), 300.0);
        assert_eq!(receivable_before(&company, customer, date(5)), 0.0);
        assert_eq!(receivable_before(&company, customer, date(6)), 300.0);
    }
}
