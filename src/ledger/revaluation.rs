//! Unrealized FX gain/loss on foreign-currency accounts and open items.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::currency::{CurrencyCode, CurrencyError};
use crate::domain::{
    round_money, AccountType, Company, JournalLine, RevaluationMark, Transaction, TransactionKind,
};

use super::error::PostingError;
use super::posting::fx_gain_loss_account;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RevaluationSource {
    Account,
    OpenItem(Uuid),
}

/// Amounts are debit-positive in the base currency, so a positive `unrealized`
/// increases the balance-sheet line and is a gain.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevaluationLine {
    pub source: RevaluationSource,
    pub account_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub currency: CurrencyCode,
    pub foreign_balance: f64,
    pub booked_base: f64,
    pub rate: f64,
    pub revalued_base: f64,
    pub unrealized: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevaluationReport {
    pub as_of: NaiveDate,
    pub base_currency: CurrencyCode,
    pub lines: Vec<RevaluationLine>,
    pub total_unrealized: f64,
}

impl RevaluationReport {
    pub fn is_zero(&self) -> bool {
        self.lines.iter().all(|line| line.unrealized == 0.0)
    }
}

fn line(
    source: RevaluationSource,
    account_id: Uuid,
    contact_id: Option<Uuid>,
    currency: &CurrencyCode,
    foreign_balance: f64,
    booked_base: f64,
    rate: f64,
) -> RevaluationLine {
    let foreign_balance = round_money(foreign_balance);
    let booked_base = round_money(booked_base);
    let revalued_base = round_money(foreign_balance * rate);
    let unrealized = if foreign_balance == 0.0 {
        0.0
    } else {
        round_money(revalued_base - booked_base)
    };
    RevaluationLine {
        source,
        account_id,
        contact_id,
        currency: currency.clone(),
        foreign_balance,
        booked_base,
        rate,
        revalued_base,
        unrealized,
    }
}

/// Restates every foreign balance at the `as_of` rate from the company's FX book.
pub fn revalue(company: &Company, as_of: NaiveDate) -> Result<RevaluationReport, CurrencyError> {
    let base = &company.base_currency;
    let mut lines = Vec::new();

    for account in &company.accounts {
        let Some(currency) = account.currency.as_ref().filter(|code| *code != base) else {
            continue;
        };
        let mut foreign = 0.0;
        let mut booked = 0.0;
        for entry in company
            .entries
            .iter()
            .filter(|entry| entry.account_id == account.id && entry.date <= as_of)
        {
            booked += entry.net();
            if &entry.currency == currency {
                foreign += entry.foreign_amount.unwrap_or(0.0);
            }
        }
        if round_money(foreign) == 0.0 && round_money(booked) == 0.0 {
            continue;
        }
        let rate = company
            .fx_rates
            .lookup_rate(currency.as_str(), base.as_str(), as_of)?
            .rate;
        lines.push(line(
            RevaluationSource::Account,
            account.id,
            None,
            currency,
            foreign,
            booked,
            rate,
        ));
    }

    for txn in company.transactions.iter().filter(|txn| {
        txn.is_open_item()
            && txn.is_posted()
            && txn.balance > 0.0
            && txn.date <= as_of
            && &txn.currency != base
    }) {
        let (control_type, sign) = match txn.kind {
            TransactionKind::Invoice => (AccountType::AccountsReceivable, 1.0),
            _ => (AccountType::AccountsPayable, -1.0),
        };
        let Some(control) = company.system_account(control_type) else {
            continue;
        };
        let rate = company
            .fx_rates
            .lookup_rate(txn.currency.as_str(), base.as_str(), as_of)?
            .rate;
        let booked_rate = txn.carrying_rate();
        lines.push(line(
            RevaluationSource::OpenItem(txn.id),
            control.id,
            txn.contact_id,
            &txn.currency,
            sign * txn.balance,
            sign * txn.balance * booked_rate,
            rate,
        ));
    }

    let total_unrealized = round_money(lines.iter().map(|line| line.unrealized).sum());
    Ok(RevaluationReport {
        as_of,
        base_currency: base.clone(),
        lines,
        total_unrealized,
    })
}

/// Builds the adjusting journal entry for `report`, or `None` when nothing moved.
///
/// The offset lands on the FX Gain/Loss account so the entry always balances.
pub fn revaluation_journal(
    company: &Company,
    report: &RevaluationReport,
) -> Result<Option<Transaction>, PostingError> {
    if report.is_zero() {
        return Ok(None);
    }
    let gain_loss = fx_gain_loss_account(company)?;

    let mut journal = Transaction::new(
        TransactionKind::JournalEntry,
        report.as_of,
        report.base_currency.clone(),
    );
    journal.memo = Some(format!("FX revaluation as of {}", report.as_of));

    let mut offset = 0.0;
    for entry in report.lines.iter().filter(|line| line.unrealized != 0.0) {
        let mut journal_line = if entry.unrealized > 0.0 {
            JournalLine::debit(entry.account_id, entry.unrealized)
        } else {
            JournalLine::credit(entry.account_id, -entry.unrealized)
        };
        journal_line.contact_id = entry.contact_id;
        journal_line.description = Some(format!("Revalue {} at {}", entry.currency, entry.rate));
        journal.journal_lines.push(journal_line);
        offset += entry.unrealized;
    }
    let offset = round_money(offset);
    if offset > 0.0 {
        journal
            .journal_lines
            .push(JournalLine::credit(gain_loss, offset));
    } else if offset < 0.0 {
        journal
            .journal_lines
            .push(JournalLine::debit(gain_loss, -offset));
    }
    Ok(Some(journal))
}

/// Marks to record on open items once `journal_id` has been posted for `report`.
pub fn revalued_open_items(
    report: &RevaluationReport,
    journal_id: Uuid,
) -> Vec<(Uuid, RevaluationMark)> {
    report
        .lines
        .iter()
        .filter_map(|line| match line.source {
            RevaluationSource::OpenItem(id) => Some((
                id,
                RevaluationMark {
                    journal_id,
                    rate: line.rate,
                    balance: line.foreign_balance.abs(),
                },
            )),
            RevaluationSource::Account => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::FxRate;
    use crate::domain::{Account, Contact, LineItem};
    use crate::ledger::posting::{post, LedgerWriter};

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn commit(company: &mut Company, txn: Transaction) -> Uuid {
        let id = txn.id;
        company.transactions.push(txn);
        LedgerWriter::commit(company, id).unwrap();
        id
    }

    #[test]
    fn zero_foreign_balance_has_no_unrealized_result() {
        let mut company = Company::with_default_chart("FX", "USD");
        let euro_bank = company.add_account(
            Account::new("Euro Bank", AccountType::Bank).with_currency("EUR"),
        );
        let cash = company.account_by_name("Cash").unwrap().id;
        company
            .fx_rates
            .add_rate(FxRate::new("EUR", "USD", date(6, 30), 1.30))
            .unwrap();
        commit(
            &mut company,
            Transaction::new(TransactionKind::JournalEntry, date(1, 5), "EUR")
                .with_exchange_rate(1.10)
                .with_journal_line(JournalLine::debit(euro_bank, 100.0))
                .with_journal_line(JournalLine::credit(cash, 100.0)),
        );
        commit(
            &mut company,
            Transaction::new(TransactionKind::JournalEntry, date(2, 5), "EUR")
                .with_exchange_rate(1.20)
                .with_journal_line(JournalLine::debit(cash, 100.0))
                .with_journal_line(JournalLine::credit(euro_bank, 100.0)),
        );

        let report = revalue(&company, date(6, 30)).unwrap();
        let line = report
            .lines
            .iter()
            .find(|line| line.account_id == euro_bank)
            .unwrap();
        assert_eq!(line.foreign_balance, 0.0);
        assert_eq!(line.unrealized, 0.0);
        assert!(report.is_zero());
        assert!(revaluation_journal(&company, &report).unwrap().is_none());
    }

    #[test]
    fn foreign_account_gain_posts_balanced_journal() {
        let mut company = Company::with_default_chart("FX", "USD");
        let euro_bank = company.add_account(
            Account::new("Euro Bank", AccountType::Bank).with_currency("EUR"),
        );
        let equity = company.account_by_name("Owner's Equity").unwrap().id;
        company
            .fx_rates
            .add_rate(FxRate::new("EUR", "USD", date(3, 31), 1.25))
            .unwrap();
        commit(
            &mut company,
            Transaction::new(TransactionKind::JournalEntry, date(1, 5), "EUR")
                .with_exchange_rate(1.10)
                .with_journal_line(JournalLine::debit(euro_bank, 1_000.0))
                .with_journal_line(JournalLine::credit(equity, 1_000.0)),
        );

        let report = revalue(&company, date(3, 31)).unwrap();
        assert_eq!(report.total_unrealized, 150.0);
        let journal = revaluation_journal(&company, &report).unwrap().unwrap();
        let entries = post(&company, &journal).unwrap();
        let debits: f64 = entries.iter().map(|e| e.debit).sum();
        let credits: f64 = entries.iter().map(|e| e.credit).sum();
        assert!((debits - credits).abs() <= 0.001);
        assert_eq!(debits, 150.0);
    }

    #[test]
    fn open_invoice_in_foreign_currency_is_revalued() {
        let mut company = Company::with_default_chart("FX", "USD");
        let customer = company.add_contact(Contact::customer("Lyon SA"));
        let sales = company.account_by_name("Sales").unwrap().id;
        company
            .fx_rates
            .add_rate(FxRate::new("USD", "EUR", date(4, 30), 0.8))
            .unwrap();
        let invoice = commit(
            &mut company,
            Transaction::new(TransactionKind::Invoice, date(4, 1), "EUR")
                .with_exchange_rate(1.10)
                .with_contact(customer)
                .with_line(LineItem::new(sales, 1.0, 200.0)),
        );

        let report = revalue(&company, date(4, 30)).unwrap();
        let line = report
            .lines
            .iter()
            .find(|line| line.source == RevaluationSource::OpenItem(invoice))
            .unwrap();
        assert_eq!(line.booked_base, 220.0);
        assert_eq!(line.revalued_base, 250.0);
        assert_eq!(line.unrealized, 30.0);
        let journal_id = Uuid::new_v4();
        assert_eq!(
            revalued_open_items(&report, journal_id),
            vec![(
                invoice,
                RevaluationMark {
                    journal_id,
                    rate: 1.25,
                    balance: 200.0
                }
            )]
        );
    }
}
