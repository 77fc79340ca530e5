//! Profit and loss and balance sheet built from posted entries.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    round_money, Account, AccountClass, AccountType, Company, LedgerEntry, BALANCE_TOLERANCE,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportRow {
    pub account_id: Option<Uuid>,
    pub code: Option<String>,
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub rows: Vec<ReportRow>,
    pub total: f64,
}

impl ReportSection {
    fn new(title: impl Into<String>, mut rows: Vec<ReportRow>) -> Self {
        rows.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.name.cmp(&b.name)));
        let total = round_money(rows.iter().map(|row| row.amount).sum());
        Self {
            title: title.into(),
            rows,
            total,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income: ReportSection,
    pub cost_of_goods_sold: ReportSection,
    pub expenses: ReportSection,
    pub gross_profit: f64,
    pub net_income: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub assets: ReportSection,
    pub liabilities: ReportSection,
    pub equity: ReportSection,
    pub total_liabilities_and_equity: f64,
}

impl BalanceSheet {
    pub fn is_balanced(&self) -> bool {
        (self.assets.total - self.total_liabilities_and_equity).abs() <= BALANCE_TOLERANCE
    }
}

fn signed_totals<F>(company: &Company, include: F) -> Vec<(&Account, f64)>
where
    F: Fn(&LedgerEntry) -> bool,
{
    company
        .accounts
        .iter()
        .filter_map(|account| {
            let (debit, credit) = company
                .entries
                .iter()
                .filter(|entry| entry.account_id == account.id && include(*entry))
                .fold((0.0, 0.0), |(d, c), entry| (d + entry.debit, c + entry.credit));
            let balance = account.signed_balance(debit, credit);
            (balance != 0.0).then_some((account, balance))
        })
        .collect()
}

fn row(account: &Account, amount: f64) -> ReportRow {
    ReportRow {
        account_id: Some(account.id),
        code: account.code.clone(),
        name: account.name.clone(),
        amount,
    }
}

/// Income and expense activity dated within `[from, to]`.
pub fn profit_and_loss(company: &Company, from: NaiveDate, to: NaiveDate) -> ProfitAndLoss {
    let totals = signed_totals(company, |entry| entry.date >= from && entry.date <= to);
    let mut income = Vec::new();
    let mut cogs = Vec::new();
    let mut expenses = Vec::new();
    for (account, amount) in totals {
        match account.account_type {
            AccountType::CostOfGoodsSold => cogs.push(row(account, amount)),
            t if t.class() == AccountClass::Income => income.push(row(account, amount)),
            t if t.class() == AccountClass::Expense => expenses.push(row(account, amount)),
            _ => {}
        }
    }
    let income = ReportSection::new("Income", income);
    let cost_of_goods_sold = ReportSection::new("Cost of Goods Sold", cogs);
    let expenses = ReportSection::new("Expenses", expenses);
    let gross_profit = round_money(income.total - cost_of_goods_sold.total);
    let net_income = round_money(gross_profit - expenses.total);
    ProfitAndLoss {
        from,
        to,
        income,
        cost_of_goods_sold,
        expenses,
        gross_profit,
        net_income,
    }
}

/// Net income of every period up to and including `as_of`.
pub fn earnings_to_date(company: &Company, as_of: NaiveDate) -> f64 {
    let totals = signed_totals(company, |entry| entry.date <= as_of);
    round_money(
        totals
            .into_iter()
            .map(|(account, amount)| match account.account_type.class() {
                AccountClass::Income => amount,
                AccountClass::Expense => -amount,
                _ => 0.0,
            })
            .sum(),
    )
}

/// Balance-sheet accounts as of `as_of`, with unclosed earnings shown under equity.
pub fn balance_sheet(company: &Company, as_of: NaiveDate) -> BalanceSheet {
    let totals = signed_totals(company, |entry| entry.date <= as_of);
    let mut assets = Vec::new();
    let mut liabilities = Vec::new();
    let mut equity = Vec::new();
    for (account, amount) in totals {
        match account.account_type.class() {
            AccountClass::Asset => assets.push(row(account, amount)),
            AccountClass::Liability => liabilities.push(row(account, amount)),
            AccountClass::Equity => equity.push(row(account, amount)),
            AccountClass::Income | AccountClass::Expense => {}
        }
    }
    let earnings = earnings_to_date(company, as_of);
    if earnings != 0.0 {
        equity.push(ReportRow {
            account_id: None,
            code: None,
            name: "Current earnings".into(),
            amount: earnings,
        });
    }
    let assets = ReportSection::new("Assets", assets);
    let liabilities = ReportSection::new("Liabilities", liabilities);
    let equity = ReportSection::new("Equity", equity);
    let total_liabilities_and_equity = round_money(liabilities.total + equity.total);
    BalanceSheet {
        as_of,
        assets,
        liabilities,
        equity,
        total_liabilities_and_equity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, JournalLine, LineItem, Transaction, TransactionKind};
    use crate::ledger::posting::LedgerWriter;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn commit(company: &mut Company, txn: Transaction) {
        let id = txn.id;
        company.transactions.push(txn);
        LedgerWriter::commit(company, id).unwrap();
    }

    fn trading_company() -> Company {
        let mut company = Company::with_default_chart("Reports", "USD");
        let customer = company.add_contact(Contact::customer("Vandelay"));
        let vendor = company.add_contact(Contact::vendor("Kramerica"));
        let cash = company.account_by_name("Cash").unwrap().id;
        let equity = company.account_by_name("Owner's Equity").unwrap().id;
        let sales = company.account_by_name("Sales").unwrap().id;
        let cogs = company.account_by_name("Cost of Goods Sold").unwrap().id;
        let fees = company.account_by_name("Bank Fees").unwrap().id;
        commit(
            &mut company,
            Transaction::new(TransactionKind::JournalEntry, date(1, 1), "USD")
                .with_journal_line(JournalLine::debit(cash, 5_000.0))
                .with_journal_line(JournalLine::credit(equity, 5_000.0)),
        );
        commit(
            &mut company,
            Transaction::new(TransactionKind::Invoice, date(2, 1), "USD")
                .with_contact(customer)
                .with_line(LineItem::new(sales, 10.0, 120.0)),
        );
        commit(
            &mut company,
            Transaction::new(TransactionKind::Bill, date(2, 3), "USD")
                .with_contact(vendor)
                .with_line(LineItem::new(cogs, 10.0, 45.0)),
        );
        commit(
            &mut company,
            Transaction::new(TransactionKind::Expense, date(2, 5), "USD")
                .with_payment_account(cash)
                .with_line(LineItem::new(fees, 1.0, 25.0)),
        );
        company
    }

    #[test]
    fn profit_and_loss_splits_gross_and_net() {
        let company = trading_company();
        let pnl = profit_and_loss(&company, date(2, 1), date(2, 28));
        assert_eq!(pnl.income.total, 1_200.0);
        assert_eq!(pnl.cost_of_goods_sold.total, 450.0);
        assert_eq!(pnl.gross_profit, 750.0);
        assert_eq!(pnl.expenses.total, 25.0);
        assert_eq!(pnl.net_income, 725.0);

        let january = profit_and_loss(&company, date(1, 1), date(1, 31));
        assert_eq!(january.net_income, 0.0);
    }

    #[test]
    fn balance_sheet_balances_with_current_earnings() {
        let company = trading_company();
        let sheet = balance_sheet(&company, date(12, 31));
        assert!(sheet.is_balanced());
        assert_eq!(sheet.assets.total, 6_175.0);
        assert_eq!(sheet.liabilities.total, 450.0);
        assert!(sheet
            .equity
            .rows
            .iter()
            .any(|row| row.name == "Current earnings" && row.amount == 725.0));
    }
}
