//! Customer statements: balance-forward and open-item, plus paginated text rendering.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::currency::{format_currency_value, format_date, LocaleConfig};
use crate::domain::{round_money, AccountType, Company, TransactionKind};

use super::aging::{aging_for_contact, AgingBucket, AgingSchedule, AgingSide};
use super::allocation::balance_as_of;
use super::balances::receivable_before;
use super::error::StatementError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    BalanceForward,
    OpenItem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementRequest {
    pub contact_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub kind: StatementKind,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatementLine {
    pub date: NaiveDate,
    pub transaction_id: Uuid,
    pub number: Option<String>,
    pub kind: TransactionKind,
    pub description: String,
    pub charge: f64,
    pub payment: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub contact_id: Uuid,
    pub contact_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: f64,
    pub lines: Vec<StatementLine>,
    pub total_charges: f64,
    pub total_payments: f64,
    pub closing_balance: f64,
    pub aging: AgingSchedule,
}

/// Builds the statement described by `request` from posted activity.
pub fn generate(company: &Company, request: &StatementRequest) -> Result<Statement, StatementError> {
    let contact = company
        .contact(request.contact_id)
        .ok_or(StatementError::UnknownContact(request.contact_id))?;
    if request.to < request.from {
        return Err(StatementError::InvalidRange {
            from: request.from,
            to: request.to,
        });
    }

    let (opening_balance, lines) = match request.kind {
        StatementKind::BalanceForward => balance_forward_lines(company, request),
        StatementKind::OpenItem => (0.0, open_item_lines(company, request)),
    };
    let total_charges = round_money(lines.iter().map(|line| line.charge).sum());
    let total_payments = round_money(lines.iter().map(|line| line.payment).sum());
    let closing_balance = round_money(opening_balance + total_charges - total_payments);

    Ok(Statement {
        kind: request.kind,
        contact_id: contact.id,
        contact_name: contact.name.clone(),
        from: request.from,
        to: request.to,
        opening_balance,
        lines,
        total_charges,
        total_payments,
        closing_balance,
        aging: aging_for_contact(company, contact.id, AgingSide::Receivable, request.to),
    })
}

/// Receivable movements in the period, one line per transaction.
fn balance_forward_lines(company: &Company, request: &StatementRequest) -> (f64, Vec<StatementLine>) {
    let opening = receivable_before(company, request.contact_id, request.from);

    let mut order: Vec<Uuid> = Vec::new();
    let mut nets: HashMap<Uuid, f64> = HashMap::new();
    for entry in &company.entries {
        if entry.contact_id != Some(request.contact_id)
            || entry.date < request.from
            || entry.date > request.to
        {
            continue;
        }
        let receivable = company
            .account(entry.account_id)
            .is_some_and(|account| account.account_type == AccountType::AccountsReceivable);
        if !receivable {
            continue;
        }
        let net = nets.entry(entry.transaction_id).or_insert_with(|| {
            order.push(entry.transaction_id);
            0.0
        });
        *net += entry.net();
    }

    let mut rows: Vec<_> = order
        .into_iter()
        .filter_map(|id| {
            let txn = company.transaction(id)?;
            let net = round_money(nets.get(&id).copied().unwrap_or(0.0));
            (net != 0.0).then_some((txn, net))
        })
        .collect();
    rows.sort_by(|(a, _), (b, _)| (a.date, &a.number).cmp(&(b.date, &b.number)));

    let mut running = opening;
    let lines = rows
        .into_iter()
        .map(|(txn, net)| {
            let (charge, payment) = if net > 0.0 { (net, 0.0) } else { (0.0, -net) };
            running = round_money(running + net);
            StatementLine {
                date: txn.date,
                transaction_id: txn.id,
                number: txn.number.clone(),
                kind: txn.kind,
                description: txn.memo.clone().unwrap_or_else(|| txn.kind.to_string()),
                charge,
                payment,
                balance: running,
            }
        })
        .collect();
    (opening, lines)
}

/// Invoices still open at the end of the period, each with what remained on that day.
fn open_item_lines(company: &Company, request: &StatementRequest) -> Vec<StatementLine> {
    let mut invoices: Vec<_> = company
        .transactions
        .iter()
        .filter(|txn| {
            txn.kind == TransactionKind::Invoice && txn.contact_id == Some(request.contact_id)
        })
        .map(|txn| (txn, balance_as_of(company, txn, request.to)))
        .filter(|(_, balance)| *balance > 0.0)
        .collect();
    invoices.sort_by(|(a, _), (b, _)| (a.date, &a.number).cmp(&(b.date, &b.number)));
    invoices
        .into_iter()
        .map(|(txn, balance)| StatementLine {
            date: txn.date,
            transaction_id: txn.id,
            number: txn.number.clone(),
            kind: txn.kind,
            description: txn.memo.clone().unwrap_or_else(|| txn.kind.to_string()),
            charge: txn.amount,
            payment: round_money(txn.amount - balance),
            balance,
        })
        .collect()
}

/// One page of a rendered statement.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatementPage {
    pub number: usize,
    pub total: usize,
    pub lines: Vec<String>,
}

impl StatementPage {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

const COLUMNS: [(&str, usize, bool); 6] = [
    ("Date", 12, false),
    ("Number", 11, false),
    ("Description", 22, false),
    ("Charge", 14, true),
    ("Payment", 14, true),
    ("Balance", 14, true),
];

fn row(cells: [&str; 6]) -> String {
    let mut out = String::new();
    for (cell, (_, width, right)) in cells.iter().zip(COLUMNS) {
        let clipped: String = cell.chars().take(width).collect();
        let padded = if right {
            format!("{:>width$}", clipped, width = width)
        } else {
            format!("{:<width$}", clipped, width = width)
        };
        out.push_str(&padded);
        out.push(' ');
    }
    out.trim_end().to_string()
}

fn rule() -> String {
    let width: usize = COLUMNS.iter().map(|(_, w, _)| w + 1).sum::<usize>() - 1;
    "-".repeat(width)
}

struct Formatter<'a> {
    company: &'a Company,
    config: &'a Config,
    locale: LocaleConfig,
}

impl Formatter<'_> {
    fn money(&self, amount: f64) -> String {
        format_currency_value(
            amount,
            &self.company.base_currency,
            &self.locale,
            self.config.currency_display,
            self.config.negative_style,
        )
    }

    fn blank_or_money(&self, amount: f64) -> String {
        if amount == 0.0 {
            String::new()
        } else {
            self.money(amount)
        }
    }

    fn date(&self, date: NaiveDate) -> String {
        format_date(&self.locale, date)
    }
}

/// Paginates a statement into fixed-width text pages.
///
/// Every page repeats the header and carries a "Page n of m" footer; totals and the
/// aging table follow the detail rows on the last page.
pub fn render(statement: &Statement, company: &Company, config: &Config) -> Vec<StatementPage> {
    let fmt = Formatter {
        company,
        config,
        locale: config.locale_config(),
    };
    let title = match statement.kind {
        StatementKind::BalanceForward => "Statement (balance forward)",
        StatementKind::OpenItem => "Statement (open items)",
    };
    let header = vec![
        company.name.clone(),
        title.to_string(),
        format!("Customer: {}", statement.contact_name),
        format!(
            "Period: {} to {}",
            fmt.date(statement.from),
            fmt.date(statement.to)
        ),
        String::new(),
        row(COLUMNS.map(|(label, _, _)| label)),
        rule(),
    ];

    let mut body: Vec<String> = Vec::new();
    if statement.kind == StatementKind::BalanceForward {
        let opening = fmt.money(statement.opening_balance);
        body.push(row([
            &fmt.date(statement.from),
            "",
            "Balance forward",
            "",
            "",
            &opening,
        ]));
    }
    for line in &statement.lines {
        let number = line.number.clone().unwrap_or_default();
        body.push(row([
            &fmt.date(line.date),
            &number,
            &line.description,
            &fmt.blank_or_money(line.charge),
            &fmt.blank_or_money(line.payment),
            &fmt.money(line.balance),
        ]));
    }

    let page_lines = config.statement_page_lines();
    let mut chunks: Vec<Vec<String>> = body.chunks(page_lines).map(<[String]>::to_vec).collect();
    if chunks.is_empty() {
        chunks.push(vec!["No activity in this period.".to_string()]);
    }

    let mut summary = vec![
        rule(),
        format!("Opening balance: {}", fmt.money(statement.opening_balance)),
        format!("Total charges:   {}", fmt.money(statement.total_charges)),
        format!("Total payments:  {}", fmt.money(statement.total_payments)),
        format!("Amount due:      {}", fmt.money(statement.closing_balance)),
        String::new(),
        "Aging".to_string(),
    ];
    for bucket in AgingBucket::ALL {
        summary.push(format!(
            "  {:<10}{:>14}",
            bucket.to_string(),
            fmt.money(statement.aging.bucket(bucket))
        ));
    }
    summary.push(format!("  {:<10}{:>14}", "Total", fmt.money(statement.aging.total())));
    if let Some(last) = chunks.last_mut() {
        last.extend(summary);
    }

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let mut lines = header.clone();
            lines.extend(chunk);
            lines.push(String::new());
            lines.push(format!("Page {} of {}", index + 1, total));
            StatementPage {
                number: index + 1,
                total,
                lines,
            }
        })
        .collect()
}
