//! Turns business transactions into balanced double-entry ledger entries.
//!
//! `post` is pure: it reads the company and a transaction and returns the entries the
//! transaction would produce. `LedgerWriter` is the only code that writes
//! `Company::entries`.

use tracing::{debug, info};
use uuid::Uuid;

use crate::currency::CurrencyError;
use crate::domain::{
    company::FX_GAIN_LOSS_ACCOUNT, round_money, Account, AccountType, Company, EntrySide,
    LedgerEntry, Transaction, TransactionKind, TransactionStatus, BALANCE_TOLERANCE,
};

use super::error::PostingError;

/// Largest rounding residual absorbed when converting a foreign journal entry.
const MAX_ROUNDING_RESIDUAL: f64 = 0.05;

/// Produces the balanced ledger entries for `txn` without mutating anything.
pub fn post(company: &Company, txn: &Transaction) -> Result<Vec<LedgerEntry>, PostingError> {
    if !txn.exchange_rate.is_finite() || txn.exchange_rate <= 0.0 {
        return Err(CurrencyError::InvalidRate(txn.exchange_rate).into());
    }
    if let Some(contact_id) = txn.contact_id {
        if company.contact(contact_id).is_none() {
            return Err(PostingError::MissingContact(contact_id));
        }
    }

    let mut builder = EntryBuilder::new(company, txn);
    match txn.kind {
        TransactionKind::Invoice | TransactionKind::SalesReceipt | TransactionKind::Deposit => {
            builder.post_lines(EntrySide::Credit)?;
            let control = match txn.kind {
                TransactionKind::Invoice => {
                    require_contact(txn)?;
                    control_account(company, AccountType::AccountsReceivable)?
                }
                _ => payment_account(company, txn)?,
            };
            builder.close_against(control)?;
        }
        TransactionKind::Bill | TransactionKind::Expense | TransactionKind::Cheque => {
            builder.post_lines(EntrySide::Debit)?;
            let control = match txn.kind {
                TransactionKind::Bill => {
                    require_contact(txn)?;
                    control_account(company, AccountType::AccountsPayable)?
                }
                _ => payment_account(company, txn)?,
            };
            builder.close_against(control)?;
        }
        TransactionKind::CustomerPayment => {
            let receivable = control_account(company, AccountType::AccountsReceivable)?;
            builder.post_allocations(receivable, EntrySide::Credit)?;
            builder.post_difference(EntrySide::Credit)?;
            builder.close_against(payment_account(company, txn)?)?;
        }
        TransactionKind::BillPayment => {
            let payable = control_account(company, AccountType::AccountsPayable)?;
            builder.post_allocations(payable, EntrySide::Debit)?;
            builder.post_difference(EntrySide::Debit)?;
            builder.close_against(payment_account(company, txn)?)?;
        }
        TransactionKind::JournalEntry => builder.post_journal_lines()?,
    }

    let entries = builder.finish();
    validate_balanced(&entries)?;
    Ok(entries)
}

/// Checks the double-entry invariant over a set of entries.
pub fn validate_balanced(entries: &[LedgerEntry]) -> Result<(), PostingError> {
    if entries.is_empty() {
        return Err(PostingError::Empty);
    }
    let mut debits = 0.0;
    let mut credits = 0.0;
    for entry in entries {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(entry.debit) || !valid(entry.credit) {
            return Err(PostingError::InvalidAmount);
        }
        debits += entry.debit;
        credits += entry.credit;
    }
    let has_debit = entries.iter().any(|e| e.debit > 0.0);
    let has_credit = entries.iter().any(|e| e.credit > 0.0);
    if !has_debit || !has_credit {
        return Err(PostingError::SingleSided);
    }
    if (debits - credits).abs() > BALANCE_TOLERANCE {
        return Err(PostingError::Unbalanced {
            debits: round_money(debits),
            credits: round_money(credits),
        });
    }
    Ok(())
}

fn require_contact(txn: &Transaction) -> Result<(), PostingError> {
    if txn.contact_id.is_none() {
        return Err(PostingError::InvalidLine(format!(
            "{} requires a contact",
            txn.kind
        )));
    }
    Ok(())
}

fn control_account(company: &Company, account_type: AccountType) -> Result<Uuid, PostingError> {
    company
        .system_account(account_type)
        .map(|account| account.id)
        .ok_or(PostingError::MissingSystemAccount(account_type))
}

/// Account that carries realized and unrealized exchange differences.
pub(crate) fn fx_gain_loss_account(company: &Company) -> Result<Uuid, PostingError> {
    company
        .account_by_name(FX_GAIN_LOSS_ACCOUNT)
        .filter(|account| !account.archived)
        .or_else(|| company.system_account(AccountType::OtherExpense))
        .map(|account| account.id)
        .ok_or(PostingError::MissingSystemAccount(AccountType::OtherExpense))
}

fn payment_account(company: &Company, txn: &Transaction) -> Result<Uuid, PostingError> {
    let id = txn
        .payment_account_id
        .ok_or_else(|| PostingError::MissingPaymentAccount(txn.kind.to_string()))?;
    let account = active_account(company, id)?;
    if !account.account_type.is_payment_account() {
        return Err(PostingError::InvalidLine(format!(
            "{} cannot be used as a payment account",
            account.name
        )));
    }
    Ok(id)
}

fn active_account(company: &Company, id: Uuid) -> Result<&Account, PostingError> {
    let account = company
        .account(id)
        .ok_or(PostingError::MissingAccount(id))?;
    if account.archived {
        return Err(PostingError::ArchivedAccount(account.name.clone()));
    }
    Ok(account)
}

struct EntryBuilder<'a> {
    company: &'a Company,
    txn: &'a Transaction,
    foreign: bool,
    entries: Vec<LedgerEntry>,
}

impl<'a> EntryBuilder<'a> {
    fn new(company: &'a Company, txn: &'a Transaction) -> Self {
        Self {
            company,
            txn,
            foreign: txn.currency != company.base_currency,
            entries: Vec::new(),
        }
    }

    /// Adds an entry for `amount` in transaction currency; negative amounts flip sides.
    fn push(
        &mut self,
        account_id: Uuid,
        side: EntrySide,
        amount: f64,
        description: Option<&str>,
    ) -> Result<(), PostingError> {
        self.push_at(account_id, side, amount, self.txn.exchange_rate, description)
    }

    /// Like `push`, converting to base at `rate` instead of the transaction rate.
    fn push_at(
        &mut self,
        account_id: Uuid,
        side: EntrySide,
        amount: f64,
        rate: f64,
        description: Option<&str>,
    ) -> Result<(), PostingError> {
        if !amount.is_finite() {
            return Err(PostingError::InvalidAmount);
        }
        active_account(self.company, account_id)?;
        let amount = round_money(amount);
        if amount == 0.0 {
            return Ok(());
        }
        let (side, amount) = match (side, amount < 0.0) {
            (EntrySide::Debit, false) | (EntrySide::Credit, true) => (EntrySide::Debit, amount.abs()),
            _ => (EntrySide::Credit, amount.abs()),
        };
        let base = round_money(amount * rate);
        let signed_foreign = match side {
            EntrySide::Debit => amount,
            EntrySide::Credit => -amount,
        };
        self.entries.push(LedgerEntry {
            id: Uuid::new_v4(),
            transaction_id: self.txn.id,
            account_id,
            contact_id: self.txn.contact_id,
            date: self.txn.date,
            debit: if side == EntrySide::Debit { base } else { 0.0 },
            credit: if side == EntrySide::Credit { base } else { 0.0 },
            currency: self.txn.currency.clone(),
            foreign_amount: self.foreign.then_some(signed_foreign),
            description: description
                .map(str::to_string)
                .or_else(|| self.txn.memo.clone()),
        });
        Ok(())
    }

    fn post_lines(&mut self, side: EntrySide) -> Result<(), PostingError> {
        let (company, txn) = (self.company, self.txn);
        if txn.line_items.is_empty() {
            return Err(PostingError::Empty);
        }
        for line in &txn.line_items {
            if !line.quantity.is_finite() || !line.unit_price.is_finite() {
                return Err(PostingError::InvalidLine(format!(
                    "line {} has a non-numeric quantity or price",
                    line.id
                )));
            }
            self.push(line.account_id, side, line.amount, line.description.as_deref())?;
            if line.tax_amount != 0.0 {
                let tax_id = line.sales_tax_id.ok_or_else(|| {
                    PostingError::InvalidLine(format!("line {} has tax but no sales tax", line.id))
                })?;
                let tax = company.sales_tax(tax_id).ok_or_else(|| {
                    PostingError::InvalidLine(format!("sales tax {} not found", tax_id))
                })?;
                self.push(tax.account_id, side, line.tax_amount, Some(&tax.name))?;
            }
        }
        Ok(())
    }

    /// One control entry per applied open item, tagged with that item's contact.
    ///
    /// The control entry clears the item at the rate it is carried at; the gap to
    /// the payment rate is the realized exchange difference.
    fn post_allocations(&mut self, control: Uuid, side: EntrySide) -> Result<(), PostingError> {
        let (company, txn) = (self.company, self.txn);
        for allocation in &txn.allocations {
            let target = company.transaction(allocation.target_id);
            let label = target
                .and_then(|t| t.number.clone())
                .map(|number| format!("Applied to {}", number));
            let carrying = target
                .map(Transaction::carrying_rate)
                .unwrap_or(txn.exchange_rate);
            let before = self.entries.len();
            self.push_at(control, side, allocation.amount, carrying, label.as_deref())?;
            let contact = target.and_then(|t| t.contact_id).or(txn.contact_id);
            if let Some(entry) = self.entries.get_mut(before) {
                entry.contact_id = contact;
            }

            let realized = round_money(allocation.amount * txn.exchange_rate)
                - round_money(allocation.amount * carrying);
            self.push_realized(side, realized, label.as_deref())?;
        }
        Ok(())
    }

    /// Books a base-currency exchange difference; it carries no foreign amount.
    fn push_realized(
        &mut self,
        side: EntrySide,
        base: f64,
        label: Option<&str>,
    ) -> Result<(), PostingError> {
        let base = round_money(base);
        if base == 0.0 {
            return Ok(());
        }
        let account_id = fx_gain_loss_account(self.company)?;
        let (side, amount) = match (side, base < 0.0) {
            (EntrySide::Debit, false) | (EntrySide::Credit, true) => (EntrySide::Debit, base.abs()),
            _ => (EntrySide::Credit, base.abs()),
        };
        let description = match label {
            Some(label) => format!("Realized FX on {}", label.trim_start_matches("Applied to ")),
            None => "Realized FX".to_string(),
        };
        self.entries.push(LedgerEntry {
            id: Uuid::new_v4(),
            transaction_id: self.txn.id,
            account_id,
            contact_id: self.txn.contact_id,
            date: self.txn.date,
            debit: if side == EntrySide::Debit { amount } else { 0.0 },
            credit: if side == EntrySide::Credit { amount } else { 0.0 },
            currency: self.company.base_currency.clone(),
            foreign_amount: None,
            description: Some(description),
        });
        Ok(())
    }

    fn post_difference(&mut self, side: EntrySide) -> Result<(), PostingError> {
        let txn = self.txn;
        if let Some(difference) = &txn.difference {
            self.push(difference.account_id, side, difference.amount, Some("Difference"))?;
        }
        Ok(())
    }

    fn post_journal_lines(&mut self) -> Result<(), PostingError> {
        let txn = self.txn;
        if txn.journal_lines.is_empty() {
            return Err(PostingError::Empty);
        }
        let mut debits = 0.0;
        let mut credits = 0.0;
        for line in &txn.journal_lines {
            let one_sided = (line.debit == 0.0) != (line.credit == 0.0);
            if !one_sided || line.debit < 0.0 || line.credit < 0.0 {
                return Err(PostingError::InvalidLine(
                    "journal lines need exactly one positive side".into(),
                ));
            }
            debits += line.debit;
            credits += line.credit;
        }
        if (debits - credits).abs() > BALANCE_TOLERANCE {
            return Err(PostingError::Unbalanced {
                debits: round_money(debits),
                credits: round_money(credits),
            });
        }
        for line in &txn.journal_lines {
            let (side, amount) = if line.debit > 0.0 {
                (EntrySide::Debit, line.debit)
            } else {
                (EntrySide::Credit, line.credit)
            };
            let before = self.entries.len();
            self.push(line.account_id, side, amount, line.description.as_deref())?;
            if let (Some(contact_id), Some(entry)) = (line.contact_id, self.entries.get_mut(before)) {
                entry.contact_id = Some(contact_id);
            }
        }
        self.absorb_rounding();
        Ok(())
    }

    /// Books the net of everything pushed so far against one control account.
    fn close_against(&mut self, control: Uuid) -> Result<(), PostingError> {
        if self.entries.is_empty() {
            return Err(PostingError::Empty);
        }
        let base_net: f64 = self.entries.iter().map(LedgerEntry::net).sum();
        let foreign_net: f64 = self
            .entries
            .iter()
            .filter_map(|e| e.foreign_amount)
            .sum();
        let base_net = round_money(base_net);
        if base_net == 0.0 {
            return Ok(());
        }
        let side = if base_net > 0.0 {
            EntrySide::Credit
        } else {
            EntrySide::Debit
        };
        let amount = base_net.abs();
        self.entries.push(LedgerEntry {
            id: Uuid::new_v4(),
            transaction_id: self.txn.id,
            account_id: control,
            contact_id: self.txn.contact_id,
            date: self.txn.date,
            debit: if side == EntrySide::Debit { amount } else { 0.0 },
            credit: if side == EntrySide::Credit { amount } else { 0.0 },
            currency: self.txn.currency.clone(),
            foreign_amount: self.foreign.then_some(round_money(-foreign_net)),
            description: self.txn.memo.clone(),
        });
        Ok(())
    }

    /// Folds a sub-cent conversion residual into the largest entry on the short side.
    fn absorb_rounding(&mut self) {
        if !self.foreign {
            return;
        }
        let residual: f64 = round_money(self.entries.iter().map(LedgerEntry::net).sum());
        if residual == 0.0 || residual.abs() > MAX_ROUNDING_RESIDUAL {
            return;
        }
        let short_side_debit = residual < 0.0;
        let target = self
            .entries
            .iter_mut()
            .filter(|e| if short_side_debit { e.debit > 0.0 } else { e.credit > 0.0 })
            .max_by(|a, b| {
                (a.debit + a.credit)
                    .partial_cmp(&(b.debit + b.credit))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        if let Some(entry) = target {
            if short_side_debit {
                entry.debit = round_money(entry.debit - residual);
            } else {
                entry.credit = round_money(entry.credit + residual);
            }
        }
    }

    fn finish(self) -> Vec<LedgerEntry> {
        self.entries
    }
}

/// Writes and removes posted entries on the company book.
pub struct LedgerWriter;

impl LedgerWriter {
    /// Posts (or re-posts) the transaction identified by `id`.
    ///
    /// Entries are computed before anything is mutated, so a failure leaves the
    /// company untouched.
    pub fn commit(company: &mut Company, id: Uuid) -> Result<(), PostingError> {
        let txn = company
            .transaction(id)
            .ok_or(PostingError::MissingTransaction(id))?;
        let entries = post(company, txn)?;
        let amount = txn.total();
        let was_posted = txn.is_posted();
        let paid = if was_posted && txn.is_open_item() {
            (txn.amount - txn.balance).max(0.0)
        } else {
            0.0
        };

        let count = entries.len();
        company.entries.retain(|entry| entry.transaction_id != id);
        company.entries.extend(entries);

        let txn = company
            .transaction_mut(id)
            .ok_or(PostingError::MissingTransaction(id))?;
        txn.amount = amount;
        txn.balance = if txn.is_open_item() {
            round_money((amount - paid).max(0.0))
        } else {
            0.0
        };
        if !was_posted {
            txn.status = TransactionStatus::Posted;
        }
        txn.refresh_status();
        info!(
            transaction = %id,
            kind = %txn.kind,
            amount,
            entries = count,
            "posted transaction"
        );
        company.touch();
        Ok(())
    }

    /// Removes every entry posted for `id`, returning how many were removed.
    pub fn reverse(company: &mut Company, id: Uuid) -> usize {
        let before = company.entries.len();
        company.entries.retain(|entry| entry.transaction_id != id);
        let removed = before - company.entries.len();
        if removed > 0 {
            debug!(transaction = %id, removed, "reversed ledger entries");
            company.touch();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, Difference, JournalLine, LineItem, SalesTax};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn account(company: &Company, name: &str) -> Uuid {
        company.account_by_name(name).unwrap().id
    }

    fn setup() -> (Company, Uuid) {
        let mut company = Company::with_default_chart("Posting", "USD");
        let customer = company.add_contact(Contact::customer("Globex"));
        (company, customer)
    }

    fn sums(entries: &[LedgerEntry]) -> (f64, f64) {
        (
            entries.iter().map(|e| e.debit).sum(),
            entries.iter().map(|e| e.credit).sum(),
        )
    }

    #[test]
    fn invoice_debits_receivable_and_credits_income_and_tax() {
        let (mut company, customer) = setup();
        let tax_account = account(&company, "Sales Tax Payable");
        let tax = SalesTax::new("HST", 13.0, tax_account);
        company.add_sales_tax(tax.clone());
        let sales = account(&company, "Sales");
        let txn = Transaction::new(TransactionKind::Invoice, date(), "USD")
            .with_contact(customer)
            .with_line(LineItem::new(sales, 2.0, 50.0).with_tax(&tax));

        let entries = post(&company, &txn).unwrap();
        let ar = account(&company, "Accounts Receivable");
        let receivable = entries.iter().find(|e| e.account_id == ar).unwrap();
        assert_eq!(receivable.debit, 113.0);
        let (debits, credits) = sums(&entries);
        assert!((debits - credits).abs() < BALANCE_TOLERANCE);
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn invoice_without_contact_is_rejected() {
        let (company, _) = setup();
        let sales = account(&company, "Sales");
        let txn = Transaction::new(TransactionKind::Invoice, date(), "USD")
            .with_line(LineItem::new(sales, 1.0, 10.0));
        assert!(matches!(
            post(&company, &txn),
            Err(PostingError::InvalidLine(_))
        ));
    }

    #[test]
    fn expense_requires_payment_account() {
        let (company, _) = setup();
        let expenses = account(&company, "General Expenses");
        let txn = Transaction::new(TransactionKind::Expense, date(), "USD")
            .with_line(LineItem::new(expenses, 1.0, 25.0));
        assert_eq!(
            post(&company, &txn),
            Err(PostingError::MissingPaymentAccount("Expense".into()))
        );

        let cash = account(&company, "Cash");
        let entries = post(&company, &txn.with_payment_account(cash)).unwrap();
        let bank = entries.iter().find(|e| e.account_id == cash).unwrap();
        assert_eq!(bank.credit, 25.0);
    }

    #[test]
    fn unbalanced_journal_entry_is_rejected() {
        let (company, _) = setup();
        let cash = account(&company, "Cash");
        let equity = account(&company, "Owner's Equity");
        let txn = Transaction::new(TransactionKind::JournalEntry, date(), "USD")
            .with_journal_line(JournalLine::debit(cash, 100.0))
            .with_journal_line(JournalLine::credit(equity, 99.0));
        assert_eq!(
            post(&company, &txn),
            Err(PostingError::Unbalanced {
                debits: 100.0,
                credits: 99.0
            })
        );
    }

    #[test]
    fn journal_entry_within_tolerance_posts() {
        let (company, _) = setup();
        let cash = account(&company, "Cash");
        let equity = account(&company, "Owner's Equity");
        let txn = Transaction::new(TransactionKind::JournalEntry, date(), "USD")
            .with_journal_line(JournalLine::debit(cash, 100.0))
            .with_journal_line(JournalLine::credit(equity, 100.0004));
        let entries = post(&company, &txn).unwrap();
        assert_eq!(entries.len(), 2);
        validate_balanced(&entries).unwrap();
    }

    #[test]
    fn foreign_invoice_converts_each_line_and_balances() {
        let (company, customer) = setup();
        let sales = account(&company, "Sales");
        let txn = Transaction::new(TransactionKind::Invoice, date(), "EUR")
            .with_contact(customer)
            .with_exchange_rate(1.0837)
            .with_line(LineItem::new(sales, 1.0, 33.33))
            .with_line(LineItem::new(sales, 1.0, 66.67));
        let entries = post(&company, &txn).unwrap();
        let (debits, credits) = sums(&entries);
        assert!((debits - credits).abs() < BALANCE_TOLERANCE);
        let foreign: f64 = entries.iter().filter_map(|e| e.foreign_amount).sum();
        assert!(foreign.abs() < BALANCE_TOLERANCE);
    }

    #[test]
    fn bill_payment_books_difference() {
        let (mut company, _) = setup();
        let vendor = company.add_contact(Contact::vendor("Initech"));
        let cash = account(&company, "Cash");
        let fees = account(&company, "Bank Fees");
        let mut payment = Transaction::new(TransactionKind::BillPayment, date(), "USD")
            .with_contact(vendor)
            .with_payment_account(cash)
            .with_allocation(Uuid::new_v4(), 100.0);
        payment.difference = Some(Difference {
            account_id: fees,
            amount: 1.5,
        });
        let entries = post(&company, &payment).unwrap();
        let bank = entries.iter().find(|e| e.account_id == cash).unwrap();
        assert_eq!(bank.credit, 101.5);
        let fee = entries.iter().find(|e| e.account_id == fees).unwrap();
        assert_eq!(fee.debit, 1.5);
    }

    #[test]
    fn foreign_payment_clears_receivable_at_booked_rate() {
        let (mut company, customer) = setup();
        let sales = account(&company, "Sales");
        let cash = account(&company, "Cash");
        let invoice = Transaction::new(TransactionKind::Invoice, date(), "EUR")
            .with_contact(customer)
            .with_exchange_rate(1.10)
            .with_line(LineItem::new(sales, 1.0, 1_000.0));
        let invoice_id = invoice.id;
        company.transactions.push(invoice);
        LedgerWriter::commit(&mut company, invoice_id).unwrap();

        let payment = Transaction::new(TransactionKind::CustomerPayment, date(), "EUR")
            .with_contact(customer)
            .with_exchange_rate(1.20)
            .with_payment_account(cash)
            .with_allocation(invoice_id, 1_000.0);
        let entries = post(&company, &payment).unwrap();

        let ar = account(&company, "Accounts Receivable");
        let receivable = entries.iter().find(|e| e.account_id == ar).unwrap();
        assert_eq!(receivable.credit, 1_100.0);
        assert_eq!(receivable.foreign_amount, Some(-1_000.0));
        let fx = account(&company, FX_GAIN_LOSS_ACCOUNT);
        let realized = entries.iter().find(|e| e.account_id == fx).unwrap();
        assert_eq!(realized.credit, 100.0);
        assert_eq!(realized.foreign_amount, None);
        let bank = entries.iter().find(|e| e.account_id == cash).unwrap();
        assert_eq!(bank.debit, 1_200.0);
        assert_eq!(bank.foreign_amount, Some(1_000.0));
    }

    #[test]
    fn foreign_bill_paid_at_higher_rate_books_a_loss() {
        let (mut company, _) = setup();
        let vendor = company.add_contact(Contact::vendor("Lyon SA"));
        let supplies = account(&company, "General Expenses");
        let cash = account(&company, "Cash");
        let bill = Transaction::new(TransactionKind::Bill, date(), "EUR")
            .with_contact(vendor)
            .with_exchange_rate(1.10)
            .with_line(LineItem::new(supplies, 1.0, 500.0));
        let bill_id = bill.id;
        company.transactions.push(bill);
        LedgerWriter::commit(&mut company, bill_id).unwrap();

        let payment = Transaction::new(TransactionKind::BillPayment, date(), "EUR")
            .with_contact(vendor)
            .with_exchange_rate(1.20)
            .with_payment_account(cash)
            .with_allocation(bill_id, 500.0);
        let entries = post(&company, &payment).unwrap();
        let ap = account(&company, "Accounts Payable");
        assert_eq!(entries.iter().find(|e| e.account_id == ap).unwrap().debit, 550.0);
        let fx = account(&company, FX_GAIN_LOSS_ACCOUNT);
        assert_eq!(entries.iter().find(|e| e.account_id == fx).unwrap().debit, 50.0);
        assert_eq!(entries.iter().find(|e| e.account_id == cash).unwrap().credit, 600.0);
    }

    #[test]
    fn commit_and_reverse_round_trip() {
        let (mut company, customer) = setup();
        let sales = account(&company, "Sales");
        let txn = Transaction::new(TransactionKind::Invoice, date(), "USD")
            .with_contact(customer)
            .with_line(LineItem::new(sales, 1.0, 80.0));
        let id = txn.id;
        company.transactions.push(txn);

        LedgerWriter::commit(&mut company, id).unwrap();
        let stored = company.transaction(id).unwrap();
        assert_eq!(stored.status, TransactionStatus::Posted);
        assert_eq!(stored.balance, 80.0);
        assert_eq!(company.entries_for_transaction(id).count(), 2);

        assert_eq!(LedgerWriter::reverse(&mut company, id), 2);
        assert!(company.entries.is_empty());
    }

    #[test]
    fn failed_commit_leaves_entries_untouched() {
        let (mut company, customer) = setup();
        let txn = Transaction::new(TransactionKind::Invoice, date(), "USD").with_contact(customer);
        let id = txn.id;
        company.transactions.push(txn);
        assert_eq!(LedgerWriter::commit(&mut company, id), Err(PostingError::Empty));
        assert!(company.entries.is_empty());
        assert_eq!(
            company.transaction(id).unwrap().status,
            TransactionStatus::Draft
        );
    }
}
