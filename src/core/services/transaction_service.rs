//! Business logic helpers for creating, posting, editing, and voiding transactions.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::{Company, Transaction, TransactionKind, TransactionStatus, BALANCE_TOLERANCE};
use crate::ledger::allocation::{payments_applied_to, release};
use crate::ledger::{post, LedgerWriter};

/// Narrows `TransactionService::list`; every `None` field matches everything.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TransactionFilter {
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub contact_id: Option<Uuid>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        self.kind.map_or(true, |kind| txn.kind == kind)
            && self.status.map_or(true, |status| txn.status == status)
            && self.contact_id.map_or(true, |id| txn.contact_id == Some(id))
            && self.from.map_or(true, |from| txn.date >= from)
            && self.to.map_or(true, |to| txn.date <= to)
    }
}

/// Provides validated lifecycle operations for business transactions.
pub struct TransactionService;

impl TransactionService {
    /// Stores `draft` with a fresh number, posting it immediately when `post` is set.
    ///
    /// Payments are recorded through `PaymentService`.
    pub fn create(company: &mut Company, mut draft: Transaction, post_now: bool) -> ServiceResult<Uuid> {
        if draft.kind.is_payment() {
            return Err(ServiceError::Invalid(format!(
                "{} must be recorded through the payment operations",
                draft.kind
            )));
        }
        if company.transaction(draft.id).is_some() {
            draft.id = Uuid::new_v4();
        }
        draft.status = TransactionStatus::Draft;
        draft.number = None;
        draft.balance = 0.0;
        draft.revaluations.clear();
        Self::prepare(company, &mut draft)?;
        if post_now {
            post(company, &draft)?;
        }

        draft.number = Some(company.next_number(draft.kind));
        let id = draft.id;
        let kind = draft.kind;
        company.transactions.push(draft);
        if post_now {
            if let Err(err) = LedgerWriter::commit(company, id) {
                company.transactions.retain(|txn| txn.id != id);
                return Err(err.into());
            }
        }
        company.touch();
        info!(transaction = %id, %kind, posted = post_now, "created transaction");
        Ok(id)
    }

    /// Posts a draft to the ledger.
    pub fn post(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        let txn = Self::get(company, id)?;
        if txn.status != TransactionStatus::Draft {
            return Err(ServiceError::Invalid(format!(
                "{} is {} and cannot be posted",
                txn.number.as_deref().unwrap_or("Transaction"),
                txn.status
            )));
        }
        let mut prepared = txn.clone();
        Self::prepare(company, &mut prepared)?;
        post(company, &prepared)?;
        if let Some(stored) = company.transaction_mut(id) {
            *stored = prepared;
        }
        LedgerWriter::commit(company, id)?;
        Ok(())
    }

    /// Replaces the editable fields of `id` with `changes`, re-posting when already posted.
    pub fn update(company: &mut Company, id: Uuid, changes: Transaction) -> ServiceResult<()> {
        let existing = Self::get(company, id)?.clone();
        if existing.status == TransactionStatus::Void {
            return Err(ServiceError::Invalid("Void transactions cannot be edited".into()));
        }
        if existing.kind.is_payment() {
            return Err(ServiceError::Invalid(
                "Payments cannot be edited; void the payment and record it again".into(),
            ));
        }
        if changes.kind != existing.kind {
            return Err(ServiceError::Invalid(format!(
                "Cannot change a {} into a {}",
                existing.kind, changes.kind
            )));
        }
        Self::ensure_no_payments(company, &existing)?;
        if Self::is_revaluation_journal(company, id) {
            return Err(ServiceError::Invalid(
                "FX revaluation journals cannot be edited; void it and revalue again".into(),
            ));
        }

        let mut updated = changes;
        updated.id = id;
        updated.number = existing.number.clone();
        updated.status = existing.status;
        updated.allocations.clear();
        updated.difference = None;
        updated.recurring_template_id = existing.recurring_template_id;
        updated.revaluations = existing.revaluations.clone();
        Self::prepare(company, &mut updated)?;
        if !existing.revaluations.is_empty() {
            let repriced = updated.currency != existing.currency
                || updated.exchange_rate != existing.exchange_rate
                || updated.contact_id != existing.contact_id
                || (updated.amount - existing.amount).abs() > BALANCE_TOLERANCE;
            if repriced {
                return Err(ServiceError::Invalid(format!(
                    "{} has been revalued; void its FX revaluation before changing its amount, currency or contact",
                    existing.number.as_deref().unwrap_or("Transaction")
                )));
            }
        }
        if existing.is_posted() {
            post(company, &updated)?;
            updated.balance = updated.amount;
        }

        if let Some(stored) = company.transaction_mut(id) {
            *stored = updated;
        }
        if existing.is_posted() {
            if let Err(err) = LedgerWriter::commit(company, id) {
                if let Some(stored) = company.transaction_mut(id) {
                    *stored = existing;
                }
                return Err(err.into());
            }
        }
        company.touch();
        info!(transaction = %id, "updated transaction");
        Ok(())
    }

    /// Reverses the entries of `id`, releases any allocations it made, and marks it void.
    pub fn void(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        let existing = Self::get(company, id)?.clone();
        if existing.status == TransactionStatus::Void {
            return Err(ServiceError::Invalid(format!(
                "{} is already void",
                existing.number.as_deref().unwrap_or("Transaction")
            )));
        }
        Self::ensure_no_payments(company, &existing)?;
        Self::ensure_not_revalued(company, &existing)?;
        let unmarked = Self::revaluation_marks_to_undo(company, &existing)?;

        if existing.kind.is_payment() && existing.is_posted() {
            release(company, &existing);
        }
        let removed = LedgerWriter::reverse(company, id);
        for target in unmarked {
            if let Some(txn) = company.transaction_mut(target) {
                txn.revaluations.pop();
            }
        }
        if let Some(txn) = company.transaction_mut(id) {
            txn.balance = 0.0;
            txn.status = TransactionStatus::Void;
        }
        company.touch();
        info!(transaction = %id, entries = removed, "voided transaction");
        Ok(())
    }

    /// Voids `id` when needed and removes it from the book.
    pub fn delete(company: &mut Company, id: Uuid) -> ServiceResult<Transaction> {
        let status = Self::get(company, id)?.status;
        if status != TransactionStatus::Void && status != TransactionStatus::Draft {
            Self::void(company, id)?;
        }
        let index = company
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| ServiceError::not_found("Transaction", id))?;
        let removed = company.transactions.remove(index);
        company.touch();
        info!(transaction = %id, "deleted transaction");
        Ok(removed)
    }

    pub fn get(company: &Company, id: Uuid) -> ServiceResult<&Transaction> {
        company
            .transaction(id)
            .ok_or_else(|| ServiceError::not_found("Transaction", id))
    }

    /// Transactions matching `filter`, ordered by date then number.
    pub fn list<'a>(company: &'a Company, filter: &TransactionFilter) -> Vec<&'a Transaction> {
        let mut matches: Vec<&Transaction> = company
            .transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.number.cmp(&b.number)));
        matches
    }

    fn ensure_no_payments(company: &Company, txn: &Transaction) -> ServiceResult<()> {
        if !txn.is_open_item() {
            return Ok(());
        }
        let applied = payments_applied_to(company, txn.id);
        if applied.is_empty() {
            return Ok(());
        }
        Err(ServiceError::Invalid(format!(
            "{} has {} applied payment(s); void them first",
            txn.number.as_deref().unwrap_or("Transaction"),
            applied.len()
        )))
    }

    fn is_revaluation_journal(company: &Company, id: Uuid) -> bool {
        company.transactions.iter().any(|txn| txn.is_revalued_by(id))
    }

    /// A revalued open item, or a payment whose target was revalued after it,
    /// would leave the revaluation booked against a balance that no longer exists.
    fn ensure_not_revalued(company: &Company, txn: &Transaction) -> ServiceResult<()> {
        let label = txn.number.as_deref().unwrap_or("Transaction");
        if txn.is_open_item() && !txn.revaluations.is_empty() {
            return Err(ServiceError::Invalid(format!(
                "{} has been revalued; void its FX revaluation first",
                label
            )));
        }
        if !txn.kind.is_payment() || !txn.is_posted() {
            return Ok(());
        }
        let position = |id: Uuid| company.transactions.iter().position(|t| t.id == id);
        let Some(payment_at) = position(txn.id) else {
            return Ok(());
        };
        for allocation in &txn.allocations {
            let Some(target) = company.transaction(allocation.target_id) else {
                continue;
            };
            let revalued_later = target
                .revaluations
                .iter()
                .any(|mark| position(mark.journal_id).is_some_and(|at| at > payment_at));
            if revalued_later {
                return Err(ServiceError::Invalid(format!(
                    "{} was revalued after {}; void that FX revaluation first",
                    target.number.as_deref().unwrap_or("Transaction"),
                    label
                )));
            }
        }
        Ok(())
    }

    /// Open items whose latest mark was booked by the revaluation journal `journal`.
    ///
    /// Only the most recent revaluation of an unchanged balance can be undone.
    fn revaluation_marks_to_undo(company: &Company, journal: &Transaction) -> ServiceResult<Vec<Uuid>> {
        let mut targets = Vec::new();
        for txn in company.transactions.iter().filter(|t| t.is_revalued_by(journal.id)) {
            let label = txn.number.as_deref().unwrap_or("Transaction");
            let latest = txn.revaluations.last().filter(|mark| mark.journal_id == journal.id);
            let Some(mark) = latest else {
                return Err(ServiceError::Invalid(format!(
                    "{} has a later FX revaluation; void that one first",
                    label
                )));
            };
            if (txn.balance - mark.balance).abs() > BALANCE_TOLERANCE {
                return Err(ServiceError::Invalid(format!(
                    "{} has been paid since it was revalued; void those payments first",
                    label
                )));
            }
            targets.push(txn.id);
        }
        Ok(targets)
    }

    /// Normalises a document before it is stored: contact roles, line math, tax,
    /// due date, and the exchange rate for foreign documents.
    fn prepare(company: &Company, txn: &mut Transaction) -> ServiceResult<()> {
        if let Some(contact_id) = txn.contact_id {
            let contact = company
                .contact(contact_id)
                .ok_or_else(|| ServiceError::not_found("Contact", contact_id))?;
            let role_ok = match txn.kind {
                TransactionKind::Invoice | TransactionKind::SalesReceipt => contact.is_customer(),
                TransactionKind::Bill => contact.is_vendor(),
                _ => true,
            };
            if !role_ok {
                return Err(ServiceError::Invalid(format!(
                    "{} is not a {} contact for a {}",
                    contact.name,
                    if txn.kind == TransactionKind::Bill { "vendor" } else { "customer" },
                    txn.kind
                )));
            }
        } else if txn.is_open_item() {
            return Err(ServiceError::Invalid(format!("{} requires a contact", txn.kind)));
        }

        for line in txn.line_items.iter_mut() {
            let tax = match line.sales_tax_id {
                Some(tax_id) => Some(
                    company
                        .sales_tax(tax_id)
                        .ok_or_else(|| ServiceError::not_found("Sales tax", tax_id))?,
                ),
                None => None,
            };
            line.recompute(tax);
        }

        if txn.is_open_item() {
            if txn.due_date.is_none() {
                let terms = txn
                    .contact_id
                    .and_then(|id| company.contact(id))
                    .map(|contact| contact.payment_terms_days)
                    .unwrap_or(0);
                txn.due_date = Some(txn.date + Duration::days(i64::from(terms)));
            }
        } else {
            txn.due_date = None;
        }
        if let Some(due) = txn.due_date {
            if due < txn.date {
                return Err(ServiceError::Invalid(format!(
                    "Due date {} is before the document date {}",
                    due, txn.date
                )));
            }
        }

        if txn.currency == company.base_currency {
            txn.exchange_rate = 1.0;
        } else if txn.exchange_rate == 1.0 {
            let lookup = company.fx_rates.lookup_rate(
                txn.currency.as_str(),
                company.base_currency.as_str(),
                txn.date,
            )?;
            txn.exchange_rate = lookup.rate;
        }
        txn.amount = txn.total();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::FxRate;
    use crate::domain::{Contact, JournalLine, LineItem, SalesTax};
    use crate::ledger::trial_balance;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn setup() -> (Company, Uuid, Uuid) {
        let mut company = Company::with_default_chart("Txn", "USD");
        let customer = company.add_contact(Contact::customer("Acme").with_terms(14));
        let sales = company.account_by_name("Sales").unwrap().id;
        (company, customer, sales)
    }

    fn invoice(customer: Uuid, sales: Uuid, price: f64) -> Transaction {
        Transaction::new(TransactionKind::Invoice, date(1), "USD")
            .with_contact(customer)
            .with_line(LineItem::new(sales, 2.0, price))
    }

    #[test]
    fn create_numbers_and_defaults_due_date() {
        let (mut company, customer, sales) = setup();
        let id = TransactionService::create(&mut company, invoice(customer, sales, 50.0), false).unwrap();
        let txn = company.transaction(id).unwrap();
        assert_eq!(txn.number.as_deref(), Some("INV-0001"));
        assert_eq!(txn.status, TransactionStatus::Draft);
        assert_eq!(txn.amount, 100.0);
        assert_eq!(txn.due_date, Some(date(15)));
        assert!(company.entries.is_empty());

        TransactionService::post(&mut company, id).unwrap();
        assert_eq!(company.transaction(id).unwrap().balance, 100.0);
        assert!(TransactionService::post(&mut company, id).is_err());
    }

    #[test]
    fn create_recomputes_tampered_lines() {
        let (mut company, customer, sales) = setup();
        let payable = company.account_by_name("Sales Tax Payable").unwrap().id;
        let tax = SalesTax::new("GST", 10.0, payable);
        let tax_id = company.add_sales_tax(tax.clone());
        let mut draft = invoice(customer, sales, 50.0);
        draft.line_items[0].sales_tax_id = Some(tax_id);
        draft.line_items[0].amount = 1.0;
        let id = TransactionService::create(&mut company, draft, true).unwrap();
        let txn = company.transaction(id).unwrap();
        assert_eq!(txn.line_items[0].amount, 100.0);
        assert_eq!(txn.line_items[0].tax_amount, 10.0);
        assert_eq!(txn.amount, 110.0);
    }

    #[test]
    fn failed_post_stores_nothing() {
        let (mut company, customer, sales) = setup();
        let mut draft = invoice(customer, sales, 10.0);
        draft.line_items[0].account_id = Uuid::new_v4();
        assert!(TransactionService::create(&mut company, draft, true).is_err());
        assert!(company.transactions.is_empty());
        assert!(company.sequences.is_empty());
    }

    #[test]
    fn vendor_cannot_be_invoiced() {
        let (mut company, _, sales) = setup();
        let vendor = company.add_contact(Contact::vendor("Supplier"));
        let err = TransactionService::create(&mut company, invoice(vendor, sales, 5.0), false)
            .expect_err("vendor invoice");
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[test]
    fn update_reposts_and_void_restores_balances() {
        let (mut company, customer, sales) = setup();
        let id = TransactionService::create(&mut company, invoice(customer, sales, 50.0), true).unwrap();

        let mut changes = company.transaction(id).unwrap().clone();
        changes.line_items[0].unit_price = 75.0;
        TransactionService::update(&mut company, id, changes).unwrap();
        let txn = company.transaction(id).unwrap();
        assert_eq!(txn.amount, 150.0);
        assert_eq!(txn.balance, 150.0);
        assert_eq!(trial_balance(&company, None).total_debit, 150.0);

        TransactionService::void(&mut company, id).unwrap();
        let txn = company.transaction(id).unwrap().clone();
        assert_eq!(txn.status, TransactionStatus::Void);
        assert_eq!(txn.balance, 0.0);
        assert!(company.entries.is_empty());
        assert!(TransactionService::update(&mut company, id, txn).is_err());

        TransactionService::delete(&mut company, id).unwrap();
        assert!(company.transaction(id).is_none());
    }

    #[test]
    fn foreign_documents_pick_up_the_book_rate() {
        let (mut company, customer, sales) = setup();
        company
            .fx_rates
            .add_rate(FxRate::new("EUR", "USD", date(1), 1.1))
            .unwrap();
        let mut draft = invoice(customer, sales, 50.0);
        draft.currency = "EUR".into();
        let id = TransactionService::create(&mut company, draft, true).unwrap();
        assert_eq!(company.transaction(id).unwrap().exchange_rate, 1.1);

        let mut missing = invoice(customer, sales, 50.0);
        missing.currency = "GBP".into();
        assert!(matches!(
            TransactionService::create(&mut company, missing, false),
            Err(ServiceError::Currency(_))
        ));
    }

    #[test]
    fn list_filters_by_kind_and_range() {
        let (mut company, customer, sales) = setup();
        let cash = company.account_by_name("Cash").unwrap().id;
        let equity = company.account_by_name("Owner's Equity").unwrap().id;
        TransactionService::create(&mut company, invoice(customer, sales, 10.0), true).unwrap();
        let journal = Transaction::new(TransactionKind::JournalEntry, date(20), "USD")
            .with_journal_line(JournalLine::debit(cash, 5.0))
            .with_journal_line(JournalLine::credit(equity, 5.0));
        TransactionService::create(&mut company, journal, true).unwrap();

        let filter = TransactionFilter {
            kind: Some(TransactionKind::JournalEntry),
            ..TransactionFilter::default()
        };
        assert_eq!(TransactionService::list(&company, &filter).len(), 1);
        let filter = TransactionFilter {
            to: Some(date(10)),
            ..TransactionFilter::default()
        };
        let listed = TransactionService::list(&company, &filter);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, TransactionKind::Invoice);
    }
}
