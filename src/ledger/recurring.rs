//! Generates transactions from recurring templates.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Company, RecurrenceStatus, RecurringTemplate, Transaction, TransactionStatus};

use super::posting::{post, LedgerWriter};

/// Upper bound on occurrences produced for one template in a single run.
pub const MAX_OCCURRENCES_PER_RUN: usize = 1024;

/// Occurrences due on or before `as_of`, as `(index, date)` pairs.
///
/// Dates are measured from `start_date` so month-end series do not drift.
pub fn due_dates(template: &RecurringTemplate, as_of: NaiveDate) -> Vec<(u32, NaiveDate)> {
    let mut due = Vec::new();
    if !template.is_active() || template.next_date.is_none() {
        return due;
    }
    let mut index = template.generated_count;
    while due.len() < MAX_OCCURRENCES_PER_RUN {
        let date = template.interval.nth_date(template.start_date, index);
        if date > as_of || !template.allows(index, date) {
            break;
        }
        due.push((index, date));
        index += 1;
    }
    due
}

/// The date following the last generated occurrence, or `None` once the series has ended.
pub fn upcoming_date(template: &RecurringTemplate) -> Option<NaiveDate> {
    let index = template.generated_count;
    let date = template.interval.nth_date(template.start_date, index);
    template.allows(index, date).then_some(date)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedOccurrence {
    pub template_id: Uuid,
    pub transaction_id: Uuid,
    pub number: Option<String>,
    pub date: NaiveDate,
    pub posted: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecurringFailure {
    pub template_id: Uuid,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RecurringRunSummary {
    pub generated: Vec<GeneratedOccurrence>,
    pub completed: Vec<Uuid>,
    pub failures: Vec<RecurringFailure>,
}

/// Builds the transaction for one occurrence of `template` on `date`.
pub fn instantiate(company: &Company, template: &RecurringTemplate, date: NaiveDate) -> Transaction {
    let mut txn = template.template.clone();
    txn.id = Uuid::new_v4();
    txn.number = None;
    txn.status = TransactionStatus::Draft;
    txn.date = date;
    txn.allocations.clear();
    txn.amount = 0.0;
    txn.balance = 0.0;
    txn.revaluations.clear();
    txn.recurring_template_id = Some(template.id);
    for line in &mut txn.line_items {
        line.id = Uuid::new_v4();
    }
    txn.due_date = if txn.is_open_item() {
        let terms = txn
            .contact_id
            .and_then(|id| company.contact(id))
            .map(|contact| contact.payment_terms_days)
            .unwrap_or(0);
        Some(date + Duration::days(i64::from(terms)))
    } else {
        None
    };
    txn
}

pub struct RecurringRunner;

impl RecurringRunner {
    /// Generates every due occurrence of every active template up to `as_of`.
    ///
    /// A template whose occurrence fails to post is left untouched and reported in
    /// `failures`; other templates still run.
    pub fn run(company: &mut Company, as_of: NaiveDate) -> RecurringRunSummary {
        let mut summary = RecurringRunSummary::default();
        let ids: Vec<Uuid> = company
            .recurring
            .iter()
            .filter(|template| template.is_active())
            .map(|template| template.id)
            .collect();

        for id in ids {
            let Some(template) = company.recurring_template(id).cloned() else {
                continue;
            };
            let due = due_dates(&template, as_of);

            let mut drafts = Vec::with_capacity(due.len());
            let mut failure = None;
            for (_, date) in &due {
                let draft = instantiate(company, &template, *date);
                if template.auto_post {
                    if let Err(err) = post(company, &draft) {
                        failure = Some(err.to_string());
                        break;
                    }
                }
                drafts.push(draft);
            }
            if let Some(message) = failure {
                warn!(template = %template.id, %message, "recurring template failed to post");
                summary.failures.push(RecurringFailure {
                    template_id: template.id,
                    name: template.name.clone(),
                    message,
                });
                continue;
            }

            let mut last = None;
            for mut draft in drafts {
                draft.number = Some(company.next_number(draft.kind));
                let (txn_id, number, date) = (draft.id, draft.number.clone(), draft.date);
                company.transactions.push(draft);
                let posted = template.auto_post && LedgerWriter::commit(company, txn_id).is_ok();
                summary.generated.push(GeneratedOccurrence {
                    template_id: template.id,
                    transaction_id: txn_id,
                    number,
                    date,
                    posted,
                });
                last = Some(date);
            }

            if let Some(stored) = company.recurring_template_mut(id) {
                stored.generated_count += due.len() as u32;
                if last.is_some() {
                    stored.last_generated = last;
                }
                stored.next_date = upcoming_date(stored);
                if stored.next_date.is_none() {
                    stored.status = RecurrenceStatus::Completed;
                    summary.completed.push(id);
                }
                info!(
                    template = %id,
                    generated = due.len(),
                    next = ?stored.next_date,
                    "ran recurring template"
                );
            }
        }
        if !summary.generated.is_empty() || !summary.completed.is_empty() {
            company.touch();
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Contact, LineItem, RecurrenceEnd, TimeInterval, TransactionKind,
    };

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn company_with_template(end: RecurrenceEnd, auto_post: bool) -> (Company, Uuid) {
        let mut company = Company::with_default_chart("Recurring", "USD");
        let customer = company.add_contact(Contact::customer("Hooli").with_terms(15));
        let sales = company.account_by_name("Sales").unwrap().id;
        let invoice = Transaction::new(TransactionKind::Invoice, date(1, 31), "USD")
            .with_contact(customer)
            .with_line(LineItem::new(sales, 1.0, 500.0));
        let template = RecurringTemplate::new("Retainer", invoice, TimeInterval::monthly(), date(1, 31))
            .with_end(end)
            .with_auto_post(auto_post);
        let id = template.id;
        company.recurring.push(template);
        (company, id)
    }

    #[test]
    fn due_dates_clamp_to_month_end_without_drift() {
        let (company, id) = company_with_template(RecurrenceEnd::Never, false);
        let template = company.recurring_template(id).unwrap();
        let dates: Vec<_> = due_dates(template, date(4, 30)).into_iter().map(|(_, d)| d).collect();
        assert_eq!(dates, vec![date(1, 31), date(2, 29), date(3, 31), date(4, 30)]);
    }

    #[test]
    fn run_generates_and_posts_occurrences() {
        let (mut company, id) = company_with_template(RecurrenceEnd::Never, true);
        let summary = RecurringRunner::run(&mut company, date(3, 1));
        assert_eq!(summary.generated.len(), 2);
        assert!(summary.generated.iter().all(|g| g.posted));

        let first = company.transaction(summary.generated[0].transaction_id).unwrap();
        assert_eq!(first.number.as_deref(), Some("INV-0001"));
        assert_eq!(first.due_date, Some(date(2, 15)));
        assert_eq!(first.balance, 500.0);
        assert_eq!(first.recurring_template_id, Some(id));

        let template = company.recurring_template(id).unwrap();
        assert_eq!(template.generated_count, 2);
        assert_eq!(template.last_generated, Some(date(2, 29)));
        assert_eq!(template.next_date, Some(date(3, 31)));

        let again = RecurringRunner::run(&mut company, date(3, 1));
        assert!(again.generated.is_empty());
    }

    #[test]
    fn occurrence_limit_completes_the_series() {
        let (mut company, id) = company_with_template(RecurrenceEnd::AfterOccurrences(2), false);
        let summary = RecurringRunner::run(&mut company, date(12, 31));
        assert_eq!(summary.generated.len(), 2);
        assert_eq!(summary.completed, vec![id]);
        let template = company.recurring_template(id).unwrap();
        assert_eq!(template.status, RecurrenceStatus::Completed);
        assert!(company
            .transactions
            .iter()
            .all(|txn| txn.status == TransactionStatus::Draft));
    }

    #[test]
    fn paused_templates_are_skipped() {
        let (mut company, id) = company_with_template(RecurrenceEnd::Never, false);
        company.recurring_template_mut(id).unwrap().status = RecurrenceStatus::Paused;
        let summary = RecurringRunner::run(&mut company, date(6, 30));
        assert!(summary.generated.is_empty());
        assert!(company.transactions.is_empty());
    }
}
