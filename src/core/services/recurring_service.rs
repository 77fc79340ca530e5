use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Company, RecurrenceEnd, RecurrenceStatus, RecurringTemplate};
use crate::ledger::recurring::{instantiate, upcoming_date};
use crate::ledger::{post, RecurringRunSummary, RecurringRunner};

use super::{ServiceError, ServiceResult};

pub struct RecurringService;

impl RecurringService {
    /// Registers a template after checking that its first occurrence would post.
    pub fn add(company: &mut Company, mut template: RecurringTemplate) -> ServiceResult<Uuid> {
        template.name = template.name.trim().to_string();
        if template.name.is_empty() {
            return Err(ServiceError::Invalid("Recurring template name is required".into()));
        }
        if template.template.kind.is_payment() {
            return Err(ServiceError::Invalid(
                "Payments cannot be scheduled as recurring transactions".into(),
            ));
        }
        if template.interval.every == 0 {
            return Err(ServiceError::Invalid("Recurrence interval must be at least 1".into()));
        }
        match template.end {
            RecurrenceEnd::OnDate(end) if end < template.start_date => {
                return Err(ServiceError::Invalid(format!(
                    "Series ends ({}) before it starts ({})",
                    end, template.start_date
                )));
            }
            RecurrenceEnd::AfterOccurrences(0) => {
                return Err(ServiceError::Invalid("Series needs at least one occurrence".into()));
            }
            _ => {}
        }
        let sample = instantiate(company, &template, template.start_date);
        post(company, &sample)?;

        template.status = RecurrenceStatus::Active;
        template.generated_count = 0;
        template.last_generated = None;
        template.next_date = upcoming_date(&template);
        let id = template.id;
        company.recurring.push(template);
        company.touch();
        info!(template = %id, "added recurring template");
        Ok(id)
    }

    pub fn pause(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        let template = Self::template_mut(company, id)?;
        if template.status != RecurrenceStatus::Active {
            return Err(ServiceError::Invalid(format!(
                "`{}` is {} and cannot be paused",
                template.name, template.status
            )));
        }
        template.status = RecurrenceStatus::Paused;
        company.touch();
        Ok(())
    }

    /// Reactivates a paused template; missed occurrences are generated on the next run.
    pub fn resume(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        let template = Self::template_mut(company, id)?;
        match template.status {
            RecurrenceStatus::Paused => {}
            RecurrenceStatus::Active => return Ok(()),
            RecurrenceStatus::Completed => {
                return Err(ServiceError::Invalid(format!(
                    "`{}` has completed and cannot be resumed",
                    template.name
                )))
            }
        }
        template.status = RecurrenceStatus::Active;
        template.next_date = upcoming_date(template);
        company.touch();
        Ok(())
    }

    /// Deletes the template; transactions it already generated are kept.
    pub fn remove(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        let before = company.recurring.len();
        company.recurring.retain(|template| template.id != id);
        if company.recurring.len() == before {
            return Err(ServiceError::not_found("Recurring template", id));
        }
        company.touch();
        info!(template = %id, "removed recurring template");
        Ok(())
    }

    pub fn list(company: &Company) -> Vec<&RecurringTemplate> {
        let mut templates: Vec<&RecurringTemplate> = company.recurring.iter().collect();
        templates.sort_by(|a, b| a.next_date.cmp(&b.next_date).then_with(|| a.name.cmp(&b.name)));
        templates
    }

    pub fn run_due(company: &mut Company, as_of: NaiveDate) -> RecurringRunSummary {
        RecurringRunner::run(company, as_of)
    }

    fn template_mut(company: &mut Company, id: Uuid) -> ServiceResult<&mut RecurringTemplate> {
        company
            .recurring_template_mut(id)
            .ok_or_else(|| ServiceError::not_found("Recurring template", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, LineItem, TimeInterval, Transaction, TransactionKind};

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn template(company: &mut Company) -> RecurringTemplate {
        let customer = company.add_contact(Contact::customer("Hooli"));
        let sales = company.account_by_name("Sales").unwrap().id;
        let invoice = Transaction::new(TransactionKind::Invoice, date(1, 1), "USD")
            .with_contact(customer)
            .with_line(LineItem::new(sales, 1.0, 250.0));
        RecurringTemplate::new("Support plan", invoice, TimeInterval::monthly(), date(1, 1))
            .with_auto_post(true)
    }

    #[test]
    fn pause_resume_and_run() {
        let mut company = Company::with_default_chart("Recurring", "USD");
        let template = template(&mut company);
        let id = RecurringService::add(&mut company, template).unwrap();

        RecurringService::pause(&mut company, id).unwrap();
        assert!(RecurringService::run_due(&mut company, date(3, 1)).generated.is_empty());
        assert!(RecurringService::pause(&mut company, id).is_err());

        RecurringService::resume(&mut company, id).unwrap();
        let summary = RecurringService::run_due(&mut company, date(3, 1));
        assert_eq!(summary.generated.len(), 3);
        assert!(summary.generated.iter().all(|g| g.posted));
        assert_eq!(
            company.recurring_template(id).unwrap().next_date,
            Some(date(4, 1))
        );
    }

    #[test]
    fn invalid_templates_are_rejected() {
        let mut company = Company::with_default_chart("Recurring", "USD");
        let mut broken = template(&mut company);
        broken.template.line_items.clear();
        assert!(RecurringService::add(&mut company, broken).is_err());

        let ended = template(&mut company).with_end(RecurrenceEnd::OnDate(date(1, 1) - chrono::Duration::days(1)));
        assert!(RecurringService::add(&mut company, ended).is_err());
        assert!(company.recurring.is_empty());
    }

    #[test]
    fn completed_series_cannot_resume() {
        let mut company = Company::with_default_chart("Recurring", "USD");
        let once = template(&mut company).with_end(RecurrenceEnd::AfterOccurrences(1));
        let id = RecurringService::add(&mut company, once).unwrap();
        let summary = RecurringService::run_due(&mut company, date(6, 1));
        assert_eq!(summary.completed, vec![id]);
        assert!(RecurringService::resume(&mut company, id).is_err());
        RecurringService::remove(&mut company, id).unwrap();
        assert!(RecurringService::list(&company).is_empty());
    }
}
