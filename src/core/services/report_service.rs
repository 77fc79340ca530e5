use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::Company;
use crate::ledger::{
    aging_for_contact, aging_report, balance_sheet, profit_and_loss, register, trial_balance,
    AgingSchedule, AgingSide, BalanceSheet, ProfitAndLoss, Register, TrialBalance,
};

use super::{ServiceError, ServiceResult};

/// Read-only financial reports over the posted ledger.
pub struct ReportService;

impl ReportService {
    pub fn trial_balance(company: &Company, as_of: Option<NaiveDate>) -> TrialBalance {
        trial_balance(company, as_of)
    }

    pub fn profit_and_loss(company: &Company, from: NaiveDate, to: NaiveDate) -> ServiceResult<ProfitAndLoss> {
        Self::ensure_range(Some(from), Some(to))?;
        Ok(profit_and_loss(company, from, to))
    }

    pub fn balance_sheet(company: &Company, as_of: NaiveDate) -> BalanceSheet {
        balance_sheet(company, as_of)
    }

    pub fn aging(company: &Company, side: AgingSide, as_of: NaiveDate) -> AgingSchedule {
        aging_report(company, side, as_of)
    }

    pub fn contact_aging(
        company: &Company,
        contact_id: Uuid,
        side: AgingSide,
        as_of: NaiveDate,
    ) -> ServiceResult<AgingSchedule> {
        if company.contact(contact_id).is_none() {
            return Err(ServiceError::not_found("Contact", contact_id));
        }
        Ok(aging_for_contact(company, contact_id, side, as_of))
    }

    pub fn register(
        company: &Company,
        account_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ServiceResult<Register> {
        if company.account(account_id).is_none() {
            return Err(ServiceError::not_found("Account", account_id));
        }
        Self::ensure_range(from, to)?;
        Ok(register(company, account_id, from, to))
    }

    fn ensure_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ServiceResult<()> {
        match (from, to) {
            (Some(from), Some(to)) if to < from => Err(ServiceError::Invalid(format!(
                "Report period ends ({}) before it starts ({})",
                to, from
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, 1).unwrap()
    }

    #[test]
    fn ranges_and_ids_are_checked() {
        let company = Company::with_default_chart("Reports", "USD");
        assert!(ReportService::profit_and_loss(&company, date(5), date(4)).is_err());
        assert!(ReportService::register(&company, Uuid::new_v4(), None, None)
            .expect_err("unknown account")
            .is_not_found());
        let cash = company.account_by_name("Cash").unwrap().id;
        let register = ReportService::register(&company, cash, Some(date(1)), Some(date(2))).unwrap();
        assert!(register.lines.is_empty());
        assert!(ReportService::trial_balance(&company, None).is_balanced());
        assert!(ReportService::balance_sheet(&company, date(6)).is_balanced());
    }
}
