//! Exchange-rate maintenance and unrealized gain/loss postings.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::currency::FxRate;
use crate::domain::Company;
use crate::ledger::revaluation::revalued_open_items;
use crate::ledger::{revaluation_journal, revalue, RevaluationReport};

use super::transaction_service::TransactionService;
use super::{ServiceError, ServiceResult};

pub struct FxService;

impl FxService {
    pub fn add_rate(company: &mut Company, rate: FxRate) -> ServiceResult<()> {
        if rate.from.as_str().len() != 3 || rate.to.as_str().len() != 3 {
            return Err(ServiceError::Invalid(format!(
                "Currency codes must have three letters: {} -> {}",
                rate.from, rate.to
            )));
        }
        if rate.from == rate.to {
            return Err(ServiceError::Invalid(format!(
                "Rate must convert between two currencies, got {} -> {}",
                rate.from, rate.to
            )));
        }
        let summary = format!("{} -> {} on {}", rate.from, rate.to, rate.date);
        company.fx_rates.add_rate(rate)?;
        company.touch();
        info!(rate = %summary, "recorded FX rate");
        Ok(())
    }

    pub fn remove_rate(company: &mut Company, from: &str, to: &str, date: NaiveDate) -> ServiceResult<usize> {
        let removed = company.fx_rates.remove_rate(from, to, date);
        if removed == 0 {
            return Err(ServiceError::NotFound(format!("FX rate {} -> {} on {}", from, to, date)));
        }
        company.touch();
        Ok(removed)
    }

    pub fn list(company: &Company) -> &[FxRate] {
        company.fx_rates.all_rates()
    }

    /// Applies the configured look-back window for nearest-prior rates.
    pub fn set_tolerance(company: &mut Company, days: i64) {
        if company.fx_rates.tolerance_days != days {
            company.fx_rates.tolerance_days = days.max(0);
            company.touch();
        }
    }

    /// Previews the unrealized gain/loss at `as_of` without posting.
    pub fn revalue(company: &Company, as_of: NaiveDate) -> ServiceResult<RevaluationReport> {
        Ok(revalue(company, as_of)?)
    }

    /// Posts the revaluation journal for `as_of`, returning its id when anything moved.
    ///
    /// Each revalued open item records a mark so the next run only books the change
    /// since, and a payment clears the item at the revalued rate.
    pub fn post_revaluation(company: &mut Company, as_of: NaiveDate) -> ServiceResult<Option<Uuid>> {
        let report = revalue(company, as_of)?;
        let Some(journal) = revaluation_journal(company, &report)? else {
            return Ok(None);
        };
        let id = TransactionService::create(company, journal, true)?;
        for (target, mark) in revalued_open_items(&report, id) {
            if let Some(txn) = company.transaction_mut(target) {
                txn.revaluations.push(mark);
            }
        }
        company.touch();
        info!(
            journal = %id,
            as_of = %as_of,
            unrealized = report.total_unrealized,
            "posted FX revaluation"
        );
        Ok(Some(id))
    }
}
