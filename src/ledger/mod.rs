//! The ledger engine: posting, balances, payment allocation, aging, statements,
//! FX revaluation, recurring generation, and financial reports.
//!
//! Everything that writes `Company::entries` goes through [`posting::LedgerWriter`].

pub mod aging;
pub mod allocation;
pub mod balances;
pub mod error;
pub mod posting;
pub mod recurring;
pub mod reports;
pub mod revaluation;
pub mod statement;

pub use aging::{aging_for_contact, aging_report, AgingBucket, AgingItem, AgingSchedule, AgingSide};
pub use allocation::{plan_allocations, reconcile, AllocationPlan, PlannedAllocation};
pub use balances::{
    account_balance, contact_balance, register, trial_balance, Register, RegisterLine,
    TrialBalance, TrialBalanceRow,
};
pub use error::{AllocationError, PostingError, StatementError};
pub use posting::{post, validate_balanced, LedgerWriter};
pub use recurring::{due_dates, RecurringRunSummary, RecurringRunner};
pub use reports::{balance_sheet, profit_and_loss, BalanceSheet, ProfitAndLoss, ReportRow, ReportSection};
pub use revaluation::{revaluation_journal, revalue, RevaluationLine, RevaluationReport, RevaluationSource};
pub use statement::{
    generate as generate_statement, render as render_statement, Statement, StatementKind,
    StatementLine, StatementPage, StatementRequest,
};
