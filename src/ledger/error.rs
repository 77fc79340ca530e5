use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::currency::CurrencyError;
use crate::domain::AccountType;

/// Reasons a transaction cannot be turned into ledger entries.
#[derive(Debug, Error, PartialEq)]
pub enum PostingError {
    #[error("Transaction has nothing to post")]
    Empty,
    #[error("Entries are unbalanced: debits ({debits:.2}) != credits ({credits:.2})")]
    Unbalanced { debits: f64, credits: f64 },
    #[error("Entries must have both debit and credit sides")]
    SingleSided,
    #[error("Entry amount must be a non-negative number")]
    InvalidAmount,
    #[error("Account not found: {0}")]
    MissingAccount(Uuid),
    #[error("Contact not found: {0}")]
    MissingContact(Uuid),
    #[error("{0} requires a payment account")]
    MissingPaymentAccount(String),
    #[error("No active {0} account in the chart of accounts")]
    MissingSystemAccount(AccountType),
    #[error("Archived account cannot receive postings: {0}")]
    ArchivedAccount(String),
    #[error("Invalid line: {0}")]
    InvalidLine(String),
    #[error("Transaction not found: {0}")]
    MissingTransaction(Uuid),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// Reasons a payment cannot be applied to open items.
#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("Allocation target not found: {0}")]
    TargetNotFound(Uuid),
    #[error("{kind} {target} cannot settle a {payment}")]
    WrongKind {
        target: String,
        kind: String,
        payment: String,
    },
    #[error("{0} is not open for payment")]
    NotOpen(String),
    #[error("{0} belongs to a different contact")]
    ContactMismatch(String),
    #[error("Allocation amount must be positive, got {0:.2}")]
    NonPositive(f64),
    #[error("Cannot apply {amount:.2} to {target}; only {balance:.2} remains")]
    OverAllocated {
        target: String,
        amount: f64,
        balance: f64,
    },
    #[error("{target} is in {target_currency}, payment is in {payment_currency}")]
    CurrencyMismatch {
        target: String,
        target_currency: String,
        payment_currency: String,
    },
    #[error("{0} appears more than once")]
    Duplicate(String),
    #[error("Applied {applied:.2} plus difference {difference:.2} does not match {expected:.2}")]
    Unreconciled {
        applied: f64,
        difference: f64,
        expected: f64,
    },
    #[error("Payment has no allocations or difference")]
    Empty,
}

/// Reasons a contact statement cannot be produced.
#[derive(Debug, Error, PartialEq)]
pub enum StatementError {
    #[error("Contact not found: {0}")]
    UnknownContact(Uuid),
    #[error("Statement period ends ({to}) before it starts ({from})")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
}
