//! Pure domain models for the company book: accounts, contacts, taxes, transactions,
//! ledger entries, and recurring templates. No I/O lives here.

pub mod account;
pub mod common;
pub mod company;
pub mod contact;
pub mod ledger_entry;
pub mod recurring;
pub mod sales_tax;
pub mod transaction;

pub use account::{Account, AccountClass, AccountType};
pub use common::{
    approx_eq, round_money, Displayable, Identifiable, NamedEntity, TimeInterval, TimeUnit,
    ALLOCATION_TOLERANCE, BALANCE_TOLERANCE,
};
pub use company::Company;
pub use contact::{Contact, ContactKind};
pub use ledger_entry::{EntrySide, LedgerEntry};
pub use recurring::{RecurrenceEnd, RecurrenceStatus, RecurringTemplate};
pub use sales_tax::SalesTax;
pub use transaction::{
    Allocation, Difference, JournalLine, LineItem, RevaluationMark, Transaction,
    TransactionKind, TransactionStatus,
};
