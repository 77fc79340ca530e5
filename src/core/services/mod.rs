pub mod account_service;
pub mod contact_service;
pub mod fx_service;
pub mod payment_service;
pub mod recurring_service;
pub mod report_service;
pub mod sales_tax_service;
pub mod statement_service;
pub mod transaction_service;

pub use account_service::AccountService;
pub use contact_service::ContactService;
pub use fx_service::FxService;
pub use payment_service::{PaymentRequest, PaymentService};
pub use recurring_service::RecurringService;
pub use report_service::ReportService;
pub use sales_tax_service::SalesTaxService;
pub use statement_service::StatementService;
pub use transaction_service::{TransactionFilter, TransactionService};

use crate::currency::CurrencyError;
use crate::ledger::{AllocationError, PostingError, StatementError};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Posting(#[from] PostingError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
}

impl ServiceError {
    pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {}", what, id))
    }

    /// True for errors caused by references to records that do not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::NotFound(_)
                | ServiceError::Posting(PostingError::MissingTransaction(_))
                | ServiceError::Allocation(AllocationError::TargetNotFound(_))
                | ServiceError::Statement(StatementError::UnknownContact(_))
        )
    }
}
