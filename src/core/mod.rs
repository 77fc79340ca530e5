pub mod company_manager;
pub mod errors;
pub mod services;
pub mod utils;

pub use company_manager::{CompanyManager, LoadMetadata};
pub use errors::{BookError, CliError};
