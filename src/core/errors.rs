use std::result::Result as StdResult;

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::services::ServiceError;

/// Unified error type for the company manager and storage layers.
#[derive(Error, Debug)]
pub enum BookError {
    #[error("No company is open")]
    CompanyNotLoaded,
    #[error("Company not found: {0}")]
    CompanyNotFound(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub type Result<T> = StdResult<T, BookError>;

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] BookError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::StorageError(err.to_string())
    }
}

impl From<ConfigError> for BookError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => BookError::StorageError(io.to_string()),
            other => BookError::ConfigError(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::from(BookError::from(err))
    }
}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        CliError::from(BookError::from(err))
    }
}
