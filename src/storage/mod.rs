pub mod files;
pub mod json_backend;

use std::path::{Path, PathBuf};

use crate::{core::errors::BookError, domain::Company};

pub type Result<T> = std::result::Result<T, BookError>;

/// Abstraction over persistence backends capable of storing company books and backups.
pub trait StorageBackend: Send + Sync {
    fn save(&self, company: &Company, name: &str) -> Result<PathBuf>;
    fn load(&self, name: &str) -> Result<Company>;
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    fn backup(&self, company: &Company, name: &str, note: Option<&str>) -> Result<String>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<Company>;
    fn company_path(&self, name: &str) -> PathBuf;
    fn list_companies(&self) -> Result<Vec<String>>;
    fn last_company(&self) -> Result<Option<String>>;
    fn record_last_company(&self, name: Option<&str>) -> Result<()>;

    /// Optional helpers for ad-hoc file operations outside the managed directories.
    fn save_to_path(&self, company: &Company, path: &Path) -> Result<()> {
        json_backend::save_company_to_path(company, path)
    }

    fn load_from_path(&self, path: &Path) -> Result<Company> {
        json_backend::load_company_from_path(path)
    }
}

pub use json_backend::{canonical_name, company_warnings, JsonStorage};
