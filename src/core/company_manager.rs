use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::errors::{BookError, Result};
use crate::currency::CurrencyCode;
use crate::domain::Company;
use crate::storage::{canonical_name, company_warnings, StorageBackend};

/// Metadata describing the outcome of opening a company.
#[derive(Debug, Clone)]
pub struct LoadMetadata {
    pub warnings: Vec<String>,
    pub path: PathBuf,
    pub name: String,
    pub schema_version: u8,
}

/// Facade that coordinates the open company, persistence, and backups.
pub struct CompanyManager {
    pub current: Option<Company>,
    current_name: Option<String>,
    storage: Box<dyn StorageBackend>,
}

impl CompanyManager {
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self {
            current: None,
            current_name: None,
            storage,
        }
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    /// Creates a company with the default chart of accounts, saves it, and opens it.
    pub fn create(&mut self, name: &str, base_currency: &str) -> Result<PathBuf> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BookError::InvalidInput("company name is required".into()));
        }
        let currency = CurrencyCode::new(base_currency);
        if currency.as_str().len() != 3 || !currency.as_str().chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(BookError::InvalidInput(format!(
                "`{}` is not a three-letter currency code",
                base_currency
            )));
        }
        if self.storage.company_path(trimmed).exists() {
            return Err(BookError::InvalidInput(format!(
                "company `{}` already exists",
                trimmed
            )));
        }
        let company = Company::with_default_chart(trimmed, currency);
        let path = self.storage.save(&company, trimmed)?;
        self.storage.record_last_company(Some(trimmed))?;
        self.current = Some(company);
        self.current_name = Some(canonical_name(trimmed));
        info!(company = trimmed, path = %path.display(), "created company");
        Ok(path)
    }

    pub fn open(&mut self, name: &str) -> Result<LoadMetadata> {
        let company = self.storage.load(name)?;
        let path = self.storage.company_path(name);
        self.storage.record_last_company(Some(name))?;
        Ok(self.apply_load(company, path, canonical_name(name)))
    }

    /// Opens a snapshot from an arbitrary file; `save` then writes it under its slug.
    pub fn open_path(&mut self, path: &Path) -> Result<LoadMetadata> {
        let company = self.storage.load_from_path(path)?;
        let name = canonical_name(&company.name);
        Ok(self.apply_load(company, path.to_path_buf(), name))
    }

    pub fn save(&mut self) -> Result<PathBuf> {
        let name = self.require_name()?.to_string();
        let company = self.current.as_ref().ok_or(BookError::CompanyNotLoaded)?;
        self.storage.save(company, &name)
    }

    pub fn backup(&self, note: Option<&str>) -> Result<String> {
        let name = self.require_name()?;
        let company = self.current.as_ref().ok_or(BookError::CompanyNotLoaded)?;
        self.storage.backup(company, name, note)
    }

    pub fn list_backups(&self) -> Result<Vec<String>> {
        self.storage.list_backups(self.require_name()?)
    }

    pub fn restore(&mut self, backup_name: &str) -> Result<LoadMetadata> {
        let name = self.require_name()?.to_string();
        let company = self.storage.restore(&name, backup_name)?;
        let path = self.storage.company_path(&name);
        Ok(self.apply_load(company, path, name))
    }

    pub fn list_companies(&self) -> Result<Vec<String>> {
        self.storage.list_companies()
    }

    pub fn last_opened(&self) -> Result<Option<String>> {
        self.storage.last_company()
    }

    pub fn current(&self) -> Result<&Company> {
        self.current.as_ref().ok_or(BookError::CompanyNotLoaded)
    }

    pub fn current_mut(&mut self) -> Result<&mut Company> {
        self.current.as_mut().ok_or(BookError::CompanyNotLoaded)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.current_name = None;
    }

    fn require_name(&self) -> Result<&str> {
        self.current_name.as_deref().ok_or(BookError::CompanyNotLoaded)
    }

    fn apply_load(&mut self, company: Company, path: PathBuf, name: String) -> LoadMetadata {
        let warnings = company_warnings(&company);
        for warning in &warnings {
            warn!(company = %company.name, %warning, "integrity warning");
        }
        let schema_version = company.schema_version;
        info!(company = %company.name, path = %path.display(), "opened company");
        self.current = Some(company);
        self.current_name = Some(name.clone());
        LoadMetadata {
            warnings,
            path,
            name,
            schema_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use tempfile::tempdir;

    fn manager(root: &Path) -> CompanyManager {
        let store = JsonStorage::new(Some(root.to_path_buf()), Some(3)).unwrap();
        CompanyManager::new(Box::new(store))
    }

    #[test]
    fn create_save_and_reopen() {
        let temp = tempdir().unwrap();
        let mut manager = manager(temp.path());
        let path = manager.create("Demo Books", "eur").expect("create company");
        assert!(path.exists());
        assert!(manager.create("Demo Books", "EUR").is_err());

        manager.current_mut().unwrap().name = "Demo Books Ltd".into();
        manager.save().unwrap();
        manager.clear();
        assert!(matches!(manager.current(), Err(BookError::CompanyNotLoaded)));

        let metadata = manager.open("demo books").expect("open company");
        assert_eq!(metadata.name, "demo_books");
        assert!(metadata.warnings.is_empty());
        assert_eq!(manager.current().unwrap().name, "Demo Books Ltd");
        assert_eq!(manager.current().unwrap().base_currency.as_str(), "EUR");
        assert_eq!(manager.last_opened().unwrap().as_deref(), Some("demo_books"));
    }

    #[test]
    fn backup_and_restore_current_company() {
        let temp = tempdir().unwrap();
        let mut manager = manager(temp.path());
        manager.create("Household", "USD").unwrap();
        let backup = manager.backup(Some("Quarter Close")).expect("create backup");
        assert!(backup.starts_with("household_"));
        assert!(backup.contains("quarter-close"));

        manager.current_mut().unwrap().name = "Changed".into();
        manager.save().unwrap();
        let metadata = manager.restore(&backup).expect("restore");
        assert_eq!(metadata.name, "household");
        assert_eq!(manager.current().unwrap().name, "Household");
        assert!(!manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn operations_require_an_open_company() {
        let temp = tempdir().unwrap();
        let mut manager = manager(temp.path());
        assert!(matches!(manager.save(), Err(BookError::CompanyNotLoaded)));
        assert!(matches!(manager.backup(None), Err(BookError::CompanyNotLoaded)));
        assert!(manager.create("  ", "USD").is_err());
        assert!(manager.create("Bad", "DOLLARS").is_err());
    }
}
