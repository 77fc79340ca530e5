use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{
    core::{
        errors::BookError,
        utils::{ensure_dir, PathResolver},
    },
    domain::{company::CURRENT_SCHEMA_VERSION, Company, BALANCE_TOLERANCE},
};

use super::files::{backup_file_name, list_backup_files, write_atomic, BACKUP_EXTENSION};
use super::{Result, StorageBackend};

const DEFAULT_RETENTION: usize = 5;

/// Stores one pretty-printed JSON snapshot per company, with rotated backups.
#[derive(Clone)]
pub struct JsonStorage {
    root: PathBuf,
    companies_dir: PathBuf,
    backups_dir: PathBuf,
    state_file: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let companies_dir = PathResolver::company_dir_in(&app_root);
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&companies_dir)?;
        ensure_dir(&backups_dir)?;
        let state_file = PathResolver::state_file_in(&app_root);
        Ok(Self {
            root: app_root,
            companies_dir,
            backups_dir,
            state_file,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    fn read_state(&self) -> Result<StoreState> {
        if self.state_file.exists() {
            let data = fs::read_to_string(&self.state_file)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(StoreState::default())
        }
    }

    /// Copies the current snapshot aside before it is overwritten.
    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let backup_path = dir.join(backup_file_name(&canonical_name(name), None));
        fs::copy(path, &backup_path)?;
        self.prune_backups(name)?;
        Ok(())
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            let path = self.backup_path(name, entry);
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %err, "failed to prune backup");
            } else {
                debug!(path = %path.display(), "pruned backup");
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, company: &Company, name: &str) -> Result<PathBuf> {
        let path = self.company_path(name);
        self.backup_existing_file(name, &path)?;
        save_company_to_path(company, &path)?;
        info!(company = %company.name, path = %path.display(), "saved company");
        Ok(path)
    }

    fn load(&self, name: &str) -> Result<Company> {
        let path = self.company_path(name);
        if !path.exists() {
            return Err(BookError::CompanyNotFound(name.to_string()));
        }
        load_company_from_path(&path)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        Ok(list_backup_files(&self.backup_dir(name))?)
    }

    fn backup(&self, company: &Company, name: &str, note: Option<&str>) -> Result<String> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let file_name = backup_file_name(&canonical_name(name), note);
        let json = serde_json::to_string_pretty(company)?;
        write_atomic(&dir.join(&file_name), &json)?;
        self.prune_backups(name)?;
        info!(company = %company.name, backup = %file_name, "created backup");
        Ok(file_name)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<Company> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(BookError::StorageError(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let company = load_company_from_path(&backup_path)?;
        let target = self.company_path(name);
        save_company_to_path(&company, &target)?;
        info!(backup = %backup_name, path = %target.display(), "restored backup");
        Ok(company)
    }

    fn company_path(&self, name: &str) -> PathBuf {
        self.companies_dir
            .join(format!("{}.{}", canonical_name(name), BACKUP_EXTENSION))
    }

    fn list_companies(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.companies_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn last_company(&self) -> Result<Option<String>> {
        Ok(self.read_state()?.last_company)
    }

    fn record_last_company(&self, name: Option<&str>) -> Result<()> {
        let mut state = self.read_state()?;
        state.last_company = name.map(canonical_name);
        let data = serde_json::to_string_pretty(&state)?;
        write_atomic(&self.state_file, &data)?;
        Ok(())
    }
}

pub fn save_company_to_path(company: &Company, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(company)?;
    write_atomic(path, &json)?;
    Ok(())
}

pub fn load_company_from_path(path: &Path) -> Result<Company> {
    let data = fs::read_to_string(path)?;
    let company: Company = serde_json::from_str(&data)?;
    if company.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(BookError::StorageError(format!(
            "company schema v{} is newer than supported v{}",
            company.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(company)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    last_company: Option<String>,
}

/// File-safe slug for a company name: lowercase alphanumerics joined by underscores.
pub fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "company".into()
    } else {
        sanitized
    }
}

/// Integrity problems in a loaded snapshot that do not prevent opening it.
pub fn company_warnings(company: &Company) -> Vec<String> {
    let account_ids: HashSet<_> = company.accounts.iter().map(|a| a.id).collect();
    let contact_ids: HashSet<_> = company.contacts.iter().map(|c| c.id).collect();
    let transaction_ids: HashSet<_> = company.transactions.iter().map(|t| t.id).collect();
    let mut warnings = Vec::new();

    for entry in &company.entries {
        if !account_ids.contains(&entry.account_id) {
            warnings.push(format!(
                "entry {} references unknown account {}",
                entry.id, entry.account_id
            ));
        }
        if !transaction_ids.contains(&entry.transaction_id) {
            warnings.push(format!(
                "entry {} references unknown transaction {}",
                entry.id, entry.transaction_id
            ));
        }
    }
    for txn in &company.transactions {
        if let Some(contact) = txn.contact_id {
            if !contact_ids.contains(&contact) {
                warnings.push(format!(
                    "transaction {} references unknown contact {}",
                    txn.id, contact
                ));
            }
        }
        if txn.is_posted() {
            let (debit, credit) = company
                .entries_for_transaction(txn.id)
                .fold((0.0, 0.0), |(d, c), e| (d + e.debit, c + e.credit));
            if (debit - credit).abs() > BALANCE_TOLERANCE {
                warnings.push(format!(
                    "transaction {} is unbalanced: debits {:.2} != credits {:.2}",
                    txn.id, debit, credit
                ));
            }
        }
        if txn.balance < 0.0 || txn.balance > txn.amount + BALANCE_TOLERANCE {
            warnings.push(format!(
                "transaction {} has balance {:.2} outside 0..={:.2}",
                txn.id, txn.balance, txn.amount
            ));
        }
    }
    warnings
}
