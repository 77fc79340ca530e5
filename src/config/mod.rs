//! Persistent user preferences: locale, defaults for new documents, and storage policy.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::core::utils::{ensure_dir, PathResolver};
use crate::currency::{CurrencyCode, CurrencyDisplay, LocaleConfig, NegativeStyle};
use crate::storage::files::{
    backup_file_name, list_backup_files, write_atomic, write_file,
};

/// Smallest page a rendered statement may use.
pub const MIN_STATEMENT_LINES: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Configuration backup `{0}` not found")]
    BackupNotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub locale: String,
    pub base_currency: String,
    #[serde(default = "Config::default_payment_terms")]
    pub default_payment_terms_days: u32,
    #[serde(default = "Config::default_statement_lines")]
    pub statement_lines_per_page: usize,
    #[serde(default = "Config::default_fx_tolerance")]
    pub fx_tolerance_days: i64,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default = "Config::default_currency_display")]
    pub currency_display: CurrencyDisplay,
    #[serde(default = "Config::default_negative_style")]
    pub negative_style: NegativeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_company: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            base_currency: "USD".into(),
            default_payment_terms_days: Self::default_payment_terms(),
            statement_lines_per_page: Self::default_statement_lines(),
            fx_tolerance_days: Self::default_fx_tolerance(),
            backup_retention: Self::default_backup_retention(),
            currency_display: Self::default_currency_display(),
            negative_style: Self::default_negative_style(),
            last_opened_company: None,
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 8] = [
        "locale",
        "base_currency",
        "default_payment_terms_days",
        "statement_lines_per_page",
        "fx_tolerance_days",
        "backup_retention",
        "currency_display",
        "negative_style",
    ];

    fn default_payment_terms() -> u32 {
        30
    }

    fn default_statement_lines() -> usize {
        40
    }

    fn default_fx_tolerance() -> i64 {
        5
    }

    fn default_backup_retention() -> usize {
        5
    }

    fn default_currency_display() -> CurrencyDisplay {
        CurrencyDisplay::Symbol
    }

    fn default_negative_style() -> NegativeStyle {
        NegativeStyle::Sign
    }

    pub fn locale_config(&self) -> LocaleConfig {
        LocaleConfig::for_tag(&self.locale)
    }

    pub fn base_currency_code(&self) -> CurrencyCode {
        CurrencyCode::new(self.base_currency.clone())
    }

    /// Lines per statement page, never below [`MIN_STATEMENT_LINES`].
    pub fn statement_page_lines(&self) -> usize {
        self.statement_lines_per_page.max(MIN_STATEMENT_LINES)
    }

    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "locale" => self.locale.clone(),
            "base_currency" => self.base_currency.clone(),
            "default_payment_terms_days" => self.default_payment_terms_days.to_string(),
            "statement_lines_per_page" => self.statement_lines_per_page.to_string(),
            "fx_tolerance_days" => self.fx_tolerance_days.to_string(),
            "backup_retention" => self.backup_retention.to_string(),
            "currency_display" => format!("{:?}", self.currency_display).to_lowercase(),
            "negative_style" => format!("{:?}", self.negative_style).to_lowercase(),
            "last_opened_company" => self.last_opened_company.clone().unwrap_or_default(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Parses `value` into the field named `key`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        match key {
            "locale" => {
                if value.is_empty() {
                    return Err(invalid("locale cannot be empty"));
                }
                self.locale = value.to_string();
            }
            "base_currency" => {
                if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(invalid("expected a three-letter ISO code"));
                }
                self.base_currency = value.to_ascii_uppercase();
            }
            "default_payment_terms_days" => {
                self.default_payment_terms_days =
                    value.parse().map_err(|_| invalid("expected a whole number of days"))?;
            }
            "statement_lines_per_page" => {
                let lines: usize = value.parse().map_err(|_| invalid("expected a number"))?;
                if lines < MIN_STATEMENT_LINES {
                    return Err(invalid("pages need at least 5 lines"));
                }
                self.statement_lines_per_page = lines;
            }
            "fx_tolerance_days" => {
                let days: i64 = value.parse().map_err(|_| invalid("expected a number"))?;
                if days < 0 {
                    return Err(invalid("tolerance cannot be negative"));
                }
                self.fx_tolerance_days = days;
            }
            "backup_retention" => {
                let count: usize = value.parse().map_err(|_| invalid("expected a number"))?;
                if count == 0 {
                    return Err(invalid("keep at least one backup"));
                }
                self.backup_retention = count;
            }
            "currency_display" => {
                self.currency_display = match value.to_ascii_lowercase().as_str() {
                    "symbol" => CurrencyDisplay::Symbol,
                    "code" => CurrencyDisplay::Code,
                    _ => return Err(invalid("expected `symbol` or `code`")),
                };
            }
            "negative_style" => {
                self.negative_style = match value.to_ascii_lowercase().as_str() {
                    "sign" => NegativeStyle::Sign,
                    "parentheses" => NegativeStyle::Parentheses,
                    _ => return Err(invalid("expected `sign` or `parentheses`")),
                };
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Handles persistence and backup management for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        let backups_dir = PathResolver::config_backup_dir_in(&base);
        ensure_dir(&backups_dir)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            backups_dir,
        })
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }

    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        ensure_dir(&self.backups_dir)?;
        let name = backup_file_name("config", note);
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_file(&self.backups_dir.join(&name), &json)?;
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        let path = self.backups_dir.join(backup_name);
        if !path.exists() {
            return Err(ConfigError::BackupNotFound(backup_name.to_string()));
        }
        let data = fs::read_to_string(&path)?;
        serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
    }

    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        Ok(list_backup_files(&self.backups_dir)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
