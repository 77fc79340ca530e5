//! Shell state, dispatch, and error reporting shared by every command.

use std::io;

use chrono::NaiveDate;
use strsim::levenshtein;
use thiserror::Error;

use crate::config::{Config, ConfigManager};
use crate::core::errors::{BookError, CliError};
use crate::core::services::{FxService, ServiceError};
use crate::core::CompanyManager;
use crate::currency::{format_currency_value, format_date};
use crate::domain::Company;
use crate::storage::JsonStorage;

use super::commands::{self, CommandDefinition, CommandRegistry};
use super::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No company is open. Use `new-company` or `open` first.")]
    CompanyNotOpen,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] BookError),
    #[error("exit requested")]
    ExitRequested,
}

impl From<ServiceError> for CommandError {
    fn from(err: ServiceError) -> Self {
        CommandError::Core(BookError::Service(err))
    }
}

impl From<crate::config::ConfigError> for CommandError {
    fn from(err: crate::config::ConfigError) -> Self {
        CommandError::Core(err.into())
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Core(inner) => CliError::Core(inner),
            other => CliError::Command(other.to_string()),
        }
    }
}

pub type CommandResult = Result<(), CommandError>;

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub manager: CompanyManager,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let storage = JsonStorage::new(None, Some(config.backup_retention))?;
        output::set_color(mode == CliMode::Interactive);

        let mut context = Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            manager: CompanyManager::new(Box::new(storage)),
            config_manager,
            config,
            last_command: None,
            running: true,
        };
        context.auto_open_last();
        Ok(context)
    }

    /// Reopens the last company in interactive sessions; scripts always start empty.
    fn auto_open_last(&mut self) {
        if self.mode != CliMode::Interactive {
            return;
        }
        let Some(name) = self.config.last_opened_company.clone() else {
            return;
        };
        match self.manager.open(&name) {
            Ok(metadata) => {
                self.after_open(&metadata.warnings);
                output::success(format!("Automatically opened last company `{}`.", name));
            }
            Err(err) => output::warning(format!("Could not reopen `{}`: {}", name, err)),
        }
    }

    pub(crate) fn after_open(&mut self, warnings: &[String]) {
        let tolerance = self.config.fx_tolerance_days;
        if let Some(company) = self.manager.current.as_mut() {
            FxService::set_tolerance(company, tolerance);
        }
        for warning in warnings {
            output::warning(warning);
        }
    }

    pub(crate) fn remember_company(&mut self, name: Option<&str>) -> CommandResult {
        self.config.last_opened_company = name.map(str::to_string);
        self.persist_config()
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub(crate) fn company(&self) -> Result<&Company, CommandError> {
        self.manager.current.as_ref().ok_or(CommandError::CompanyNotOpen)
    }

    pub(crate) fn company_mut(&mut self) -> Result<&mut Company, CommandError> {
        self.manager.current.as_mut().ok_or(CommandError::CompanyNotOpen)
    }

    pub(crate) fn money(&self, company: &Company, amount: f64) -> String {
        format_currency_value(
            amount,
            &company.base_currency,
            &self.config.locale_config(),
            self.config.currency_display,
            self.config.negative_style,
        )
    }

    pub(crate) fn date(&self, date: NaiveDate) -> String {
        format_date(&self.config.locale_config(), date)
    }

    pub(crate) fn prompt(&self) -> String {
        match self.manager.current_name() {
            Some(name) => format!("bookkeeper({})> ", name),
            None => "bookkeeper> ".into(),
        }
    }

    pub(crate) fn command_usages(&self) -> Vec<(&'static str, &'static str)> {
        self.registry
            .iter()
            .map(|definition| (definition.name, definition.usage))
            .collect()
    }

    /// Saved companies, or none when the data folder cannot be read.
    pub(crate) fn company_names(&self) -> Vec<String> {
        self.manager.list_companies().unwrap_or_default()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.registry.get(name)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.get(command).map(|definition| definition.handler) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = closest_command(self.registry.names(), input) {
            output::info(format!("Did you mean `{}`?", best));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::CompanyNotOpen => {
                output::error(CommandError::CompanyNotOpen);
                output::hint("Try `new-company \"Demo Books\" USD` to get started.");
            }
            other => output::error(other),
        }
    }
}

/// The registered name nearest to `input`, if it is within three edits.
pub(crate) fn closest_command<'a>(
    names: impl Iterator<Item = &'a str>,
    input: &str,
) -> Option<&'a str> {
    let input = input.to_ascii_lowercase();
    names
        .map(|name| (levenshtein(name, &input), name))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 3)
        .map(|(_, name)| name)
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

pub(crate) fn optional_date(input: Option<&&str>) -> Result<Option<NaiveDate>, CommandError> {
    input.map(|value| parse_date(value)).transpose()
}
