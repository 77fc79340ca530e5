use std::{
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;

use crate::cli::context::{CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;
use crate::core::errors::CliError;

const SCRIPT_ENV: &str = "BOOKKEEPER_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn readline_error(err: ReadlineError) -> CliError {
    CliError::Command(err.to_string())
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new().map_err(readline_error)?;
    editor.set_helper(Some(CommandHelper::new(
        context.command_usages(),
        context.company_names(),
    )));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
    output::info("Type `help` to list commands.");

    while context.running {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                match handle_line(context, trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err),
                }
                if let Some(helper) = editor.helper_mut() {
                    helper.companies = context.company_names();
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(readline_error(err)),
        }
    }

    Ok(())
}

/// Reads commands from stdin, one per line; `#` starts a comment line.
fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        let line = line.map_err(|err| CliError::Command(err.to_string()))?;
        if line.trim_start().starts_with('#') {
            continue;
        }
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err),
        }
    }
    Ok(())
}

pub(crate) fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(&err);
            return Ok(LoopControl::Continue);
        }
    };

    let Some(raw) = tokens.first() else {
        return Ok(LoopControl::Continue);
    };
    let command = raw.to_lowercase();
    let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();

    context.last_command = Some(line.trim().to_string());

    match context.dispatch(&command, raw, &args) {
        Ok(LoopControl::Exit) => {
            context.running = false;
            Ok(LoopControl::Exit)
        }
        other => other,
    }
}

/// Completes command words, company names for `open`, command names for `help`,
/// and request methods for `api`; hints the remaining usage of a typed command.
struct CommandHelper {
    commands: Vec<(String, &'static str)>,
    companies: Vec<String>,
}

const API_METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

impl CommandHelper {
    fn new(usages: Vec<(&'static str, &'static str)>, companies: Vec<String>) -> Self {
        let mut commands: Vec<(String, &'static str)> = usages
            .into_iter()
            .map(|(name, usage)| (name.to_ascii_lowercase(), usage))
            .collect();
        commands.sort();
        commands.dedup_by(|a, b| a.0 == b.0);
        Self { commands, companies }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<String> {
        let pool: Vec<&str> = match words {
            [] => self.commands.iter().map(|(name, _)| name.as_str()).collect(),
            [command] => match command.to_ascii_lowercase().as_str() {
                "open" => self.companies.iter().map(String::as_str).collect(),
                "help" => self.commands.iter().map(|(name, _)| name.as_str()).collect(),
                "api" => API_METHODS.to_vec(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let needle = needle.to_ascii_lowercase();
        pool.into_iter()
            .filter(|candidate| candidate.to_ascii_lowercase().starts_with(&needle))
            .map(|candidate| {
                if candidate.contains(char::is_whitespace) {
                    format!("'{}'", candidate)
                } else {
                    candidate.to_string()
                }
            })
            .collect()
    }

    /// The argument part of a command's usage, once its name and a space are typed.
    fn usage_hint(&self, line: &str) -> Option<String> {
        if !line.ends_with(' ') {
            return None;
        }
        let mut words = line.split_whitespace();
        let command = words.next()?.to_ascii_lowercase();
        if words.next().is_some() {
            return None;
        }
        let (_, usage) = self.commands.iter().find(|(name, _)| *name == command)?;
        let rest = usage.split_once(' ')?.1;
        Some(rest.to_string())
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let words: Vec<&str> = prefix[..start].split_whitespace().collect();
        let candidates = self
            .candidates(&words, &prefix[start..])
            .into_iter()
            .map(|name| Pair {
                display: name.clone(),
                replacement: name,
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.usage_hint(line)
    }
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> CommandHelper {
        CommandHelper::new(
            vec![
                ("open", "open <name>"),
                ("new-company", "new-company <name> <currency>"),
                ("help", "help [command]"),
                ("api", "api <METHOD> <path> [json]"),
            ],
            vec!["Northwind".into(), "Demo Books".into()],
        )
    }

    #[test]
    fn completes_commands_then_their_arguments() {
        let helper = helper();
        assert_eq!(helper.candidates(&[], "ne"), vec!["new-company"]);
        assert_eq!(helper.candidates(&["open"], "north"), vec!["Northwind"]);
        assert_eq!(helper.candidates(&["OPEN"], "d"), vec!["'Demo Books'"]);
        assert_eq!(helper.candidates(&["api"], "p"), vec!["POST", "PUT"]);
        assert_eq!(helper.candidates(&["help"], "o"), vec!["open"]);
        assert!(helper.candidates(&["open", "Northwind"], "").is_empty());
        assert!(helper.candidates(&["new-company"], "").is_empty());
    }

    #[test]
    fn hints_the_arguments_a_command_expects() {
        let helper = helper();
        assert_eq!(helper.usage_hint("new-company ").as_deref(), Some("<name> <currency>"));
        assert_eq!(helper.usage_hint("new-company"), None);
        assert_eq!(helper.usage_hint("open Northwind "), None);
        assert_eq!(helper.usage_hint("bogus "), None);
    }

    #[test]
    fn quoted_arguments_stay_together() {
        let tokens =
            parse_command_line(r#"api POST /api/contacts '{"name": "Acme Ltd", "kind": "Customer"}'"#)
                .unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3], r#"{"name": "Acme Ltd", "kind": "Customer"}"#);
        assert!(parse_command_line("open 'unterminated").is_err());
    }
}
