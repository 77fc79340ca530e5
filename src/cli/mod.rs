//! The `bookkeeper_cli` shell: interactive with rustyline, or line-by-line from stdin
//! when `BOOKKEEPER_CLI_SCRIPT` is set.

pub mod commands;
mod context;
pub mod output;
mod shell;

pub use context::{CliMode, CommandError, CommandResult, ShellContext};
pub use shell::run_cli;
