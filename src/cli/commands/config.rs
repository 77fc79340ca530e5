use crate::cli::commands::CommandDefinition;
use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::output;
use crate::config::Config;
use crate::core::services::FxService;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "config",
        "View and change preferences",
        "config [<key> [value]|backup [note]|backups|restore <name>]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => show_config(context),
        ["backup", note @ ..] => {
            let note = (!note.is_empty()).then(|| note.join(" "));
            let name = context.config_manager.backup(&context.config, note.as_deref())?;
            output::success(format!("Configuration backup created: {}", name));
            Ok(())
        }
        ["backups"] => {
            let backups = context.config_manager.list_backups()?;
            if backups.is_empty() {
                output::info("No configuration backups yet.");
            }
            for name in backups {
                output::plain(format!("  {}", name));
            }
            Ok(())
        }
        ["restore", name] => {
            context.config = context.config_manager.restore(name)?;
            context.persist_config()?;
            apply_to_company(context);
            output::success(format!("Configuration restored from {}.", name));
            Ok(())
        }
        [key] => {
            output::plain(format!("{} = {}", key, context.config.get(key)?));
            Ok(())
        }
        [key, value @ ..] => {
            context.config.set(key, &value.join(" "))?;
            context.persist_config()?;
            apply_to_company(context);
            output::success(format!("{} set to {}.", key, context.config.get(key)?));
            Ok(())
        }
    }
}

fn show_config(context: &ShellContext) -> CommandResult {
    output::section("Configuration");
    for key in Config::KEYS {
        output::plain(format!("  {:<28} {}", key, context.config.get(key)?));
    }
    output::plain(format!("  file: {}", context.config_manager.path().display()));
    Ok(())
}

fn apply_to_company(context: &mut ShellContext) {
    let tolerance = context.config.fx_tolerance_days;
    if let Some(company) = context.manager.current.as_mut() {
        FxService::set_tolerance(company, tolerance);
    }
}
