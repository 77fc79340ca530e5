use crate::cli::commands::CommandDefinition;
use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "new-company",
            "Create a company with the default chart of accounts",
            "new-company <name> [currency]",
            cmd_new_company,
        ),
        CommandDefinition::new("open", "Open a saved company", "open <name>", cmd_open),
        CommandDefinition::new("companies", "List saved companies", "companies", cmd_companies),
        CommandDefinition::new("save", "Save the open company", "save", cmd_save),
        CommandDefinition::new(
            "backup",
            "Snapshot the open company",
            "backup [note]",
            cmd_backup,
        ),
        CommandDefinition::new(
            "backups",
            "List backups of the open company",
            "backups",
            cmd_backups,
        ),
        CommandDefinition::new(
            "restore",
            "Replace the open company with a backup",
            "restore <backup>",
            cmd_restore,
        ),
    ]
}

fn cmd_new_company(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: new-company <name> [currency]".into(),
        ));
    };
    let currency = args
        .get(1)
        .map(|code| code.to_string())
        .unwrap_or_else(|| context.config.base_currency.clone());
    let path = context.manager.create(name, &currency)?;
    context.after_open(&[]);
    let slug = context.manager.current_name().map(str::to_string);
    context.remember_company(slug.as_deref())?;
    output::success(format!(
        "New company `{}` created in {} at {}.",
        name,
        currency.to_ascii_uppercase(),
        path.display()
    ));
    Ok(())
}

fn cmd_open(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return Err(CommandError::InvalidArguments("usage: open <name>".into()));
    };
    let metadata = context.manager.open(name)?;
    context.after_open(&metadata.warnings);
    context.remember_company(Some(&metadata.name))?;
    output::success(format!(
        "Opened `{}` from {}.",
        metadata.name,
        metadata.path.display()
    ));
    Ok(())
}

fn cmd_companies(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let names = context.manager.list_companies()?;
    if names.is_empty() {
        output::info("No companies saved yet.");
        return Ok(());
    }
    output::section("Companies");
    for name in names {
        output::plain(format!("  {}", name));
    }
    Ok(())
}

fn cmd_save(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.company()?;
    let path = context.manager.save()?;
    output::success(format!("Company saved to {}.", path.display()));
    Ok(())
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    context.company()?;
    let note = (!args.is_empty()).then(|| args.join(" "));
    let name = context.manager.backup(note.as_deref())?;
    output::success(format!("Backup created: {}", name));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.company()?;
    let backups = context.manager.list_backups()?;
    if backups.is_empty() {
        output::info("No backups yet.");
        return Ok(());
    }
    output::section("Backups (newest first)");
    for (index, name) in backups.iter().enumerate() {
        output::plain(format!("  {:>2}. {}", index + 1, name));
    }
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    context.company()?;
    let Some(reference) = args.first() else {
        return Err(CommandError::InvalidArguments("usage: restore <backup>".into()));
    };
    let backups = context.manager.list_backups()?;
    let backup = match reference.parse::<usize>() {
        Ok(index) if index >= 1 && index <= backups.len() => backups[index - 1].clone(),
        _ => reference.to_string(),
    };
    let metadata = context.manager.restore(&backup)?;
    context.after_open(&metadata.warnings);
    output::success(format!("Restored `{}` from {}.", metadata.name, backup));
    Ok(())
}
