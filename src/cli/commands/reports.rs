use chrono::Local;
use uuid::Uuid;

use crate::cli::commands::CommandDefinition;
use crate::cli::context::{optional_date, parse_date, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::core::services::{RecurringService, ReportService, StatementService};
use crate::domain::Company;
use crate::ledger::{AgingBucket, AgingSide, StatementKind, StatementRequest};

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "trial-balance",
            "Show debit and credit totals per account",
            "trial-balance [YYYY-MM-DD]",
            cmd_trial_balance,
        ),
        CommandDefinition::new(
            "aging",
            "Show open invoices or bills by days past due",
            "aging [receivable|payable] [YYYY-MM-DD]",
            cmd_aging,
        ),
        CommandDefinition::new(
            "statement",
            "Render a customer statement",
            "statement <contact> <from> <to> [open-item]",
            cmd_statement,
        ),
        CommandDefinition::new(
            "run-recurring",
            "Generate every recurring transaction due by the date",
            "run-recurring [YYYY-MM-DD]",
            cmd_run_recurring,
        ),
    ]
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

fn cmd_trial_balance(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let as_of = optional_date(args.first())?;
    let company = context.company()?;
    let report = ReportService::trial_balance(company, as_of);
    let heading = match as_of {
        Some(date) => format!("Trial balance as of {}", context.date(date)),
        None => "Trial balance".to_string(),
    };
    output::section(heading);
    let blank_or = |amount: f64| {
        if amount == 0.0 {
            String::new()
        } else {
            context.money(company, amount)
        }
    };
    let mut rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            vec![
                row.code.clone().unwrap_or_default(),
                row.name.clone(),
                blank_or(row.debit),
                blank_or(row.credit),
            ]
        })
        .collect();
    rows.push(vec![
        String::new(),
        "Total".into(),
        context.money(company, report.total_debit),
        context.money(company, report.total_credit),
    ]);
    output::table(&["Code", "Account", "Debit", "Credit"], &[false, false, true, true], &rows);
    if report.is_balanced() {
        output::success("Debits equal credits.");
    } else {
        output::warning("Trial balance is out of balance.");
    }
    Ok(())
}

fn cmd_aging(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let mut side = AgingSide::Receivable;
    let mut as_of = today();
    for arg in args {
        match arg.parse::<AgingSide>() {
            Ok(parsed) => side = parsed,
            Err(_) => as_of = parse_date(arg)?,
        }
    }
    let company = context.company()?;
    let schedule = ReportService::aging(company, side, as_of);
    let title = match side {
        AgingSide::Receivable => "Receivables aging",
        AgingSide::Payable => "Payables aging",
    };
    output::section(format!("{} as of {}", title, context.date(as_of)));

    let rows: Vec<Vec<String>> = schedule
        .items
        .iter()
        .map(|item| {
            vec![
                item.number.clone().unwrap_or_default(),
                contact_name(company, item.contact_id),
                context.date(item.due_date),
                item.days_overdue.max(0).to_string(),
                item.bucket.to_string(),
                context.money(company, item.balance),
            ]
        })
        .collect();
    output::table(
        &["Number", "Contact", "Due", "Days", "Bucket", "Balance"],
        &[false, false, false, true, false, true],
        &rows,
    );
    let buckets: Vec<String> = AgingBucket::ALL
        .iter()
        .map(|bucket| format!("{} {}", bucket, context.money(company, schedule.bucket(*bucket))))
        .collect();
    output::plain(buckets.join(" | "));
    output::info(format!("Total open: {}", context.money(company, schedule.total())));
    Ok(())
}

fn contact_name(company: &Company, id: Option<Uuid>) -> String {
    id.and_then(|id| company.contact(id))
        .map(|contact| contact.name.clone())
        .unwrap_or_default()
}

fn cmd_statement(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.len() < 3 {
        return Err(CommandError::InvalidArguments(
            "usage: statement <contact> <from> <to> [open-item]".into(),
        ));
    }
    let company = context.company()?;
    let contact = match Uuid::parse_str(args[0]) {
        Ok(id) => company.contact(id),
        Err(_) => company.contact_by_name(args[0]),
    }
    .ok_or_else(|| CommandError::InvalidArguments(format!("unknown contact `{}`", args[0])))?;
    let kind = match args.get(3).map(|value| value.to_ascii_lowercase()) {
        None => StatementKind::BalanceForward,
        Some(value) if value == "open-item" || value == "open" => StatementKind::OpenItem,
        Some(value) if value == "balance-forward" => StatementKind::BalanceForward,
        Some(other) => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown statement kind `{}` (use open-item or balance-forward)",
                other
            )))
        }
    };
    let request = StatementRequest {
        contact_id: contact.id,
        from: parse_date(args[1])?,
        to: parse_date(args[2])?,
        kind,
    };
    let pages = StatementService::render(company, &context.config, &request)?;
    for page in pages {
        output::plain(page.text());
        output::plain("");
    }
    Ok(())
}

fn cmd_run_recurring(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let as_of = optional_date(args.first())?.unwrap_or_else(today);
    let summary = RecurringService::run_due(context.company_mut()?, as_of);
    for generated in &summary.generated {
        output::info(format!(
            "{} {} on {}{}",
            generated.number.as_deref().unwrap_or("draft"),
            generated.transaction_id,
            generated.date,
            if generated.posted { " (posted)" } else { "" }
        ));
    }
    for failure in &summary.failures {
        output::warning(format!("`{}` failed: {}", failure.name, failure.message));
    }
    output::success(format!(
        "Generated {} transaction(s); {} series completed.",
        summary.generated.len(),
        summary.completed.len()
    ));
    Ok(())
}
