use serde_json::Value;

use crate::api::{ApiRequest, Method, Router};
use crate::cli::commands::CommandDefinition;
use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "api",
        "Send a request to the bookkeeping API of the open company",
        "api <GET|POST|PUT|DELETE> <path> ['<json body>']",
        cmd_api,
    )]
}

fn cmd_api(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (Some(method), Some(path)) = (args.first(), args.get(1)) else {
        return Err(CommandError::InvalidArguments(
            "usage: api <METHOD> <path> ['<json body>']".into(),
        ));
    };
    let method: Method = method
        .parse()
        .map_err(|err: crate::api::ApiError| CommandError::InvalidArguments(err.to_string()))?;
    let body = if args.len() > 2 {
        serde_json::from_str(&args[2..].join(" "))?
    } else {
        Value::Null
    };
    let request = ApiRequest::new(method, path).with_body(body);

    let config = context.config.clone();
    let response = Router::handle(context.company_mut()?, &config, &request);
    let summary = format!("{} {} -> {}", request.method, request.path, response.status);
    if response.is_success() {
        output::success(summary);
    } else {
        output::error(summary);
    }
    if !response.body.is_null() {
        output::plain(serde_json::to_string_pretty(&response.body)?);
    }
    Ok(())
}
