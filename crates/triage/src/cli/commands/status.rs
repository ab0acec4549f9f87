//! Implementation of `triage status`.

use std::process::ExitCode;

use crate::cli::{
    args::StatusCommand,
    commands::shared::{apply_query, settle},
    context::CommandContext,
    output::{success, warning},
};

/// Moves alerts on the searched page to a new workflow status.
pub async fn run(ctx: &CommandContext, cmd: &StatusCommand) -> ExitCode {
    let mut settings = ctx.settings();
    if let Some(size) = cmd.page.size {
        settings.page_size = size;
    }
    let (backend, mut console) = match ctx.console(settings) {
        Ok(console) => console,
        Err(code) => return code,
    };

    let query = console.query_mut();
    apply_query(query, &cmd.query);
    let size = query.size();
    query.set_from_and_size(cmd.page.from, size);
    console.search(false, None);
    if let Err(code) = settle(&mut console).await {
        return code;
    }

    let shown: Vec<String> = console
        .view()
        .alerts()
        .into_iter()
        .map(|alert| alert.id.clone())
        .collect();
    let ids = if cmd.all {
        shown.clone()
    } else {
        cmd.ids.clone()
    };
    for id in ids.iter().filter(|id| !shown.contains(id)) {
        eprintln!("{}", warning(&format!("alert {id} is not in the results")));
    }

    console.select(&ids);
    let count = match console.set_status(cmd.status, cmd.workflow.as_deref()).await {
        Ok(count) => count,
        Err(e) => {
            let message = console
                .last_error()
                .map_or_else(|| e.to_string(), String::from);
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = backend.persist() {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    console.settle().await;
    console.shutdown();

    let noun = if count == 1 { "alert" } else { "alerts" };
    println!("{}", success(&format!("Moved {count} {noun} to {}", cmd.status)));
    ExitCode::SUCCESS
}
