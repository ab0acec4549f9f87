//! Implementation of `triage search`.

use std::process::ExitCode;

use crate::cli::{
    args::SearchCommand,
    commands::shared::{apply_query, settle},
    context::CommandContext,
    output::{JsonPage, print_flat, print_json},
};

/// Runs a search and prints one page of alerts.
pub async fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    let mut settings = ctx.settings();
    if let Some(size) = cmd.page.size {
        settings.page_size = size;
    }
    let (_, mut console) = match ctx.console(settings) {
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

    let Some(view) = console.flat() else {
        return ExitCode::FAILURE;
    };
    if cmd.json {
        return print_json(&JsonPage {
            query: console.query().generate_select(),
            total: view.response().total,
            from: cmd.page.from,
            alerts: &view.response().results,
        });
    }
    print_flat(view, cmd.page.from);
    ExitCode::SUCCESS
}
