//! Implementation of `triage compile`.

use std::process::ExitCode;

use triage_query::{QueryBuilder, parse};

use crate::cli::{
    args::CompileCommand, commands::shared::apply_query, context::CommandContext,
    output::print_json,
};

/// Prints the query a search compiles to and checks its syntax.
pub fn run(ctx: &CommandContext, cmd: &CompileCommand) -> ExitCode {
    let mut query = QueryBuilder::new();
    query.set_from_and_size(0, ctx.config.table.page_size);
    query.set_indices(ctx.config.backend.indices.clone());
    apply_query(&mut query, &cmd.query);
    query.set_group_by(cmd.group_by.clone());

    let select = query.generate_select();
    let compiled = match &cmd.group {
        Some(path) => path.query_for(&select),
        None => select,
    };
    if let Err(e) = parse(&compiled) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    if !cmd.json {
        println!("{compiled}");
        return ExitCode::SUCCESS;
    }
    if cmd.group.is_none() && !cmd.group_by.is_empty() {
        return print_json(&query.group_request());
    }
    let mut request = query.search_request();
    request.query = compiled;
    print_json(&request)
}
