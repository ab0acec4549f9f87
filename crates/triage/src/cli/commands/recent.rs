//! Implementation of `triage recent`.

use std::process::ExitCode;

use crate::cli::{args::RecentAction, context::CommandContext, output::print_searches};

/// Lists or forgets recent searches.
pub fn run(ctx: &CommandContext, action: &RecentAction) -> ExitCode {
    let mut store = match ctx.require_store() {
        Ok(store) => store,
        Err(code) => return code,
    };
    let result = match action {
        RecentAction::List => store.list_recent().map(|searches| {
            print_searches(&searches);
        }),
        RecentAction::Delete { name } => store.delete_recent(name).map(|removed| {
            if removed {
                println!("Deleted {name}");
            } else {
                eprintln!("no recent search named {name:?}");
            }
        }),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
