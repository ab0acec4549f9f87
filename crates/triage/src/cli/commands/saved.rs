//! Implementation of `triage saved`.

use std::process::ExitCode;

use chrono::Utc;
use triage_query::QueryBuilder;
use triage_store::SaveSearch;

use crate::cli::{
    args::{QueryArgs, SavedAction},
    commands::shared::{apply_query, settle},
    context::CommandContext,
    output::{JsonPage, print_flat, print_json, print_searches, success},
};

/// Lists, saves, runs or deletes saved searches.
pub async fn run(ctx: &CommandContext, action: &SavedAction) -> ExitCode {
    match action {
        SavedAction::List => list(ctx),
        SavedAction::Save { name, query } => save(ctx, name, query),
        SavedAction::Run { name, json } => run_saved(ctx, name, *json).await,
        SavedAction::Delete { name } => delete(ctx, name),
    }
}

/// Prints every saved search.
fn list(ctx: &CommandContext) -> ExitCode {
    let store = match ctx.require_store() {
        Ok(store) => store,
        Err(code) => return code,
    };
    match store.list_saved() {
        Ok(searches) => {
            print_searches(&searches);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Saves a search under `name` without running it.
fn save(ctx: &CommandContext, name: &str, args: &QueryArgs) -> ExitCode {
    let mut store = match ctx.require_store() {
        Ok(store) => store,
        Err(code) => return code,
    };
    match store.find_saved(name) {
        Ok(Some(_)) => {
            eprintln!("error: a saved search named {name:?} already exists");
            return ExitCode::FAILURE;
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    }

    let settings = ctx.settings();
    let mut query = QueryBuilder::new();
    query.set_from_and_size(0, settings.page_size);
    query.set_indices(settings.indices);
    apply_query(&mut query, args);

    let mut search = SaveSearch::new(name, query.search_request(), settings.columns);
    search.touch(Utc::now());
    if let Err(e) = store.save_search(search) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    println!("{}", success(&format!("Saved {name}")));
    ExitCode::SUCCESS
}

/// Runs a saved search and prints its first page.
async fn run_saved(ctx: &CommandContext, name: &str, json: bool) -> ExitCode {
    let (_, mut console) = match ctx.console(ctx.settings()) {
        Ok(console) => console,
        Err(code) => return code,
    };
    if let Err(e) = console.load_saved_search(name) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(code) = settle(&mut console).await {
        return code;
    }

    let Some(view) = console.flat() else {
        return ExitCode::FAILURE;
    };
    let from = console.query().from();
    if json {
        return print_json(&JsonPage {
            query: console.query().generate_select(),
            total: view.response().total,
            from,
            alerts: &view.response().results,
        });
    }
    print_flat(view, from);
    ExitCode::SUCCESS
}

/// Deletes a saved search.
fn delete(ctx: &CommandContext, name: &str) -> ExitCode {
    let mut store = match ctx.require_store() {
        Ok(store) => store,
        Err(code) => return code,
    };
    match store.delete_saved(name) {
        Ok(true) => {
            println!("Deleted {name}");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("error: no saved search named {name:?}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
