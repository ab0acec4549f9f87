//! Shared helpers for command implementations.

use std::process::ExitCode;

use triage_console::{AlertConsole, SearchBackend};
use triage_query::{ID_FIELD, QueryBuilder, TIMESTAMP_FIELD, UID_FIELD};

use crate::cli::args::QueryArgs;

/// Applies the search flags to `query` without running it.
///
/// Filters on `id` filter on the backend's record id, as they do in the console.
pub fn apply_query(query: &mut QueryBuilder, args: &QueryArgs) {
    if let Some(text) = &args.query {
        query.set_display_query(text);
    }
    for (field, value) in &args.filters {
        let field = if field == ID_FIELD {
            UID_FIELD
        } else {
            field.as_str()
        };
        query.add_or_update_filter(field, value);
    }
    if args.since.is_some() || args.until.is_some() {
        query.set_time_range(TIMESTAMP_FIELD, args.since, args.until);
    }
    if let Some(field) = &args.sort {
        query.set_sort(field, args.order);
    }
}

/// Waits for outstanding fetches and reports the console's last failure.
pub async fn settle<B: SearchBackend>(console: &mut AlertConsole<B>) -> Result<(), ExitCode> {
    console.settle().await;
    match console.last_error() {
        Some(message) => {
            eprintln!("error: {message}");
            Err(ExitCode::FAILURE)
        }
        None => Ok(()),
    }
}
