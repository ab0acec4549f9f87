//! Implementation of `triage escape`.

use std::process::ExitCode;

use triage_query::{escape_field, escape_value};

use crate::cli::args::EscapeCommand;

/// Prints text escaped for a query.
pub fn run(cmd: &EscapeCommand) -> ExitCode {
    let escaped = if cmd.field {
        escape_field(&cmd.value)
    } else {
        escape_value(&cmd.value)
    };
    println!("{escaped}");
    ExitCode::SUCCESS
}
