//! Command-line front end for the triage alert console.
//!
//! Every command loads `.triage.toml` from the current directory upwards, then talks to
//! the configured search service, or to a JSON file of alerts given with `--fixture`.
//! Log output goes to stderr and is controlled by `TRIAGE_LOG` (default `warn`).

mod cli;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{
    CommandContext,
    args::{Cli, Commands},
    commands, logging,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let ctx = match &cli.command {
        Commands::Init(_) => CommandContext::load_cwd_only(),
        _ => CommandContext::load(cli.fixture.clone()),
    };
    let ctx = match ctx {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    commands::run(cli.command, &ctx).await
}
