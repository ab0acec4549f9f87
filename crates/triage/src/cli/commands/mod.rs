//! Command implementations and dispatch.

pub mod check;
pub mod compile;
pub mod config;
pub mod escape;
pub mod groups;
pub mod init;
pub mod recent;
pub mod saved;
pub mod search;
mod shared;
pub mod status;
pub mod watch;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub async fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Search(cmd) => search::run(ctx, &cmd).await,
        Commands::Groups(cmd) => groups::run(ctx, &cmd).await,
        Commands::Watch(cmd) => watch::run(ctx, &cmd).await,
        Commands::Compile(cmd) => compile::run(ctx, &cmd),
        Commands::Escape(cmd) => escape::run(&cmd),
        Commands::Status(cmd) => status::run(ctx, &cmd).await,
        Commands::Saved { action } => saved::run(ctx, &action).await,
        Commands::Recent { action } => recent::run(ctx, &action),
        Commands::Init(cmd) => init::run(ctx, &cmd),
        Commands::Config => config::run(ctx),
        Commands::Check => check::run(ctx),
    }
}
