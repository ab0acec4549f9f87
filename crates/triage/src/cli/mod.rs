//! CLI support for the `triage` binary.

pub mod args;
pub mod backend;
pub mod commands;
pub mod context;
pub mod logging;
pub mod output;

pub use context::CommandContext;
