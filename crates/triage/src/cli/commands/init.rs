//! Implementation of `triage init`.

use std::{fs, path::PathBuf, process::ExitCode};

use triage_config::{CONFIG_FILENAME, Template, global_config_path};

use crate::cli::{args::InitCommand, context::CommandContext, output::subheader};

/// Writes a commented starter `.triage.toml`.
///
/// Running in the home directory, or with `--global`, writes the per-user file.
pub fn run(ctx: &CommandContext, cmd: &InitCommand) -> ExitCode {
    let Some((path, template)) = target(ctx, cmd.global) else {
        eprintln!("error: could not determine home directory");
        return ExitCode::FAILURE;
    };

    if path.exists() && !cmd.force {
        eprintln!("error: configuration file already exists: {}", path.display());
        eprintln!("use --force to overwrite");
        return ExitCode::FAILURE;
    }

    if let Err(e) = fs::write(&path, template.render()) {
        eprintln!("error: failed to write {}: {e}", path.display());
        return ExitCode::FAILURE;
    }

    println!("Created {}", path.display());
    println!();
    println!(
        "{}",
        subheader("Point [backend] url at your search service, or set fixture to work offline.")
    );
    ExitCode::SUCCESS
}

/// The file to write and the template for it.
fn target(ctx: &CommandContext, global: bool) -> Option<(PathBuf, Template)> {
    let global_path = global_config_path();
    let in_home = global_path
        .as_ref()
        .and_then(|p| p.parent())
        .is_some_and(|home| home == ctx.cwd);

    if global || in_home {
        global_path.map(|p| (p, Template::Global))
    } else {
        Some((ctx.cwd.join(CONFIG_FILENAME), Template::Local))
    }
}
