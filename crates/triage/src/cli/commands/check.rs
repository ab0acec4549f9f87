//! Implementation of `triage check`.

use std::process::ExitCode;

use triage_config::{ConfigWarning, discover_config_files};

use crate::cli::{
    context::CommandContext,
    output::{dim, header, rule, subheader, warning},
};

/// Shows the configuration files in effect and any validation warnings.
///
/// Exits with failure when there are warnings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config_files = discover_config_files(&ctx.cwd);

    println!("{}", header("Configuration"));
    println!("{}", rule(40));

    if config_files.is_empty() {
        println!("{}", dim("No configuration files found."));
        println!();
        println!("Run {} to create a configuration file.", subheader("triage init"));
    } else {
        println!("{}", subheader("Config files (highest precedence first):"));
        for path in &config_files {
            println!("   {}", path.display());
        }
    }
    println!();

    let config = &ctx.config;
    println!("{}", subheader("Backend:"));
    match (&config.backend.fixture, &config.backend.url) {
        (Some(fixture), _) => println!("   fixture {}", fixture.display()),
        (None, Some(url)) => println!("   {url}"),
        (None, None) => println!("   {}", dim("(none)")),
    }
    println!();

    println!("{}", subheader("Searches:"));
    match config.searches_dir() {
        Some(dir) => println!("   {}", dir.display()),
        None => println!("   {}", dim("(no data directory)")),
    }
    println!();

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return ExitCode::SUCCESS;
    }

    println!("{}", subheader(&format!("Warnings ({}):", warnings.len())));
    for w in &warnings {
        println!("   {}", warning(&w.to_string()));
    }
    println!();

    print_hints(&warnings);

    ExitCode::FAILURE
}

/// Prints hints for resolving common warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    let mut hints: Vec<&str> = warnings
        .iter()
        .filter_map(|w| match w {
            ConfigWarning::NoBackend => {
                Some("Hint: set [backend] url, or [backend] fixture to a JSON file of alerts")
            }
            ConfigWarning::FixtureMissing { .. } => {
                Some("Hint: fixture paths are relative to the config file that sets them")
            }
            ConfigWarning::FixtureShadowsUrl => {
                Some("Hint: remove [backend] fixture to use the search service")
            }
            ConfigWarning::NoColumns | ConfigWarning::IntervalTooShort { .. } => None,
        })
        .collect();
    hints.dedup();
    for hint in hints {
        println!("{}", dim(hint));
    }
}
