//! Log output for the CLI.

use std::io;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, in `RUST_LOG` syntax.
pub const LOG_ENV: &str = "TRIAGE_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid.
const DEFAULT_FILTER: &str = "warn";

/// Sends `tracing` output to stderr, filtered by [`LOG_ENV`].
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("warning: could not set up logging: {e}");
    }
}
