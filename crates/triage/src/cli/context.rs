//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use triage_config::Config;
use triage_console::{AlertConsole, ConsoleSettings, ConsoleStore, HttpBackend};
use triage_query::{ColumnMetadata, TIMESTAMP_FIELD};
use triage_store::{FileStorage, SearchStore, Storage};

use crate::cli::backend::CliBackend;

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (may be default if no config files found).
    pub config: Config,
    /// Fixture given on the command line, overriding the configured backend.
    fixture: Option<PathBuf>,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    pub fn load(fixture: Option<PathBuf>) -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let config = load_config_or_failure(&cwd)?;
        Ok(Self {
            fixture: fixture.map(|path| cwd.join(path)),
            cwd,
            config,
        })
    }

    /// Loads only the current directory, skipping configuration parsing.
    ///
    /// Used for `init`, which should work even when an existing config file is invalid.
    pub fn load_cwd_only() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self {
            cwd,
            config: Config::default(),
            fixture: None,
        })
    }

    /// Opens the backend: a fixture if one is given or configured, else the REST service.
    pub fn backend(&self) -> Result<CliBackend, ExitCode> {
        let fixture = self
            .fixture
            .clone()
            .or_else(|| self.config.backend.fixture.clone());
        if let Some(path) = fixture {
            return CliBackend::fixture(path).map_err(|e| {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            });
        }

        let Some(url) = &self.config.backend.url else {
            eprintln!("error: no backend configured");
            eprintln!("Set [backend] url in .triage.toml, or pass --fixture <FILE>.");
            return Err(ExitCode::FAILURE);
        };
        HttpBackend::new(url, self.config.backend.timeout())
            .map(CliBackend::Http)
            .map_err(|e| {
                eprintln!("error: failed to create HTTP client: {e}");
                ExitCode::FAILURE
            })
    }

    /// Console settings taken from the configuration.
    pub fn settings(&self) -> ConsoleSettings {
        let config = &self.config;
        ConsoleSettings {
            refresh_interval: config.refresh_interval(),
            paused: config.refresh.paused,
            page_size: config.table.page_size,
            group_page_size: config.table.group_page_size,
            columns: config
                .table
                .columns
                .iter()
                .map(|name| ColumnMetadata::new(name, column_kind(name)))
                .collect(),
            indices: config.backend.indices.clone(),
        }
    }

    /// The saved and recent search store, when a directory for it is known.
    pub fn store(&self) -> Option<ConsoleStore> {
        let dir = self.config.searches_dir()?;
        let storage: Box<dyn Storage + Send> = Box::new(FileStorage::new(dir));
        Some(SearchStore::new(storage, self.config.searches.recent_limit))
    }

    /// Returns the search store or exits with a consistent error.
    pub fn require_store(&self) -> Result<ConsoleStore, ExitCode> {
        self.store().ok_or_else(|| {
            eprintln!("error: could not determine where to keep searches");
            eprintln!("Set [searches] dir in .triage.toml.");
            ExitCode::FAILURE
        })
    }

    /// Builds a console over the configured backend and search store.
    pub fn console(
        &self,
        settings: ConsoleSettings,
    ) -> Result<(Arc<CliBackend>, AlertConsole<CliBackend>), ExitCode> {
        let backend = Arc::new(self.backend()?);
        let mut console = AlertConsole::new(Arc::clone(&backend), settings);
        if let Some(store) = self.store() {
            console = console.with_store(store);
        }
        Ok((backend, console))
    }
}

/// Column type shown for a configured column.
fn column_kind(name: &str) -> &'static str {
    if name == TIMESTAMP_FIELD || name.ends_with(":ts") {
        "date"
    } else {
        "string"
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Loads configuration from the provided directory or exits with an error.
fn load_config_or_failure(cwd: &Path) -> Result<Config, ExitCode> {
    Config::load(cwd).map_err(|e| {
        eprintln!("error: failed to load configuration: {e}");
        ExitCode::FAILURE
    })
}
