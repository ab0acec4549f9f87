//! Configuration system for triage.
//!
//! triage uses TOML configuration files named `.triage.toml`. Configuration is resolved by
//! walking up the directory tree from the current working directory, collecting any
//! `.triage.toml` files found, then loading `~/.triage.toml` as the global config with
//! lowest precedence.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod resolve;
mod templates;
#[cfg(test)]
mod test_support;
mod validate;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawBackendSettings, RawConfig, RawRefreshSettings, RawSearchesSettings, RawTableSettings,
    parse_config_file, parse_config_str,
};
pub use resolve::{default_searches_dir, resolve_path};
use serde::Serialize;
pub use templates::Template;
pub use validate::ConfigWarning;
use validate::validate_config;

/// Indices searched when none are configured.
pub const DEFAULT_INDICES: &[&str] = &["websphere", "snort", "asa", "bro", "yaf"];

/// Columns shown when none are configured.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "id",
    "timestamp",
    "source:type",
    "ip_src_addr",
    "enrichments:geo:ip_dst_addr:country",
    "ip_dst_addr",
    "host",
    "alert_status",
];

/// Top-level merged configuration for triage.
///
/// This represents the fully resolved configuration after merging all discovered
/// `.triage.toml` files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Search backend settings.
    pub backend: BackendSettings,
    /// Polling settings.
    pub refresh: RefreshSettings,
    /// Result table settings.
    pub table: TableSettings,
    /// Saved and recent search settings.
    pub searches: SearchesSettings,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.triage.toml` files.
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        if files.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        merge_configs(&parsed)
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Serializes the effective settings in `.triage.toml` form.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let serializable = SerializableSettings {
            backend: &self.backend,
            refresh: &self.refresh,
            table: &self.table,
            searches: &self.searches,
        };
        Ok(toml::to_string_pretty(&serializable)?)
    }

    /// Time between polls.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    /// Directory saved searches live in: the configured one, else the platform data dir.
    pub fn searches_dir(&self) -> Option<PathBuf> {
        self.searches.dir.clone().or_else(default_searches_dir)
    }
}

/// Search backend settings.
#[derive(Debug, Clone, Serialize)]
pub struct BackendSettings {
    /// Base URL of the REST search service, without a trailing slash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// JSON file of alerts served from memory. Takes precedence over `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
    /// Indices to search.
    pub indices: Vec<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: None,
            fixture: None,
            indices: DEFAULT_INDICES.iter().map(|s| (*s).to_string()).collect(),
            timeout_secs: 30,
        }
    }
}

impl BackendSettings {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Polling settings.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSettings {
    /// Seconds between polls.
    pub interval_secs: u64,
    /// Start with polling paused.
    pub paused: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            paused: false,
        }
    }
}

/// Result table settings.
#[derive(Debug, Clone, Serialize)]
pub struct TableSettings {
    /// Rows per page in the flat view.
    pub page_size: usize,
    /// Rows per page inside an expanded group.
    pub group_page_size: usize,
    /// Columns shown, in order.
    pub columns: Vec<String>,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            page_size: 25,
            group_page_size: 5,
            columns: DEFAULT_COLUMNS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Saved and recent search settings.
#[derive(Debug, Clone, Serialize)]
pub struct SearchesSettings {
    /// How many recent searches are kept.
    pub recent_limit: usize,
    /// Storage directory; `None` uses the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for SearchesSettings {
    fn default() -> Self {
        Self {
            recent_limit: 10,
            dir: None,
        }
    }
}

/// Borrowed view of the settings sections for TOML output.
#[derive(Serialize)]
struct SerializableSettings<'a> {
    /// Backend section.
    backend: &'a BackendSettings,
    /// Refresh section.
    refresh: &'a RefreshSettings,
    /// Table section.
    table: &'a TableSettings,
    /// Searches section.
    searches: &'a SearchesSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.backend.indices.len(), DEFAULT_INDICES.len());
        assert_eq!(config.refresh.interval_secs, 60);
        assert!(!config.refresh.paused);
        assert_eq!(config.table.page_size, 25);
        assert_eq!(config.table.group_page_size, 5);
        assert_eq!(config.searches.recent_limit, 10);
        assert!(config.config_root.is_none());
    }

    #[test]
    fn test_refresh_interval() {
        let mut config = Config::default();
        config.refresh.interval_secs = 15;
        assert_eq!(config.refresh_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_searches_dir_prefers_configured() {
        let mut config = Config::default();
        config.searches.dir = Some(PathBuf::from("/var/triage"));
        assert_eq!(config.searches_dir(), Some(PathBuf::from("/var/triage")));
    }

    #[test]
    fn test_settings_to_toml_round_trips() {
        let mut config = Config::default();
        config.backend.url = Some("http://metron:8082".into());
        config.refresh.paused = true;

        let toml = config.settings_to_toml().unwrap();
        assert!(toml.contains("[backend]"));
        assert!(toml.contains("url = \"http://metron:8082\""));
        assert!(!toml.contains("fixture"));

        let parsed = parse_config_str(&toml, Path::new("out.toml")).unwrap();
        assert_eq!(parsed.refresh.unwrap().paused, Some(true));
        assert_eq!(
            parsed.table.unwrap().columns.unwrap().len(),
            DEFAULT_COLUMNS.len()
        );
    }
}
