//! Configuration file parsing.
//!
//! Parses individual `.triage.toml` files into `RawConfig` structures whose fields are all
//! optional, so partial files can be merged.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_with::{OneOrMany, serde_as};
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Search backend section.
    pub backend: Option<RawBackendSettings>,
    /// Polling section.
    pub refresh: Option<RawRefreshSettings>,
    /// Result table section.
    pub table: Option<RawTableSettings>,
    /// Saved and recent search section.
    pub searches: Option<RawSearchesSettings>,
}

/// Raw backend settings.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBackendSettings {
    /// Base URL of the REST search service.
    pub url: Option<String>,
    /// JSON file of alerts to serve from memory instead of a live backend.
    pub fixture: Option<String>,
    /// Indices to search. Accepts a single string or an array.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub indices: Option<Vec<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Raw refresh settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRefreshSettings {
    /// Seconds between polls.
    pub interval_secs: Option<u64>,
    /// Start with polling paused.
    pub paused: Option<bool>,
}

/// Raw table settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTableSettings {
    /// Rows per page in the flat view.
    pub page_size: Option<usize>,
    /// Rows per page inside an expanded group.
    pub group_page_size: Option<usize>,
    /// Columns shown, in order.
    pub columns: Option<Vec<String>>,
}

/// Raw saved-search settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSearchesSettings {
    /// How many recent searches are kept.
    pub recent_limit: Option<usize>,
    /// Directory the search lists are stored in.
    pub dir: Option<String>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}
