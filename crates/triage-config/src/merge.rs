//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`, applying precedence
//! rules and resolving paths relative to the file that set them.

use std::path::{Path, PathBuf};

use crate::{
    BackendSettings, Config, ConfigError, RefreshSettings, SearchesSettings, TableSettings,
    parse::{
        RawBackendSettings, RawConfig, RawRefreshSettings, RawSearchesSettings, RawTableSettings,
    },
    resolve::resolve_path,
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

impl ParsedConfig {
    /// Directory holding the file, which relative paths are resolved against.
    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to the
/// working directory), global config last. Every scalar takes the first defined value; lists
/// (`indices`, `columns`) are replaced whole, never concatenated.
pub fn merge_configs(configs: &[ParsedConfig]) -> Result<Config, ConfigError> {
    if configs.is_empty() {
        return Ok(Config::default());
    }

    let mut backend = BackendSettings::default();
    let mut refresh = RefreshSettings::default();
    let mut table = TableSettings::default();
    let mut searches = SearchesSettings::default();

    // Lowest precedence first so closer files overwrite.
    for parsed in configs.iter().rev() {
        let raw = &parsed.config;
        if let Some(ref v) = raw.backend {
            apply_raw_backend(&mut backend, v, parsed)?;
        }
        if let Some(ref v) = raw.refresh {
            apply_raw_refresh(&mut refresh, v, parsed)?;
        }
        if let Some(ref v) = raw.table {
            apply_raw_table(&mut table, v, parsed)?;
        }
        if let Some(ref v) = raw.searches {
            apply_raw_searches(&mut searches, v, parsed)?;
        }
    }

    let config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(Path::to_path_buf);

    Ok(Config {
        backend,
        refresh,
        table,
        searches,
        config_root,
    })
}

/// Rejects zero for settings that must be positive.
fn positive<T: PartialEq + Default>(
    value: T,
    key: &str,
    parsed: &ParsedConfig,
) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            path: parsed.path.clone(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Applies raw backend settings to result, overwriting any present values.
fn apply_raw_backend(
    result: &mut BackendSettings,
    raw: &RawBackendSettings,
    parsed: &ParsedConfig,
) -> Result<(), ConfigError> {
    if let Some(ref v) = raw.url {
        result.url = Some(v.trim_end_matches('/').to_string());
    }
    if let Some(ref v) = raw.fixture {
        result.fixture = Some(resolve_path(v, parsed.dir())?);
    }
    if let Some(ref v) = raw.indices {
        result.indices = v.clone();
    }
    if let Some(v) = raw.timeout_secs {
        result.timeout_secs = positive(v, "backend.timeout_secs", parsed)?;
    }
    Ok(())
}

/// Applies raw refresh settings to result.
fn apply_raw_refresh(
    result: &mut RefreshSettings,
    raw: &RawRefreshSettings,
    parsed: &ParsedConfig,
) -> Result<(), ConfigError> {
    if let Some(v) = raw.interval_secs {
        result.interval_secs = positive(v, "refresh.interval_secs", parsed)?;
    }
    if let Some(v) = raw.paused {
        result.paused = v;
    }
    Ok(())
}

/// Applies raw table settings to result.
fn apply_raw_table(
    result: &mut TableSettings,
    raw: &RawTableSettings,
    parsed: &ParsedConfig,
) -> Result<(), ConfigError> {
    if let Some(v) = raw.page_size {
        result.page_size = positive(v, "table.page_size", parsed)?;
    }
    if let Some(v) = raw.group_page_size {
        result.group_page_size = positive(v, "table.group_page_size", parsed)?;
    }
    if let Some(ref v) = raw.columns {
        result.columns = v.clone();
    }
    Ok(())
}

/// Applies raw saved-search settings to result.
fn apply_raw_searches(
    result: &mut SearchesSettings,
    raw: &RawSearchesSettings,
    parsed: &ParsedConfig,
) -> Result<(), ConfigError> {
    if let Some(v) = raw.recent_limit {
        result.recent_limit = positive(v, "searches.recent_limit", parsed)?;
    }
    if let Some(ref v) = raw.dir {
        result.dir = Some(resolve_path(v, parsed.dir())?);
    }
    Ok(())
}
