//! Configuration validation.
//!
//! Checks a loaded configuration and reports warnings for settings that will load but
//! probably do not do what was meant.

use std::{fmt, path::PathBuf};

use crate::Config;

/// Polling faster than this hammers a failing backend, since failed polls are retried on
/// every tick.
const MIN_SENSIBLE_INTERVAL_SECS: u64 = 5;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Neither a backend URL nor a fixture is configured.
    NoBackend,
    /// The fixture file does not exist.
    FixtureMissing {
        /// Path that doesn't exist.
        path: PathBuf,
    },
    /// Both a URL and a fixture are set; the fixture is used.
    FixtureShadowsUrl,
    /// The table has no columns.
    NoColumns,
    /// The refresh interval is very short.
    IntervalTooShort {
        /// Configured interval.
        secs: u64,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBackend => write!(f, "no backend url or fixture is configured"),
            Self::FixtureMissing { path } => {
                write!(f, "backend fixture does not exist: {}", path.display())
            }
            Self::FixtureShadowsUrl => {
                write!(f, "both backend url and fixture are set; the fixture is used")
            }
            Self::NoColumns => write!(f, "table.columns is empty; rows will show only ids"),
            Self::IntervalTooShort { secs } => write!(
                f,
                "refresh interval of {secs}s is very short; failed polls retry every tick"
            ),
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let backend = &config.backend;

    match (&backend.url, &backend.fixture) {
        (None, None) => warnings.push(ConfigWarning::NoBackend),
        (Some(_), Some(_)) => warnings.push(ConfigWarning::FixtureShadowsUrl),
        _ => {}
    }

    if let Some(path) = &backend.fixture
        && !path.is_file()
    {
        warnings.push(ConfigWarning::FixtureMissing { path: path.clone() });
    }

    if config.table.columns.is_empty() {
        warnings.push(ConfigWarning::NoColumns);
    }

    if config.refresh.interval_secs < MIN_SENSIBLE_INTERVAL_SECS {
        warnings.push(ConfigWarning::IntervalTooShort {
            secs: config.refresh.interval_secs,
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDir;

    #[test]
    fn default_config_has_no_backend() {
        assert_eq!(
            validate_config(&Config::default()),
            vec![ConfigWarning::NoBackend]
        );
    }

    #[test]
    fn url_only_is_clean() {
        let mut config = Config::default();
        config.backend.url = Some("http://localhost:8082".into());
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn existing_fixture_is_clean() {
        let dir = TestDir::new();
        let fixture = dir.create_file("alerts.json", "[]");
        let mut config = Config::default();
        config.backend.fixture = Some(fixture);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn missing_fixture_and_shadowed_url() {
        let mut config = Config::default();
        config.backend.url = Some("http://localhost:8082".into());
        config.backend.fixture = Some(PathBuf::from("/nonexistent/alerts.json"));

        let warnings = validate_config(&config);
        assert_eq!(
            warnings,
            vec![
                ConfigWarning::FixtureShadowsUrl,
                ConfigWarning::FixtureMissing {
                    path: PathBuf::from("/nonexistent/alerts.json")
                },
            ]
        );
    }

    #[test]
    fn empty_columns_and_short_interval() {
        let mut config = Config::default();
        config.backend.url = Some("http://x".into());
        config.table.columns.clear();
        config.refresh.interval_secs = 1;

        let warnings = validate_config(&config);
        assert!(warnings.contains(&ConfigWarning::NoColumns));
        assert!(warnings.contains(&ConfigWarning::IntervalTooShort { secs: 1 }));
        assert!(warnings[1].to_string().contains("1s"));
    }
}
