//! Integration tests for triage-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> resolve -> merge.

// Integration tests live outside cfg(test)
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use triage_config::{CONFIG_FILENAME, Config, ConfigError, ConfigWarning, is_global_config};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Loads config from `rel_path`, ignoring any global config on the test machine.
    fn load(&self, rel_path: &str) -> Config {
        let cwd = self.path().join(rel_path);
        let files: Vec<PathBuf> = triage_config::discover_config_files(&cwd)
            .into_iter()
            .filter(|p| !is_global_config(p))
            .collect();
        Config::load_from_files(&files).unwrap()
    }
}

#[test]
fn test_load_no_files_returns_default() {
    let config = Config::load_from_files(&[]).unwrap();

    assert!(config.config_root.is_none());
    assert_eq!(config.refresh.interval_secs, 60);
    assert_eq!(config.table.page_size, 25);
}

#[test]
fn test_load_single_config() {
    let env = TestEnv::new();
    env.create_file(
        CONFIG_FILENAME,
        r#"
root = true

[backend]
url = "http://metron:8082"

[table]
page_size = 10
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(config.backend.url.as_deref(), Some("http://metron:8082"));
    assert_eq!(config.table.page_size, 10);
    assert_eq!(config.config_root.as_deref(), Some(env.path()));
}

#[test]
fn test_nested_configs_closest_wins() {
    let env = TestEnv::new();
    env.create_file(
        CONFIG_FILENAME,
        r#"
[refresh]
interval_secs = 120
paused = true

[searches]
dir = "searches"
"#,
    );
    env.create_file(
        "team/.triage.toml",
        r#"
[refresh]
interval_secs = 30
"#,
    );
    env.create_dir("team/analyst");

    let config = env.load("team/analyst");

    assert_eq!(config.refresh.interval_secs, 30);
    assert!(config.refresh.paused);
    assert_eq!(config.searches.dir, Some(env.path().join("searches")));
    assert_eq!(config.config_root, Some(env.path().join("team")));
}

#[test]
fn test_root_config_hides_parents() {
    let env = TestEnv::new();
    env.create_file(CONFIG_FILENAME, "[table]\npage_size = 99\n");
    env.create_file("project/.triage.toml", "root = true\n");
    env.create_dir("project/src");

    let config = Config::load(&env.path().join("project/src")).unwrap();

    assert_eq!(config.table.page_size, 25);
}

#[test]
fn test_fixture_path_and_validation() {
    let env = TestEnv::new();
    env.create_file("fixtures/alerts.json", "[]");
    env.create_file(
        CONFIG_FILENAME,
        r#"
root = true

[backend]
fixture = "fixtures/alerts.json"
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(
        config.backend.fixture,
        Some(env.path().join("fixtures/alerts.json"))
    );
    assert!(config.validate().is_empty());
}

#[test]
fn test_missing_fixture_warns() {
    let env = TestEnv::new();
    env.create_file(
        CONFIG_FILENAME,
        "root = true\n[backend]\nfixture = \"gone.json\"\n",
    );

    let config = Config::load(env.path()).unwrap();
    let warnings = config.validate();

    assert_eq!(
        warnings,
        vec![ConfigWarning::FixtureMissing {
            path: env.path().join("gone.json")
        }]
    );
}

#[test]
fn test_invalid_toml_is_an_error() {
    let env = TestEnv::new();
    env.create_file(CONFIG_FILENAME, "root = true\n[backend\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
}

#[test]
fn test_zero_page_size_is_an_error() {
    let env = TestEnv::new();
    env.create_file(CONFIG_FILENAME, "root = true\n[table]\npage_size = 0\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(err.to_string().contains("table.page_size"));
}

#[test]
fn test_effective_settings_render() {
    let env = TestEnv::new();
    env.create_file(
        CONFIG_FILENAME,
        "root = true\n[backend]\nindices = \"bro\"\n",
    );

    let config = Config::load(env.path()).unwrap();
    let toml = config.settings_to_toml().unwrap();

    assert!(toml.contains("indices = [\"bro\"]"));
    assert!(toml.contains("[refresh]"));
}
