//! CLI integration tests for triage commands.
//!
//! These tests focus on exit codes and basic behavioral verification,
//! not specific output formatting which may change.

// Integration tests live outside cfg(test)
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Alerts every workspace starts with.
const FIXTURE: &str = include_str!("fixtures/alerts.json");

/// A scratch workspace with an isolated home directory.
struct Workspace {
    /// Keeps the directories alive.
    temp: TempDir,
}

impl Workspace {
    /// An empty workspace with no configuration.
    fn empty() -> Self {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("home")).unwrap();
        fs::create_dir(temp.path().join("work")).unwrap();
        Self { temp }
    }

    /// A workspace configured to serve the fixture alerts.
    fn with_fixture() -> Self {
        let ws = Self::empty();
        fs::write(ws.dir().join("alerts.json"), FIXTURE).unwrap();
        fs::write(
            ws.dir().join(".triage.toml"),
            r#"root = true

[backend]
fixture = "alerts.json"

[table]
columns = ["id", "source:type", "host", "alert_status"]

[searches]
dir = "searches"
"#,
        )
        .unwrap();
        ws
    }

    /// Working directory commands run in.
    fn dir(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    /// Home directory commands see.
    fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    /// A triage command running in this workspace.
    fn triage(&self) -> Command {
        let mut cmd = triage();
        cmd.current_dir(self.dir())
            .env("HOME", self.home())
            .env_remove("XDG_DATA_HOME")
            .env_remove("TRIAGE_LOG");
        cmd
    }

    /// Runs a command expected to succeed and parses its stdout as JSON.
    fn json(&self, args: &[&str]) -> Value {
        let output = self.triage().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

/// Helper to get a triage command.
fn triage() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("triage").unwrap()
}

/// Ids of the alerts in a JSON alert list.
fn ids(alerts: &Value) -> Vec<&str> {
    alerts
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect()
}

/// Reads a file to a string.
fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

mod search {
    use super::*;

    #[test]
    fn shows_every_alert_newest_first() {
        let ws = Workspace::with_fixture();

        let page = ws.json(&["search", "--json"]);

        assert_eq!(page["total"], 4);
        assert_eq!(page["query"], "*");
        assert_eq!(ids(&page["alerts"]), ["4", "3", "2", "1"]);
    }

    #[test]
    fn prints_a_table() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .arg("search")
            .assert()
            .success()
            .stdout(predicate::str::contains("source:type"))
            .stdout(predicate::str::contains("web2"))
            .stdout(predicate::str::contains("Showing 1-4 of 4"));
    }

    #[test]
    fn filters_narrow_results() {
        let ws = Workspace::with_fixture();

        let page = ws.json(&["search", "-f", "source:type=bro", "--json"]);

        assert_eq!(page["total"], 2);
        assert_eq!(page["query"], "source\\:type:bro");
        assert_eq!(ids(&page["alerts"]), ["2", "1"]);
    }

    #[test]
    fn free_text_and_filters_combine() {
        let ws = Workspace::with_fixture();

        let page = ws.json(&["search", "host:web1", "-f", "source:type=snort", "--json"]);

        assert_eq!(ids(&page["alerts"]), ["3"]);
    }

    #[test]
    fn sorts_and_pages() {
        let ws = Workspace::with_fixture();

        let page = ws.json(&[
            "search",
            "--sort",
            "threat:triage:score",
            "--order",
            "asc",
            "--from",
            "1",
            "-n",
            "2",
            "--json",
        ]);

        assert_eq!(page["total"], 4);
        assert_eq!(page["from"], 1);
        assert_eq!(ids(&page["alerts"]), ["1", "2"]);
    }

    #[test]
    fn time_range_filters_on_timestamp() {
        let ws = Workspace::with_fixture();

        let page = ws.json(&["search", "--since", "2017-05-01T01:30:00Z", "--json"]);

        assert_eq!(ids(&page["alerts"]), ["4", "3"]);
    }

    #[test]
    fn syntax_errors_fail() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["search", "host:(web1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error:"));
    }

    #[test]
    fn fails_without_a_backend() {
        let ws = Workspace::empty();

        ws.triage()
            .arg("search")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no backend configured"));
    }

    #[test]
    fn fixture_flag_overrides_config() {
        let ws = Workspace::empty();
        fs::write(ws.dir().join("other.json"), FIXTURE).unwrap();

        ws.triage()
            .args(["search", "--fixture", "other.json", "-f", "host=db1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Showing 1-1 of 1"));
    }

    #[test]
    fn unreadable_fixture_fails() {
        let ws = Workspace::empty();

        ws.triage()
            .args(["search", "--fixture", "missing.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing.json"));
    }
}

mod groups {
    use super::*;

    #[test]
    fn buckets_by_field() {
        let ws = Workspace::with_fixture();

        let groups = ws.json(&["groups", "--by", "source:type", "--json"]);

        let keys: Vec<&str> = groups
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, ["bro", "snort", "yaf"]);
        assert_eq!(groups[0]["total"], 2);
        assert_eq!(groups[0]["score"], 30.0);
        assert_eq!(groups[0]["expanded"], false);
    }

    #[test]
    fn expanding_a_leaf_fetches_its_alerts() {
        let ws = Workspace::with_fixture();

        let groups = ws.json(&[
            "groups",
            "--by",
            "source:type",
            "--expand",
            "source:type=bro",
            "--json",
        ]);

        assert_eq!(groups[0]["expanded"], true);
        assert_eq!(ids(&groups[0]["alerts"]), ["2", "1"]);
        assert!(groups[1].get("alerts").is_none());
    }

    #[test]
    fn nested_expansion_opens_every_level() {
        let ws = Workspace::with_fixture();

        let groups = ws.json(&[
            "groups",
            "--by",
            "source:type,host",
            "--expand",
            "source:type=bro/host=web2",
            "--json",
        ]);

        let bro = &groups[0];
        assert_eq!(bro["expanded"], true);
        let hosts = bro["children"].as_array().unwrap();
        assert_eq!(hosts.len(), 2);
        let web2 = hosts.iter().find(|h| h["key"] == "web2").unwrap();
        assert_eq!(web2["path"], "source:type=bro/host=web2");
        assert_eq!(ids(&web2["alerts"]), ["2"]);
    }

    #[test]
    fn prints_the_tree() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["groups", "-b", "source:type", "-e", "source:type=yaf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Grouped by"))
            .stdout(predicate::str::contains("snort"))
            .stdout(predicate::str::contains("db1"));
    }

    #[test]
    fn unknown_group_fails() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["groups", "-b", "source:type", "-e", "source:type=asa"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no group source:type=asa"));
    }

    #[test]
    fn requires_group_fields() {
        let ws = Workspace::with_fixture();
        ws.triage().arg("groups").assert().failure();
    }
}

mod status {
    use super::*;

    #[test]
    fn moves_selected_alerts_and_persists() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["status", "escalate", "--ids", "1,3", "--workflow", "wf-9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Moved 2 alerts to ESCALATE"));

        let page = ws.json(&["search", "-f", "alert_status=ESCALATE", "--json"]);
        assert_eq!(ids(&page["alerts"]), ["3", "1"]);
        assert!(read(&ws.dir().join("alerts.json")).contains("wf-9"));
    }

    #[test]
    fn all_moves_the_searched_page() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["status", "dismiss", "--all", "-f", "source:type=bro"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Moved 2 alerts to DISMISS"));

        let page = ws.json(&["search", "-f", "alert_status=DISMISS", "--json"]);
        assert_eq!(page["total"], 2);
    }

    #[test]
    fn unknown_ids_select_nothing() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["status", "resolve", "--ids", "99"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("alert 99 is not in the results"))
            .stderr(predicate::str::contains("no alerts are selected"));
    }

    #[test]
    fn rejects_unknown_status() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["status", "ignored", "--all"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown alert status"));
    }
}

mod searches {
    use super::*;

    #[test]
    fn save_list_run_and_delete() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["saved", "save", "web1 alerts", "-f", "host=web1"])
            .assert()
            .success();

        ws.triage()
            .args(["saved", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("web1 alerts"))
            .stdout(predicate::str::contains("host:web1"));

        let page = ws.json(&["saved", "run", "web1 alerts", "--json"]);
        assert_eq!(ids(&page["alerts"]), ["3", "1"]);

        ws.triage()
            .args(["saved", "delete", "web1 alerts"])
            .assert()
            .success();
        ws.triage()
            .args(["saved", "run", "web1 alerts"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no saved search named"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["saved", "save", "mine", "host:web1"])
            .assert()
            .success();
        ws.triage()
            .args(["saved", "save", "mine", "host:web2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn filtered_searches_become_recent() {
        let ws = Workspace::with_fixture();

        ws.triage().arg("search").assert().success();
        ws.triage()
            .args(["search", "-f", "host=db1"])
            .assert()
            .success();

        ws.triage()
            .args(["recent", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("host:db1"));
        assert!(ws.dir().join("searches/alerts-search.json").is_file());

        ws.triage()
            .args(["recent", "delete", "host:db1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted host:db1"));
        ws.triage()
            .args(["recent", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No searches found."));
    }
}

mod compile {
    use super::*;

    #[test]
    fn prints_the_compiled_query() {
        let ws = Workspace::empty();

        ws.triage()
            .args(["compile", "-f", "ip_src_addr=10.0.0.1", "-f", "guid=abc def"])
            .assert()
            .success()
            .stdout("ip_src_addr:10.0.0.1 AND guid:\"abc def\"\n");
    }

    #[test]
    fn scopes_to_a_group() {
        let ws = Workspace::empty();

        ws.triage()
            .args(["compile", "host:foo", "--group", "source:type=bro"])
            .assert()
            .success()
            .stdout("source\\:type:bro AND host:foo\n");
    }

    #[test]
    fn grouped_json_is_an_aggregation_request() {
        let ws = Workspace::empty();

        let request = ws.json(&["compile", "--by", "source:type,host", "--json"]);

        assert_eq!(request["query"], "*");
        assert_eq!(request["groups"][1]["field"], "host");
        assert_eq!(request["scoreField"], "threat:triage:score");
    }

    #[test]
    fn rejects_bad_syntax() {
        let ws = Workspace::empty();

        ws.triage()
            .args(["compile", "a AND"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error:"));
    }

    #[test]
    fn escapes_values() {
        triage()
            .args(["escape", "a||b"])
            .assert()
            .success()
            .stdout("a\\||b\n");
        triage()
            .args(["escape", "--field", "source:type"])
            .assert()
            .success()
            .stdout("source\\:type\n");
    }
}

mod watch {
    use super::*;

    #[test]
    fn reports_each_refresh() {
        let ws = Workspace::with_fixture();

        let output = ws
            .triage()
            .args(["watch", "--interval", "1", "--ticks", "1"])
            .output()
            .unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.matches("4 alerts").count(), 2);
    }

    #[test]
    fn reports_groups() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .args(["watch", "-b", "source:type", "--interval", "1", "--ticks", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("3 groups: bro (2), snort (1), yaf (1)"));
    }
}

mod init {
    use super::*;

    #[test]
    fn creates_config_file() {
        let ws = Workspace::empty();

        ws.triage().arg("init").assert().success();

        let contents = read(&ws.dir().join(".triage.toml"));
        assert!(contents.contains("[backend]"));
    }

    #[test]
    fn fails_if_config_exists() {
        let ws = Workspace::empty();
        fs::write(ws.dir().join(".triage.toml"), "existing").unwrap();

        ws.triage()
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn force_overwrites() {
        let ws = Workspace::empty();
        fs::write(ws.dir().join(".triage.toml"), "existing").unwrap();

        ws.triage().args(["init", "--force"]).assert().success();

        assert_ne!(read(&ws.dir().join(".triage.toml")), "existing");
    }

    #[test]
    fn global_writes_to_home() {
        let ws = Workspace::empty();

        ws.triage().args(["init", "--global"]).assert().success();

        assert!(ws.home().join(".triage.toml").exists());
        assert!(!ws.dir().join(".triage.toml").exists());
    }
}

mod config {
    use super::*;

    #[test]
    fn prints_effective_settings() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("[table]"))
            .stdout(predicate::str::contains("alerts.json"));
    }

    #[test]
    fn invalid_config_fails() {
        let ws = Workspace::empty();
        fs::write(ws.dir().join(".triage.toml"), "[table\n").unwrap();

        ws.triage()
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to load configuration"));
    }

    #[test]
    fn check_passes_with_a_fixture() {
        let ws = Workspace::with_fixture();

        ws.triage()
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("No issues found."));
    }

    #[test]
    fn check_warns_without_a_backend() {
        let ws = Workspace::empty();

        ws.triage()
            .arg("check")
            .assert()
            .failure()
            .stdout(predicate::str::contains("no backend url or fixture"));
    }
}
