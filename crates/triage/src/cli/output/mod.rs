//! Rendering and JSON serialization for CLI output.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use triage_console::{FlatResultView, GroupedResultView, ResultView, RowFormatter};
use triage_query::{Alert, GroupPath};
use triage_store::SaveSearch;
use triage_tree::{GroupNode, NodeState};

/// ANSI color codes for terminal output.
pub mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Cyan text (for headers).
    pub const CYAN: &str = "\x1b[36m";
    /// Green text (for success).
    pub const GREEN: &str = "\x1b[32m";
    /// Yellow text (for warnings).
    pub const YELLOW: &str = "\x1b[33m";
    /// Dim/gray text (for less important info).
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats a header with bold cyan styling.
pub fn header(text: &str) -> String {
    format!("{}{}{}{}", colors::BOLD, colors::CYAN, text, colors::RESET)
}

/// Formats text as a subheader (bold).
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Formats text as dimmed/less important.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a success message (green).
pub fn success(text: &str) -> String {
    format!("{}{}{}", colors::GREEN, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Returns a dimmed horizontal rule for visual separation.
pub fn rule(width: usize) -> String {
    dim(&"─".repeat(width))
}

/// Writes a group path the way `--expand` takes it.
pub fn format_path(path: &GroupPath) -> String {
    path.segments()
        .iter()
        .map(|s| format!("{}={}", s.field, s.key))
        .collect::<Vec<_>>()
        .join("/")
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Builds a table of alerts with the formatter's columns.
pub fn alert_table(formatter: &RowFormatter, alerts: &[&Alert]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(formatter.header());
    for alert in alerts {
        table.add_row(formatter.row(alert).into_iter().map(Cell::new));
    }
    table
}

/// Prints the page shown by the flat view.
pub fn print_flat(view: &FlatResultView, from: usize) {
    let response = view.response();
    if response.results.is_empty() {
        println!("{}", dim("No alerts found."));
        return;
    }

    let alerts: Vec<&Alert> = response.results.iter().collect();
    println!("{}", alert_table(view.formatter(), &alerts));
    let last = from + alerts.len();
    println!(
        "{}",
        dim(&format!("Showing {}-{last} of {}", from + 1, response.total))
    );
}

/// Prints the rows of the grouped view, with the alerts of every populated group.
pub fn print_groups(view: &GroupedResultView) {
    let rows = view.tree().rows();
    if rows.is_empty() {
        println!("{}", dim("No groups found."));
        return;
    }

    for node in rows {
        let indent = "  ".repeat(node.level);
        let marker = if node.is_expanded() { "▾" } else { "▸" };
        let score = node
            .score
            .map(|s| dim(&format!(" score {s}")))
            .unwrap_or_default();
        println!(
            "{indent}{marker} {} {}{score}",
            subheader(&node.key),
            dim(&format!("({})", node.total))
        );
        print_group_alerts(view.formatter(), node, &indent);
    }
}

/// Prints the alerts cached for an expanded leaf group.
fn print_group_alerts(formatter: &RowFormatter, node: &GroupNode, indent: &str) {
    match &node.state {
        NodeState::ExpandedFetching { .. } => println!("{indent}  {}", dim("(loading)")),
        NodeState::ExpandedPopulated { .. } => {
            let Some(results) = &node.results else {
                return;
            };
            let alerts: Vec<&Alert> = results.results.iter().collect();
            if alerts.is_empty() {
                println!("{indent}  {}", dim("(no alerts)"));
                return;
            }
            for line in alert_table(formatter, &alerts).to_string().lines() {
                println!("{indent}  {line}");
            }
            let paging = node.paging;
            let last = paging.from + alerts.len();
            println!(
                "{indent}  {}",
                dim(&format!(
                    "Showing {}-{last} of {}",
                    paging.from + 1,
                    paging.total
                ))
            );
        }
        NodeState::Collapsed | NodeState::ExpandedNotFetched => {}
    }
}

/// Prints stored searches, newest access first.
pub fn print_searches(searches: &[SaveSearch]) {
    if searches.is_empty() {
        println!("{}", dim("No searches found."));
        return;
    }

    let mut sorted: Vec<&SaveSearch> = searches.iter().collect();
    sorted.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Query", "Last run"]);
    for search in sorted {
        let last_run = search
            .last_accessed_at()
            .map(|t| format_time(&t))
            .unwrap_or_else(|| "never".to_string());
        table.add_row(vec![
            Cell::new(&search.name),
            Cell::new(&search.search_request.query),
            Cell::new(last_run),
        ]);
    }
    println!("{table}");
}

/// Formats a time for display.
fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// JSON output for the flat view.
#[derive(Serialize)]
pub struct JsonPage<'a> {
    /// Compiled query.
    pub query: String,
    /// Total matches across all pages.
    pub total: u64,
    /// Offset of the first alert.
    pub from: usize,
    /// Alerts on the page.
    pub alerts: &'a [Alert],
}

/// JSON output for one group.
#[derive(Serialize)]
pub struct JsonGroup<'a> {
    /// Path in `--expand` form.
    pub path: String,
    /// Bucket key.
    pub key: &'a str,
    /// Alerts in the bucket.
    pub total: u64,
    /// Summed score.
    pub score: Option<f64>,
    /// Whether the group is expanded.
    pub expanded: bool,
    /// Alerts fetched for an expanded leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<&'a [Alert]>,
    /// Nested groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl<'a> JsonGroup<'a> {
    /// Converts a node and its subtree.
    pub fn from_node(node: &'a GroupNode) -> Self {
        Self {
            path: format_path(&node.path),
            key: &node.key,
            total: node.total,
            score: node.score,
            expanded: node.is_expanded(),
            alerts: node.results.as_ref().map(|r| r.results.as_slice()),
            children: node.children.iter().map(Self::from_node).collect(),
        }
    }
}
