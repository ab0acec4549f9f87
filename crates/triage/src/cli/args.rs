//! Clap argument definitions for the `triage` CLI.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use triage_query::{AlertStatus, GroupPath, SortOrder};

/// Parses `FIELD=VALUE`.
fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got '{s}'")),
    }
}

/// Parses an RFC 3339 time or epoch milliseconds.
fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(millis) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| format!("timestamp out of range: {s}"));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid time '{s}': {e}"))
}

/// Parses a group path written `FIELD=KEY/FIELD=KEY`, outermost group first.
pub fn parse_group_path(s: &str) -> Result<GroupPath, String> {
    let mut path = GroupPath::root();
    for segment in s.split('/') {
        let Some((field, key)) = segment.split_once('=') else {
            return Err(format!("expected FIELD=KEY in group path, got '{segment}'"));
        };
        if field.is_empty() {
            return Err(format!("missing field in group path segment '{segment}'"));
        }
        path = path.child(field, key);
    }
    Ok(path)
}

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Search, group and triage security alerts")]
pub struct Cli {
    /// Serve alerts from a JSON fixture instead of the configured backend
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// What to search for. Shared by every command that runs a search.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Free-text query in search syntax [default: *]
    pub query: Option<String>,

    /// Exact-match filter as FIELD=VALUE (can be specified multiple times)
    #[arg(short = 'f', long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Only alerts at or after this time (RFC 3339 or epoch milliseconds)
    #[arg(long, value_parser = parse_time)]
    pub since: Option<DateTime<Utc>>,

    /// Only alerts at or before this time (RFC 3339 or epoch milliseconds)
    #[arg(long, value_parser = parse_time)]
    pub until: Option<DateTime<Utc>>,

    /// Field to sort by [default: timestamp]
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort order: asc or desc
    #[arg(long, default_value = "desc")]
    pub order: SortOrder,
}

/// Paging flags for flat results.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Offset of the first alert shown
    #[arg(long, default_value = "0")]
    pub from: usize,

    /// Alerts per page [default: from config]
    #[arg(short = 'n', long)]
    pub size: Option<usize>,
}

/// Arguments for `triage search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    /// What to search for.
    pub query: QueryArgs,

    #[command(flatten)]
    /// Paging.
    pub page: PageArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `triage groups`.
#[derive(Args, Debug, Clone)]
pub struct GroupsCommand {
    #[command(flatten)]
    /// What to search for.
    pub query: QueryArgs,

    /// Fields to group by, outermost first (comma separated)
    #[arg(short = 'b', long = "by", value_delimiter = ',', required = true)]
    pub group_by: Vec<String>,

    /// Group to expand, as FIELD=KEY/FIELD=KEY (can be specified multiple times)
    #[arg(short = 'e', long = "expand", value_parser = parse_group_path)]
    pub expand: Vec<GroupPath>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `triage watch`.
#[derive(Args, Debug, Clone)]
pub struct WatchCommand {
    #[command(flatten)]
    /// What to search for.
    pub query: QueryArgs,

    /// Fields to group by, outermost first (comma separated)
    #[arg(short = 'b', long = "by", value_delimiter = ',')]
    pub group_by: Vec<String>,

    /// Seconds between refreshes [default: from config]
    #[arg(long)]
    pub interval: Option<u64>,

    /// Stop after this many refreshes (0 runs until interrupted)
    #[arg(long, default_value = "0")]
    pub ticks: usize,
}

/// Arguments for `triage compile`.
#[derive(Args, Debug, Clone)]
pub struct CompileCommand {
    #[command(flatten)]
    /// What to search for.
    pub query: QueryArgs,

    /// Fields to group by; prints the aggregation request instead of the search request
    #[arg(short = 'b', long = "by", value_delimiter = ',')]
    pub group_by: Vec<String>,

    /// Group whose derived query to print, as FIELD=KEY/FIELD=KEY
    #[arg(long, value_parser = parse_group_path)]
    pub group: Option<GroupPath>,

    /// Print the full request as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `triage escape`.
#[derive(Args, Debug, Clone)]
pub struct EscapeCommand {
    /// Text to escape
    pub value: String,

    /// Escape as a field name rather than a value
    #[arg(long)]
    pub field: bool,
}

/// Arguments for `triage status`.
#[derive(Args, Debug, Clone)]
pub struct StatusCommand {
    /// New status: NEW, OPEN, ESCALATE, DISMISS or RESOLVE
    pub status: AlertStatus,

    /// Ids of the alerts to change (comma separated)
    #[arg(long, value_delimiter = ',', required_unless_present = "all")]
    pub ids: Vec<String>,

    /// Change every alert on the page
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,

    /// Workflow id to record with the change
    #[arg(long)]
    pub workflow: Option<String>,

    #[command(flatten)]
    /// Search the alerts are picked from.
    pub query: QueryArgs,

    #[command(flatten)]
    /// Page the alerts are picked from.
    pub page: PageArgs,
}

/// Arguments for `triage init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global config (~/.triage.toml) instead of local
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

/// Saved search actions.
#[derive(Subcommand, Debug, Clone)]
pub enum SavedAction {
    /// List saved searches
    List,
    /// Save a search under a name
    Save {
        /// Name to save the search under
        name: String,

        #[command(flatten)]
        /// The search to save.
        query: QueryArgs,
    },
    /// Run a saved search
    Run {
        /// Saved search name
        name: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved search
    Delete {
        /// Saved search name
        name: String,
    },
}

/// Recent search actions.
#[derive(Subcommand, Debug, Clone)]
pub enum RecentAction {
    /// List recent searches, most recently run first
    List,
    /// Forget a recent search
    Delete {
        /// Recent search name (its compiled query)
        name: String,
    },
}

/// Supported `triage` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search alerts and show one page
    Search(SearchCommand),

    /// Group alerts by one or more fields
    Groups(GroupsCommand),

    /// Keep a search refreshed and report each change
    Watch(WatchCommand),

    /// Show the query a search compiles to, without running it
    Compile(CompileCommand),

    /// Escape text for use in a query
    Escape(EscapeCommand),

    /// Change the workflow status of alerts
    Status(StatusCommand),

    /// Manage saved searches
    Saved {
        /// Action to take.
        #[command(subcommand)]
        action: SavedAction,
    },

    /// Manage recent searches
    Recent {
        /// Action to take.
        #[command(subcommand)]
        action: RecentAction,
    },

    /// Initialize configuration in current directory
    Init(InitCommand),

    /// Show effective configuration settings
    Config,

    /// Validate configuration and report problems
    Check,
}
