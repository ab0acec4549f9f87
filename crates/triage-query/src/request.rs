//! Requests sent to the search backend.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Indices searched when none are configured.
pub const DEFAULT_INDICES: &[&str] = &["websphere", "snort", "asa", "bro", "yaf"];

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortOrder {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(format!("unknown sort order: {other} (expected asc or desc)")),
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    /// Field to sort on.
    pub field: String,
    /// Direction.
    pub sort_order: SortOrder,
}

impl SortField {
    /// Creates a sort key.
    pub fn new(field: impl Into<String>, sort_order: SortOrder) -> Self {
        Self {
            field: field.into(),
            sort_order,
        }
    }
}

/// A flat, paginated search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    /// Query string in the backend dialect.
    pub query: String,
    /// Offset of the first result.
    pub from: usize,
    /// Page size.
    pub size: usize,
    /// Sort keys, primary first.
    pub sort: Vec<SortField>,
    /// Source fields to return.
    pub fields: Vec<String>,
    /// Indices to search.
    pub indices: Vec<String>,
    /// Fields to compute facet counts for.
    pub facet_fields: Vec<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: "*".to_string(),
            from: 0,
            size: 25,
            sort: vec![SortField::new("timestamp", SortOrder::Desc)],
            fields: Vec::new(),
            indices: DEFAULT_INDICES.iter().map(|s| s.to_string()).collect(),
            facet_fields: Vec::new(),
        }
    }
}

/// How group buckets are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOrderType {
    /// By member count.
    #[default]
    Count,
    /// By bucket key.
    Term,
}

/// Bucket ordering for one group level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOrder {
    /// Direction.
    pub sort_order: SortOrder,
    /// What to order by.
    pub group_order_type: GroupOrderType,
}

/// One group-by level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Field to bucket on.
    pub field: String,
    /// Bucket ordering.
    #[serde(default)]
    pub order: GroupOrder,
}

impl Group {
    /// Creates a group level with the default ordering (count, descending).
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: GroupOrder::default(),
        }
    }
}

/// A nested aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    /// Query string restricting the aggregated documents.
    pub query: String,
    /// Indices to aggregate over.
    pub indices: Vec<String>,
    /// Field summed into each bucket's score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_field: Option<String>,
    /// Group levels, outermost first.
    pub groups: Vec<Group>,
}

impl GroupRequest {
    /// The group-by field names, outermost first.
    pub fn fields(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.field.clone()).collect()
    }
}
