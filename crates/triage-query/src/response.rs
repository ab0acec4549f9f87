//! Responses returned by the search backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alert::Alert;

/// Per-field value counts, keyed by field then value.
pub type FacetCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// A page of flat search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    /// Total number of matches across all pages.
    pub total: u64,
    /// Alerts on this page.
    pub results: Vec<Alert>,
    /// Value counts for the requested facet fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_counts: Option<FacetCounts>,
}

impl SearchResponse {
    /// An empty result set, used to clear a view after a failure.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A nested aggregation response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupResponse {
    /// Field the top-level buckets were grouped by.
    pub grouped_by: String,
    /// Top-level buckets.
    pub group_results: Vec<GroupResult>,
}

/// One aggregation bucket, possibly grouped further by the next field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    /// Bucket key.
    pub key: String,
    /// Number of members.
    pub total: u64,
    /// Sum of the score field over the members.
    #[serde(default)]
    pub score: Option<f64>,
    /// Field the nested buckets are grouped by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped_by: Option<String>,
    /// Nested buckets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_results: Option<Vec<GroupResult>>,
}

impl GroupResult {
    /// Creates a leaf bucket.
    pub fn leaf(key: impl Into<String>, total: u64) -> Self {
        Self {
            key: key.into(),
            total,
            ..Self::default()
        }
    }

    /// Creates a bucket grouped further by `grouped_by`.
    pub fn branch(
        key: impl Into<String>,
        total: u64,
        grouped_by: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            key: key.into(),
            total,
            score: None,
            grouped_by: Some(grouped_by.into()),
            group_results: Some(children),
        }
    }

    /// Sets the score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Nested buckets, empty for a leaf.
    pub fn children(&self) -> &[Self] {
        self.group_results.as_deref().unwrap_or(&[])
    }

    /// Whether this bucket has no nested buckets.
    ///
    /// A bucket reporting an empty nested list is also a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }
}
