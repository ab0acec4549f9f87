//! Group paths: the chain of group-by values leading to a node in a grouped view.
//!
//! A path is the typed identity of a grouped-view node. It is what scopes a node's
//! query to its bucket, and it is the key subscriptions are registered under.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::escape::{escape_field, escape_value};

/// One step in a group path: the group-by field and the bucket key chosen at that level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupSegment {
    /// Group-by field at this level.
    pub field: String,
    /// Bucket key selected for that field.
    pub key: String,
}

impl GroupSegment {
    /// Renders the segment as an escaped `field:value` clause.
    pub fn clause(&self) -> String {
        format!("{}:{}", escape_field(&self.field), escape_value(&self.key))
    }
}

/// Ordered group-by selections from the outermost group inwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupPath(Vec<GroupSegment>);

impl GroupPath {
    /// The empty path (the whole result set).
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path extended by one segment.
    pub fn child(&self, field: impl Into<String>, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(GroupSegment {
            field: field.into(),
            key: key.into(),
        });
        Self(segments)
    }

    /// Segments from the outermost group inwards.
    pub fn segments(&self) -> &[GroupSegment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The innermost segment.
    pub fn last(&self) -> Option<&GroupSegment> {
        self.0.last()
    }

    /// The path one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Whether `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }

    /// The path's own clauses joined with `AND`, without any select.
    pub fn clause(&self) -> String {
        self.0
            .iter()
            .map(GroupSegment::clause)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Scopes `select` to this path.
    ///
    /// The path clauses come first. The select is appended with `AND` unless it is the
    /// wildcard `*`, which would add nothing. The root path yields `select` unchanged.
    pub fn query_for(&self, select: &str) -> String {
        if self.is_empty() {
            return select.to_string();
        }

        let clause = self.clause();
        if select == "*" {
            clause
        } else {
            format!("{clause} AND {select}")
        }
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}={}", segment.field, segment.key)?;
        }
        Ok(())
    }
}

impl FromIterator<GroupSegment> for GroupPath {
    fn from_iter<T: IntoIterator<Item = GroupSegment>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
