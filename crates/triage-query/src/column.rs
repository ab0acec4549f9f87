//! Table column metadata.

use serde::{Deserialize, Serialize};

/// A displayed table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Source field shown in the column.
    pub name: String,
    /// Index mapping type (`string`, `ip`, `date`, ...), empty when unknown.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ColumnMetadata {
    /// Creates column metadata.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}
