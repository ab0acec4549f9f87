//! Field filters and their query-string clauses.

use serde::{Deserialize, Serialize};

use crate::{
    alert::GUID_FIELD,
    escape::{escape_field, escape_value},
};

/// The constraint a filter applies to its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FilterValue {
    /// The field must equal this value.
    Exact {
        /// Value to match.
        value: String,
    },
    /// The field must fall between the bounds (inclusive). `None` leaves a side open.
    Range {
        /// Lower bound.
        lower: Option<String>,
        /// Upper bound.
        upper: Option<String>,
    },
}

/// A constraint on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Field the filter applies to.
    pub field: String,
    /// The constraint.
    #[serde(flatten)]
    pub value: FilterValue,
}

impl Filter {
    /// Creates an equality filter.
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::Exact {
                value: value.into(),
            },
        }
    }

    /// Creates an inclusive range filter.
    pub fn range(field: impl Into<String>, lower: Option<String>, upper: Option<String>) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::Range { lower, upper },
        }
    }

    /// Renders the filter as a query-string clause.
    ///
    /// `guid` filters are exact-phrase matches: the value is quoted and never escaped.
    pub fn query_string(&self) -> String {
        let field = escape_field(&self.field);
        match &self.value {
            FilterValue::Exact { value } if self.field == GUID_FIELD => {
                format!("{field}:\"{value}\"")
            }
            FilterValue::Exact { value } => format!("{field}:{}", escape_value(value)),
            FilterValue::Range { lower, upper } => {
                let lower = range_bound(lower.as_deref());
                let upper = range_bound(upper.as_deref());
                format!("{field}:[{lower} TO {upper}]")
            }
        }
    }
}

/// Renders one side of a range, `*` when open.
fn range_bound(bound: Option<&str>) -> String {
    bound.map_or_else(|| "*".to_string(), escape_value)
}
