//! The stored search record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_query::{ColumnMetadata, SearchRequest};

/// A search as stored in the recent and saved lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSearch {
    /// Name the search is listed and looked up under.
    pub name: String,
    /// The search itself.
    pub search_request: SearchRequest,
    /// Columns shown when the search was stored.
    #[serde(default)]
    pub table_columns: Vec<ColumnMetadata>,
    /// When the search was last run, in epoch milliseconds.
    #[serde(default)]
    pub last_accessed: i64,
}

impl SaveSearch {
    /// Creates a record that has never been accessed.
    pub fn new(
        name: impl Into<String>,
        search_request: SearchRequest,
        table_columns: Vec<ColumnMetadata>,
    ) -> Self {
        Self {
            name: name.into(),
            search_request,
            table_columns,
            last_accessed: 0,
        }
    }

    /// Marks the search as accessed at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now.timestamp_millis();
    }

    /// When the search was last accessed, or `None` if never.
    pub fn last_accessed_at(&self) -> Option<DateTime<Utc>> {
        if self.last_accessed == 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.last_accessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        let mut search = SaveSearch::new(
            "host:foo",
            SearchRequest::default(),
            vec![ColumnMetadata::new("host", "string")],
        );
        search.last_accessed = 1_500_000_000_000;

        let json = serde_json::to_value(&search).unwrap();
        assert_eq!(json["name"], "host:foo");
        assert_eq!(json["lastAccessed"], 1_500_000_000_000_i64);
        assert_eq!(json["tableColumns"][0]["type"], "string");
        assert_eq!(json["searchRequest"]["query"], "*");
    }

    #[test]
    fn touch_records_epoch_millis() {
        let mut search = SaveSearch::new("*", SearchRequest::default(), Vec::new());
        assert!(search.last_accessed_at().is_none());

        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        search.touch(now);

        assert_eq!(search.last_accessed, 1_700_000_000_123);
        assert_eq!(search.last_accessed_at(), Some(now));
    }

    #[test]
    fn missing_optional_fields_default() {
        let search: SaveSearch =
            serde_json::from_str(r#"{"name":"a","searchRequest":{"query":"a"}}"#).unwrap();
        assert!(search.table_columns.is_empty());
        assert_eq!(search.last_accessed, 0);
        assert_eq!(search.search_request.size, 25);
    }
}
