//! The query model: what the analyst is currently searching for.
//!
//! A [`QueryBuilder`] is shared by the flat and grouped views. It never fails; malformed
//! input is escaped and sent as-is, and any rejection comes back from the backend.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{
    alert::ALERT_STATUS_FIELD,
    filter::{Filter, FilterValue},
    request::{Group, GroupRequest, SearchRequest, SortField, SortOrder},
};

/// Aggregated threat score field, always projected and summed into group scores.
pub const THREAT_SCORE_FIELD: &str = "threat:triage:score";

/// Logical record id column.
pub const ID_FIELD: &str = "id";

/// Backend's unique-record-identifier field, sortable where `id` is not.
pub const UID_FIELD: &str = "_uid";

/// Default event time field.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// The display query meaning "no free-text constraint".
const MATCH_ALL: &str = "*";

/// Mutable search state shared by every result view.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    /// Free-text query as typed, `*` when empty.
    display_query: String,
    /// Active filters, unique per field, in insertion order.
    filters: Vec<Filter>,
    /// Everything else a search carries: sort, paging, projection, indices.
    request: SearchRequest,
    /// Group-by fields, outermost first. Empty means the flat view.
    group_by: Vec<String>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Creates a model matching everything with default sort and paging.
    pub fn new() -> Self {
        Self {
            display_query: MATCH_ALL.to_string(),
            filters: Vec::new(),
            request: SearchRequest::default(),
            group_by: Vec::new(),
        }
    }

    /// Restores a model from a saved request. Its query becomes the display query.
    pub fn from_search_request(request: SearchRequest) -> Self {
        let mut builder = Self {
            display_query: MATCH_ALL.to_string(),
            filters: Vec::new(),
            request,
            group_by: Vec::new(),
        };
        let query = builder.request.query.clone();
        builder.set_display_query(&query);
        builder
    }

    /// Sets the free-text query. Blank input resets it to `*`.
    pub fn set_display_query(&mut self, query: &str) {
        let trimmed = query.trim();
        self.display_query = if trimmed.is_empty() {
            MATCH_ALL.to_string()
        } else {
            trimmed.to_string()
        };
    }

    /// The free-text query.
    pub fn display_query(&self) -> &str {
        &self.display_query
    }

    /// Replaces the projection.
    ///
    /// `id` and `alert_status` are bookkeeping columns the backend returns anyway; the
    /// threat score is always requested.
    pub fn set_fields<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut seen = HashSet::new();
        let mut fields: Vec<String> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| *name != ID_FIELD && *name != ALERT_STATUS_FIELD)
            .filter(|name| *name != THREAT_SCORE_FIELD)
            .filter(|name| seen.insert(*name))
            .map(String::from)
            .collect();
        fields.push(THREAT_SCORE_FIELD.to_string());
        self.request.fields = fields;
    }

    /// Sets an equality filter, replacing any existing filter on the field in place.
    pub fn add_or_update_filter(&mut self, field: &str, value: &str) {
        self.upsert(Filter::exact(field, value));
    }

    /// Sets an inclusive range filter, replacing any existing filter on the field in place.
    pub fn add_or_update_range(&mut self, field: &str, lower: Option<&str>, upper: Option<&str>) {
        self.upsert(Filter::range(
            field,
            lower.map(String::from),
            upper.map(String::from),
        ));
    }

    /// Restricts `field` to a time window in epoch milliseconds.
    ///
    /// With both ends open the time filter is removed.
    pub fn set_time_range(
        &mut self,
        field: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) {
        if from.is_none() && to.is_none() {
            self.remove_filter(field);
            return;
        }
        let lower = from.map(|t| t.timestamp_millis().to_string());
        let upper = to.map(|t| t.timestamp_millis().to_string());
        self.add_or_update_range(field, lower.as_deref(), upper.as_deref());
    }

    /// Replaces a filter on the same field, keeping its position, or appends it.
    fn upsert(&mut self, filter: Filter) {
        match self.filters.iter_mut().find(|f| f.field == filter.field) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
    }

    /// Removes the filter on `field`, if any.
    pub fn remove_filter(&mut self, field: &str) {
        self.filters.retain(|f| f.field != field);
    }

    /// Active filters in insertion order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// The exact-match value filtered on `field`, if any.
    pub fn filter_value(&self, field: &str) -> Option<&str> {
        self.filters.iter().find_map(|f| match &f.value {
            FilterValue::Exact { value } if f.field == field => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replaces the group-by fields. An empty list selects the flat view.
    pub fn set_group_by(&mut self, fields: Vec<String>) {
        self.group_by = fields;
    }

    /// Group-by fields, outermost first.
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Sorts by a single field. The logical `id` column sorts by `_uid`.
    pub fn set_sort(&mut self, field: &str, order: SortOrder) {
        let field = if field == ID_FIELD { UID_FIELD } else { field };
        self.request.sort = vec![SortField::new(field, order)];
    }

    /// The current sort.
    pub fn sort(&self) -> &[SortField] {
        &self.request.sort
    }

    /// Sets the pagination window. Not validated.
    pub fn set_from_and_size(&mut self, from: usize, size: usize) {
        self.request.from = from;
        self.request.size = size;
    }

    /// Offset of the first result.
    pub fn from(&self) -> usize {
        self.request.from
    }

    /// Page size.
    pub fn size(&self) -> usize {
        self.request.size
    }

    /// Sets the indices searched.
    pub fn set_indices(&mut self, indices: Vec<String>) {
        self.request.indices = indices;
    }

    /// Sets the fields facet counts are requested for.
    pub fn set_facet_fields(&mut self, fields: Vec<String>) {
        self.request.facet_fields = fields;
    }

    /// Compiles the display query and every filter into one `AND` expression.
    ///
    /// The display query is omitted when it is `*`; with nothing active the result is `*`.
    pub fn generate_select(&self) -> String {
        let display = (self.display_query != MATCH_ALL).then(|| self.display_query.clone());
        let clauses: Vec<String> = display
            .into_iter()
            .chain(self.filters.iter().map(Filter::query_string))
            .collect();

        if clauses.is_empty() {
            MATCH_ALL.to_string()
        } else {
            clauses.join(" AND ")
        }
    }

    /// A flat search request carrying the compiled query.
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.generate_select(),
            ..self.request.clone()
        }
    }

    /// A grouped aggregation request over every group-by field.
    pub fn group_request(&self) -> GroupRequest {
        GroupRequest {
            query: self.generate_select(),
            indices: self.request.indices.clone(),
            score_field: Some(THREAT_SCORE_FIELD.to_string()),
            groups: self.group_by.iter().map(Group::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_path::GroupPath;

    #[test]
    fn starts_matching_everything() {
        let query = QueryBuilder::new();
        assert_eq!(query.display_query(), "*");
        assert_eq!(query.generate_select(), "*");
        assert!(query.group_by().is_empty());
    }

    #[test]
    fn updating_a_filter_replaces_it() {
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("ip", "1.2.3.4");
        query.add_or_update_filter("ip", "5.6.7.8");

        assert_eq!(query.filters(), &[Filter::exact("ip", "5.6.7.8")]);
    }

    #[test]
    fn updating_keeps_position() {
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("a", "1");
        query.add_or_update_filter("b", "2");
        query.add_or_update_filter("a", "3");

        assert_eq!(query.generate_select(), "a:3 AND b:2");
    }

    #[test]
    fn equal_update_is_idempotent() {
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("ip", "1.2.3.4");
        let before = query.clone();
        query.add_or_update_filter("ip", "1.2.3.4");
        assert_eq!(query, before);
    }

    #[test]
    fn range_and_exact_share_the_uniqueness_rule() {
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("score", "5");
        query.add_or_update_range("score", Some("1"), None);
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.generate_select(), "score:[1 TO *]");
    }

    #[test]
    fn removing_absent_filter_is_a_no_op() {
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("a", "1");
        query.remove_filter("missing");
        query.remove_filter("a");
        assert!(query.filters().is_empty());
    }

    #[test]
    fn select_combines_display_query_and_filters() {
        let mut query = QueryBuilder::new();
        query.set_display_query("host:foo");
        query.add_or_update_filter("source:type", "bro");
        assert_eq!(query.generate_select(), "host:foo AND source\\:type:bro");
    }

    #[test]
    fn blank_display_query_resets_to_wildcard() {
        let mut query = QueryBuilder::new();
        query.set_display_query("  ");
        assert_eq!(query.display_query(), "*");
    }

    #[test]
    fn group_scope_with_wildcard_select() {
        let query = QueryBuilder::new();
        let path = GroupPath::root().child("source:type", "bro");
        assert_eq!(path.query_for(&query.generate_select()), "source\\:type:bro");
    }

    #[test]
    fn group_scope_with_display_query() {
        let mut query = QueryBuilder::new();
        query.set_display_query("host:foo");
        let path = GroupPath::root().child("source:type", "bro");
        assert_eq!(
            path.query_for(&query.generate_select()),
            "source\\:type:bro AND host:foo"
        );
    }

    #[test]
    fn id_sort_maps_to_uid() {
        let mut query = QueryBuilder::new();
        query.set_sort("id", SortOrder::Asc);
        assert_eq!(query.sort(), &[SortField::new("_uid", SortOrder::Asc)]);

        query.set_sort("ip_src_addr", SortOrder::Desc);
        assert_eq!(query.sort(), &[SortField::new("ip_src_addr", SortOrder::Desc)]);
    }

    #[test]
    fn projection_drops_bookkeeping_and_adds_score_once() {
        let mut query = QueryBuilder::new();
        query.set_fields(&["id", "ip_src_addr", "alert_status", THREAT_SCORE_FIELD]);
        assert_eq!(
            query.search_request().fields,
            vec!["ip_src_addr".to_string(), THREAT_SCORE_FIELD.to_string()]
        );
    }

    #[test]
    fn projection_keeps_first_of_repeated_columns() {
        let mut query = QueryBuilder::new();
        query.set_fields(&["host", "ip_src_addr", "host", "timestamp", "ip_src_addr"]);
        assert_eq!(
            query.search_request().fields,
            ["host", "ip_src_addr", "timestamp", THREAT_SCORE_FIELD]
        );
    }

    #[test]
    fn time_range_uses_epoch_millis() {
        let mut query = QueryBuilder::new();
        let from = DateTime::from_timestamp_millis(1_000).unwrap();
        query.set_time_range(TIMESTAMP_FIELD, Some(from), None);
        assert_eq!(query.generate_select(), "timestamp:[1000 TO *]");

        query.set_time_range(TIMESTAMP_FIELD, None, None);
        assert!(query.filters().is_empty());
    }

    #[test]
    fn search_request_snapshot() {
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("ip", "1");
        query.set_from_and_size(50, 10);
        let request = query.search_request();
        assert_eq!(request.query, "ip:1");
        assert_eq!((request.from, request.size), (50, 10));
    }

    #[test]
    fn group_request_carries_every_level_and_score() {
        let mut query = QueryBuilder::new();
        query.set_group_by(vec!["source:type".into(), "ip_src_addr".into()]);
        let request = query.group_request();
        assert_eq!(request.fields(), vec!["source:type", "ip_src_addr"]);
        assert_eq!(request.score_field.as_deref(), Some(THREAT_SCORE_FIELD));
        assert_eq!(request.query, "*");
    }

    #[test]
    fn restores_from_saved_request() {
        let request = SearchRequest {
            query: "ip:1".into(),
            size: 10,
            ..SearchRequest::default()
        };
        let query = QueryBuilder::from_search_request(request);
        assert_eq!(query.display_query(), "ip:1");
        assert_eq!(query.size(), 10);
        assert_eq!(query.generate_select(), "ip:1");
    }
}
