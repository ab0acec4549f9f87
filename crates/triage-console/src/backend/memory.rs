//! A search service over alerts held in memory.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use triage_query::{
    Alert, AlertStatus, FacetCounts, FieldValue, Group, GroupOrder, GroupOrderType, GroupRequest,
    GroupResponse, GroupResult, QueryExpr, SearchRequest, SearchResponse, SortField, SortOrder,
    parse,
};

use super::{
    SearchBackend,
    eval::{field_value, matches},
};
use crate::BackendError;

/// Serves searches and aggregations from a fixed set of alerts.
///
/// Queries are parsed and evaluated locally. Buckets are ordered by count, largest first,
/// then by key, and scored by summing the request's score field over their members.
/// Failures and latency can be injected for tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Everything mutable.
    state: Mutex<State>,
}

/// Mutable backend state.
#[derive(Debug, Default)]
struct State {
    /// Stored alerts.
    alerts: Vec<Alert>,
    /// Error returned by every call while set.
    failure: Option<BackendError>,
    /// Delay before each call answers.
    latency: Duration,
    /// Flat searches served.
    searches: usize,
    /// Aggregations served.
    aggregations: usize,
}

/// Accepted fixture shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    /// A bare array of alerts.
    Alerts(Vec<Alert>),
    /// A saved search response.
    Response {
        /// The alerts.
        results: Vec<Alert>,
    },
}

impl MemoryBackend {
    /// Creates a backend serving `alerts`.
    pub fn new(alerts: Vec<Alert>) -> Self {
        Self {
            state: Mutex::new(State {
                alerts,
                ..State::default()
            }),
        }
    }

    /// Loads alerts from JSON: an array of alerts or an object with a `results` array.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let fixture: Fixture =
            serde_json::from_str(json).map_err(|e| BackendError::Decode(e.to_string()))?;
        let alerts = match fixture {
            Fixture::Alerts(alerts) | Fixture::Response { results: alerts } => alerts,
        };
        Ok(Self::new(alerts))
    }

    /// A snapshot of the stored alerts.
    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    /// Adds an alert.
    pub fn push(&self, alert: Alert) {
        self.lock().alerts.push(alert);
    }

    /// Makes every call fail with `failure` until cleared with `None`.
    pub fn set_failure(&self, failure: Option<BackendError>) {
        self.lock().failure = failure;
    }

    /// Delays every answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Number of flat searches served, failed ones included.
    pub fn search_count(&self) -> usize {
        self.lock().searches
    }

    /// Number of aggregations served, failed ones included.
    pub fn group_count(&self) -> usize {
        self.lock().aggregations
    }

    /// Locks the state, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits out the configured latency.
    async fn wait(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.wait().await;
        let mut state = self.lock();
        state.searches += 1;
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        debug!(query = %request.query, "memory search");

        let expr = parse(&request.query)?;
        let mut hits = select(&state.alerts, expr.as_ref(), &request.indices);
        hits.sort_by(|a, b| compare_alerts(a, b, &request.sort));

        let facet_counts =
            (!request.facet_fields.is_empty()).then(|| facets(&hits, &request.facet_fields));
        Ok(SearchResponse {
            total: hits.len() as u64,
            results: hits
                .into_iter()
                .skip(request.from)
                .take(request.size)
                .map(|alert| project(alert, &request.fields))
                .collect(),
            facet_counts,
        })
    }

    async fn groups(&self, request: &GroupRequest) -> Result<GroupResponse, BackendError> {
        self.wait().await;
        let mut state = self.lock();
        state.aggregations += 1;
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        debug!(query = %request.query, groups = ?request.fields(), "memory aggregation");

        let expr = parse(&request.query)?;
        let hits = select(&state.alerts, expr.as_ref(), &request.indices);
        let Some((first, rest)) = request.groups.split_first() else {
            return Ok(GroupResponse::default());
        };
        Ok(GroupResponse {
            grouped_by: first.field.clone(),
            group_results: bucket(&hits, first, rest, request.score_field.as_deref()),
        })
    }

    async fn update_alert_state(
        &self,
        alerts: &[Alert],
        status: AlertStatus,
        workflow_id: Option<&str>,
    ) -> Result<(), BackendError> {
        self.wait().await;
        let mut state = self.lock();
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        let ids: HashSet<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        for alert in state.alerts.iter_mut().filter(|a| ids.contains(a.id.as_str())) {
            alert.set_status(status, workflow_id);
        }
        Ok(())
    }
}

/// Alerts in `indices` matching `expr`; no expression matches everything.
fn select<'a>(alerts: &'a [Alert], expr: Option<&QueryExpr>, indices: &[String]) -> Vec<&'a Alert> {
    alerts
        .iter()
        .filter(|alert| in_indices(alert, indices))
        .filter(|alert| expr.is_none_or(|e| matches(e, alert)))
        .collect()
}

/// Whether the alert's index starts with one of `indices`. Alerts without an index are
/// always searched.
fn in_indices(alert: &Alert, indices: &[String]) -> bool {
    match &alert.index {
        Some(index) => indices.is_empty() || indices.iter().any(|i| index.starts_with(i.as_str())),
        None => true,
    }
}

/// Orders alerts by the sort fields in precedence order, then by id.
///
/// Alerts missing a sort field come last in either direction.
fn compare_alerts(a: &Alert, b: &Alert, sort: &[SortField]) -> Ordering {
    for field in sort {
        let ordering = match (field_value(a, &field.field), field_value(b, &field.field)) {
            (Some(x), Some(y)) => match field.sort_order {
                SortOrder::Asc => compare_values(&x, &y),
                SortOrder::Desc => compare_values(&y, &x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.id.cmp(&b.id)
}

/// Numeric comparison when both values are numbers, text otherwise.
fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Keeps only `fields` of the source; no fields keeps everything.
fn project(alert: &Alert, fields: &[String]) -> Alert {
    let mut alert = alert.clone();
    if !fields.is_empty() {
        alert.source.retain(|name, _| fields.contains(name));
    }
    alert
}

/// Value counts per facet field.
fn facets(alerts: &[&Alert], fields: &[String]) -> FacetCounts {
    fields
        .iter()
        .map(|field| {
            let mut counts = BTreeMap::new();
            for value in alerts.iter().filter_map(|a| field_value(a, field)) {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
            (field.clone(), counts)
        })
        .collect()
}

/// Buckets `alerts` on `group`, nesting the remaining levels inside each bucket.
fn bucket(
    alerts: &[&Alert],
    group: &Group,
    rest: &[Group],
    score_field: Option<&str>,
) -> Vec<GroupResult> {
    let mut members: BTreeMap<String, Vec<&Alert>> = BTreeMap::new();
    for &alert in alerts {
        if let Some(value) = field_value(alert, &group.field) {
            members.entry(value.to_string()).or_default().push(alert);
        }
    }

    let mut results: Vec<GroupResult> = members
        .into_iter()
        .map(|(key, members)| {
            let total = members.len() as u64;
            let result = match rest.split_first() {
                Some((next, deeper)) => GroupResult::branch(
                    key,
                    total,
                    next.field.clone(),
                    bucket(&members, next, deeper, score_field),
                ),
                None => GroupResult::leaf(key, total),
            };
            match score_field {
                Some(field) => result.with_score(
                    members
                        .iter()
                        .filter_map(|a| a.field(field).and_then(FieldValue::as_f64))
                        .sum(),
                ),
                None => result,
            }
        })
        .collect();

    results.sort_by(|a, b| compare_buckets(a, b, group.order));
    results
}

/// Bucket ordering; ties on count fall back to key order.
fn compare_buckets(a: &GroupResult, b: &GroupResult, order: GroupOrder) -> Ordering {
    let primary = match order.group_order_type {
        GroupOrderType::Count => a.total.cmp(&b.total),
        GroupOrderType::Term => a.key.cmp(&b.key),
    };
    let primary = match order.sort_order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.key.cmp(&b.key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use triage_query::{QueryBuilder, THREAT_SCORE_FIELD};

    use super::*;

    fn fixture() -> MemoryBackend {
        let alerts = json!([
            {"id": "1", "index": "bro_index_2017", "source": {
                "source:type": "bro", "ip_src_addr": "10.0.0.1", "threat:triage:score": 10,
                "timestamp": 1000, "guid": "g1"}},
            {"id": "2", "index": "bro_index_2017", "source": {
                "source:type": "bro", "ip_src_addr": "10.0.0.2", "threat:triage:score": 30,
                "timestamp": 3000, "guid": "g2"}},
            {"id": "3", "index": "snort_index_2017", "source": {
                "source:type": "snort", "ip_src_addr": "10.0.0.1", "threat:triage:score": 5,
                "timestamp": 2000, "guid": "g3"}},
            {"id": "4", "index": "yaf_index_2017", "source": {
                "source:type": "yaf", "ip_src_addr": "10.0.0.3", "timestamp": 4000,
                "guid": "g4"}},
            {"id": "5", "index": "other_index", "source": {
                "source:type": "other", "timestamp": 5000}}
        ]);
        MemoryBackend::from_json(&alerts.to_string()).unwrap()
    }

    fn ids(response: &SearchResponse) -> Vec<&str> {
        response.results.iter().map(|a| a.id.as_str()).collect()
    }

    #[tokio::test]
    async fn search_sorts_pages_and_filters_indices() {
        let backend = fixture();
        let mut query = QueryBuilder::new();
        query.set_from_and_size(1, 2);

        let response = backend.search(&query.search_request()).await.unwrap();

        assert_eq!(response.total, 4);
        assert_eq!(ids(&response), ["2", "3"]);
        assert_eq!(backend.search_count(), 1);
    }

    #[tokio::test]
    async fn search_applies_query_and_sort() {
        let backend = fixture();
        let mut query = QueryBuilder::new();
        query.add_or_update_filter("ip_src_addr", "10.0.0.1");
        query.set_sort(THREAT_SCORE_FIELD, SortOrder::Asc);

        let response = backend.search(&query.search_request()).await.unwrap();

        assert_eq!(ids(&response), ["3", "1"]);
    }

    #[tokio::test]
    async fn search_projects_fields_and_counts_facets() {
        let backend = fixture();
        let mut query = QueryBuilder::new();
        query.set_fields(&["ip_src_addr"]);
        query.set_facet_fields(vec!["source:type".to_string()]);

        let response = backend.search(&query.search_request()).await.unwrap();

        assert!(
            response
                .results
                .iter()
                .all(|a| a.field("timestamp").is_none() && a.field("guid").is_none())
        );
        assert!(response.results.iter().any(|a| a.field("ip_src_addr").is_some()));
        let facets = response.facet_counts.unwrap();
        assert_eq!(facets["source:type"]["bro"], 2);
        assert_eq!(facets["source:type"]["yaf"], 1);
    }

    #[tokio::test]
    async fn bad_queries_are_rejected() {
        let request = SearchRequest {
            query: "(bro".to_string(),
            ..SearchRequest::default()
        };
        let err = fixture().search(&request).await.unwrap_err();
        assert!(matches!(err, BackendError::Query(_)));
    }

    #[tokio::test]
    async fn groups_order_by_count_then_key_and_sum_scores() {
        let backend = fixture();
        let mut query = QueryBuilder::new();
        query.set_group_by(vec!["source:type".to_string(), "ip_src_addr".to_string()]);

        let response = backend.groups(&query.group_request()).await.unwrap();

        assert_eq!(response.grouped_by, "source:type");
        let keys: Vec<&str> = response.group_results.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["bro", "snort", "yaf"]);

        let bro = &response.group_results[0];
        assert_eq!(bro.total, 2);
        assert_eq!(bro.score, Some(40.0));
        assert_eq!(bro.grouped_by.as_deref(), Some("ip_src_addr"));
        assert_eq!(bro.children().len(), 2);
        assert!(bro.children()[0].is_leaf());
        assert_eq!(response.group_results[2].score, Some(0.0));
    }

    #[tokio::test]
    async fn no_groups_gives_an_empty_response() {
        let response = fixture().groups(&QueryBuilder::new().group_request()).await.unwrap();
        assert!(response.group_results.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_returned() {
        let backend = fixture();
        backend.set_failure(Some(BackendError::Transport("down".to_string())));

        assert!(backend.search(&SearchRequest::default()).await.is_err());
        assert!(backend.groups(&QueryBuilder::new().group_request()).await.is_err());

        backend.set_failure(None);
        assert!(backend.search(&SearchRequest::default()).await.is_ok());
        assert_eq!(backend.search_count(), 2);
        assert_eq!(backend.group_count(), 1);
    }

    #[tokio::test]
    async fn status_updates_are_stored() {
        let backend = fixture();
        let targets: Vec<Alert> = backend.alerts().into_iter().take(2).collect();

        backend
            .update_alert_state(&targets, AlertStatus::Escalate, Some("wf-1"))
            .await
            .unwrap();

        let mut query = QueryBuilder::new();
        query.add_or_update_filter("alert_status", "ESCALATE");
        let response = backend.search(&query.search_request()).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.results[0].status, AlertStatus::Escalate);
    }

    #[test]
    fn fixture_accepts_a_response_object() {
        let backend = MemoryBackend::from_json(r#"{"total": 1, "results": [{"id": "x"}]}"#).unwrap();
        assert_eq!(backend.alerts().len(), 1);
        assert!(MemoryBackend::from_json("{").is_err());
    }
}
