//! The REST search service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};
use triage_query::{
    Alert, AlertStatus, GroupRequest, GroupResponse, SearchRequest, SearchResponse,
};

use super::SearchBackend;
use crate::BackendError;

/// Path of the flat search endpoint.
const SEARCH_PATH: &str = "/api/v1/search/search";

/// Path of the aggregation endpoint.
const GROUP_PATH: &str = "/api/v1/search/group";

/// Path of the bulk update endpoint.
const BULK_PATH: &str = "/_bulk";

/// Talks to the search REST API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// Shared connection pool.
    client: Client,
    /// Service root without a trailing slash.
    base_url: String,
}

/// The part of a bulk response we check.
#[derive(Deserialize)]
struct BulkSummary {
    /// Whether any item failed.
    #[serde(default)]
    errors: bool,
}

impl HttpBackend {
    /// Creates a backend for the service at `base_url`. Every request gives up after
    /// `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Service root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs `body` as JSON and decodes the JSON reply.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "dispatching backend request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .inspect_err(|error| error!(?error, %url, "backend request failed"))?;

        Ok(checked(response).await?.json().await?)
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.post_json(SEARCH_PATH, request).await
    }

    async fn groups(&self, request: &GroupRequest) -> Result<GroupResponse, BackendError> {
        self.post_json(GROUP_PATH, request).await
    }

    async fn update_alert_state(
        &self,
        alerts: &[Alert],
        status: AlertStatus,
        workflow_id: Option<&str>,
    ) -> Result<(), BackendError> {
        if alerts.is_empty() {
            return Ok(());
        }
        let url = format!("{}{BULK_PATH}", self.base_url);
        debug!(%url, count = alerts.len(), %status, "updating alert status");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(alerts, status, workflow_id))
            .send()
            .await
            .inspect_err(|error| error!(?error, %url, "bulk update failed"))?;
        let response = checked(response).await?;

        let status_code = response.status().as_u16();
        let body = response.text().await?;
        let summary: BulkSummary =
            serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))?;
        if summary.errors {
            warn!("bulk update reported failed items");
            return Err(BackendError::Status {
                status: status_code,
                body,
            });
        }
        Ok(())
    }
}

/// Passes successful responses through and turns the rest into errors.
async fn checked(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "backend returned an error");
    Err(BackendError::from_status(status.as_u16(), body))
}

/// Builds the NDJSON bulk body moving `alerts` to `status`.
///
/// Each alert contributes an `update` action line addressed by sensor type and guid,
/// followed by a partial document line.
pub fn bulk_body(alerts: &[Alert], status: AlertStatus, workflow_id: Option<&str>) -> String {
    let mut doc = Map::new();
    doc.insert("alert_status".to_string(), json!(status.as_str()));
    if let Some(id) = workflow_id {
        doc.insert("workflow_id".to_string(), json!(id));
    }
    let doc = json!({ "doc": Value::Object(doc) }).to_string();

    let mut body = String::new();
    for alert in alerts {
        let action = json!({
            "update": { "sensorType": alert.sensor_type(), "guid": alert.guid() }
        });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&doc);
        body.push('\n');
    }
    body
}
