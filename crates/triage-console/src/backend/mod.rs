//! The search service the console talks to.

mod eval;
mod http;
mod memory;

use async_trait::async_trait;
use triage_query::{Alert, AlertStatus, GroupRequest, GroupResponse, SearchRequest, SearchResponse};

use crate::BackendError;

pub use http::{HttpBackend, bulk_body};
pub use memory::MemoryBackend;

/// A search service holding alerts.
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Runs a flat search.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;

    /// Runs a nested aggregation.
    async fn groups(&self, request: &GroupRequest) -> Result<GroupResponse, BackendError>;

    /// Moves `alerts` to `status`, recording `workflow_id` when given.
    async fn update_alert_state(
        &self,
        alerts: &[Alert],
        status: AlertStatus,
        workflow_id: Option<&str>,
    ) -> Result<(), BackendError>;
}
