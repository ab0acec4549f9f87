//! The backend a CLI invocation talks to.

use std::{fs, path::PathBuf};

use async_trait::async_trait;
use triage_console::{BackendError, HttpBackend, MemoryBackend, SearchBackend};
use triage_query::{
    Alert, AlertStatus, GroupRequest, GroupResponse, SearchRequest, SearchResponse,
};

/// Either the REST service or alerts loaded from a fixture file.
#[derive(Debug)]
pub enum CliBackend {
    /// The search REST service.
    Http(HttpBackend),
    /// Alerts from a JSON file, evaluated in memory.
    Fixture {
        /// File the alerts came from.
        path: PathBuf,
        /// The loaded alerts.
        backend: MemoryBackend,
    },
}

impl CliBackend {
    /// Loads a fixture file.
    pub fn fixture(path: PathBuf) -> Result<Self, String> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read fixture {}: {e}", path.display()))?;
        let backend = MemoryBackend::from_json(&contents)
            .map_err(|e| format!("failed to load fixture {}: {e}", path.display()))?;
        Ok(Self::Fixture { path, backend })
    }

    /// Writes fixture alerts back to their file, so status changes stick.
    ///
    /// Does nothing for the REST service, which stores changes itself.
    pub fn persist(&self) -> Result<(), String> {
        let Self::Fixture { path, backend } = self else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&backend.alerts())
            .map_err(|e| format!("failed to serialize alerts: {e}"))?;
        fs::write(path, json).map_err(|e| format!("failed to write {}: {e}", path.display()))
    }

    /// The backend as a trait object.
    fn inner(&self) -> &dyn SearchBackend {
        match self {
            Self::Http(backend) => backend,
            Self::Fixture { backend, .. } => backend,
        }
    }
}

#[async_trait]
impl SearchBackend for CliBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.inner().search(request).await
    }

    async fn groups(&self, request: &GroupRequest) -> Result<GroupResponse, BackendError> {
        self.inner().groups(request).await
    }

    async fn update_alert_state(
        &self,
        alerts: &[Alert],
        status: AlertStatus,
        workflow_id: Option<&str>,
    ) -> Result<(), BackendError> {
        self.inner()
            .update_alert_state(alerts, status, workflow_id)
            .await
    }
}
