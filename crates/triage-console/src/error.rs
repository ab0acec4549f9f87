//! Error types for the triage-console crate.

use serde::Deserialize;
use thiserror::Error;
use triage_query::QueryError;
use triage_store::StoreError;
use triage_tree::TreeError;

/// Structured error body returned by the search backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ErrorPayload {
    /// Top-level reason.
    #[serde(default, alias = "message")]
    pub reason: String,
    /// Per-index causes.
    #[serde(default)]
    pub root_cause: Vec<RootCause>,
}

/// One index-level cause of a backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RootCause {
    /// Index the failure happened in.
    #[serde(default)]
    pub index: String,
    /// What went wrong there.
    #[serde(default)]
    pub reason: String,
}

/// The `{"error": {...}}` envelope search engines wrap payloads in.
#[derive(Deserialize)]
struct Envelope {
    /// The wrapped payload.
    error: ErrorPayload,
}

impl ErrorPayload {
    /// Parses an error body, with or without the `error` envelope.
    ///
    /// Returns `None` when the body carries no reason.
    pub fn from_body(body: &str) -> Option<Self> {
        let payload = serde_json::from_str::<Envelope>(body)
            .map(|envelope| envelope.error)
            .or_else(|_| serde_json::from_str::<Self>(body))
            .ok()?;
        (!payload.reason.is_empty()).then_some(payload)
    }

    /// The reason followed by one `index: reason` line per root cause.
    pub fn message(&self) -> String {
        let mut message = self.reason.clone();
        for cause in &self.root_cause {
            message.push('\n');
            message.push_str(&cause.index);
            message.push_str(": ");
            message.push_str(&cause.reason);
        }
        message
    }
}

/// Errors from a search backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend refused the request and said why.
    #[error("search backend rejected the request ({status}): {}", payload.reason)]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Parsed error body.
        payload: ErrorPayload,
    },

    /// The backend failed without a structured body.
    #[error("search backend returned {status}: {body}")]
    Status {
        /// HTTP status.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The backend could not be reached.
    #[error("failed to reach search backend: {0}")]
    Transport(String),

    /// The response was not what we expected.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// The query could not be evaluated.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl BackendError {
    /// Classifies an unsuccessful response by its body.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match ErrorPayload::from_body(&body) {
            Some(payload) => Self::Rejected { status, payload },
            None => Self::Status { status, body },
        }
    }

    /// Text to show the analyst for this failure.
    pub fn dialog_message(&self) -> String {
        match self {
            Self::Rejected { payload, .. } => payload.message(),
            Self::Query(e) => format!("query syntax error: {}", e.message()),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Errors from console operations.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Reading or writing stored searches failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A group operation named a node that cannot take it.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A status change was requested with nothing selected.
    #[error("no alerts are selected")]
    NoSelection,

    /// A group operation was requested while results are flat.
    #[error("results are not grouped")]
    NotGrouped,

    /// A stored search operation was requested without a store.
    #[error("no search store is configured")]
    NoStore,

    /// No saved search has the requested name.
    #[error("no saved search named {name:?}")]
    UnknownSearch {
        /// Requested name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_message_lists_root_causes() {
        let body = r#"{
            "error": {
                "root_cause": [
                    {"type": "query_shard_exception", "reason": "Failed to parse query", "index": "bro_index"},
                    {"type": "query_shard_exception", "reason": "Failed to parse query", "index": "snort_index"}
                ],
                "type": "search_phase_execution_exception",
                "reason": "all shards failed"
            },
            "status": 400
        }"#;

        let err = BackendError::from_status(400, body.to_string());

        assert_eq!(
            err.dialog_message(),
            "all shards failed\nbro_index: Failed to parse query\nsnort_index: Failed to parse query"
        );
    }

    #[test]
    fn bare_payload_with_message() {
        let err = BackendError::from_status(500, r#"{"message":"boom"}"#.to_string());
        assert!(matches!(err, BackendError::Rejected { status: 500, .. }));
        assert_eq!(err.dialog_message(), "boom");
    }

    #[test]
    fn unstructured_body_falls_back_to_status_text() {
        let err = BackendError::from_status(502, "Bad Gateway".to_string());
        assert_eq!(
            err.dialog_message(),
            "search backend returned 502: Bad Gateway"
        );
    }

    #[test]
    fn transport_failures_render_as_is() {
        let err = BackendError::Transport("connection refused".to_string());
        assert_eq!(
            err.dialog_message(),
            "failed to reach search backend: connection refused"
        );
    }

    #[test]
    fn query_errors_use_the_short_message() {
        let err = BackendError::from(triage_query::parse("(a").unwrap_err());
        assert!(err.dialog_message().starts_with("query syntax error: "));
        assert!(!err.dialog_message().contains('\n'));
    }
}
