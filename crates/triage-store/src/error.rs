//! Error types for the triage-store crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors from reading or writing stored searches.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write a storage file.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Failed to encode searches as JSON.
    #[error("failed to encode searches: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates an `Io` error for a path.
    pub(crate) fn io(path: PathBuf, source: io::Error) -> Self {
        Self::Io { path, source }
    }
}
