//! Error types for the triage-tree crate.

use thiserror::Error;
use triage_query::GroupPath;

/// Errors from operations addressed to a single tree node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No node exists at the path.
    #[error("no group at {path}")]
    UnknownNode {
        /// Path that was looked up.
        path: GroupPath,
    },

    /// The operation needs a leaf group but the node has nested groups.
    #[error("group {path} has nested groups and holds no alerts of its own")]
    NotALeaf {
        /// Path of the branch node.
        path: GroupPath,
    },
}
