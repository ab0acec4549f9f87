//! Grouped result tree for triage.
//!
//! The grouped view shows alerts bucketed by one or more fields, nested in the order the
//! fields were chosen. The analyst expands and collapses buckets, pages through the alerts
//! of a leaf bucket and sorts them, while the buckets themselves are refreshed by polling.
//!
//! [`GroupTree`] owns that state. Each refresh of the aggregation goes through
//! [`GroupTree::reconcile`], which matches the new buckets to the existing nodes by
//! position and keeps everything the analyst did to nodes that are still there.
//!
//! Leaf fetches are identified by a [`FetchTicket`]. A node accepts results only for its
//! current ticket, so responses that arrive after a collapse, a page change or a rebuild
//! are dropped instead of overwriting newer state.
//!
//! # Example
//!
//! ```
//! use triage_query::{GroupPath, GroupResponse, GroupResult, SearchRequest};
//! use triage_tree::{GroupTree, Toggled};
//!
//! let group_by = vec!["source:type".to_string()];
//! let response = GroupResponse {
//!     grouped_by: "source:type".to_string(),
//!     group_results: vec![GroupResult::leaf("bro", 12)],
//! };
//!
//! let mut tree = GroupTree::default();
//! tree.reconcile(&group_by, &response, &SearchRequest::default());
//!
//! let bro = GroupPath::root().child("source:type", "bro");
//! let Ok(Toggled::Expanded { fetch: Some(ticket) }) = tree.toggle(&bro) else {
//!     panic!("leaf should fetch on expand");
//! };
//! assert_eq!(tree.request(&ticket).unwrap().query, "source\\:type:bro");
//! ```

#![warn(missing_docs)]

mod error;
mod node;
mod reconcile;
mod tree;

pub use error::TreeError;
pub use node::{DEFAULT_GROUP_PAGE_SIZE, FetchTicket, GroupNode, NodeState, Paging};
pub use tree::{GroupTree, Reconciliation, Toggled};
