//! The triage alert console.
//!
//! [`AlertConsole`] takes the analyst's actions (filtering, sorting, paging, grouping,
//! expanding groups, pausing, changing alert status) and turns them into requests to a
//! [`SearchBackend`]. Results are shown through a [`ResultView`]: [`FlatResultView`] for a
//! paged table, [`GroupedResultView`] for nested buckets. Everything on screen is kept
//! fresh by a [`Poller`] that repeats each request on an interval.
//!
//! Two backends are provided: [`HttpBackend`] for the search REST service and
//! [`MemoryBackend`], which evaluates queries over alerts held in memory.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use triage_console::{AlertConsole, ConsoleSettings, MemoryBackend, ResultView};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = MemoryBackend::from_json(
//!     r#"[{"id": "1", "source": {"source:type": "bro", "ip_src_addr": "10.0.0.1"}}]"#,
//! )
//! .unwrap();
//! let mut console = AlertConsole::new(Arc::new(backend), ConsoleSettings::default());
//!
//! console.query_mut().set_display_query("ip_src_addr:10.0.0.1");
//! console.search(true, None);
//! console.settle().await;
//!
//! assert_eq!(console.view().alerts().len(), 1);
//! # }
//! ```

#![warn(missing_docs)]

mod backend;
mod console;
mod error;
mod poll;
mod view;

pub use backend::{HttpBackend, MemoryBackend, SearchBackend, bulk_body};
pub use console::{AlertConsole, ConsoleEvent, ConsoleSettings, ConsoleStore};
pub use error::{BackendError, ConsoleError, ErrorPayload, RootCause};
pub use poll::{PollEvent, PollKey, Poller};
pub use view::{
    Fetched, FlatResultView, GroupedResultView, ResultView, RowFormatter, ViewRequest,
    ViewUpdate, column_value, format_value,
};
