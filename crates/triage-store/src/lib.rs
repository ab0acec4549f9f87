//! Saved and recent search persistence for triage.
//!
//! Two lists of [`SaveSearch`] records are kept, each as a JSON array under a fixed key:
//! recent searches ([`RECENT_SEARCHES_KEY`]), a bounded most-recently-used list the console
//! appends to on every search, and saved searches ([`SAVED_SEARCHES_KEY`]), which the
//! analyst names and manages.
//!
//! [`SearchStore`] implements the list semantics over any [`Storage`]. [`FileStorage`]
//! keeps one `<key>.json` file per list in a directory; [`MemoryStorage`] keeps them in
//! process. Stored data that cannot be parsed is logged and read as an empty list.

#![warn(missing_docs)]

mod error;
mod search;
mod storage;
mod store;

pub use error::StoreError;
pub use search::SaveSearch;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{DEFAULT_RECENT_LIMIT, RECENT_SEARCHES_KEY, SAVED_SEARCHES_KEY, SearchStore};
