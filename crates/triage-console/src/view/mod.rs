//! Result views.
//!
//! A view turns analyst actions into backend requests and backend answers into what is on
//! screen. Views do no I/O: every method returns a [`ViewUpdate`] saying what to fetch,
//! what to stop polling and what went wrong, and the console carries it out. Requests are
//! tagged (a generation for top-level searches, a [`FetchTicket`] for group nodes) so a
//! view can recognize and drop answers that no longer apply.

mod flat;
mod format;
mod grouped;

use triage_query::{
    Alert, GroupRequest, GroupResponse, QueryBuilder, SearchRequest, SearchResponse, SortOrder,
};
use triage_tree::FetchTicket;

use crate::{BackendError, PollKey, SearchBackend};

pub use flat::FlatResultView;
pub use format::{RowFormatter, column_value, format_value};
pub use grouped::GroupedResultView;

/// A backend request issued by a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewRequest {
    /// A flat page of alerts.
    Flat {
        /// Search the request belongs to.
        generation: u64,
        /// The request.
        request: SearchRequest,
    },
    /// The top-level aggregation.
    Groups {
        /// Search the request belongs to.
        generation: u64,
        /// The request.
        request: GroupRequest,
    },
    /// The alerts of one group node.
    Node {
        /// Fetch the request belongs to.
        ticket: FetchTicket,
        /// The request.
        request: SearchRequest,
    },
}

impl ViewRequest {
    /// Key the request is polled under.
    pub fn poll_key(&self) -> PollKey {
        match self {
            Self::Flat { .. } | Self::Groups { .. } => PollKey::TopLevel,
            Self::Node { ticket, .. } => PollKey::Node(ticket.path.clone()),
        }
    }

    /// Sends the request to `backend`.
    pub async fn run<B: SearchBackend + ?Sized>(&self, backend: &B) -> Fetched {
        match self {
            Self::Flat {
                generation,
                request,
            } => Fetched::Flat {
                generation: *generation,
                result: backend.search(request).await,
            },
            Self::Groups {
                generation,
                request,
            } => Fetched::Groups {
                generation: *generation,
                result: backend.groups(request).await,
            },
            Self::Node { ticket, request } => Fetched::Node {
                ticket: ticket.clone(),
                result: backend.search(request).await,
            },
        }
    }
}

/// A backend answer to a [`ViewRequest`].
#[derive(Debug)]
pub enum Fetched {
    /// Answer to [`ViewRequest::Flat`].
    Flat {
        /// Search the request belonged to.
        generation: u64,
        /// What the backend said.
        result: Result<SearchResponse, BackendError>,
    },
    /// Answer to [`ViewRequest::Groups`].
    Groups {
        /// Search the request belonged to.
        generation: u64,
        /// What the backend said.
        result: Result<GroupResponse, BackendError>,
    },
    /// Answer to [`ViewRequest::Node`].
    Node {
        /// Fetch the request belonged to.
        ticket: FetchTicket,
        /// What the backend said.
        result: Result<SearchResponse, BackendError>,
    },
}

/// What the console has to do after a view changed.
#[derive(Debug, Default)]
pub struct ViewUpdate {
    /// Requests to send now and keep polling under their key.
    pub fetch: Vec<ViewRequest>,
    /// Subscriptions to stop.
    pub cancel: Vec<PollKey>,
    /// Message for the analyst when a fetch failed.
    pub error: Option<String>,
    /// Whether the answer was dropped as stale.
    pub discarded: bool,
}

impl ViewUpdate {
    /// An update fetching `request`.
    pub fn fetch(request: ViewRequest) -> Self {
        Self {
            fetch: vec![request],
            ..Self::default()
        }
    }

    /// An update for an answer that no longer applies.
    pub fn discarded() -> Self {
        Self {
            discarded: true,
            ..Self::default()
        }
    }

    /// An update reporting `error` to the analyst.
    pub fn failed(error: &BackendError) -> Self {
        Self {
            error: Some(error.dialog_message()),
            ..Self::default()
        }
    }
}

/// A way of showing search results.
pub trait ResultView {
    /// Runs the current search, from the first page when `reset_pagination` is set.
    /// `page_size` replaces the page size when given.
    fn search(
        &mut self,
        query: &mut QueryBuilder,
        reset_pagination: bool,
        page_size: Option<usize>,
    ) -> ViewUpdate;

    /// Sorts by `field` and searches again from the first page.
    fn on_sort(&mut self, query: &mut QueryBuilder, field: &str, order: SortOrder) -> ViewUpdate {
        query.set_sort(field, order);
        self.search(query, true, None)
    }

    /// Moves to the page starting at `from`.
    fn on_page_change(&mut self, query: &mut QueryBuilder, from: usize) -> ViewUpdate {
        query.set_from_and_size(from, query.size());
        self.search(query, false, None)
    }

    /// Replaces the selection with the alerts whose ids are in `ids`.
    fn selection_change(&mut self, ids: &[String]);

    /// Ids of the selected alerts.
    fn selection(&self) -> &[String];

    /// Takes a backend answer into the view.
    fn apply(&mut self, fetched: Fetched) -> ViewUpdate;

    /// Alerts currently on screen, in display order.
    fn alerts(&self) -> Vec<&Alert>;

    /// Formats alerts into table cells.
    fn formatter(&self) -> &RowFormatter;

    /// Replaces the formatter, as when the column set changes.
    fn set_formatter(&mut self, formatter: RowFormatter);

    /// Selected alerts that are on screen.
    fn selected(&self) -> Vec<&Alert> {
        let ids = self.selection();
        self.alerts()
            .into_iter()
            .filter(|alert| ids.contains(&alert.id))
            .collect()
    }

    /// On-screen alerts as formatted rows.
    fn table(&self) -> Vec<Vec<String>> {
        let formatter = self.formatter();
        self.alerts()
            .into_iter()
            .map(|alert| formatter.row(alert))
            .collect()
    }
}
