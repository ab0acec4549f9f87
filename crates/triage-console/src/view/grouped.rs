//! Alerts bucketed by one or more fields.

use std::mem;

use tracing::debug;
use triage_query::{Alert, GroupPath, QueryBuilder, SearchRequest, SortOrder};
use triage_tree::{FetchTicket, GroupTree, Toggled, TreeError};

use super::{Fetched, ResultView, RowFormatter, ViewRequest, ViewUpdate};
use crate::PollKey;

/// The grouped view: a tree of buckets whose expanded leaves show pages of alerts.
///
/// The aggregation is fetched and polled at the top level; each expanded leaf fetches and
/// polls its own page. A top-level answer is reconciled into the tree, so expansion,
/// paging and sorting survive refreshes.
#[derive(Debug)]
pub struct GroupedResultView {
    /// Cell formatting.
    formatter: RowFormatter,
    /// Buckets and their state.
    tree: GroupTree,
    /// Search the shown aggregation belongs to.
    generation: u64,
    /// Group-by fields of the current search.
    group_by: Vec<String>,
    /// Flat search leaf requests derive from.
    base: SearchRequest,
    /// Whether the next aggregation should refetch every open leaf.
    refresh_leaves: bool,
    /// Selected alert ids.
    selection: Vec<String>,
}

impl GroupedResultView {
    /// Creates an empty view whose leaves page `group_page_size` alerts at a time.
    pub fn new(formatter: RowFormatter, group_page_size: usize) -> Self {
        Self {
            formatter,
            tree: GroupTree::new(group_page_size),
            generation: 0,
            group_by: Vec::new(),
            base: SearchRequest::default(),
            refresh_leaves: false,
            selection: Vec::new(),
        }
    }

    /// The bucket tree.
    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    /// Expands or collapses the group at `path`.
    pub fn toggle(&mut self, path: &GroupPath) -> Result<ViewUpdate, TreeError> {
        Ok(match self.tree.toggle(path)? {
            Toggled::Expanded { fetch } => self.fetch_nodes(fetch),
            Toggled::Collapsed { cancelled } => ViewUpdate {
                cancel: cancelled.into_iter().map(PollKey::Node).collect(),
                ..ViewUpdate::default()
            },
        })
    }

    /// Shows the page of a leaf group starting at `from`.
    pub fn page(&mut self, path: &GroupPath, from: usize) -> Result<ViewUpdate, TreeError> {
        let ticket = self.tree.set_page(path, from)?;
        Ok(self.fetch_nodes(ticket))
    }

    /// Sorts the alerts of a leaf group.
    pub fn sort(
        &mut self,
        path: &GroupPath,
        field: &str,
        order: SortOrder,
    ) -> Result<ViewUpdate, TreeError> {
        let ticket = self.tree.set_sort(path, field, order)?;
        Ok(self.fetch_nodes(ticket))
    }

    /// An update fetching each ticket that is still current.
    fn fetch_nodes(&self, tickets: impl IntoIterator<Item = FetchTicket>) -> ViewUpdate {
        let fetch = tickets
            .into_iter()
            .filter_map(|ticket| {
                let request = self.tree.request(&ticket)?;
                Some(ViewRequest::Node { ticket, request })
            })
            .collect();
        ViewUpdate {
            fetch,
            ..ViewUpdate::default()
        }
    }
}

impl ResultView for GroupedResultView {
    /// Fetches the aggregation for the current group-by fields. Group paging lives on the
    /// leaves, so `reset_pagination` and `page_size` only affect the top-level window.
    fn search(
        &mut self,
        query: &mut QueryBuilder,
        reset_pagination: bool,
        page_size: Option<usize>,
    ) -> ViewUpdate {
        let from = if reset_pagination { 0 } else { query.from() };
        query.set_from_and_size(from, page_size.unwrap_or_else(|| query.size()));

        self.group_by = query.group_by().to_vec();
        self.base = query.search_request();
        self.refresh_leaves = true;
        self.generation += 1;
        ViewUpdate::fetch(ViewRequest::Groups {
            generation: self.generation,
            request: query.group_request(),
        })
    }

    fn selection_change(&mut self, ids: &[String]) {
        self.selection = ids.to_vec();
    }

    fn selection(&self) -> &[String] {
        &self.selection
    }

    fn apply(&mut self, fetched: Fetched) -> ViewUpdate {
        match fetched {
            Fetched::Groups { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "dropping stale groups");
                    return ViewUpdate::discarded();
                }
                match result {
                    Ok(response) => {
                        let pass = self.tree.reconcile(&self.group_by, &response, &self.base);
                        let tickets = if mem::take(&mut self.refresh_leaves) {
                            self.tree.refetch_all()
                        } else {
                            pass.fetch
                        };
                        let mut update = self.fetch_nodes(tickets);
                        update.cancel = pass.cancelled.into_iter().map(PollKey::Node).collect();
                        update
                    }
                    Err(e) => {
                        let cancelled = self.tree.clear();
                        self.selection.clear();
                        ViewUpdate {
                            cancel: cancelled.into_iter().map(PollKey::Node).collect(),
                            ..ViewUpdate::failed(&e)
                        }
                    }
                }
            }
            Fetched::Node { ticket, result } => {
                let (applied, update) = match result {
                    Ok(response) => (
                        self.tree.apply_results(&ticket, response),
                        ViewUpdate::default(),
                    ),
                    Err(e) => (self.tree.apply_failure(&ticket), ViewUpdate::failed(&e)),
                };
                if applied {
                    update
                } else {
                    ViewUpdate::discarded()
                }
            }
            Fetched::Flat { .. } => ViewUpdate::discarded(),
        }
    }

    fn alerts(&self) -> Vec<&Alert> {
        self.tree
            .rows()
            .into_iter()
            .filter(|node| node.is_leaf() && node.is_expanded())
            .filter_map(|node| node.results.as_ref())
            .flat_map(|response| &response.results)
            .collect()
    }

    fn formatter(&self) -> &RowFormatter {
        &self.formatter
    }

    fn set_formatter(&mut self, formatter: RowFormatter) {
        self.formatter = formatter;
    }
}
