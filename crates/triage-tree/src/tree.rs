//! The grouped result tree and the analyst operations on it.

use tracing::debug;
use triage_query::{
    GroupPath, GroupResponse, ID_FIELD, SearchRequest, SearchResponse, SortField, SortOrder,
    UID_FIELD,
};

use crate::{
    error::TreeError,
    node::{DEFAULT_GROUP_PAGE_SIZE, FetchTicket, GroupNode, NodeState},
    reconcile::{Pass, reconcile_level},
};

/// What a reconciliation pass changed, for whoever runs the fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Leaf fetches to dispatch now.
    pub fetch: Vec<FetchTicket>,
    /// Every leaf that should be polling after this pass.
    pub poll: Vec<GroupPath>,
    /// Paths whose fetches and polls must stop.
    pub cancelled: Vec<GroupPath>,
}

/// Outcome of toggling a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggled {
    /// The node expanded. Leaves that are now on screen come with their first fetch.
    Expanded {
        /// Fetch to dispatch, if the node is a visible leaf.
        fetch: Option<FetchTicket>,
    },
    /// The node collapsed, along with everything beneath it.
    Collapsed {
        /// Paths whose fetches and polls must stop.
        cancelled: Vec<GroupPath>,
    },
}

/// The forest of groups shown in the grouped view, with the analyst's expand state.
#[derive(Debug, Clone)]
pub struct GroupTree {
    /// Group-by fields the forest was built for.
    group_by: Vec<String>,
    /// Top-level groups in backend order.
    roots: Vec<GroupNode>,
    /// Search the leaf requests are derived from, with paging cleared.
    base: SearchRequest,
    /// Page size for newly created nodes.
    page_size: usize,
    /// Last fetch generation handed out.
    generation: u64,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_PAGE_SIZE)
    }
}

impl GroupTree {
    /// Creates an empty tree whose groups page `page_size` alerts at a time.
    pub fn new(page_size: usize) -> Self {
        Self {
            group_by: Vec::new(),
            roots: Vec::new(),
            base: SearchRequest::default(),
            page_size,
            generation: 0,
        }
    }

    /// Group-by fields the current forest was built for.
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Top-level groups.
    pub fn roots(&self) -> &[GroupNode] {
        &self.roots
    }

    /// Whether the tree has no groups.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Merges a fresh aggregation response into the forest.
    ///
    /// `base` is the flat search the leaves derive their requests from. When it changed since
    /// the last pass, every polling leaf is fetched again; otherwise only leaves without a
    /// fetch are. A different group-by list discards the whole forest first.
    pub fn reconcile(
        &mut self,
        group_by: &[String],
        response: &GroupResponse,
        base: &SearchRequest,
    ) -> Reconciliation {
        let mut cancelled = Vec::new();
        if self.group_by != group_by {
            debug!(from = ?self.group_by, to = ?group_by, "group-by changed, rebuilding tree");
            for root in &self.roots {
                root.subscribed_paths(&mut cancelled);
            }
            self.roots.clear();
            self.group_by = group_by.to_vec();
        }

        let field = if response.grouped_by.is_empty() {
            group_by.first().map(String::as_str)
        } else {
            Some(response.grouped_by.as_str())
        };
        let mut pass = Pass {
            group_by,
            page_size: self.page_size,
            cancelled,
        };
        match field {
            Some(field) => reconcile_level(
                &mut self.roots,
                &response.group_results,
                &GroupPath::root(),
                field,
                0,
                &mut pass,
            ),
            None => {
                for root in self.roots.drain(..) {
                    root.subscribed_paths(&mut pass.cancelled);
                }
            }
        }

        let base = normalized(base);
        let base_changed = base != self.base;
        self.base = base;

        let poll = self.pollable_leaves();
        let stale: Vec<GroupPath> = poll
            .iter()
            .filter(|path| base_changed || self.ticket(path).is_none())
            .cloned()
            .collect();
        let fetch = stale
            .iter()
            .filter_map(|path| self.issue_ticket(path))
            .collect();

        Reconciliation {
            fetch,
            poll,
            cancelled: pass.cancelled,
        }
    }

    /// Expands a collapsed node or collapses an expanded one.
    ///
    /// Expanding reveals the direct children. Collapsing hides and collapses every
    /// descendant and drops any cached alerts.
    pub fn toggle(&mut self, path: &GroupPath) -> Result<Toggled, TreeError> {
        let ancestors_open = self.ancestors_open(path);
        let node = self.node_mut(path)?;

        if node.is_expanded() {
            let mut cancelled = Vec::new();
            node.collapse(&mut cancelled);
            return Ok(Toggled::Collapsed { cancelled });
        }

        node.state = NodeState::ExpandedNotFetched;
        if node.level == 0 {
            node.visible = true;
        }
        for child in &mut node.children {
            child.visible = true;
        }
        let wants_fetch = node.is_leaf() && node.visible && ancestors_open;
        let fetch = if wants_fetch {
            self.issue_ticket(path)
        } else {
            None
        };
        Ok(Toggled::Expanded { fetch })
    }

    /// Moves a leaf group to another page.
    ///
    /// Returns the fetch for the new page when the group is on screen.
    pub fn set_page(
        &mut self,
        path: &GroupPath,
        from: usize,
    ) -> Result<Option<FetchTicket>, TreeError> {
        let node = self.leaf_mut(path)?;
        node.paging.from = from;
        Ok(self.refetch(path))
    }

    /// Sorts a leaf group's alerts by one field.
    ///
    /// The logical `id` field sorts on the backend's unique record id.
    pub fn set_sort(
        &mut self,
        path: &GroupPath,
        field: &str,
        order: SortOrder,
    ) -> Result<Option<FetchTicket>, TreeError> {
        let field = if field == ID_FIELD { UID_FIELD } else { field };
        let node = self.leaf_mut(path)?;
        node.sort = Some(vec![SortField::new(field, order)]);
        Ok(self.refetch(path))
    }

    /// Caches a leaf's alerts if `ticket` is still the node's current fetch.
    ///
    /// Returns `false` when the results were discarded as stale.
    pub fn apply_results(&mut self, ticket: &FetchTicket, response: SearchResponse) -> bool {
        let Some(node) = self.current_mut(ticket) else {
            debug!(
                path = %ticket.path,
                generation = ticket.generation,
                "discarding stale group results"
            );
            return false;
        };
        node.paging.total = response.total;
        node.results = Some(response);
        node.state = NodeState::ExpandedPopulated {
            ticket: ticket.clone(),
        };
        true
    }

    /// Clears a leaf's alerts after a failed fetch, if `ticket` is still current.
    pub fn apply_failure(&mut self, ticket: &FetchTicket) -> bool {
        self.apply_results(ticket, SearchResponse::empty())
    }

    /// The request to run for a fetch, or `None` when the ticket is stale.
    pub fn request(&self, ticket: &FetchTicket) -> Option<SearchRequest> {
        self.node(&ticket.path)
            .filter(|node| node.state.ticket() == Some(ticket))
            .map(|node| node.search_request(&self.base))
    }

    /// The current fetch of the node at `path`.
    pub fn ticket(&self, path: &GroupPath) -> Option<&FetchTicket> {
        self.node(path).and_then(|node| node.state.ticket())
    }

    /// Finds a node by path.
    pub fn node(&self, path: &GroupPath) -> Option<&GroupNode> {
        let mut level = &self.roots;
        let mut found = None;
        for segment in path.segments() {
            let node = level.iter().find(|n| n.key == segment.key)?;
            level = &node.children;
            found = Some(node);
        }
        found
    }

    /// Rows on screen, depth first: top-level groups and, beneath every expanded group,
    /// its visible children.
    pub fn rows(&self) -> Vec<&GroupNode> {
        let mut rows = Vec::new();
        let mut stack: Vec<&GroupNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            rows.push(node);
            if node.is_expanded() {
                stack.extend(node.children.iter().rev().filter(|c| c.visible));
            }
        }
        rows
    }

    /// Every node, depth first.
    pub fn nodes(&self) -> Vec<&GroupNode> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.walk(&mut out);
        }
        out
    }

    /// Leaves that are expanded and visible along their whole ancestor chain.
    pub fn pollable_leaves(&self) -> Vec<GroupPath> {
        self.nodes()
            .into_iter()
            .filter(|node| {
                node.is_leaf()
                    && node.is_expanded()
                    && node.visible
                    && self.ancestors_open(&node.path)
            })
            .map(|node| node.path.clone())
            .collect()
    }

    /// Issues fresh tickets for every pollable leaf, as when polling resumes.
    pub fn refetch_all(&mut self) -> Vec<FetchTicket> {
        self.pollable_leaves()
            .iter()
            .filter_map(|path| self.issue_ticket(path))
            .collect()
    }

    /// Drops the whole forest, returning the paths whose fetches must stop.
    pub fn clear(&mut self) -> Vec<GroupPath> {
        let mut cancelled = Vec::new();
        for root in self.roots.drain(..) {
            root.subscribed_paths(&mut cancelled);
        }
        self.group_by.clear();
        cancelled
    }

    /// Finds a node by path for mutation.
    fn node_mut(&mut self, path: &GroupPath) -> Result<&mut GroupNode, TreeError> {
        let unknown = || TreeError::UnknownNode { path: path.clone() };
        let (first, rest) = path.segments().split_first().ok_or_else(unknown)?;
        let mut node = self
            .roots
            .iter_mut()
            .find(|n| n.key == first.key)
            .ok_or_else(unknown)?;
        for segment in rest {
            node = node
                .children
                .iter_mut()
                .find(|n| n.key == segment.key)
                .ok_or_else(unknown)?;
        }
        Ok(node)
    }

    /// Finds a leaf node for mutation.
    fn leaf_mut(&mut self, path: &GroupPath) -> Result<&mut GroupNode, TreeError> {
        let node = self.node_mut(path)?;
        if !node.is_leaf() {
            return Err(TreeError::NotALeaf { path: path.clone() });
        }
        Ok(node)
    }

    /// The node `ticket` belongs to, if the ticket is its current fetch.
    fn current_mut(&mut self, ticket: &FetchTicket) -> Option<&mut GroupNode> {
        self.node_mut(&ticket.path)
            .ok()
            .filter(|node| node.state.ticket() == Some(ticket))
    }

    /// Whether every ancestor of `path` is expanded and visible.
    fn ancestors_open(&self, path: &GroupPath) -> bool {
        let mut ancestor = path.parent();
        while let Some(p) = ancestor {
            if p.is_empty() {
                return true;
            }
            match self.node(&p) {
                Some(node) if node.is_expanded() && node.visible => {}
                _ => return false,
            }
            ancestor = p.parent();
        }
        true
    }

    /// Issues a new fetch for a leaf on screen; other nodes get nothing.
    fn refetch(&mut self, path: &GroupPath) -> Option<FetchTicket> {
        let on_screen = self.ancestors_open(path)
            && self
                .node(path)
                .is_some_and(|node| node.is_expanded() && node.visible);
        if on_screen {
            self.issue_ticket(path)
        } else {
            None
        }
    }

    /// Moves the node to `ExpandedFetching` under a new ticket. Cached alerts stay on
    /// screen until the fetch lands.
    fn issue_ticket(&mut self, path: &GroupPath) -> Option<FetchTicket> {
        self.generation += 1;
        let ticket = FetchTicket {
            path: path.clone(),
            generation: self.generation,
        };
        let node = self.node_mut(path).ok()?;
        node.state = NodeState::ExpandedFetching {
            ticket: ticket.clone(),
        };
        Some(ticket)
    }
}

/// The parts of a search that leaf requests inherit.
fn normalized(base: &SearchRequest) -> SearchRequest {
    SearchRequest {
        from: 0,
        size: 0,
        ..base.clone()
    }
}
