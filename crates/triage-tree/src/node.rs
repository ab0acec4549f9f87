//! Tree nodes and their per-node fetch state.

use triage_query::{GroupPath, GroupResult, SearchRequest, SearchResponse, SortField};

/// Page size inside a newly expanded group.
pub const DEFAULT_GROUP_PAGE_SIZE: usize = 5;

/// Identity of one fetch of a leaf group's alerts.
///
/// A node holds at most one current ticket. Results carrying any other ticket belong to a
/// fetch the node has since moved past (collapsed, re-paged, replaced) and are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    /// Node the fetch is for.
    pub path: GroupPath,
    /// Tree-wide sequence number; never reused.
    pub generation: u64,
}

/// Expand/fetch state of a node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeState {
    /// Children (or alerts) are hidden.
    #[default]
    Collapsed,
    /// Expanded, with nothing requested yet. Branch nodes stay here while expanded.
    ExpandedNotFetched,
    /// Expanded leaf with a request in flight.
    ExpandedFetching {
        /// The outstanding fetch.
        ticket: FetchTicket,
    },
    /// Expanded leaf showing results.
    ExpandedPopulated {
        /// Fetch the cached results came from; polls keep refreshing under it.
        ticket: FetchTicket,
    },
}

impl NodeState {
    /// The current fetch, if any.
    pub fn ticket(&self) -> Option<&FetchTicket> {
        match self {
            Self::ExpandedFetching { ticket } | Self::ExpandedPopulated { ticket } => Some(ticket),
            Self::Collapsed | Self::ExpandedNotFetched => None,
        }
    }
}

/// Paging window inside a leaf group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Offset of the first alert shown.
    pub from: usize,
    /// Alerts per page.
    pub size: usize,
    /// Total alerts in the group, as of the last fetch.
    pub total: u64,
}

impl Paging {
    /// First page of the given size.
    pub fn with_size(size: usize) -> Self {
        Self {
            from: 0,
            size,
            total: 0,
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self::with_size(DEFAULT_GROUP_PAGE_SIZE)
    }
}

/// One group in the rendered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Bucket key.
    pub key: String,
    /// Alerts in the bucket.
    pub total: u64,
    /// Summed threat score of the bucket.
    pub score: Option<f64>,
    /// Depth; top-level groups are level 0.
    pub level: usize,
    /// Whether the row is shown beneath its expanded parent.
    ///
    /// For top-level rows this follows the expanded state.
    pub visible: bool,
    /// Path from the root, one segment per level.
    pub path: GroupPath,
    /// Paging inside the group.
    pub paging: Paging,
    /// Sort chosen for this group's alerts; `None` follows the search's sort.
    pub sort: Option<Vec<SortField>>,
    /// Expand/fetch state.
    pub state: NodeState,
    /// Alerts from the most recent fetch of a leaf group.
    pub results: Option<SearchResponse>,
    /// Nested groups.
    pub children: Vec<Self>,
    /// Whether the backend reported no nested groups.
    leaf: bool,
}

impl GroupNode {
    /// Builds a fresh, collapsed node (and its subtree) from a backend bucket.
    ///
    /// Only level-1 rows start out visible, so expanding a top-level group reveals them.
    /// Nested buckets are keyed by the field the backend reports, else by `group_by`.
    pub(crate) fn from_result(
        result: &GroupResult,
        path: GroupPath,
        level: usize,
        page_size: usize,
        group_by: &[String],
    ) -> Self {
        let mut node = Self {
            key: result.key.clone(),
            total: result.total,
            score: result.score,
            level,
            visible: level == 1,
            path,
            paging: Paging::with_size(page_size),
            sort: None,
            state: NodeState::Collapsed,
            results: None,
            children: Vec::new(),
            leaf: result.is_leaf(),
        };
        if let Some(field) = child_field(result, level, group_by) {
            node.children = result
                .children()
                .iter()
                .map(|child| {
                    let path = node.path.child(field, &child.key);
                    Self::from_result(child, path, level + 1, page_size, group_by)
                })
                .collect();
        }
        node
    }

    /// Whether the backend reported no nested groups for this bucket.
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Whether the node is expanded.
    pub fn is_expanded(&self) -> bool {
        self.state != NodeState::Collapsed
    }

    /// Whether this node matches an incoming bucket at the same position.
    pub(crate) fn matches(&self, result: &GroupResult, level: usize) -> bool {
        self.key == result.key && self.level == level && self.leaf == result.is_leaf()
    }

    /// Builds the request for this group's alerts.
    ///
    /// `base` is the flat search the analyst has set up; the group scopes its query and
    /// substitutes its own paging and sort.
    pub fn search_request(&self, base: &SearchRequest) -> SearchRequest {
        SearchRequest {
            query: self.path.query_for(&base.query),
            from: self.paging.from,
            size: self.paging.size,
            sort: self.sort.clone().unwrap_or_else(|| base.sort.clone()),
            ..base.clone()
        }
    }

    /// Depth-first walk over this node and its descendants.
    pub(crate) fn walk<'a>(&'a self, out: &mut Vec<&'a Self>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    /// Collapses this node and every descendant, returning the paths whose fetches stop.
    pub(crate) fn collapse(&mut self, cancelled: &mut Vec<GroupPath>) {
        if self.state.ticket().is_some() {
            cancelled.push(self.path.clone());
        }
        self.state = NodeState::Collapsed;
        self.results = None;
        if self.level == 0 {
            self.visible = false;
        }
        for child in &mut self.children {
            child.visible = false;
            child.collapse(cancelled);
        }
    }

    /// Paths under this node (itself included) that have a fetch outstanding or polling.
    pub(crate) fn subscribed_paths(&self, out: &mut Vec<GroupPath>) {
        if self.state.ticket().is_some() {
            out.push(self.path.clone());
        }
        for child in &self.children {
            child.subscribed_paths(out);
        }
    }
}

/// Field the nested buckets of `result` are grouped by.
pub fn child_field<'a>(
    result: &'a GroupResult,
    level: usize,
    group_by: &'a [String],
) -> Option<&'a str> {
    result
        .grouped_by
        .as_deref()
        .or_else(|| group_by.get(level + 1).map(String::as_str))
}
