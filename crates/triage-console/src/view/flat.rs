//! The paged table of alerts.

use tracing::debug;
use triage_query::{Alert, QueryBuilder, SearchResponse};

use super::{Fetched, ResultView, RowFormatter, ViewRequest, ViewUpdate};

/// One page of alerts matching the search.
#[derive(Debug, Default)]
pub struct FlatResultView {
    /// Cell formatting.
    formatter: RowFormatter,
    /// Search the shown page belongs to.
    generation: u64,
    /// The shown page.
    response: SearchResponse,
    /// Selected alert ids.
    selection: Vec<String>,
}

impl FlatResultView {
    /// Creates an empty view.
    pub fn new(formatter: RowFormatter) -> Self {
        Self {
            formatter,
            ..Self::default()
        }
    }

    /// The shown page and total.
    pub fn response(&self) -> &SearchResponse {
        &self.response
    }
}

impl ResultView for FlatResultView {
    fn search(
        &mut self,
        query: &mut QueryBuilder,
        reset_pagination: bool,
        page_size: Option<usize>,
    ) -> ViewUpdate {
        let from = if reset_pagination { 0 } else { query.from() };
        query.set_from_and_size(from, page_size.unwrap_or_else(|| query.size()));

        self.generation += 1;
        ViewUpdate::fetch(ViewRequest::Flat {
            generation: self.generation,
            request: query.search_request(),
        })
    }

    fn selection_change(&mut self, ids: &[String]) {
        self.selection = ids.to_vec();
    }

    fn selection(&self) -> &[String] {
        &self.selection
    }

    fn apply(&mut self, fetched: Fetched) -> ViewUpdate {
        let Fetched::Flat { generation, result } = fetched else {
            return ViewUpdate::discarded();
        };
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale page");
            return ViewUpdate::discarded();
        }
        match result {
            Ok(response) => {
                self.response = response;
                let shown = &self.response.results;
                self.selection.retain(|id| shown.iter().any(|a| &a.id == id));
                ViewUpdate::default()
            }
            Err(e) => {
                self.response = SearchResponse::empty();
                self.selection.clear();
                ViewUpdate::failed(&e)
            }
        }
    }

    fn alerts(&self) -> Vec<&Alert> {
        self.response.results.iter().collect()
    }

    fn formatter(&self) -> &RowFormatter {
        &self.formatter
    }

    fn set_formatter(&mut self, formatter: RowFormatter) {
        self.formatter = formatter;
    }
}
