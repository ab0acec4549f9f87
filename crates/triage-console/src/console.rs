//! The alert console: analyst actions in, backend requests out.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use triage_query::{
    AlertStatus, ColumnMetadata, GroupPath, ID_FIELD, QueryBuilder, SortOrder, UID_FIELD,
};
use triage_store::{SaveSearch, SearchStore, Storage};
use triage_tree::DEFAULT_GROUP_PAGE_SIZE;

use crate::{
    ConsoleError, FlatResultView, GroupedResultView, PollEvent, Poller, ResultView, RowFormatter,
    SearchBackend,
    view::{Fetched, ViewUpdate},
};

/// Compiled query of a search with nothing to filter on.
const MATCH_ALL: &str = "*";

/// Search persistence used by the console.
pub type ConsoleStore = SearchStore<Box<dyn Storage + Send>>;

/// Startup settings.
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    /// Time between refreshes.
    pub refresh_interval: Duration,
    /// Whether refreshing starts paused.
    pub paused: bool,
    /// Alerts per page in the flat view.
    pub page_size: usize,
    /// Alerts per page in a group.
    pub group_page_size: usize,
    /// Table columns.
    pub columns: Vec<ColumnMetadata>,
    /// Indices searched; empty keeps the default set.
    pub indices: Vec<String>,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            paused: false,
            page_size: 25,
            group_page_size: DEFAULT_GROUP_PAGE_SIZE,
            columns: Vec::new(),
            indices: Vec::new(),
        }
    }
}

/// Something the console has to react to.
#[derive(Debug)]
pub enum ConsoleEvent {
    /// A poll task delivered a refresh.
    Polled(PollEvent<Fetched>),
    /// A one-off fetch completed.
    Fetched {
        /// Epoch of the view that asked for it.
        view: u64,
        /// The result.
        fetched: Fetched,
    },
}

/// The view in use.
#[derive(Debug)]
enum ActiveView {
    /// Ungrouped results.
    Flat(FlatResultView),
    /// Grouped results.
    Grouped(GroupedResultView),
}

impl ActiveView {
    /// The view as a trait object.
    fn as_view(&self) -> &dyn ResultView {
        match self {
            Self::Flat(view) => view,
            Self::Grouped(view) => view,
        }
    }

    /// The view as a mutable trait object.
    fn as_view_mut(&mut self) -> &mut dyn ResultView {
        match self {
            Self::Flat(view) => view,
            Self::Grouped(view) => view,
        }
    }
}

/// Drives searches for one analyst.
///
/// Every change to the query goes through the console, which asks the active view what to
/// fetch, sends the fetches to the backend in the background and keeps refreshing them.
/// Results come back as [`ConsoleEvent`]s; the owner waits for them with
/// [`next_event`](Self::next_event) and feeds them to [`handle_event`](Self::handle_event),
/// or lets [`settle`](Self::settle) do both until nothing is outstanding.
///
/// Grouping switches between the flat and grouped views. A failed fetch empties the
/// affected results and leaves a message in [`last_error`](Self::last_error).
#[derive(Debug)]
pub struct AlertConsole<B> {
    /// The search service.
    backend: Arc<B>,
    /// The analyst's query.
    query: QueryBuilder,
    /// How results are shown.
    view: ActiveView,
    /// Settings the console was created with.
    settings: ConsoleSettings,
    /// Periodic refreshes.
    poller: Poller<Fetched>,
    /// Refreshes delivered by the poller.
    polled: UnboundedReceiver<PollEvent<Fetched>>,
    /// Where one-off fetches deliver results, stamped with the view epoch.
    fetched_tx: UnboundedSender<(u64, Fetched)>,
    /// One-off fetch results.
    fetched_rx: UnboundedReceiver<(u64, Fetched)>,
    /// Bumped whenever the view is replaced. View generations and tree tickets restart
    /// with each view, so fetches are matched on this first.
    view_epoch: u64,
    /// One-off fetches not yet handled.
    in_flight: usize,
    /// Recent and saved searches.
    store: Option<ConsoleStore>,
    /// Message of the last failure.
    last_error: Option<String>,
}

impl<B: SearchBackend> AlertConsole<B> {
    /// Creates a console showing flat results. Nothing is fetched until the first search.
    pub fn new(backend: Arc<B>, settings: ConsoleSettings) -> Self {
        let (poll_tx, polled) = mpsc::unbounded_channel();
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
        let mut poller = Poller::new(settings.refresh_interval, poll_tx);
        poller.set_paused(settings.paused);

        let mut query = QueryBuilder::new();
        query.set_from_and_size(0, settings.page_size);
        if !settings.indices.is_empty() {
            query.set_indices(settings.indices.clone());
        }
        if !settings.columns.is_empty() {
            let names: Vec<&str> = settings.columns.iter().map(|c| c.name.as_str()).collect();
            query.set_fields(&names);
        }

        Self {
            backend,
            query,
            view: ActiveView::Flat(FlatResultView::new(RowFormatter::new(
                settings.columns.clone(),
            ))),
            settings,
            poller,
            polled,
            fetched_tx,
            fetched_rx,
            view_epoch: 0,
            in_flight: 0,
            store: None,
            last_error: None,
        }
    }

    /// Records recent searches in `store` and makes saved searches available.
    pub fn with_store(mut self, store: ConsoleStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The analyst's query.
    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    /// The query, for changes that should not search right away.
    pub fn query_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }

    /// The active view.
    pub fn view(&self) -> &dyn ResultView {
        self.view.as_view()
    }

    /// The flat view, when results are not grouped.
    pub fn flat(&self) -> Option<&FlatResultView> {
        match &self.view {
            ActiveView::Flat(view) => Some(view),
            ActiveView::Grouped(_) => None,
        }
    }

    /// The grouped view, when results are grouped.
    pub fn grouped(&self) -> Option<&GroupedResultView> {
        match &self.view {
            ActiveView::Grouped(view) => Some(view),
            ActiveView::Flat(_) => None,
        }
    }

    /// The periodic refreshes.
    pub fn poller(&self) -> &Poller<Fetched> {
        &self.poller
    }

    /// The search store, if any.
    pub fn store(&self) -> Option<&ConsoleStore> {
        self.store.as_ref()
    }

    /// Message of the last failure, cleared by the next search.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether refreshing is paused.
    pub fn is_paused(&self) -> bool {
        self.poller.is_paused()
    }

    /// One-off fetches whose results have not been handled yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Adds or replaces one filter per entry and searches from the first page.
    ///
    /// Filtering on the `id` column filters on the backend's unique record id.
    pub fn on_add_filter(&mut self, filters: &BTreeMap<String, String>) {
        for (field, value) in filters {
            let field = if field == ID_FIELD { UID_FIELD } else { field };
            self.query.add_or_update_filter(field, value);
        }
        self.search(true, None);
    }

    /// Removes the filter on `field` and searches from the first page.
    pub fn remove_filter(&mut self, field: &str) {
        self.query.remove_filter(field);
        self.search(true, None);
    }

    /// Sorts by `field` and searches from the first page.
    pub fn on_sort(&mut self, field: &str, order: SortOrder) {
        let update = self.view.as_view_mut().on_sort(&mut self.query, field, order);
        self.apply_update(update);
    }

    /// Shows the page starting at `from`.
    pub fn on_page_change(&mut self, from: usize) {
        let update = self.view.as_view_mut().on_page_change(&mut self.query, from);
        self.apply_update(update);
    }

    /// Groups by `fields`, outermost first; no fields shows flat results.
    pub fn on_groups_change(&mut self, fields: Vec<String>) {
        let grouped = !fields.is_empty();
        self.query.set_group_by(fields);

        let switching = grouped != self.grouped().is_some();
        if switching {
            self.poller.stop_all();
            self.view_epoch += 1;
            let formatter = self.view().formatter().clone();
            self.view = if grouped {
                ActiveView::Grouped(GroupedResultView::new(
                    formatter,
                    self.settings.group_page_size,
                ))
            } else {
                ActiveView::Flat(FlatResultView::new(formatter))
            };
            debug!(grouped, epoch = self.view_epoch, "switched result view");
        }
        self.search(true, None);
    }

    /// Runs the current search and keeps refreshing it.
    ///
    /// `reset_pagination` starts from the first page; `page_size` replaces the page size.
    /// Searches that filter anything are recorded as recent searches.
    pub fn search(&mut self, reset_pagination: bool, page_size: Option<usize>) {
        self.last_error = None;
        self.record_recent();
        let update = self
            .view
            .as_view_mut()
            .search(&mut self.query, reset_pagination, page_size);
        self.apply_update(update);
    }

    /// Pauses or resumes refreshing. Resuming searches again. Returns whether paused.
    pub fn toggle_pause(&mut self) -> bool {
        let paused = !self.poller.is_paused();
        self.poller.set_paused(paused);
        info!(paused, "refresh toggled");
        if !paused {
            self.search(false, None);
        }
        paused
    }

    /// Expands or collapses a group.
    pub fn toggle_group(&mut self, path: &GroupPath) -> Result<(), ConsoleError> {
        let update = self.grouped_mut()?.toggle(path)?;
        self.apply_update(update);
        Ok(())
    }

    /// Shows the page of a leaf group starting at `from`.
    pub fn group_page_change(&mut self, path: &GroupPath, from: usize) -> Result<(), ConsoleError> {
        let update = self.grouped_mut()?.page(path, from)?;
        self.apply_update(update);
        Ok(())
    }

    /// Sorts the alerts of a leaf group.
    pub fn group_sort(
        &mut self,
        path: &GroupPath,
        field: &str,
        order: SortOrder,
    ) -> Result<(), ConsoleError> {
        let update = self.grouped_mut()?.sort(path, field, order)?;
        self.apply_update(update);
        Ok(())
    }

    /// Selects the alerts with the given ids.
    pub fn select(&mut self, ids: &[String]) {
        self.view.as_view_mut().selection_change(ids);
    }

    /// Moves the selected alerts to `status`, then searches again so the change shows.
    ///
    /// Returns how many alerts were updated.
    pub async fn set_status(
        &mut self,
        status: AlertStatus,
        workflow_id: Option<&str>,
    ) -> Result<usize, ConsoleError> {
        let alerts: Vec<_> = self.view().selected().into_iter().cloned().collect();
        if alerts.is_empty() {
            return Err(ConsoleError::NoSelection);
        }

        if let Err(e) = self
            .backend
            .update_alert_state(&alerts, status, workflow_id)
            .await
        {
            self.last_error = Some(e.dialog_message());
            return Err(e.into());
        }
        info!(count = alerts.len(), %status, "alert status updated");

        self.search(false, None);
        Ok(alerts.len())
    }

    /// Waits for the next fetch result or refresh.
    pub async fn next_event(&mut self) -> Option<ConsoleEvent> {
        tokio::select! {
            Some((view, fetched)) = self.fetched_rx.recv() => {
                Some(ConsoleEvent::Fetched { view, fetched })
            }
            Some(polled) = self.polled.recv() => Some(ConsoleEvent::Polled(polled)),
            else => None,
        }
    }

    /// Applies an event to the view. Returns `false` when it was dropped as stale.
    pub fn handle_event(&mut self, event: ConsoleEvent) -> bool {
        let fetched = match event {
            ConsoleEvent::Fetched { view, fetched } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if view != self.view_epoch {
                    debug!(
                        view,
                        current = self.view_epoch,
                        "dropping fetch made for a replaced view"
                    );
                    return false;
                }
                fetched
            }
            ConsoleEvent::Polled(polled) => {
                if !self.poller.is_current(&polled.key, polled.subscription) {
                    debug!(
                        key = ?polled.key,
                        subscription = polled.subscription,
                        "dropping refresh from stopped poll"
                    );
                    return false;
                }
                polled.payload
            }
        };

        let update = self.view.as_view_mut().apply(fetched);
        let applied = !update.discarded;
        self.apply_update(update);
        applied
    }

    /// Handles events until every one-off fetch, including those it triggers, is done.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.handle_event(event);
        }
    }

    /// Saves the current search under `name`.
    pub fn save_search(&mut self, name: &str) -> Result<(), ConsoleError> {
        let mut search = SaveSearch::new(
            name,
            self.query.search_request(),
            self.view().formatter().columns().to_vec(),
        );
        search.touch(Utc::now());
        self.store.as_mut().ok_or(ConsoleError::NoStore)?.save_search(search)?;
        Ok(())
    }

    /// Replaces the query and columns with a saved search and runs it.
    ///
    /// The group-by fields are kept.
    pub fn load_saved_search(&mut self, name: &str) -> Result<(), ConsoleError> {
        let store = self.store.as_mut().ok_or(ConsoleError::NoStore)?;
        let mut saved = store
            .find_saved(name)?
            .ok_or_else(|| ConsoleError::UnknownSearch {
                name: name.to_string(),
            })?;
        saved.touch(Utc::now());
        store.update_search(&saved)?;

        let group_by = self.query.group_by().to_vec();
        self.query = QueryBuilder::from_search_request(saved.search_request);
        self.query.set_group_by(group_by);
        if !saved.table_columns.is_empty() {
            self.view
                .as_view_mut()
                .set_formatter(RowFormatter::new(saved.table_columns));
        }
        self.search(true, None);
        Ok(())
    }

    /// Stops every refresh.
    pub fn shutdown(&mut self) {
        self.poller.stop_all();
        debug!("console shut down");
    }

    /// The grouped view, or an error when results are flat.
    fn grouped_mut(&mut self) -> Result<&mut GroupedResultView, ConsoleError> {
        match &mut self.view {
            ActiveView::Grouped(view) => Ok(view),
            ActiveView::Flat(_) => Err(ConsoleError::NotGrouped),
        }
    }

    /// Stops, fetches and polls what the view asked for.
    fn apply_update(&mut self, update: ViewUpdate) {
        for key in &update.cancel {
            self.poller.stop(key);
        }
        for request in update.fetch {
            self.in_flight += 1;
            let backend = Arc::clone(&self.backend);
            let tx = self.fetched_tx.clone();
            let once = request.clone();
            let view = self.view_epoch;
            tokio::spawn(async move {
                let fetched = once.run(backend.as_ref()).await;
                if tx.send((view, fetched)).is_err() {
                    debug!("console gone before fetch completed");
                }
            });

            let backend = Arc::clone(&self.backend);
            let key = request.poll_key();
            self.poller.start(key, move || {
                let backend = Arc::clone(&backend);
                let request = request.clone();
                async move { request.run(backend.as_ref()).await }
            });
        }
        if let Some(message) = update.error {
            warn!(%message, "search failed");
            self.last_error = Some(message);
        }
    }

    /// Records the current search as recent unless it matches everything.
    fn record_recent(&mut self) {
        let select = self.query.generate_select();
        if select == MATCH_ALL {
            return;
        }
        let columns = self.view().formatter().columns().to_vec();
        let request = self.query.search_request();
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let search = SaveSearch::new(select, request, columns);
        if let Err(e) = store.save_as_recent(search, Utc::now()) {
            warn!(error = %e, "failed to record recent search");
        }
    }
}
