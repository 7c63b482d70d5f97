//! The per-catalog search state machine.
//!
//! A [`Catalog`] is a cheap, cloneable handle. Searches run as tokio tasks; each one gets a
//! generation number and a cancellation token, and starting a new search always cancels the
//! previous one first, so at most one request is current per catalog. A response whose
//! generation is no longer current changes nothing.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use common::{search_query::SearchRequest, search_result::CatalogSearchResponse};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    api::CatalogApi,
    config::CatalogConfig,
    detail_fetch::DetailHandle,
    error::{ApiError, SearchFailure},
    events::{CatalogEvent, CatalogSnapshot, changed_fields},
    filter::{Filter, FilterSet},
    handle::TaskHandle,
    result::{DisplayMode, ResultSet, SearchResult},
};

pub type SearchHandle = TaskHandle<SearchOutcome>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Completed { page: u64, result_count: u64 },
    /// Nothing to do, e.g. paging past either end.
    Skipped,
    /// Superseded by a newer search or cancelled explicitly.
    Cancelled,
    Failed(SearchFailure),
}

/// What a catalog did in response to a filter mutation.
#[derive(Debug, Clone)]
pub enum FilterReaction {
    Unchanged,
    /// The filter changed but the query or some filter is invalid, so nothing was searched.
    Ignored,
    Searching(SearchHandle),
    /// The catalog is inactive; it will search when next activated.
    MarkedStale,
}

/// Static description of a data source and the filters it offers.
#[derive(Debug, Clone)]
pub struct CatalogDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub filters: FilterSet,
}

impl CatalogDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), description: String::new(), filters: FilterSet::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters = FilterSet::new(filters);
        self
    }
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

pub(crate) struct CatalogState {
    pub(crate) data: CatalogSnapshot,
    generation: u64,
    in_flight: Option<InFlight>,
    last_search: Option<SearchHandle>,
    pub(crate) detail_fetches: HashMap<String, DetailHandle>,
    pub(crate) detail_ids: u64,
}

impl CatalogState {
    fn cancel_in_flight(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        debug!(catalog = %self.data.id, generation = in_flight.generation, "cancelling search");
        in_flight.token.cancel();
        self.data.loading = false;
        self.data.stale = false;
        true
    }

    /// True while `fetch_id` is the detail fetch registered for `result_id`. Fetches for a
    /// replaced page, or superseded by a newer fetch, must not write back.
    pub(crate) fn owns_detail_fetch(&self, result_id: &str, fetch_id: u64) -> bool {
        self.detail_fetches.get(result_id).is_some_and(|handle| handle.id() == fetch_id)
    }

    fn build_request(&self, page: u64, config: &CatalogConfig) -> SearchRequest {
        let data = &self.data;
        let last_page = config.last_page(data.result_count);
        let (from_date, to_date) = data
            .filters
            .date_range()
            .map(|(from, to)| (from.map(str::to_string), to.map(str::to_string)))
            .unwrap_or_default();
        let options = data.filters.active_option_ids();

        SearchRequest {
            catalog_id: data.id.clone(),
            query: data.query.clone(),
            geometry: data.geometry.clone(),
            from_date,
            to_date,
            page: (page > 1 && page <= last_page).then_some(page),
            options: (!options.is_empty()).then(|| options.join(",")),
        }
    }
}

struct CatalogInner<A> {
    id: String,
    api: Arc<A>,
    config: CatalogConfig,
    state: Mutex<CatalogState>,
    events: broadcast::Sender<CatalogEvent>,
}

pub struct Catalog<A: CatalogApi> {
    inner: Arc<CatalogInner<A>>,
}

impl<A: CatalogApi> Clone for Catalog<A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<A: CatalogApi> Catalog<A> {
    pub fn new(definition: CatalogDefinition, api: Arc<A>, config: CatalogConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let data = CatalogSnapshot {
            results: ResultSet::new(definition.id.clone()),
            id: definition.id.clone(),
            name: definition.name,
            description: definition.description,
            query: String::new(),
            geometry: String::new(),
            loading: false,
            stale: false,
            active: false,
            result_count: 0,
            page: 1,
            error: None,
            filters: definition.filters,
            detail_result: None,
        };
        let state = CatalogState {
            data,
            generation: 0,
            in_flight: None,
            last_search: None,
            detail_fetches: HashMap::new(),
            detail_ids: 0,
        };
        Self {
            inner: Arc::new(CatalogInner {
                id: definition.id,
                api,
                config,
                state: Mutex::new(state),
                events,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    pub(crate) fn api(&self) -> &A {
        &self.inner.api
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` to the state and publishes an event if any observable field changed.
    /// The event is sent after the lock is released.
    pub(crate) fn transition<R>(&self, f: impl FnOnce(&mut CatalogState) -> R) -> R {
        let (output, event) = {
            let mut state = self.lock();
            let before = state.data.clone();
            let output = f(&mut state);
            state.data.detail_result = state.data.results.detail().map(|r| r.id().to_string());

            let changed = changed_fields(&before, &state.data);
            let event = (!changed.is_empty()).then(|| CatalogEvent {
                catalog_id: self.inner.id.clone(),
                changed,
                snapshot: Arc::new(state.data.clone()),
            });
            (output, event)
        };
        if let Some(event) = event {
            // no subscribers is fine
            let _ = self.inner.events.send(event);
        }
        output
    }

    pub(crate) fn update_result(&self, result_id: &str, f: impl FnOnce(&mut SearchResult)) -> bool {
        self.transition(|state| state.data.results.get_mut(result_id).map(f).is_some())
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::new(self.lock().data.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.inner.events.subscribe()
    }

    /// Sets the query and geometry and searches from page 1.
    pub fn search(&self, query: &str, geometry: &str) -> SearchHandle {
        self.transition(|state| {
            state.data.query = query.to_string();
            state.data.geometry = geometry.to_string();
        });
        self.start_search(1)
    }

    /// Searches only if the inputs differ from the last search, the results are stale or the
    /// last search failed. Otherwise returns the last search's handle, pending or resolved.
    pub fn search_if_needed(&self, query: &str, geometry: &str) -> SearchHandle {
        let (needed, last_search) = {
            let state = self.lock();
            let same_search = state.data.query == query && state.data.geometry == geometry;
            (
                !same_search || state.data.stale || state.data.error.is_some(),
                state.last_search.clone(),
            )
        };
        if needed {
            return self.search(query, geometry);
        }
        last_search.unwrap_or_else(|| SearchHandle::ready(0, SearchOutcome::Skipped))
    }

    /// Cancels the in-flight search, if any. Cancellation never records an error.
    pub fn cancel_search(&self) -> bool {
        self.transition(CatalogState::cancel_in_flight)
    }

    /// Starts a search for `page`. The page is only sent when it lies in `(1, last_page]`
    /// for the last known result count; otherwise the server returns the first page.
    ///
    /// Cancelling the previous search, spawning the request and recording its handle happen
    /// under one lock, so the stored handle always belongs to the current search.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_search(&self, page: u64) -> SearchHandle {
        self.transition(|state| {
            state.cancel_in_flight();

            let request = state.build_request(page, &self.inner.config);
            state.generation += 1;
            let generation = state.generation;
            let token = CancellationToken::new();
            state.in_flight = Some(InFlight { generation, token: token.clone() });
            state.data.loading = true;
            state.data.error = None;
            info!(
                catalog = %request.catalog_id,
                query = %request.query,
                page = ?request.page,
                options = ?request.options,
                generation,
                "starting search"
            );

            let catalog = self.clone();
            let task = tokio::spawn(async move {
                let result = catalog.inner.api.search(&request, token).await;
                catalog.finish_search(generation, result)
            });
            let handle = SearchHandle::spawned(generation, task, |_| SearchOutcome::Cancelled);
            state.last_search = Some(handle.clone());
            handle
        })
    }

    fn finish_search(
        &self,
        generation: u64,
        result: Result<Vec<CatalogSearchResponse>, ApiError>,
    ) -> SearchOutcome {
        let config = &self.inner.config;
        self.transition(|state| {
            if state.in_flight.as_ref().map(|f| f.generation) != Some(generation) {
                debug!(catalog = %state.data.id, generation, "dropping superseded search response");
                return SearchOutcome::Cancelled;
            }
            state.in_flight = None;

            let outcome = match result {
                Ok(responses) => match state.data.results.replace_from(&responses) {
                    Some(info) => {
                        let last_page = config.last_page(info.count).max(1);
                        state.data.result_count = info.count;
                        state.data.page = info.page.unwrap_or(1).clamp(1, last_page);
                        state.detail_fetches.clear();
                        info!(catalog = %state.data.id, count = info.count, page = state.data.page, "search completed");
                        SearchOutcome::Completed { page: state.data.page, result_count: info.count }
                    }
                    None => {
                        let failure = SearchFailure::Failed {
                            reason: format!("response has no entry for catalog {}", state.data.id),
                        };
                        warn!(catalog = %state.data.id, "search response is missing this catalog");
                        state.data.error = Some(failure.clone());
                        SearchOutcome::Failed(failure)
                    }
                },
                Err(e) => match SearchFailure::from_api_error(&e) {
                    None => SearchOutcome::Cancelled,
                    Some(failure) => {
                        warn!(catalog = %state.data.id, error = %e, "search failed");
                        state.data.error = Some(failure.clone());
                        SearchOutcome::Failed(failure)
                    }
                },
            };

            state.data.loading = false;
            state.data.stale = false;
            outcome
        })
    }

    pub fn previous_page(&self) -> SearchHandle {
        let page = self.lock().data.page;
        if page > 1 {
            self.start_search(page - 1)
        } else {
            SearchHandle::ready(0, SearchOutcome::Skipped)
        }
    }

    pub fn next_page(&self) -> SearchHandle {
        let (page, last_page) = {
            let state = self.lock();
            (state.data.page, self.inner.config.last_page(state.data.result_count))
        };
        if page < last_page {
            self.start_search(page + 1)
        } else {
            SearchHandle::ready(0, SearchOutcome::Skipped)
        }
    }

    pub fn last_page(&self) -> u64 {
        self.inner.config.last_page(self.lock().data.result_count)
    }

    /// True iff the query is non-empty and every filter validates.
    pub fn is_search_valid(&self) -> bool {
        self.transition(|state| {
            let filters_valid = state.data.filters.validate_all();
            !state.data.query.is_empty() && filters_valid
        })
    }

    pub fn set_active(&self, active: bool) -> bool {
        self.transition(|state| {
            let changed = state.data.active != active;
            state.data.active = active;
            changed
        })
    }

    fn react_to_filters(&self, changed: bool) -> FilterReaction {
        if !changed {
            return FilterReaction::Unchanged;
        }
        if !self.is_search_valid() {
            debug!(catalog = %self.inner.id, "filters changed but search is not valid");
            return FilterReaction::Ignored;
        }
        if self.lock().data.active {
            return FilterReaction::Searching(self.start_search(1));
        }
        self.transition(|state| state.data.stale = true);
        debug!(catalog = %self.inner.id, "filters changed while inactive, marked stale");
        FilterReaction::MarkedStale
    }

    pub fn add_filter(&self, filter: Filter) -> FilterReaction {
        let changed = self.transition(|state| state.data.filters.insert(filter));
        self.react_to_filters(changed)
    }

    pub fn set_filter_active(&self, filter_id: &str, active: bool) -> FilterReaction {
        let changed = self.transition(|state| state.data.filters.set_active(filter_id, active));
        self.react_to_filters(changed)
    }

    pub fn set_date_range(&self, from_date: Option<String>, to_date: Option<String>) -> FilterReaction {
        let changed = self.transition(|state| state.data.filters.set_dates(from_date, to_date));
        self.react_to_filters(changed)
    }

    pub fn reset_filter(&self, filter_id: &str) -> FilterReaction {
        let changed = self.transition(|state| state.data.filters.reset(filter_id));
        self.react_to_filters(changed)
    }

    pub fn reset_filters(&self) -> FilterReaction {
        let changed = self.transition(|state| state.data.filters.reset_all());
        self.react_to_filters(changed)
    }

    pub fn show_detail(&self, result_id: &str) -> bool {
        self.transition(|state| state.data.results.show_detail(result_id))
    }

    pub fn close_detail(&self) -> bool {
        self.transition(|state| state.data.results.close_detail())
    }

    /// Marks a result as highlighted (e.g. hovered) in the list.
    pub fn set_result_active(&self, result_id: &str, active: bool) -> bool {
        self.update_result(result_id, |result| result.active = active)
    }

    pub fn set_display_mode(&self, result_id: &str, mode: DisplayMode) -> bool {
        self.update_result(result_id, |result| result.display_mode = mode)
    }
}

/// All catalogs of a session. Only one is expected to be active at a time.
pub struct CatalogSet<A: CatalogApi> {
    catalogs: Vec<Catalog<A>>,
}

impl<A: CatalogApi> CatalogSet<A> {
    pub fn new(catalogs: impl IntoIterator<Item = Catalog<A>>) -> Self {
        Self { catalogs: catalogs.into_iter().collect() }
    }

    pub fn get(&self, id: &str) -> Option<&Catalog<A>> {
        self.catalogs.iter().find(|c| c.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Catalog<A>> {
        self.catalogs.iter()
    }

    pub fn active_catalog(&self) -> Option<&Catalog<A>> {
        self.catalogs.iter().find(|c| c.lock().data.active)
    }

    /// Makes `id` the only active catalog and searches it if its results are not current.
    pub fn activate(&self, id: &str, query: &str, geometry: &str) -> Option<SearchHandle> {
        let target = self.get(id)?;
        for catalog in self.catalogs.iter().filter(|c| c.id() != id) {
            catalog.set_active(false);
        }
        target.set_active(true);
        Some(target.search_if_needed(query, geometry))
    }
}
