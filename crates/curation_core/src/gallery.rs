//! Public gallery listing: faceted search with infinite scroll and debounced text input.

use std::{
    collections::HashSet,
    sync::{Arc, Weak},
};

use serde::Serialize;
use shared::{
    domain::{CollectionKey, EntityId},
    protocol::{CandidateEntity, GallerySort, GalleryQuery},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info};

use crate::{
    debounce::Debouncer,
    error::{CurationError, SourceKind},
    source::PaginatedSource,
    CurationApi, CurationConfig,
};

const GALLERY_COLLECTION: &str = "gallery";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { accepted: usize },
    /// Nothing left to read, or a page for this listing is already in flight.
    Idle,
    /// The query changed while the page was in flight; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryView {
    pub query: GalleryQuery,
    pub search_input: String,
    pub items: Vec<CandidateEntity>,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
}

struct GalleryState {
    query: GalleryQuery,
    generation: u64,
    items: Vec<CandidateEntity>,
    seen: HashSet<EntityId>,
    source: PaginatedSource,
}

impl GalleryState {
    fn restart(&mut self, query: GalleryQuery) {
        self.query = query;
        self.generation += 1;
        self.items.clear();
        self.seen.clear();
        self.source.reset();
    }
}

pub struct GalleryFeed {
    api: Arc<dyn CurationApi>,
    state: Mutex<GalleryState>,
    search: Debouncer<String>,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl GalleryFeed {
    /// Creates the feed and its search driver task. Must be called inside a tokio runtime.
    pub fn spawn(api: Arc<dyn CurationApi>, config: CurationConfig) -> Arc<Self> {
        let feed = Arc::new(Self {
            api,
            state: Mutex::new(GalleryState {
                query: GalleryQuery::default(),
                generation: 0,
                items: Vec::new(),
                seen: HashSet::new(),
                source: PaginatedSource::new(SourceKind::Gallery, config.page_size),
            }),
            search: Debouncer::new(String::new(), config.search_debounce),
            driver: std::sync::Mutex::new(None),
        });

        let driver = tokio::spawn(drive_search(Arc::downgrade(&feed), feed.search.subscribe()));
        if let Ok(mut slot) = feed.driver.lock() {
            *slot = Some(driver);
        }
        feed
    }

    /// Records a keystroke. Only the debounced value reaches the network.
    pub fn set_search_input(&self, raw: impl Into<String>) {
        self.search.set(raw.into());
    }

    pub fn search_input(&self) -> String {
        self.search.raw()
    }

    pub async fn set_category(&self, category: Option<String>) -> Result<LoadOutcome, CurationError> {
        self.update_query(|query| query.category = category).await
    }

    pub async fn set_tags(&self, tags: Vec<String>) -> Result<LoadOutcome, CurationError> {
        self.update_query(|query| query.tags = tags).await
    }

    pub async fn set_sort(&self, sort: GallerySort) -> Result<LoadOutcome, CurationError> {
        self.update_query(|query| query.sort = sort).await
    }

    pub async fn query(&self) -> GalleryQuery {
        self.state.lock().await.query.clone()
    }

    /// Loads the first page for the current query.
    pub async fn load_initial(&self) -> Result<LoadOutcome, CurationError> {
        {
            let mut state = self.state.lock().await;
            let query = state.query.clone();
            state.restart(query);
        }
        self.load_more().await
    }

    /// Replaces the active query and reloads from the first page. Responses for the
    /// previous query that are still in flight will be discarded.
    pub async fn apply_query(&self, query: GalleryQuery) -> Result<LoadOutcome, CurationError> {
        self.update_query(|current| *current = query).await
    }

    async fn apply_search(&self, search: String) -> Result<LoadOutcome, CurationError> {
        self.update_query(|query| query.search = search).await
    }

    // The edit sees and replaces the query under one lock, so concurrent facet and
    // search changes compose instead of overwriting each other.
    async fn update_query(
        &self,
        edit: impl FnOnce(&mut GalleryQuery),
    ) -> Result<LoadOutcome, CurationError> {
        {
            let mut state = self.state.lock().await;
            let mut query = state.query.clone();
            edit(&mut query);
            if state.query == query && state.generation > 0 {
                return Ok(LoadOutcome::Idle);
            }
            debug!(search = %query.search, category = ?query.category, "gallery query changed");
            state.restart(query);
        }
        self.load_more().await
    }

    /// Fetches the next page of the active query, merging it without duplicate ids.
    pub async fn load_more(&self) -> Result<LoadOutcome, CurationError> {
        let (generation, query, request) = {
            let mut state = self.state.lock().await;
            let Some(request) = state.source.begin() else {
                return Ok(LoadOutcome::Idle);
            };
            (state.generation, state.query.clone(), request)
        };

        let result = self.api.fetch_gallery(&query, request).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(offset = request.offset, "discarding gallery page for a superseded query");
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                state.source.finish(page.items.len(), page.total);
                let mut accepted = 0;
                for item in page.items {
                    if state.seen.insert(item.id.clone()) {
                        state.items.push(item);
                        accepted += 1;
                    }
                }
                info!(
                    offset = request.offset,
                    accepted,
                    total = page.total,
                    "gallery page merged"
                );
                Ok(LoadOutcome::Loaded { accepted })
            }
            Err(err) => {
                let error = CurationError::fetch(
                    &CollectionKey::new(GALLERY_COLLECTION),
                    SourceKind::Gallery,
                    &err,
                );
                state.source.fail(error.to_string());
                Err(error)
            }
        }
    }

    pub async fn view(&self) -> GalleryView {
        let state = self.state.lock().await;
        GalleryView {
            query: state.query.clone(),
            search_input: self.search.raw(),
            items: state.items.clone(),
            has_more: state.source.has_more(),
            loading: state.source.is_loading(),
            error: state.source.last_error().map(str::to_string),
        }
    }
}

impl Drop for GalleryFeed {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.driver.lock() {
            if let Some(driver) = slot.take() {
                driver.abort();
            }
        }
    }
}

async fn drive_search(
    feed: Weak<GalleryFeed>,
    mut effective: tokio::sync::watch::Receiver<String>,
) {
    while effective.changed().await.is_ok() {
        let search = effective.borrow_and_update().clone();
        let Some(feed) = feed.upgrade() else {
            return;
        };
        // Failures are recorded on the feed's source and shown by the view.
        let _ = feed.apply_search(search).await;
    }
}

#[cfg(test)]
#[path = "tests/gallery_tests.rs"]
mod tests;
