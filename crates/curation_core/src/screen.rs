//! One curation screen (carousel ordering, featured ordering, ...): the selection store,
//! its two paginated listings, drag handling and the optimistic commit, behind one lock.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{CollectionKey, EntityId},
    protocol::CandidateEntity,
};
use tokio::{
    sync::{broadcast, Mutex},
    time::sleep,
};
use tracing::{debug, info, warn};

use crate::{
    cdn::{ImageUrlResolver, PassthroughResolver},
    commit::{BeginOutcome, CommitCoordinator},
    drag::{Direction, DragController, DragInput, Move},
    error::{CurationError, SourceKind},
    source::PaginatedSource,
    store::{ChangeSet, MergeStats, SelectionStore},
    CurationAccess, CurationApi, CurationConfig,
};

const SAVED_NOTICE: &str = "Changes saved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurationEvent {
    SelectionChanged,
    CommitStarted { changes: usize },
    CommitSucceeded { changes: usize },
    /// The view should scroll to the top so the notice is visible.
    ScrollToTop,
    NoticeDismissed,
    CommitFailed { message: String },
    FetchFailed { source_kind: SourceKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Committed(ChangeSet),
    NothingToSave,
    /// A commit is already in flight; the save control should have been disabled.
    Busy,
    /// Part of the current selection is not loaded yet, so orders for the unloaded tail
    /// are unknown. Load the rest of the selection first.
    SelectionIncomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(MergeStats),
    Idle,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub shown_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRow {
    pub id: EntityId,
    pub title: String,
    pub subtitle: Option<String>,
    pub thumbnail_url: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreenView {
    pub collection: CollectionKey,
    pub editable: bool,
    pub selection: Vec<EntityRow>,
    pub candidates: Vec<EntityRow>,
    pub has_more_selection: bool,
    pub has_more_candidates: bool,
    pub selection_error: Option<String>,
    pub candidates_error: Option<String>,
    pub can_save: bool,
    pub committing: bool,
    pub pending_changes: usize,
    pub notice: Option<Notice>,
    pub alert: Option<String>,
    pub drag_preview: Option<Vec<EntityId>>,
}

struct ScreenState {
    store: SelectionStore,
    drag: DragController,
    commit: CommitCoordinator,
    selection: PaginatedSource,
    candidates: PaginatedSource,
    generation: u64,
    notice: Option<Notice>,
    notice_generation: u64,
    alert: Option<String>,
}

impl ScreenState {
    fn source_mut(&mut self, kind: SourceKind) -> &mut PaginatedSource {
        match kind {
            SourceKind::Selection => &mut self.selection,
            _ => &mut self.candidates,
        }
    }
}

pub struct CurationScreen {
    collection: CollectionKey,
    api: Arc<dyn CurationApi>,
    resolver: Arc<dyn ImageUrlResolver>,
    access: CurationAccess,
    config: CurationConfig,
    state: Mutex<ScreenState>,
    events: broadcast::Sender<CurationEvent>,
}

impl CurationScreen {
    pub fn new(
        collection: CollectionKey,
        api: Arc<dyn CurationApi>,
        access: CurationAccess,
    ) -> Arc<Self> {
        Self::new_with_dependencies(
            collection,
            api,
            Arc::new(PassthroughResolver),
            access,
            CurationConfig::default(),
        )
    }

    pub fn new_with_dependencies(
        collection: CollectionKey,
        api: Arc<dyn CurationApi>,
        resolver: Arc<dyn ImageUrlResolver>,
        access: CurationAccess,
        config: CurationConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            collection,
            api,
            resolver,
            access,
            config,
            state: Mutex::new(ScreenState {
                store: SelectionStore::new(),
                drag: DragController::new(),
                commit: CommitCoordinator::new(),
                selection: PaginatedSource::new(SourceKind::Selection, config.page_size),
                candidates: PaginatedSource::new(SourceKind::Candidates, config.page_size),
                generation: 0,
                notice: None,
                notice_generation: 0,
                alert: None,
            }),
            events,
        })
    }

    pub fn collection(&self) -> &CollectionKey {
        &self.collection
    }

    pub fn access(&self) -> CurationAccess {
        self.access
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CurationEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CurationEvent) {
        // No subscribers is fine; views may poll `view()` instead.
        let _ = self.events.send(event);
    }

    fn ensure_editable(&self) -> Result<(), CurationError> {
        if self.access.can_edit() {
            return Ok(());
        }
        Err(CurationError::Forbidden {
            collection: self.collection.clone(),
            role: self.access.role,
        })
    }

    /// Drops all local state, as when navigating away. In-flight responses are discarded.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.store.clear();
        state.drag = DragController::new();
        state.commit.abandon();
        state.selection.reset();
        state.candidates.reset();
        state.alert = None;
    }

    /// Resets and loads the first page of both the current selection and the candidates.
    pub async fn load_initial(&self) -> Result<(), CurationError> {
        self.reset().await;
        let (selection, candidates) =
            futures::join!(self.load_more_selection(), self.load_more_candidates());
        selection?;
        candidates?;
        Ok(())
    }

    pub async fn load_more_selection(&self) -> Result<LoadOutcome, CurationError> {
        self.load_more(SourceKind::Selection).await
    }

    pub async fn load_more_candidates(&self) -> Result<LoadOutcome, CurationError> {
        self.load_more(SourceKind::Candidates).await
    }

    async fn load_more(&self, kind: SourceKind) -> Result<LoadOutcome, CurationError> {
        let (generation, request) = {
            let mut state = self.state.lock().await;
            let Some(request) = state.source_mut(kind).begin() else {
                return Ok(LoadOutcome::Idle);
            };
            (state.generation, request)
        };

        let result = match kind {
            SourceKind::Selection => {
                self.api
                    .fetch_current_selection(&self.collection, request)
                    .await
            }
            _ => self.api.fetch_candidates(&self.collection, request).await,
        };

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(collection = %self.collection, %kind, "discarding page for a reset screen");
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                state.source_mut(kind).finish(page.items.len(), page.total);
                if let Some(snapshot) = state.commit.snapshot_mut() {
                    merge_page(snapshot, kind, page.items.clone());
                }
                let stats = merge_page(&mut state.store, kind, page.items);
                info!(
                    collection = %self.collection,
                    %kind,
                    offset = request.offset,
                    accepted = stats.accepted,
                    duplicates = stats.duplicates,
                    total = page.total,
                    "page merged"
                );
                drop(state);
                self.emit(CurationEvent::SelectionChanged);
                Ok(LoadOutcome::Loaded(stats))
            }
            Err(err) => {
                let error = CurationError::fetch(&self.collection, kind, &err);
                warn!(collection = %self.collection, %kind, error = %err, "page fetch failed");
                state.source_mut(kind).fail(error.to_string());
                drop(state);
                self.emit(CurationEvent::FetchFailed {
                    source_kind: kind,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Adds a candidate to the end of the selection or returns a selected entity to the
    /// candidates. Unknown ids are ignored.
    pub async fn toggle(&self, id: &EntityId) -> Result<bool, CurationError> {
        self.ensure_editable()?;
        let changed = self.state.lock().await.store.toggle(id);
        if changed {
            self.emit(CurationEvent::SelectionChanged);
        }
        Ok(changed)
    }

    pub async fn move_item(&self, from: usize, to: usize) -> Result<bool, CurationError> {
        self.ensure_editable()?;
        let changed = self.state.lock().await.store.move_item(from, to);
        if changed {
            self.emit(CurationEvent::SelectionChanged);
        }
        Ok(changed)
    }

    /// Feeds one normalized drag input; applies the move when a drag completes.
    pub async fn drag(&self, input: DragInput) -> Result<Option<Move>, CurationError> {
        self.ensure_editable()?;
        let mut state = self.state.lock().await;
        let order = state.store.selection_ids();
        let Some(step) = state.drag.handle(input, &order) else {
            return Ok(None);
        };
        let changed = state.store.move_item(step.from, step.to);
        drop(state);
        if changed {
            self.emit(CurationEvent::SelectionChanged);
        }
        Ok(changed.then_some(step))
    }

    pub async fn keyboard_move(
        &self,
        id: &EntityId,
        direction: Direction,
    ) -> Result<Option<Move>, CurationError> {
        self.ensure_editable()?;
        let mut state = self.state.lock().await;
        let order = state.store.selection_ids();
        let Some(step) = DragController::keyboard_move(id, direction, &order) else {
            return Ok(None);
        };
        state.store.move_item(step.from, step.to);
        drop(state);
        self.emit(CurationEvent::SelectionChanged);
        Ok(Some(step))
    }

    /// Commits the current selection. The saved shape is shown immediately; if the remote
    /// write fails the screen is restored to what it was before the save, keeping any
    /// pages that loaded in the meantime. Refused until the whole selection is loaded.
    pub async fn save(self: &Arc<Self>) -> Result<SaveOutcome, CurationError> {
        self.ensure_editable()?;

        let (generation, changes) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            if !state.commit.is_committing() && state.selection.has_more() {
                debug!(collection = %self.collection, "save refused, selection not fully loaded");
                return Ok(SaveOutcome::SelectionIncomplete);
            }
            match state.commit.begin(&mut state.store) {
                BeginOutcome::Started(changes) => {
                    state.alert = None;
                    (state.generation, changes)
                }
                BeginOutcome::NothingToCommit => return Ok(SaveOutcome::NothingToSave),
                BeginOutcome::Busy => return Ok(SaveOutcome::Busy),
            }
        };
        self.emit(CurationEvent::CommitStarted {
            changes: changes.len(),
        });

        let result = self
            .api
            .commit_selection(&self.collection, changes.entries())
            .await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(collection = %self.collection, "commit finished after the screen was reset");
            return match result {
                Ok(()) => Ok(SaveOutcome::Committed(changes)),
                Err(err) => Err(CurationError::commit(&self.collection, &err)),
            };
        }

        match result {
            Ok(()) => {
                state.commit.succeed();
                state.notice_generation += 1;
                let notice_generation = state.notice_generation;
                state.notice = Some(Notice {
                    message: SAVED_NOTICE.to_string(),
                    shown_at: Utc::now(),
                });
                drop(state);

                info!(collection = %self.collection, changes = changes.len(), "selection saved");
                self.emit(CurationEvent::CommitSucceeded {
                    changes: changes.len(),
                });
                self.emit(CurationEvent::ScrollToTop);
                self.schedule_notice_dismissal(notice_generation);
                Ok(SaveOutcome::Committed(changes))
            }
            Err(err) => {
                {
                    let inner = &mut *state;
                    inner.commit.fail(&mut inner.store);
                }
                let error = CurationError::commit(&self.collection, &err);
                state.alert = Some(error.to_string());
                drop(state);

                self.emit(CurationEvent::CommitFailed {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn schedule_notice_dismissal(self: &Arc<Self>, notice_generation: u64) {
        let screen: Weak<Self> = Arc::downgrade(self);
        let delay = self.config.success_notice;
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(screen) = screen.upgrade() {
                screen.dismiss_notice_if_current(notice_generation).await;
            }
        });
    }

    async fn dismiss_notice_if_current(&self, notice_generation: u64) {
        let mut state = self.state.lock().await;
        if state.notice_generation != notice_generation || state.notice.is_none() {
            return;
        }
        state.notice = None;
        drop(state);
        self.emit(CurationEvent::NoticeDismissed);
    }

    pub async fn dismiss_notice(&self) {
        let mut state = self.state.lock().await;
        if state.notice.take().is_some() {
            drop(state);
            self.emit(CurationEvent::NoticeDismissed);
        }
    }

    pub async fn dismiss_alert(&self) {
        self.state.lock().await.alert = None;
    }

    pub async fn view(&self) -> ScreenView {
        let state = self.state.lock().await;
        let saved = state.store.saved_snapshot();
        let pending_changes = state.store.diff(&saved).len();
        let order = state.store.selection_ids();

        ScreenView {
            collection: self.collection.clone(),
            editable: self.access.can_edit(),
            selection: state
                .store
                .selection()
                .iter()
                .enumerate()
                .map(|(index, entity)| self.row(entity, Some(index as u32)))
                .collect(),
            candidates: state
                .store
                .pool()
                .iter()
                .map(|entity| self.row(entity, None))
                .collect(),
            has_more_selection: state.selection.has_more(),
            has_more_candidates: state.candidates.has_more(),
            selection_error: state.selection.last_error().map(str::to_string),
            candidates_error: state.candidates.last_error().map(str::to_string),
            can_save: self.access.can_edit()
                && !state.commit.is_committing()
                && !state.selection.has_more()
                && pending_changes > 0,
            committing: state.commit.is_committing(),
            pending_changes,
            notice: state.notice.clone(),
            alert: state.alert.clone(),
            drag_preview: state.drag.preview(&order),
        }
    }

    fn row(&self, entity: &CandidateEntity, order: Option<u32>) -> EntityRow {
        EntityRow {
            id: entity.id.clone(),
            title: entity.title.clone(),
            subtitle: entity.subtitle.clone(),
            thumbnail_url: entity
                .thumbnail
                .as_ref()
                .map(|image| self.resolver.resolve(image)),
            order,
        }
    }

    /// Current selection and candidates, for callers that need the raw entities.
    pub async fn store_snapshot(&self) -> SelectionStore {
        self.state.lock().await.store.clone()
    }
}

fn merge_page(
    store: &mut SelectionStore,
    kind: SourceKind,
    items: Vec<CandidateEntity>,
) -> MergeStats {
    match kind {
        SourceKind::Selection => store.merge_selection_page(items),
        _ => store.merge_candidate_page(items),
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
