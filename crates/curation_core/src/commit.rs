//! Optimistic commit state machine: snapshot, apply, then confirm or roll back.

use tracing::{debug, info, warn};

use crate::store::{ChangeSet, SelectionStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitPhase {
    #[default]
    Clean,
    Committing,
}

/// State captured right before the optimistic apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    pub snapshot: SelectionStore,
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    Started(ChangeSet),
    NothingToCommit,
    Busy,
}

#[derive(Debug, Clone, Default)]
pub struct CommitCoordinator {
    phase: CommitPhase,
    pending: Option<PendingCommit>,
}

impl CommitCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CommitPhase {
        self.phase
    }

    pub fn is_committing(&self) -> bool {
        self.phase == CommitPhase::Committing
    }

    pub fn pending(&self) -> Option<&PendingCommit> {
        self.pending.as_ref()
    }

    /// Save is available only while no commit is in flight and the store has edits.
    pub fn can_save(&self, store: &SelectionStore) -> bool {
        !self.is_committing() && store.is_dirty(&store.saved_snapshot())
    }

    /// Snapshots `store`, computes the change set and applies the saved shape optimistically.
    pub fn begin(&mut self, store: &mut SelectionStore) -> BeginOutcome {
        if self.is_committing() {
            debug!("save ignored while a commit is in flight");
            return BeginOutcome::Busy;
        }

        let changes = store.diff(&store.saved_snapshot());
        if changes.is_empty() {
            return BeginOutcome::NothingToCommit;
        }

        self.pending = Some(PendingCommit {
            snapshot: store.clone(),
            changes: changes.clone(),
        });
        store.apply_saved_shape();
        self.phase = CommitPhase::Committing;
        info!(changes = changes.len(), "commit started");
        BeginOutcome::Started(changes)
    }

    /// The rollback target of the in-flight commit. Pages that arrive while committing are
    /// merged here as well, so a rollback keeps them.
    pub fn snapshot_mut(&mut self) -> Option<&mut SelectionStore> {
        self.pending.as_mut().map(|pending| &mut pending.snapshot)
    }

    /// The remote write was accepted; the optimistic shape stands.
    pub fn succeed(&mut self) -> Option<PendingCommit> {
        self.phase = CommitPhase::Clean;
        let pending = self.pending.take();
        if let Some(pending) = &pending {
            info!(changes = pending.changes.len(), "commit confirmed");
        }
        pending
    }

    /// The remote write failed; restores `store` to the pre-commit snapshot in full.
    pub fn fail(&mut self, store: &mut SelectionStore) -> bool {
        self.phase = CommitPhase::Clean;
        match self.pending.take() {
            Some(pending) => {
                warn!(changes = pending.changes.len(), "commit failed, rolling back");
                *store = pending.snapshot;
                true
            }
            None => false,
        }
    }

    /// Drops any in-flight bookkeeping without touching a store, e.g. on navigation.
    pub fn abandon(&mut self) {
        self.phase = CommitPhase::Clean;
        self.pending = None;
    }
}
