//! Client-owned ordered selection plus the candidate pool it is drawn from.

use std::collections::{HashMap, HashSet};

use shared::{
    domain::{EntityId, Membership},
    protocol::{CandidateEntity, ChangeEntry},
};
use tracing::debug;

/// Server-known membership of every entity, captured before an edit is committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedSnapshot {
    memberships: HashMap<EntityId, Membership>,
}

impl SavedSnapshot {
    pub fn membership(&self, id: &EntityId) -> Membership {
        self.memberships.get(id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }
}

/// Per-entity membership/order differences that a commit must write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ChangeEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&ChangeEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub already_selected: usize,
}

/// Two disjoint partitions over one universe of entities: the ordered selection and the
/// candidate pool. An entity lives in exactly one of them once seen.
///
/// The selection's index is its order; `Membership::order` on an entity only records what
/// the server last confirmed and is never read back to position anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStore {
    selection: Vec<CandidateEntity>,
    pool: Vec<CandidateEntity>,
    arrival: HashMap<EntityId, u64>,
    next_arrival: u64,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &[CandidateEntity] {
        &self.selection
    }

    pub fn pool(&self) -> &[CandidateEntity] {
        &self.pool
    }

    pub fn selection_ids(&self) -> Vec<EntityId> {
        self.selection.iter().map(|entity| entity.id.clone()).collect()
    }

    pub fn pool_ids(&self) -> Vec<EntityId> {
        self.pool.iter().map(|entity| entity.id.clone()).collect()
    }

    pub fn is_selected(&self, id: &EntityId) -> bool {
        self.selection_index(id).is_some()
    }

    pub fn selection_index(&self, id: &EntityId) -> Option<usize> {
        self.selection.iter().position(|entity| &entity.id == id)
    }

    pub fn knows(&self, id: &EntityId) -> bool {
        self.arrival.contains_key(id)
    }

    /// Appends a page of the current selection in server order, dropping ids already seen.
    pub fn merge_selection_page(&mut self, items: Vec<CandidateEntity>) -> MergeStats {
        let mut stats = MergeStats::default();
        for entity in items {
            if !self.register(&entity.id) {
                stats.duplicates += 1;
                continue;
            }
            self.selection.push(entity);
            stats.accepted += 1;
        }
        stats
    }

    /// Appends a page of candidates, dropping ids already seen. Rows the server reports as
    /// members belong to the selection listing and are left for it to deliver.
    pub fn merge_candidate_page(&mut self, items: Vec<CandidateEntity>) -> MergeStats {
        let mut stats = MergeStats::default();
        for entity in items {
            if self.knows(&entity.id) {
                stats.duplicates += 1;
                continue;
            }
            if entity.membership.selected {
                stats.already_selected += 1;
                continue;
            }
            self.register(&entity.id);
            self.pool.push(entity);
            stats.accepted += 1;
        }
        stats
    }

    fn register(&mut self, id: &EntityId) -> bool {
        if self.arrival.contains_key(id) {
            return false;
        }
        self.arrival.insert(id.clone(), self.next_arrival);
        self.next_arrival += 1;
        true
    }

    /// Moves `id` across the partition boundary. Returns false when `id` is unknown.
    pub fn toggle(&mut self, id: &EntityId) -> bool {
        if let Some(index) = self.selection_index(id) {
            let entity = self.selection.remove(index);
            self.return_to_pool(entity);
            return true;
        }

        if let Some(index) = self.pool.iter().position(|entity| &entity.id == id) {
            let entity = self.pool.remove(index);
            self.selection.push(entity);
            return true;
        }

        debug!(id = %id, "toggle ignored for unknown entity");
        false
    }

    // The pool stays in arrival order so a deselected entity returns to its original slot.
    fn return_to_pool(&mut self, entity: CandidateEntity) {
        let rank = self.arrival.get(&entity.id).copied().unwrap_or(u64::MAX);
        let slot = self.pool.partition_point(|other| {
            self.arrival.get(&other.id).copied().unwrap_or(u64::MAX) < rank
        });
        self.pool.insert(slot, entity);
    }

    /// Removes the element at `from` and reinserts it at `to`. Returns false for a
    /// no-op or out-of-range indices.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.selection.len();
        if from >= len || to >= len {
            debug!(from, to, len, "move ignored for out-of-range index");
            return false;
        }
        if from == to {
            return false;
        }
        let entity = self.selection.remove(from);
        self.selection.insert(to, entity);
        true
    }

    /// Membership each entity would have if the current shape were saved.
    pub fn current_membership(&self, id: &EntityId) -> Membership {
        match self.selection_index(id) {
            Some(index) => Membership::at(index as u32),
            None => Membership::none(),
        }
    }

    pub fn saved_snapshot(&self) -> SavedSnapshot {
        let memberships = self
            .selection
            .iter()
            .chain(self.pool.iter())
            .map(|entity| (entity.id.clone(), entity.membership))
            .collect();
        SavedSnapshot { memberships }
    }

    /// Minimal change set against `saved`: one entry per entity whose membership or order
    /// differs, selection first in display order, then the pool, then ids only `saved` knows.
    pub fn diff(&self, saved: &SavedSnapshot) -> ChangeSet {
        let mut entries = Vec::new();
        let mut visited = HashSet::new();

        for (index, entity) in self.selection.iter().enumerate() {
            visited.insert(&entity.id);
            let current = Membership::at(index as u32);
            if !same_membership(saved.membership(&entity.id), current) {
                entries.push(change_entry(&entity.id, current));
            }
        }

        for entity in &self.pool {
            visited.insert(&entity.id);
            if saved.membership(&entity.id).selected {
                entries.push(change_entry(&entity.id, Membership::none()));
            }
        }

        let mut orphans: Vec<&EntityId> = saved
            .memberships
            .iter()
            .filter(|(id, membership)| membership.selected && !visited.contains(id))
            .map(|(id, _)| id)
            .collect();
        orphans.sort();
        entries.extend(
            orphans
                .into_iter()
                .map(|id| change_entry(id, Membership::none())),
        );

        ChangeSet { entries }
    }

    pub fn is_dirty(&self, saved: &SavedSnapshot) -> bool {
        !self.diff(saved).is_empty()
    }

    /// Stamps the current shape onto every entity as if the server had confirmed it.
    pub fn apply_saved_shape(&mut self) {
        for (index, entity) in self.selection.iter_mut().enumerate() {
            entity.membership = Membership::at(index as u32);
        }
        for entity in &mut self.pool {
            entity.membership = Membership::none();
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn same_membership(saved: Membership, current: Membership) -> bool {
    if !saved.selected && !current.selected {
        return true;
    }
    saved == current
}

fn change_entry(id: &EntityId, membership: Membership) -> ChangeEntry {
    ChangeEntry {
        id: id.clone(),
        membership: membership.selected,
        order: membership.order,
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
