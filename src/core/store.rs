use crate::types::ItemId;

use super::indices::IdSet;

/// Local belief about which items are recommended.
///
/// `added` holds confirmed members, `pending_add` and `pending_remove` hold
/// items whose network call is still outstanding. An item counts as present when
/// it is added or pending addition, and not pending removal.
///
/// Every operation is total; synchronization is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticStore {
    added: IdSet,
    pending_add: IdSet,
    pending_remove: IdSet,
}

impl OptimisticStore {
    /// Empty store: nothing confirmed, nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose confirmed set is exactly `items`.
    pub fn from_catalog(items: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            added: items.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Replaces the confirmed set wholesale. Pending marks are left alone, so an
    /// optimistic addition the snapshot does not know about yet survives only
    /// through its pending mark.
    pub fn refresh(&mut self, items: impl IntoIterator<Item = ItemId>) {
        self.added = items.into_iter().collect();
    }

    /// Records an addition in flight.
    pub fn mark_pending_add(&mut self, id: &ItemId) {
        self.pending_add.insert(id.clone());
    }

    /// Forgets an in-flight addition.
    pub fn clear_pending_add(&mut self, id: &ItemId) {
        self.pending_add.remove(id);
    }

    /// Records a removal in flight.
    pub fn mark_pending_remove(&mut self, id: &ItemId) {
        self.pending_remove.insert(id.clone());
    }

    /// Forgets an in-flight removal.
    pub fn clear_pending_remove(&mut self, id: &ItemId) {
        self.pending_remove.remove(id);
    }

    /// Confirms an addition.
    pub fn commit_add(&mut self, id: &ItemId) {
        self.clear_pending_add(id);
        self.added.insert(id.clone());
    }

    /// Confirms a removal.
    pub fn commit_remove(&mut self, id: &ItemId) {
        self.clear_pending_remove(id);
        self.added.remove(id);
    }

    /// Whether `id` counts as recommended right now.
    pub fn contains(&self, id: &ItemId) -> bool {
        (self.added.contains(id) || self.pending_add.contains(id)) && !self.pending_remove.contains(id)
    }

    /// Confirmed items, plus pending additions not yet confirmed, minus pending
    /// removals of confirmed items.
    pub fn counter_value(&self) -> usize {
        let additions = self
            .pending_add
            .iter()
            .filter(|id| !self.added.contains(*id))
            .count();
        let removals = self
            .pending_remove
            .iter()
            .filter(|id| self.added.contains(*id))
            .count();
        // removals only counts members of `added`, so this never underflows.
        self.added.len() + additions - removals
    }

    /// Confirmed members.
    pub fn added(&self) -> &IdSet {
        &self.added
    }

    /// Items with an addition in flight.
    pub fn pending_additions(&self) -> &IdSet {
        &self.pending_add
    }

    /// Items with a removal in flight.
    pub fn pending_removals(&self) -> &IdSet {
        &self.pending_remove
    }
}
