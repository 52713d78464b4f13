//! In-memory snapshot of owners, items and practice history.
//!
//! The batch planner and the schedule store's repair passes read this
//! instead of querying storage item by item.

use std::collections::HashMap;

use uuid::Uuid;

use crate::history::HistoryEntry;
use crate::item::{Owner, OwnerState, PracticeItem};

#[derive(Debug, Clone, Default)]
pub struct Library {
    owners: HashMap<Uuid, Owner>,
    items: HashMap<Uuid, PracticeItem>,
    history: HashMap<Uuid, Vec<HistoryEntry>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        owners: Vec<Owner>,
        items: Vec<PracticeItem>,
        history: Vec<HistoryEntry>,
    ) -> Self {
        let mut lib = Self::new();
        for owner in owners {
            lib.insert_owner(owner);
        }
        for item in items {
            lib.insert_item(item);
        }
        for entry in history {
            lib.add_history(entry);
        }
        lib
    }

    pub fn insert_owner(&mut self, owner: Owner) {
        self.owners.insert(owner.id, owner);
    }

    pub fn insert_item(&mut self, item: PracticeItem) {
        self.items.insert(item.id, item);
    }

    pub fn add_history(&mut self, entry: HistoryEntry) {
        self.history.entry(entry.item_id).or_default().push(entry);
    }

    pub fn owner(&self, id: Uuid) -> Option<&Owner> {
        self.owners.get(&id)
    }

    pub fn item(&self, id: Uuid) -> Option<&PracticeItem> {
        self.items.get(&id)
    }

    pub fn contains_item(&self, id: Uuid) -> bool {
        self.items.contains_key(&id)
    }

    /// Owners in the `Removed` state count as gone.
    pub fn contains_owner(&self, id: Uuid) -> bool {
        self.owners
            .get(&id)
            .is_some_and(|o| o.state != OwnerState::Removed)
    }

    pub fn owner_state(&self, id: Uuid) -> Option<OwnerState> {
        self.owners.get(&id).map(|o| o.state)
    }

    /// Items sorted by id so batch passes are deterministic.
    pub fn items(&self) -> Vec<&PracticeItem> {
        let mut items: Vec<&PracticeItem> = self.items.values().collect();
        items.sort_by_key(|i| i.id);
        items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn history_for_item(&self, id: Uuid) -> &[HistoryEntry] {
        self.history.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Active lifecycle, owner present and not paused or removed.
    pub fn is_schedulable(&self, item: &PracticeItem) -> bool {
        item.is_schedulable()
            && self
                .owner_state(item.owner_id)
                .is_some_and(|s| s.is_schedulable())
    }
}
