//! World item entity (dropped items) and the registry that holds them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use warband_shared::MapRef;

use crate::geometry::Vec2;

/// First id handed to dropped items
const FIRST_ITEM_ID: u64 = 20000;

/// An item in the world that can be picked up
#[derive(Debug, Clone)]
pub struct WorldItem {
    pub entity_id: u64,
    pub item_id: u32,
    pub quantity: u32,
    pub plus: u8,
    pub map: MapRef,
    pub position: Vec2,
    /// Character the drop was generated for
    pub owner: Option<u64>,
    /// Until this time (ms) only the owner may pick it up
    pub protected_until: u64,
}

impl WorldItem {
    pub fn can_pick_up(&self, character: u64, now: u64) -> bool {
        match self.owner {
            Some(owner) if now < self.protected_until => owner == character,
            _ => true,
        }
    }
}

/// Items lying on the ground, shared by all mobs
#[derive(Debug)]
pub struct WorldItems {
    items: Mutex<HashMap<u64, WorldItem>>,
    next_id: AtomicU64,
}

impl Default for WorldItems {
    fn default() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(FIRST_ITEM_ID),
        }
    }
}

impl WorldItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an item on the ground, assigning its entity id
    pub fn insert(&self, mut item: WorldItem) -> u64 {
        let entity_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        item.entity_id = entity_id;
        self.items.lock().insert(entity_id, item);
        entity_id
    }

    pub fn get(&self, entity_id: u64) -> Option<WorldItem> {
        self.items.lock().get(&entity_id).cloned()
    }

    pub fn remove(&self, entity_id: u64) -> Option<WorldItem> {
        self.items.lock().remove(&entity_id)
    }

    /// Return an item taken by `take` that could not be handed over
    pub fn restore(&self, item: WorldItem) {
        self.items.lock().insert(item.entity_id, item);
    }

    /// Take an item off the ground if `character` may pick it up
    pub fn take(&self, entity_id: u64, character: u64, now: u64) -> Result<WorldItem, TakeError> {
        let mut items = self.items.lock();
        let item = items.get(&entity_id).ok_or(TakeError::Missing)?;
        if !item.can_pick_up(character, now) {
            return Err(TakeError::Protected);
        }
        items.remove(&entity_id).ok_or(TakeError::Missing)
    }

    pub fn snapshot(&self) -> Vec<WorldItem> {
        self.items.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why an item could not be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    Missing,
    Protected,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drop_for(owner: Option<u64>) -> WorldItem {
        WorldItem {
            entity_id: 0,
            item_id: 5,
            quantity: 1,
            plus: 0,
            map: MapRef::new(1, 1),
            position: Vec2::default(),
            owner,
            protected_until: 1_000,
        }
    }

    #[test]
    fn test_owner_protection_window() {
        let items = WorldItems::new();
        let id = items.insert(drop_for(Some(7)));
        assert_eq!(items.take(id, 8, 500).unwrap_err(), TakeError::Protected);
        assert!(items.take(id, 8, 1_000).is_ok());
        assert_eq!(items.take(id, 8, 1_000).unwrap_err(), TakeError::Missing);
    }

    #[test]
    fn test_ids_are_unique() {
        let items = WorldItems::new();
        let a = items.insert(drop_for(None));
        let b = items.insert(drop_for(None));
        assert_ne!(a, b);
        assert_eq!(items.len(), 2);
    }
}
