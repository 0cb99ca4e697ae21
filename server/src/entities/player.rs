//! Character record used by the in-memory sandbox world.

use serde::{Deserialize, Serialize};
use warband_shared::{CombatStats, Empire, MapRef};

use crate::geometry::Vec2;
use crate::world::CharacterView;

/// Maximum inventory slots
pub const INVENTORY_SIZE: usize = 20;

/// One occupied inventory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item_id: u32,
    pub quantity: u32,
    pub plus: u8,
}

/// Sandbox character state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPlayer {
    pub id: u64,
    pub name: String,
    pub empire: Empire,
    pub map: MapRef,
    pub position: Vec2,
    #[serde(default)]
    pub stats: CombatStats,
    #[serde(default = "yes")]
    pub online: bool,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub invisible: bool,
    #[serde(default)]
    pub pet: Option<u64>,
    #[serde(default)]
    pub party: Vec<u64>,
    #[serde(default = "unit_rate")]
    pub drop_rate: f64,
    #[serde(default = "unit_rate")]
    pub bonus_drop_rate: f64,
    #[serde(default = "unit_rate")]
    pub gold_rate: f64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub experience: u64,
    #[serde(default = "empty_inventory")]
    pub inventory: Vec<Option<InventorySlot>>,
}

fn yes() -> bool {
    true
}

fn unit_rate() -> f64 {
    1.0
}

fn empty_inventory() -> Vec<Option<InventorySlot>> {
    vec![None; INVENTORY_SIZE]
}

impl ServerPlayer {
    pub fn new(id: u64, name: impl Into<String>, empire: Empire, map: MapRef, position: Vec2) -> Self {
        Self {
            id,
            name: name.into(),
            empire,
            map,
            position,
            stats: CombatStats::default(),
            online: true,
            active: true,
            invisible: false,
            pet: None,
            party: Vec::new(),
            drop_rate: 1.0,
            bonus_drop_rate: 1.0,
            gold_rate: 1.0,
            gold: 0,
            experience: 0,
            inventory: empty_inventory(),
        }
    }

    /// Add item to inventory, stacking plain items where possible.
    /// Returns the first slot that received something, or `None` if it did
    /// not fit (in which case nothing changed).
    pub fn add_to_inventory(&mut self, item_id: u32, quantity: u32, plus: u8, max_stack: u32) -> Option<u16> {
        let max_stack = max_stack.max(1);
        if !self.can_fit(item_id, quantity, plus, max_stack) {
            return None;
        }

        let mut remaining = quantity;
        let mut first_slot = None;

        // Try to stack with existing items
        if plus == 0 {
            for (idx, slot) in self.inventory.iter_mut().enumerate() {
                if remaining == 0 {
                    break;
                }
                if let Some(inv_slot) = slot {
                    if inv_slot.item_id == item_id && inv_slot.plus == 0 && inv_slot.quantity < max_stack {
                        let can_add = (max_stack - inv_slot.quantity).min(remaining);
                        inv_slot.quantity += can_add;
                        remaining -= can_add;
                        first_slot.get_or_insert(idx as u16);
                    }
                }
            }
        }

        // Add to empty slots
        for (idx, slot) in self.inventory.iter_mut().enumerate() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let add_amount = remaining.min(max_stack);
                *slot = Some(InventorySlot { item_id, quantity: add_amount, plus });
                remaining -= add_amount;
                first_slot.get_or_insert(idx as u16);
            }
        }

        first_slot
    }

    fn can_fit(&self, item_id: u32, quantity: u32, plus: u8, max_stack: u32) -> bool {
        let mut room: u64 = 0;
        for slot in &self.inventory {
            match slot {
                None => room += u64::from(max_stack),
                Some(s) if plus == 0 && s.item_id == item_id && s.plus == 0 => {
                    room += u64::from(max_stack.saturating_sub(s.quantity));
                }
                Some(_) => {}
            }
        }
        room >= u64::from(quantity)
    }

    pub fn has_free_slot(&self) -> bool {
        self.inventory.iter().any(|s| s.is_none())
    }

    /// Total quantity held of an item
    pub fn count_item(&self, item_id: u32) -> u32 {
        self.inventory
            .iter()
            .flatten()
            .filter(|s| s.item_id == item_id)
            .map(|s| s.quantity)
            .sum()
    }

    /// Remove `amount` of an item across stacks; false (and no change) if short
    pub fn remove_item(&mut self, item_id: u32, amount: u32) -> bool {
        if self.count_item(item_id) < amount {
            return false;
        }
        let mut remaining = amount;
        for slot in &mut self.inventory {
            if remaining == 0 {
                break;
            }
            if let Some(inv_slot) = slot {
                if inv_slot.item_id == item_id {
                    let taken = inv_slot.quantity.min(remaining);
                    inv_slot.quantity -= taken;
                    remaining -= taken;
                    if inv_slot.quantity == 0 {
                        *slot = None;
                    }
                }
            }
        }
        true
    }

    /// Take damage, returns remaining health
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        self.stats.health = self.stats.health.saturating_sub(damage);
        self.stats.health
    }

    pub fn is_dead(&self) -> bool {
        self.stats.health == 0
    }

    pub fn view(&self) -> CharacterView {
        CharacterView {
            id: self.id,
            name: self.name.clone(),
            map: self.map,
            position: self.position,
            empire: self.empire,
            online: self.online,
            active: self.active,
            invisible: self.invisible,
            stats: self.stats.clone(),
            pet: self.pet,
            drop_rate: self.drop_rate,
            bonus_drop_rate: self.bonus_drop_rate,
            gold_rate: self.gold_rate,
        }
    }
}

/// Sandbox companion pet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPet {
    pub handle: u64,
    pub owner: u64,
    pub map: MapRef,
    pub position: Vec2,
    #[serde(default = "yes")]
    pub online: bool,
    #[serde(default)]
    pub mounted: bool,
    #[serde(default)]
    pub combat_capable: bool,
    #[serde(default)]
    pub stats: CombatStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> ServerPlayer {
        ServerPlayer::new(1, "Tester", Empire::Red, MapRef::new(1, 1), Vec2::default())
    }

    #[test]
    fn test_stacking_fills_existing_stack_first() {
        let mut p = player();
        assert_eq!(p.add_to_inventory(3, 15, 0, 20), Some(0));
        assert_eq!(p.add_to_inventory(3, 10, 0, 20), Some(0));
        assert_eq!(p.inventory[0].map(|s| s.quantity), Some(20));
        assert_eq!(p.inventory[1].map(|s| s.quantity), Some(5));
        assert_eq!(p.count_item(3), 25);
    }

    #[test]
    fn test_upgraded_items_never_stack() {
        let mut p = player();
        p.add_to_inventory(4, 1, 2, 1);
        p.add_to_inventory(4, 1, 0, 1);
        assert_eq!(p.inventory.iter().flatten().count(), 2);
    }

    #[test]
    fn test_full_inventory_rejects_without_change() {
        let mut p = player();
        for id in 0..INVENTORY_SIZE as u32 {
            p.add_to_inventory(100 + id, 1, 0, 1);
        }
        assert!(!p.has_free_slot());
        assert_eq!(p.add_to_inventory(1, 1, 0, 1), None);
        assert_eq!(p.count_item(1), 0);
    }

    #[test]
    fn test_remove_item_across_stacks() {
        let mut p = player();
        p.add_to_inventory(3, 25, 0, 20);
        assert!(!p.remove_item(3, 30));
        assert!(p.remove_item(3, 22));
        assert_eq!(p.count_item(3), 3);
    }
}
