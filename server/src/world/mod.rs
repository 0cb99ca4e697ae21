//! The world around the mobs: what the simulation asks of its host.
//!
//! Characters, pets, inventories and fan-out all belong to someone else.
//! The traits here are the narrow surface the engine uses; `sandbox` has an
//! in-memory implementation for the headless binary and for tests.

mod encounters;
mod reference_data;
pub mod sandbox;

pub use encounters::{EncounterCounters, EncounterProgress};
pub use reference_data::{ReferenceData, ReferenceDocument};

use warband_shared::{CombatStats, CombatantId, Empire, MapRef, ServerMessage};

use crate::error::InventoryError;
use crate::geometry::Vec2;

/// Who should hear about a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Observers of a mob (by display handle on its map)
    NearMob { map: MapRef, handle: u32 },
    /// Everyone around a character, including the character
    NearCharacter(u64),
    /// Everyone on a map
    Map(MapRef),
    /// Everyone
    World,
}

/// Snapshot of a character as seen by a mob
#[derive(Debug, Clone)]
pub struct CharacterView {
    pub id: u64,
    pub name: String,
    pub map: MapRef,
    pub position: Vec2,
    pub empire: Empire,
    pub online: bool,
    /// False while loading, teleporting or otherwise not in play
    pub active: bool,
    pub invisible: bool,
    pub stats: CombatStats,
    /// Handle of the companion pet, if one is summoned
    pub pet: Option<u64>,
    /// Personal and bonus drop-rate multipliers
    pub drop_rate: f64,
    pub bonus_drop_rate: f64,
    pub gold_rate: f64,
}

impl CharacterView {
    pub fn is_alive(&self) -> bool {
        self.stats.health > 0
    }
}

/// Snapshot of a companion pet
#[derive(Debug, Clone)]
pub struct PetView {
    pub handle: u64,
    pub owner: u64,
    pub map: MapRef,
    pub position: Vec2,
    pub online: bool,
    /// The owner is riding it
    pub mounted: bool,
    pub combat_capable: bool,
    pub stats: CombatStats,
}

impl PetView {
    pub fn is_alive(&self) -> bool {
        self.stats.health > 0
    }
}

/// Item handed to the inventory collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemGrant {
    pub item_id: u32,
    pub quantity: u32,
    pub plus: u8,
}

/// Display payload of a successful grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryUpdate {
    pub slot: u16,
    pub quantity: u32,
}

/// Fires messages at observers
pub trait Broadcaster: Send + Sync {
    /// Fire-and-forget delivery
    fn notify(&self, scope: Scope, message: ServerMessage);
}

/// Read access to characters and pets, plus applying mob damage to them
pub trait CharacterDirectory: Send + Sync {
    fn find_character(&self, id: u64) -> Option<CharacterView>;

    fn find_pet(&self, handle: u64) -> Option<PetView>;

    /// Characters on `map` within `radius` of `point`
    fn characters_near(&self, map: MapRef, point: Vec2, radius: f32) -> Vec<CharacterView>;

    /// Accepted party members of a character, not including the character
    fn party_members(&self, id: u64) -> Vec<CharacterView>;

    /// Faction, zone and duel rules
    fn is_attackable_by(&self, mob_faction: Option<Empire>, character: &CharacterView) -> bool {
        mob_faction != Some(character.empire)
    }

    /// Apply mob damage to a character or pet; returns its remaining health
    fn apply_damage(&self, target: CombatantId, amount: u32) -> Option<u32>;
}

/// Inventory and currency mutation
pub trait Rewards: Send + Sync {
    fn add_item(&self, character: u64, grant: ItemGrant) -> Result<InventoryUpdate, InventoryError>;

    fn has_free_slot(&self, character: u64) -> bool;

    /// Whether the character holds at least one of each item
    fn holds_items(&self, character: u64, item_ids: &[u32]) -> bool;

    /// Remove `amount` of an item; false if the character had too few
    fn decrement_stack(&self, character: u64, item_id: u32, amount: u32) -> bool;

    fn add_experience(&self, character: u64, amount: u64);

    fn add_gold(&self, character: u64, amount: u64);
}
