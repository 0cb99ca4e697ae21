//! In-memory world for the headless binary and tests.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use warband_shared::{CombatantId, MapRef, ServerMessage};

use super::{
    Broadcaster, CharacterDirectory, CharacterView, InventoryUpdate, ItemGrant, PetView, Rewards,
    Scope,
};
use crate::entities::{ServerPet, ServerPlayer};
use crate::error::{InventoryError, LoadError};
use crate::geometry::Vec2;

/// Characters and pets to populate a sandbox with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxDocument {
    pub characters: Vec<ServerPlayer>,
    pub pets: Vec<ServerPet>,
    /// Max stack per item id; unlisted items do not stack
    pub max_stacks: HashMap<u32, u32>,
}

/// Characters, pets and inventories held in memory
#[derive(Debug, Default)]
pub struct SandboxWorld {
    players: RwLock<HashMap<u64, ServerPlayer>>,
    pets: RwLock<HashMap<u64, ServerPet>>,
    max_stacks: HashMap<u32, u32>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: SandboxDocument) -> Self {
        let world = Self {
            players: RwLock::new(doc.characters.into_iter().map(|p| (p.id, p)).collect()),
            pets: RwLock::new(doc.pets.into_iter().map(|p| (p.handle, p)).collect()),
            max_stacks: doc.max_stacks,
        };
        info!(
            "Sandbox world with {} characters and {} pets",
            world.players.read().len(),
            world.pets.read().len()
        );
        world
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(path.display().to_string(), e))?;
        let doc: SandboxDocument = serde_json::from_str(&content)
            .map_err(|e| LoadError::Json(path.display().to_string(), e))?;
        Ok(Self::from_document(doc))
    }

    pub fn with_max_stacks(mut self, max_stacks: HashMap<u32, u32>) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    pub fn insert_player(&self, player: ServerPlayer) {
        self.players.write().insert(player.id, player);
    }

    pub fn insert_pet(&self, pet: ServerPet) {
        self.pets.write().insert(pet.handle, pet);
    }

    pub fn player(&self, id: u64) -> Option<ServerPlayer> {
        self.players.read().get(&id).cloned()
    }

    pub fn pet(&self, handle: u64) -> Option<ServerPet> {
        self.pets.read().get(&handle).cloned()
    }

    /// Mutate a player in place
    pub fn update_player<F: FnOnce(&mut ServerPlayer)>(&self, id: u64, f: F) -> bool {
        match self.players.write().get_mut(&id) {
            Some(player) => {
                f(player);
                true
            }
            None => false,
        }
    }

    fn max_stack(&self, item_id: u32) -> u32 {
        self.max_stacks.get(&item_id).copied().unwrap_or(1)
    }
}

impl CharacterDirectory for SandboxWorld {
    fn find_character(&self, id: u64) -> Option<CharacterView> {
        self.players.read().get(&id).map(ServerPlayer::view)
    }

    fn find_pet(&self, handle: u64) -> Option<PetView> {
        self.pets.read().get(&handle).map(|pet| PetView {
            handle: pet.handle,
            owner: pet.owner,
            map: pet.map,
            position: pet.position,
            online: pet.online,
            mounted: pet.mounted,
            combat_capable: pet.combat_capable,
            stats: pet.stats.clone(),
        })
    }

    fn characters_near(&self, map: MapRef, point: Vec2, radius: f32) -> Vec<CharacterView> {
        let mut near: Vec<CharacterView> = self
            .players
            .read()
            .values()
            .filter(|p| p.map == map && p.position.distance_to(point) <= radius)
            .map(ServerPlayer::view)
            .collect();
        near.sort_by_key(|c| c.id);
        near
    }

    fn party_members(&self, id: u64) -> Vec<CharacterView> {
        let players = self.players.read();
        let Some(player) = players.get(&id) else {
            return Vec::new();
        };
        player
            .party
            .iter()
            .filter(|member| **member != id)
            .filter_map(|member| players.get(member))
            .map(ServerPlayer::view)
            .collect()
    }

    fn apply_damage(&self, target: CombatantId, amount: u32) -> Option<u32> {
        match target {
            CombatantId::Character(id) => self
                .players
                .write()
                .get_mut(&id)
                .map(|p| p.take_damage(amount)),
            CombatantId::Pet(handle) => self.pets.write().get_mut(&handle).map(|pet| {
                pet.stats.health = pet.stats.health.saturating_sub(amount);
                pet.stats.health
            }),
        }
    }
}

impl Rewards for SandboxWorld {
    fn add_item(&self, character: u64, grant: ItemGrant) -> Result<InventoryUpdate, InventoryError> {
        let max_stack = self.max_stack(grant.item_id);
        let mut players = self.players.write();
        let player = players
            .get_mut(&character)
            .ok_or(InventoryError::UnknownCharacter(character))?;
        let slot = player
            .add_to_inventory(grant.item_id, grant.quantity, grant.plus, max_stack)
            .ok_or(InventoryError::Full)?;
        Ok(InventoryUpdate {
            slot,
            quantity: grant.quantity,
        })
    }

    fn has_free_slot(&self, character: u64) -> bool {
        self.players
            .read()
            .get(&character)
            .map(|p| p.has_free_slot())
            .unwrap_or(false)
    }

    fn holds_items(&self, character: u64, item_ids: &[u32]) -> bool {
        self.players
            .read()
            .get(&character)
            .map(|p| item_ids.iter().all(|id| p.count_item(*id) > 0))
            .unwrap_or(false)
    }

    fn decrement_stack(&self, character: u64, item_id: u32, amount: u32) -> bool {
        self.players
            .write()
            .get_mut(&character)
            .map(|p| p.remove_item(item_id, amount))
            .unwrap_or(false)
    }

    fn add_experience(&self, character: u64, amount: u64) {
        if let Some(p) = self.players.write().get_mut(&character) {
            p.experience += amount;
        }
    }

    fn add_gold(&self, character: u64, amount: u64) {
        if let Some(p) = self.players.write().get_mut(&character) {
            p.gold += amount;
        }
    }
}

/// Broadcaster that logs every message
#[derive(Debug, Default)]
pub struct LogBroadcaster;

impl Broadcaster for LogBroadcaster {
    fn notify(&self, scope: Scope, message: ServerMessage) {
        match &message {
            ServerMessage::Announcement { text } => info!("[{:?}] {}", scope, text),
            ServerMessage::MobMove { .. } => debug!("{:?} <- {:?}", scope, message),
            _ => info!("{:?} <- {:?}", scope, message),
        }
    }
}

/// Broadcaster that keeps every message for inspection
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    messages: Mutex<Vec<(Scope, ServerMessage)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Scope, ServerMessage)> {
        self.messages.lock().clone()
    }

    /// Messages matching a predicate
    pub fn filter<F: Fn(&ServerMessage) -> bool>(&self, f: F) -> Vec<ServerMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|(_, m)| f(m))
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn notify(&self, scope: Scope, message: ServerMessage) {
        self.messages.lock().push((scope, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warband_shared::Empire;

    fn world() -> SandboxWorld {
        let world = SandboxWorld::new();
        let map = MapRef::new(1, 1);
        let mut a = ServerPlayer::new(1, "A", Empire::Red, map, Vec2::new(0.0, 0.0));
        a.party = vec![1, 2, 3];
        world.insert_player(a);
        world.insert_player(ServerPlayer::new(2, "B", Empire::Red, map, Vec2::new(3.0, 4.0)));
        world.insert_player(ServerPlayer::new(
            4,
            "Far",
            Empire::Red,
            map,
            Vec2::new(100.0, 0.0),
        ));
        world
    }

    #[test]
    fn test_characters_near_respects_radius_and_map() {
        let world = world();
        let near = world.characters_near(MapRef::new(1, 1), Vec2::default(), 5.0);
        assert_eq!(near.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(world
            .characters_near(MapRef::new(2, 1), Vec2::default(), 5.0)
            .is_empty());
    }

    #[test]
    fn test_party_members_skip_self_and_unknown() {
        let world = world();
        let members = world.party_members(1);
        assert_eq!(members.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_add_item_reports_full() {
        let world = world().with_max_stacks(HashMap::from([(9, 5)]));
        let grant = ItemGrant { item_id: 9, quantity: 3, plus: 0 };
        assert_eq!(world.add_item(2, grant).map(|u| u.slot), Ok(0));
        assert_eq!(world.add_item(77, grant), Err(InventoryError::UnknownCharacter(77)));
        assert!(world.holds_items(2, &[9]));
        assert!(world.decrement_stack(2, 9, 3));
        assert!(!world.holds_items(2, &[9]));
    }
}
