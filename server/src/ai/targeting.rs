//! Observer bookkeeping and target selection.

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use warband_shared::{CombatStats, CombatantId, MapRef, NpcDef};

use super::chance;
use crate::engine::Engine;
use crate::entities::{Mob, MobState};
use crate::geometry::Vec2;
use crate::world::{CharacterView, PetView};

/// Where a target stands and what it fights with
#[derive(Debug, Clone)]
pub(crate) struct Foe {
    pub position: Vec2,
    pub stats: CombatStats,
}

/// Pick up characters within sight, then forget those who went offline,
/// changed map or now belong to the mob's faction
pub(crate) fn refresh_observers(engine: &Engine, mob: &Mob, state: &mut MobState, npc: &NpcDef) {
    let directory = engine.directory();
    for character in directory.characters_near(mob.map, state.position, engine.config().sight_radius) {
        if character.online && character.map == mob.map {
            state.observers.insert(character.id);
        }
    }

    let gone: Vec<u64> = state
        .observers
        .iter()
        .copied()
        .filter(|id| match directory.find_character(*id) {
            Some(c) => !c.online || c.map != mob.map || npc.faction == Some(c.empire),
            None => true,
        })
        .collect();

    for id in gone {
        trace!("Mob {} lost observer {}", mob.handle, id);
        state.observers.remove(&id);
        state.harvested_by.remove(&id);
    }
}

fn usable_pet(pet: &PetView, map: MapRef) -> bool {
    pet.online && pet.is_alive() && pet.map == map
}

/// A mounted, non-combat pet takes the hits meant for its rider
fn mount_of(engine: &Engine, character: &CharacterView) -> Option<PetView> {
    let pet = engine.directory().find_pet(character.pet?)?;
    (usable_pet(&pet, character.map) && pet.mounted && !pet.combat_capable).then_some(pet)
}

/// Drop targets that are gone, dead or no longer hostile
pub(crate) fn validate_target(engine: &Engine, mob: &Mob, state: &mut MobState, npc: &NpcDef) {
    let directory = engine.directory();
    match state.target {
        Some(CombatantId::Pet(handle)) => {
            let valid = directory
                .find_pet(handle)
                .map(|pet| usable_pet(&pet, mob.map))
                .unwrap_or(false);
            if !valid {
                debug!("Mob {} dropped pet target {}", mob.handle, handle);
                state.target = None;
            }
        }
        Some(CombatantId::Character(id)) => match directory.find_character(id) {
            Some(c)
                if c.online
                    && c.is_alive()
                    && c.map == mob.map
                    && directory.is_attackable_by(npc.faction, &c) =>
            {
                if let Some(mount) = mount_of(engine, &c) {
                    debug!("Mob {} retargets {}'s mount {}", mob.handle, c.name, mount.handle);
                    state.target = Some(CombatantId::Pet(mount.handle));
                }
            }
            _ => {
                debug!("Mob {} dropped character target {}", mob.handle, id);
                state.target = None;
            }
        },
        None => {}
    }
}

/// Pick a new target among admitted candidates around the mob
pub(crate) fn acquire_target<R: Rng + ?Sized>(
    engine: &Engine,
    mob: &Mob,
    state: &MobState,
    npc: &NpcDef,
    rng: &mut R,
) -> Option<CombatantId> {
    let config = engine.config();
    let directory = engine.directory();

    let admitted: Vec<CharacterView> = directory
        .characters_near(mob.map, state.position, config.aggro_radius)
        .into_iter()
        .filter(|c| {
            c.online
                && c.active
                && c.is_alive()
                && (!c.invisible || npc.detects_invisible)
                && c.map == mob.map
                && directory.is_attackable_by(npc.faction, c)
        })
        .filter(|_| chance(rng, config.aggro_admission_chance))
        .collect();

    let chosen = admitted.choose(rng)?;
    debug!("Mob {} ({}) aggroed on {}", mob.handle, npc.name, chosen.name);

    let pet = chosen
        .pet
        .and_then(|handle| directory.find_pet(handle))
        .filter(|pet| usable_pet(pet, chosen.map));
    match pet {
        Some(pet) if pet.mounted && !pet.combat_capable => Some(CombatantId::Pet(pet.handle)),
        Some(pet) if chance(rng, config.pet_priority_chance) => Some(CombatantId::Pet(pet.handle)),
        _ => Some(CombatantId::Character(chosen.id)),
    }
}

/// Current position and stats of a target
pub(crate) fn locate(engine: &Engine, target: CombatantId) -> Option<Foe> {
    let directory = engine.directory();
    match target {
        CombatantId::Character(id) => directory.find_character(id).map(|c| Foe {
            position: c.position,
            stats: c.stats,
        }),
        CombatantId::Pet(handle) => directory.find_pet(handle).map(|p| Foe {
            position: p.position,
            stats: p.stats,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Collaborators;
    use crate::entities::{ServerPet, ServerPlayer};
    use crate::world::sandbox::{LogBroadcaster, SandboxWorld};
    use crate::world::{ReferenceData, ReferenceDocument};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use warband_shared::Empire;

    const MAP: MapRef = MapRef { server: 1, map: 3 };

    fn setup() -> (Engine, Arc<SandboxWorld>) {
        let doc: ReferenceDocument = serde_json::from_str(
            r#"{
                "npcs": [{ "id": 1, "name": "Gate Guard", "level": 10, "max_health": 300,
                           "min_attack": 10, "max_attack": 20, "walk_speed": 1.0, "run_speed": 3.0,
                           "aggressive": true, "faction": "Blue" }],
                "spawn_points": [
                    { "id": 1, "npc_id": 1, "map": { "server": 1, "map": 3 },
                      "bounds": { "min_x": 0, "min_z": 0, "max_x": 0, "max_z": 0 },
                      "respawn_delay_ms": 10000 }
                ]
            }"#,
        )
        .unwrap();
        let config = EngineConfig {
            aggro_admission_chance: 1.0,
            pet_priority_chance: 0.0,
            ..EngineConfig::default()
        };
        let world = Arc::new(SandboxWorld::new());
        let engine = Engine::new(
            config,
            ReferenceData::from_document(doc),
            Collaborators {
                directory: world.clone(),
                rewards: world.clone(),
                broadcaster: Arc::new(LogBroadcaster),
            },
        );
        (engine, world)
    }

    fn player(id: u64, empire: Empire) -> ServerPlayer {
        ServerPlayer::new(id, format!("P{}", id), empire, MAP, Vec2::new(2.0, 0.0))
    }

    fn pet(handle: u64, owner: u64, mounted: bool) -> ServerPet {
        ServerPet {
            handle,
            owner,
            map: MAP,
            position: Vec2::new(2.0, 0.0),
            online: true,
            mounted,
            combat_capable: false,
            stats: CombatStats::default(),
        }
    }

    #[test]
    fn test_observers_drop_own_faction_and_offline_characters() {
        let (engine, world) = setup();
        world.insert_player(player(1, Empire::Red));
        world.insert_player(player(2, Empire::Blue));
        let mob = &engine.mobs()[0];
        let npc = engine.data().npc(1).unwrap();

        let mut state = mob.state();
        refresh_observers(&engine, mob, &mut state, npc);
        assert!(state.observers.contains(&1));
        assert!(!state.observers.contains(&2));

        state.harvested_by.insert(1);
        world.update_player(1, |p| p.online = false);
        refresh_observers(&engine, mob, &mut state, npc);
        assert!(state.observers.is_empty());
        assert!(state.harvested_by.is_empty());
    }

    #[test]
    fn test_invisible_characters_are_not_acquired() {
        let (engine, world) = setup();
        let mut hidden = player(1, Empire::Red);
        hidden.invisible = true;
        world.insert_player(hidden);
        let mob = &engine.mobs()[0];
        let npc = engine.data().npc(1).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let state = mob.state();
        assert_eq!(acquire_target(&engine, mob, &state, npc, &mut rng), None);
    }

    #[test]
    fn test_same_faction_is_never_acquired() {
        let (engine, world) = setup();
        world.insert_player(player(1, Empire::Blue));
        world.insert_player(player(2, Empire::Red));
        let mob = &engine.mobs()[0];
        let npc = engine.data().npc(1).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let state = mob.state();
        for _ in 0..20 {
            assert_eq!(
                acquire_target(&engine, mob, &state, npc, &mut rng),
                Some(CombatantId::Character(2))
            );
        }
    }

    #[test]
    fn test_mount_takes_the_hits() {
        let (engine, world) = setup();
        let mut rider = player(1, Empire::Red);
        rider.pet = Some(40);
        world.insert_player(rider);
        world.insert_pet(pet(40, 1, true));
        let mob = &engine.mobs()[0];
        let npc = engine.data().npc(1).unwrap();
        let mut rng = StdRng::seed_from_u64(9);

        let mut state = mob.state();
        assert_eq!(
            acquire_target(&engine, mob, &state, npc, &mut rng),
            Some(CombatantId::Pet(40))
        );

        state.target = Some(CombatantId::Character(1));
        validate_target(&engine, mob, &mut state, npc);
        assert_eq!(state.target, Some(CombatantId::Pet(40)));
    }

    #[test]
    fn test_dead_pet_target_is_dropped() {
        let (engine, world) = setup();
        let mut dead = pet(40, 1, false);
        dead.stats.health = 0;
        world.insert_pet(dead);
        let mob = &engine.mobs()[0];
        let npc = engine.data().npc(1).unwrap();

        let mut state = mob.state();
        state.target = Some(CombatantId::Pet(40));
        validate_target(&engine, mob, &mut state, npc);
        assert_eq!(state.target, None);
    }
}
