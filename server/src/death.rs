//! Death and respawn: `Alive -> Dying -> Respawning -> Alive`.

use log::{debug, info, warn};
use rand::Rng;
use warband_shared::{CombatantId, EncounterKind, EncounterRef, NpcDef, ServerMessage};

use crate::engine::Engine;
use crate::entities::{DamageLedger, Mob, MobState, Phase};
use crate::geometry::{clamp_to_bounds, random_point, Vec2};
use crate::loot;
use crate::scheduler::{Job, Scheduled};
use crate::world::{CharacterView, EncounterProgress, Scope};

/// Character credited with a kill; a pet's kill goes to its owner
pub(crate) fn resolve_claimant(engine: &Engine, ledger: &DamageLedger) -> Option<CharacterView> {
    let directory = engine.directory();
    match ledger.claimant()? {
        CombatantId::Character(id) => directory.find_character(id),
        CombatantId::Pet(handle) => {
            let owner = directory.find_pet(handle)?.owner;
            directory.find_character(owner)
        }
    }
}

/// Hit points just reached zero. Hands out rewards and schedules the
/// cleanup; must be called with the mob's state locked.
pub(crate) fn begin(engine: &Engine, mob: &Mob, state: &mut MobState, now: u64) -> Vec<Scheduled> {
    let mut rng = rand::thread_rng();
    let mut jobs = Vec::new();
    state.phase = Phase::Dying;
    state.halt();

    let killer = state.ledger.claimant();
    engine.broadcaster().notify(
        Scope::NearMob { map: mob.map, handle: mob.handle },
        ServerMessage::MobDeath { handle: mob.handle, killer },
    );

    let data = engine.data();
    if let (Some(npc), Some(spawn)) = (data.npc(mob.npc_id), data.spawn_point(mob.spawn_id)) {
        if spawn.attackable {
            let claimant = resolve_claimant(engine, &state.ledger);
            match &claimant {
                Some(claimant) => {
                    info!("{} killed {} (mob {})", claimant.name, npc.name, mob.handle);
                    share_experience(engine, mob, state.position, npc, claimant);
                    drop_gold(engine, npc, claimant, &mut rng);
                    let placed = loot::drop_loot(engine, mob, state.position, true, claimant, now);
                    jobs.extend(placed.jobs);
                }
                None => debug!("Mob {} died without a claimant, no rewards", mob.handle),
            }

            if let Some(encounter) = &spawn.encounter {
                record_encounter_kill(engine, mob, encounter);
            }
            if npc.announce_death {
                let text = match &claimant {
                    Some(c) => format!("{} has been slain by {}", npc.name, c.name),
                    None => format!("{} has been slain", npc.name),
                };
                engine
                    .broadcaster()
                    .notify(Scope::World, ServerMessage::Announcement { text });
            }
        }
    } else {
        warn!("Mob {} died with missing reference data", mob.handle);
    }

    jobs.push(Scheduled::after(
        engine.config().death_clear_delay_ms,
        Job::FinishDeath(mob.id),
    ));
    jobs
}

/// Split experience by level among the claimant and nearby party members
fn share_experience(engine: &Engine, mob: &Mob, position: Vec2, npc: &NpcDef, claimant: &CharacterView) {
    let config = engine.config();
    let total = (npc.experience as f64 * config.exp_rate.max(0.0)).round() as u64;
    if total == 0 {
        return;
    }

    let mut group = vec![claimant.clone()];
    group.extend(
        engine
            .directory()
            .party_members(claimant.id)
            .into_iter()
            .filter(|m| {
                m.online
                    && m.is_alive()
                    && m.map == mob.map
                    && m.position.distance_to(position) <= config.party_share_radius
            }),
    );

    let level_sum: u64 = group.iter().map(|c| u64::from(c.stats.level.max(1))).sum();
    for member in &group {
        let share = total * u64::from(member.stats.level.max(1)) / level_sum;
        if share == 0 {
            continue;
        }
        engine.rewards().add_experience(member.id, share);
        engine.broadcaster().notify(
            Scope::NearCharacter(member.id),
            ServerMessage::ExperienceGained {
                character_id: member.id,
                amount: share,
            },
        );
    }
}

fn drop_gold<R: Rng + ?Sized>(engine: &Engine, npc: &NpcDef, claimant: &CharacterView, rng: &mut R) {
    if npc.gold_max == 0 && npc.gold_min == 0 {
        return;
    }
    let low = npc.gold_min.min(npc.gold_max);
    let high = npc.gold_min.max(npc.gold_max);
    let rolled = rng.gen_range(low..=high);
    let amount = (rolled as f64 * engine.config().gold_rate * claimant.gold_rate).round();
    if amount < 1.0 {
        return;
    }
    let amount = amount as u64;
    engine.rewards().add_gold(claimant.id, amount);
    engine.broadcaster().notify(
        Scope::NearCharacter(claimant.id),
        ServerMessage::GoldGained {
            character_id: claimant.id,
            amount,
        },
    );
}

fn record_encounter_kill(engine: &Engine, mob: &Mob, encounter: &EncounterRef) {
    if engine.encounters().record_kill(mob.map, encounter) != EncounterProgress::Completed {
        return;
    }
    let text = encounter.announcement.clone().unwrap_or_else(|| match encounter.kind {
        EncounterKind::AreaCapture => format!("Area {} has been captured", encounter.key),
        EncounterKind::DungeonWave => format!("Wave {} has been cleared", encounter.wave),
    });
    engine
        .broadcaster()
        .notify(Scope::Map(mob.map), ServerMessage::Announcement { text });
}

/// Clear combat state and start the respawn timer, or retire a one-shot mob
pub(crate) fn finish(engine: &Engine, mob: &Mob) -> Vec<Scheduled> {
    let mut state = mob.state();
    if state.phase != Phase::Dying {
        debug!("Mob {} is not dying, ignoring cleanup", mob.handle);
        return Vec::new();
    }

    state.target = None;
    state.halt();
    state.ledger.clear();
    state.phase = Phase::Respawning;

    let Some(spawn) = engine.data().spawn_point(mob.spawn_id) else {
        warn!("Mob {} has no spawn point {}, it stays dead", mob.handle, mob.spawn_id);
        return Vec::new();
    };

    if spawn.one_shot {
        state.enabled = false;
        info!("One-shot mob {} retired", mob.handle);
        engine.broadcaster().notify(
            Scope::NearMob { map: mob.map, handle: mob.handle },
            ServerMessage::MobDespawn { handle: mob.handle },
        );
        return Vec::new();
    }

    vec![Scheduled::after(spawn.respawn_delay_ms / 2, Job::Respawn(mob.id))]
}

/// Bring a dead mob back near where it fell
pub(crate) fn respawn(engine: &Engine, mob: &Mob) {
    let mut rng = rand::thread_rng();
    let mut state = mob.state();
    if state.phase != Phase::Respawning || !state.enabled {
        return;
    }
    let Some(spawn) = engine.data().spawn_point(mob.spawn_id) else {
        warn!("Mob {} has no spawn point {}, cannot respawn", mob.handle, mob.spawn_id);
        return;
    };

    let fresh = random_point(&spawn.bounds, &mut rng);
    let bias = engine.config().respawn_position_bias.clamp(0.0, 1.0);
    state.position = clamp_to_bounds(&spawn.bounds, state.position.lerp(fresh, 1.0 - bias));
    state.restore();
    state.ledger.clear();
    state.target = None;
    state.halt();
    state.harvested_by.clear();
    state.phase = Phase::Alive;

    debug!(
        "Mob {} respawned at ({:.1}, {:.1})",
        mob.handle, state.position.x, state.position.z
    );
    engine.broadcaster().notify(
        Scope::NearMob { map: mob.map, handle: mob.handle },
        ServerMessage::MobRespawn {
            handle: mob.handle,
            position: state.position.to_array(),
            health: state.health,
        },
    );
}
