//! Perception and decision loop of a mob.
//!
//! A tick refreshes who is watching, settles on a target and then either
//! idles, chases, fights or walks back home. It always ends by scheduling
//! the next tick unless the mob was disabled.

pub(crate) mod targeting;

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use warband_shared::{CombatantId, NpcDef, ServerMessage, SkillDef, SpawnPointDef};

use crate::combat::{self, AttackKind};
use crate::engine::Engine;
use crate::entities::{Mob, MobState};
use crate::geometry::{random_point, within_bounds, Vec2};
use crate::movement;
use crate::scheduler::{Job, Scheduled};
use crate::world::Scope;
use targeting::Foe;

/// Bernoulli roll that tolerates probabilities outside `[0, 1]`
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability >= 1.0 {
        true
    } else if probability > 0.0 {
        rng.gen_bool(probability)
    } else {
        false
    }
}

/// Run one tick of `mob` and return the jobs it wants scheduled
pub(crate) fn tick(engine: &Engine, mob: &Mob) -> Vec<Scheduled> {
    let mut rng = rand::thread_rng();
    let mut jobs = Vec::new();
    let mut state = mob.state();

    if !state.enabled {
        debug!("Mob {} is disabled, tick loop stops", mob.handle);
        return jobs;
    }

    let data = engine.data();
    match (data.npc(mob.npc_id), data.spawn_point(mob.spawn_id)) {
        (Some(npc), Some(spawn)) => {
            targeting::refresh_observers(engine, mob, &mut state, npc);
            if spawn.attackable && state.is_alive() && !state.observers.is_empty() {
                jobs.extend(decide(engine, mob, &mut state, npc, spawn, &mut rng));
            }
        }
        _ => warn!(
            "Mob {} has no NPC {} or spawn point {}, skipping tick",
            mob.handle, mob.npc_id, mob.spawn_id
        ),
    }

    jobs.push(Scheduled::after(engine.next_tick_delay(&mut rng), Job::Tick(mob.id)));
    jobs
}

fn decide<R: Rng + ?Sized>(
    engine: &Engine,
    mob: &Mob,
    state: &mut MobState,
    npc: &NpcDef,
    spawn: &SpawnPointDef,
    rng: &mut R,
) -> Option<Scheduled> {
    let config = engine.config();

    targeting::validate_target(engine, mob, state, npc);
    if state.target.is_none() && npc.aggressive {
        state.target = targeting::acquire_target(engine, mob, state, npc, rng);
    }

    let Some(target) = state.target else {
        return idle(mob, state, npc, spawn, config.wander_chance, rng);
    };
    let Some(foe) = targeting::locate(engine, target) else {
        state.target = None;
        return None;
    };

    let distance = state.position.distance_to(foe.position);
    if distance > config.chase_range || !within_bounds(&spawn.bounds, state.position, config.leash_margin) {
        return Some(retreat(mob, state, npc, spawn, rng));
    }

    if distance <= npc.attack_range {
        engage(engine, mob, state, npc, target, &foe, rng);
        return None;
    }

    let offset = Vec2::new(
        rng.gen_range(-1.0f32..=1.0),
        rng.gen_range(-1.0f32..=1.0),
    ) * config.chase_offset;
    Some(movement::start_movement(rng, mob, state, foe.position + offset, npc.run_speed))
}

fn idle<R: Rng + ?Sized>(
    mob: &Mob,
    state: &mut MobState,
    npc: &NpcDef,
    spawn: &SpawnPointDef,
    wander_chance: f64,
    rng: &mut R,
) -> Option<Scheduled> {
    if state.is_moving() || !chance(rng, wander_chance) {
        return None;
    }
    let point = random_point(&spawn.bounds, rng);
    Some(movement::start_movement(rng, mob, state, point, npc.walk_speed))
}

/// Give up the fight, heal and run back inside the patrol bounds.
/// The damage ledger is kept.
fn retreat<R: Rng + ?Sized>(
    mob: &Mob,
    state: &mut MobState,
    npc: &NpcDef,
    spawn: &SpawnPointDef,
    rng: &mut R,
) -> Scheduled {
    debug!("Mob {} gives up on {:?} and returns home", mob.handle, state.target);
    state.target = None;
    state.restore();
    let home = random_point(&spawn.bounds, rng);
    movement::start_movement(rng, mob, state, home, npc.run_speed)
}

/// Pick an affordable skill and pay for it, or `None` for a basic attack
fn choose_skill<'a, R: Rng + ?Sized>(
    engine: &'a Engine,
    state: &mut MobState,
    npc: &NpcDef,
    rng: &mut R,
) -> Option<&'a SkillDef> {
    let affordable: Vec<&SkillDef> = npc
        .skills
        .iter()
        .filter_map(|id| engine.data().skill(*id))
        .filter(|skill| skill.affordable(state.mana))
        .collect();
    if affordable.is_empty() || !chance(rng, engine.config().skill_chance) {
        return None;
    }
    let skill = *affordable.choose(rng)?;
    state.mana -= skill.mana_cost;
    Some(skill)
}

fn engage<R: Rng + ?Sized>(
    engine: &Engine,
    mob: &Mob,
    state: &mut MobState,
    npc: &NpcDef,
    target: CombatantId,
    foe: &Foe,
    rng: &mut R,
) {
    state.halt();

    let skill = choose_skill(engine, state, npc, rng);
    let kind = skill.map(AttackKind::from_skill).unwrap_or(AttackKind::Basic);
    let mut attacker = npc.combat_stats();
    attacker.health = state.health;

    let damage = combat::pve_damage(rng, engine.config(), &attacker, Some(npc.id), &foe.stats, kind);
    let target_new_health = if damage > 0 {
        match engine.directory().apply_damage(target, damage) {
            Some(health) => health,
            None => {
                debug!("Mob {} lost target {:?} mid-swing", mob.handle, target);
                state.target = None;
                return;
            }
        }
    } else {
        foe.stats.health
    };

    let message = match skill {
        Some(skill) => ServerMessage::MobSkill {
            handle: mob.handle,
            skill_id: skill.id,
            target,
            damage,
            target_new_health,
        },
        None => ServerMessage::MobAttack {
            handle: mob.handle,
            target,
            damage,
            target_new_health,
        },
    };
    engine
        .broadcaster()
        .notify(Scope::NearMob { map: mob.map, handle: mob.handle }, message);
}
