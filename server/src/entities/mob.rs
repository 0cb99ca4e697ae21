//! Server-side mob entity.
//!
//! A mob is created once per spawn point at world load and lives for the
//! whole process. Everything that changes while the world runs sits in
//! `MobState` behind the mob's own lock.

use std::collections::HashSet;

use parking_lot::{Mutex, MutexGuard};
use warband_shared::{CombatantId, MapRef, NpcDef, SpawnPointDef};

use super::DamageLedger;
use crate::geometry::{bounds_center, Vec2};

/// Dense index of a mob in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MobId(pub u32);

/// Where a mob is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Alive,
    /// Hit points reached zero, rewards are being handed out
    Dying,
    /// Dead and waiting for the respawn timer
    Respawning,
}

/// Mutable part of a mob
#[derive(Debug)]
pub struct MobState {
    pub position: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub phase: Phase,
    /// Player or pet being fought; one value so both can never be set
    pub target: Option<CombatantId>,
    /// Epoch of the movement chain allowed to run; `None` when standing
    pub movement_token: Option<u64>,
    /// Cleared to stop the tick loop for good
    pub enabled: bool,
    /// Characters currently in notification range
    pub observers: HashSet<u64>,
    /// Characters that harvested this node during their current visit
    pub harvested_by: HashSet<u64>,
    pub ledger: DamageLedger,
}

impl MobState {
    pub fn is_moving(&self) -> bool {
        self.movement_token.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.phase == Phase::Alive && self.health > 0
    }

    /// Subtract damage, keeping health within `[0, max]`. Returns what was taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.health);
        self.health -= taken;
        taken
    }

    pub fn restore(&mut self) {
        self.health = self.max_health;
        self.mana = self.max_mana;
    }

    /// Stop any running movement chain
    pub fn halt(&mut self) {
        self.movement_token = None;
    }
}

/// A mob and its lock
#[derive(Debug)]
pub struct Mob {
    pub id: MobId,
    /// Display handle, dense per map
    pub handle: u32,
    pub spawn_id: u32,
    pub npc_id: u32,
    pub map: MapRef,
    state: Mutex<MobState>,
}

impl Mob {
    pub fn new(id: MobId, handle: u32, spawn: &SpawnPointDef, npc: &NpcDef) -> Self {
        let state = MobState {
            position: bounds_center(&spawn.bounds),
            health: npc.max_health,
            max_health: npc.max_health,
            mana: npc.max_mana,
            max_mana: npc.max_mana,
            phase: Phase::Alive,
            target: None,
            movement_token: None,
            enabled: true,
            observers: HashSet::new(),
            harvested_by: HashSet::new(),
            ledger: DamageLedger::new(),
        };
        Self {
            id,
            handle,
            spawn_id: spawn.id,
            npc_id: npc.id,
            map: spawn.map,
            state: Mutex::new(state),
        }
    }

    /// Lock the mob's mutable state
    pub fn state(&self) -> MutexGuard<'_, MobState> {
        self.state.lock()
    }
}
