//! The mob simulation.
//!
//! `Engine` owns every mob, the items they dropped, the shared encounter
//! counters and the job queue. Jobs run against it one at a time or in
//! parallel; each mob's state has its own lock so mobs never wait on each
//! other.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use rand::Rng;
use warband_shared::{CombatantId, MapRef, ServerMessage};

use crate::ai;
use crate::combat::{self, AttackKind};
use crate::config::EngineConfig;
use crate::death;
use crate::entities::{Mob, MobId, MobState, TakeError, WorldItems};
use crate::error::{EngineError, EngineResult};
use crate::loot;
use crate::movement;
use crate::scheduler::{Job, Scheduled, Scheduler};
use crate::world::{
    Broadcaster, CharacterDirectory, EncounterCounters, ItemGrant, ReferenceData, Rewards, Scope,
};

/// Services the engine calls out to
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn CharacterDirectory>,
    pub rewards: Arc<dyn Rewards>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

pub struct Engine {
    config: EngineConfig,
    data: ReferenceData,
    mobs: Vec<Mob>,
    handles: HashMap<(MapRef, u32), MobId>,
    world_items: WorldItems,
    encounters: EncounterCounters,
    directory: Arc<dyn CharacterDirectory>,
    rewards: Arc<dyn Rewards>,
    broadcaster: Arc<dyn Broadcaster>,
    scheduler: Mutex<Scheduler>,
}

impl Engine {
    /// Create one mob per spawn point. Handles are dense per map, starting at 1.
    pub fn new(config: EngineConfig, data: ReferenceData, collaborators: Collaborators) -> Self {
        let mut mobs = Vec::new();
        let mut handles = HashMap::new();
        let mut next_handle: HashMap<MapRef, u32> = HashMap::new();

        for spawn in data.spawn_points() {
            let Some(npc) = data.npc(spawn.npc_id) else {
                warn!("Spawn point {} has no NPC {}, skipping", spawn.id, spawn.npc_id);
                continue;
            };
            let id = MobId(mobs.len() as u32);
            let counter = next_handle.entry(spawn.map).or_insert(0);
            *counter += 1;
            handles.insert((spawn.map, *counter), id);
            mobs.push(Mob::new(id, *counter, spawn, npc));
        }
        info!("Spawned {} mobs on {} maps", mobs.len(), next_handle.len());

        Self {
            config,
            data,
            mobs,
            handles,
            world_items: WorldItems::new(),
            encounters: EncounterCounters::new(),
            directory: collaborators.directory,
            rewards: collaborators.rewards,
            broadcaster: collaborators.broadcaster,
            scheduler: Mutex::new(Scheduler::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn world_items(&self) -> &WorldItems {
        &self.world_items
    }

    pub fn encounters(&self) -> &EncounterCounters {
        &self.encounters
    }

    pub(crate) fn directory(&self) -> &dyn CharacterDirectory {
        self.directory.as_ref()
    }

    pub(crate) fn rewards(&self) -> &dyn Rewards {
        self.rewards.as_ref()
    }

    pub(crate) fn broadcaster(&self) -> &dyn Broadcaster {
        self.broadcaster.as_ref()
    }

    pub fn mobs(&self) -> &[Mob] {
        &self.mobs
    }

    pub fn mob(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(id.0 as usize)
    }

    pub fn mob_by_handle(&self, map: MapRef, handle: u32) -> EngineResult<&Mob> {
        self.handles
            .get(&(map, handle))
            .and_then(|id| self.mob(*id))
            .ok_or(EngineError::UnknownMob(handle))
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Current simulation time in milliseconds
    pub fn now(&self) -> u64 {
        self.scheduler.lock().now()
    }

    pub fn pending_jobs(&self) -> usize {
        self.scheduler.lock().len()
    }

    pub fn has_pending_movement(&self, mob: MobId) -> bool {
        self.scheduler.lock().has_pending_movement(mob)
    }

    /// Arm the first tick of every mob, spread over one tick period
    pub fn start(&self) {
        let mut rng = rand::thread_rng();
        let jobs: Vec<Scheduled> = self
            .mobs
            .iter()
            .map(|mob| Scheduled::after(rng.gen_range(0..=self.config.tick_base_ms), Job::Tick(mob.id)))
            .collect();
        info!("Arming {} mob tick loops", jobs.len());
        self.schedule(jobs);
    }

    /// Queue jobs relative to the current clock.
    ///
    /// A movement leg is only queued while it still carries its mob's token,
    /// checked under the mob's lock so a newer movement cannot slip in
    /// between. Must not be called while holding a mob lock.
    pub fn schedule<I: IntoIterator<Item = Scheduled>>(&self, jobs: I) {
        for scheduled in jobs {
            let Job::MoveStep(leg) = scheduled.job else {
                self.scheduler.lock().push(scheduled);
                continue;
            };
            let Some(mob) = self.mob(leg.mob) else {
                continue;
            };
            let state = mob.state();
            if state.movement_token == Some(leg.token) {
                self.scheduler.lock().push(scheduled);
            } else {
                trace!("Mob {} movement leg is stale, not queued", mob.handle);
            }
        }
    }

    pub(crate) fn next_tick_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        self.config.tick_base_ms + rng.gen_range(0..=self.config.tick_jitter_ms)
    }

    /// Pop every job due by `until`, moving the clock there. Follow-ups of
    /// the drained jobs are scheduled from `until`.
    pub fn drain_due(&self, until: u64) -> Vec<Job> {
        self.scheduler.lock().drain_due(until)
    }

    /// Run every job due by `until` on the calling thread, including
    /// follow-ups that fall due on the way
    pub fn advance_to(&self, until: u64) {
        loop {
            let job = self.scheduler.lock().pop_due(until);
            let Some(job) = job else {
                break;
            };
            let follow_ups = self.execute_guarded(job);
            self.schedule(follow_ups);
        }
        self.scheduler.lock().advance_clock(until);
    }

    /// Run one job and return what it wants scheduled next
    pub fn execute(&self, job: Job) -> Vec<Scheduled> {
        match job {
            Job::Tick(id) => match self.mob(id) {
                Some(mob) => ai::tick(self, mob),
                None => Vec::new(),
            },
            Job::MoveStep(leg) => match self.mob(leg.mob) {
                Some(mob) => {
                    let mut state = mob.state();
                    movement::step(&self.config, self.broadcaster(), mob, &mut state, leg)
                        .into_iter()
                        .collect()
                }
                None => Vec::new(),
            },
            Job::FinishDeath(id) => match self.mob(id) {
                Some(mob) => death::finish(self, mob),
                None => Vec::new(),
            },
            Job::Respawn(id) => {
                if let Some(mob) = self.mob(id) {
                    death::respawn(self, mob);
                }
                Vec::new()
            }
            Job::DespawnItem(entity_id) => {
                if let Some(item) = self.world_items.remove(entity_id) {
                    debug!("Item {} ({}) expired", entity_id, item.item_id);
                    self.broadcaster
                        .notify(Scope::Map(item.map), ServerMessage::ItemDespawn { entity_id });
                }
                Vec::new()
            }
        }
    }

    /// `execute`, with a panic turned into a logged recovery
    pub fn execute_guarded(&self, job: Job) -> Vec<Scheduled> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(job))) {
            Ok(follow_ups) => follow_ups,
            Err(_) => {
                error!("Job {:?} panicked, recovering", job);
                self.recover(job)
            }
        }
    }

    /// Jobs that keep a mob going after `job` failed half-way
    pub fn recover(&self, job: Job) -> Vec<Scheduled> {
        match job {
            Job::Tick(id) => {
                let enabled = self.mob(id).map(|mob| mob.state().enabled).unwrap_or(false);
                if enabled {
                    let delay = self.next_tick_delay(&mut rand::thread_rng());
                    vec![Scheduled::after(delay, job)]
                } else {
                    Vec::new()
                }
            }
            Job::MoveStep(leg) => {
                if let Some(mob) = self.mob(leg.mob) {
                    mob.state().halt();
                }
                Vec::new()
            }
            Job::FinishDeath(_) | Job::Respawn(_) => {
                vec![Scheduled::after(self.config.tick_base_ms, job)]
            }
            Job::DespawnItem(entity_id) => {
                self.world_items.remove(entity_id);
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Apply `amount` damage from `attacker` to a mob and return its remaining
    /// health
    pub fn apply_damage(
        &self,
        map: MapRef,
        handle: u32,
        attacker: CombatantId,
        amount: u32,
    ) -> EngineResult<u32> {
        let mob = self.mob_by_handle(map, handle)?;
        let spawn = self
            .data
            .spawn_point(mob.spawn_id)
            .ok_or(EngineError::MissingSpawn(mob.spawn_id))?;
        if !spawn.attackable {
            return Err(EngineError::Rejected("mob cannot be attacked"));
        }

        let now = self.now();
        let (health, follow_ups) = {
            let mut state = mob.state();
            if !state.enabled || !state.is_alive() {
                return Err(EngineError::Rejected("mob is not alive"));
            }
            let follow_ups = self.damage_locked(mob, &mut state, attacker, amount, now);
            (state.health, follow_ups)
        };
        self.schedule(follow_ups);
        Ok(health)
    }

    fn damage_locked(
        &self,
        mob: &Mob,
        state: &mut MobState,
        attacker: CombatantId,
        amount: u32,
        now: u64,
    ) -> Vec<Scheduled> {
        let taken = state.take_damage(amount);
        state.ledger.record(attacker, taken);
        if state.target.is_none() {
            debug!("Mob {} retaliates against {:?}", mob.handle, attacker);
            state.target = Some(attacker);
        }

        self.broadcaster.notify(
            Scope::NearMob { map: mob.map, handle: mob.handle },
            ServerMessage::MobDamaged {
                handle: mob.handle,
                attacker,
                damage: taken,
                health: state.health,
                max_health: state.max_health,
            },
        );

        if state.health == 0 {
            death::begin(self, mob, state, now)
        } else {
            Vec::new()
        }
    }

    /// Resolve a character's attack on a mob and return the damage dealt
    pub fn attack_mob(&self, character: u64, map: MapRef, handle: u32, kind: AttackKind) -> EngineResult<u32> {
        let attacker = self
            .directory
            .find_character(character)
            .ok_or(EngineError::UnknownCharacter(character))?;
        let mob = self.mob_by_handle(map, handle)?;
        if attacker.map != mob.map {
            return Err(EngineError::Rejected("character is on another map"));
        }
        if !attacker.is_alive() {
            return Err(EngineError::Rejected("character is dead"));
        }
        let npc = self.data.npc(mob.npc_id).ok_or(EngineError::MissingNpc(mob.npc_id))?;

        let mut defender = npc.combat_stats();
        defender.health = mob.state().health;
        let damage = combat::pve_damage(
            &mut rand::thread_rng(),
            &self.config,
            &attacker.stats,
            None,
            &defender,
            kind,
        );
        self.apply_damage(map, handle, CombatantId::Character(character), damage)?;
        Ok(damage)
    }

    /// Resolve a hit between two characters and return the damage dealt
    pub fn resolve_pvp(&self, attacker: u64, defender: u64, kind: AttackKind) -> EngineResult<u32> {
        let a = self
            .directory
            .find_character(attacker)
            .ok_or(EngineError::UnknownCharacter(attacker))?;
        let d = self
            .directory
            .find_character(defender)
            .ok_or(EngineError::UnknownCharacter(defender))?;
        if a.map != d.map {
            return Err(EngineError::Rejected("characters are on different maps"));
        }

        let damage = combat::pvp_damage(&mut rand::thread_rng(), &self.config, &a.stats, &d.stats, kind);
        if damage > 0 {
            self.directory
                .apply_damage(CombatantId::Character(defender), damage)
                .ok_or(EngineError::UnknownCharacter(defender))?;
        }
        Ok(damage)
    }

    /// Harvest a resource node. Returns how many items were granted.
    pub fn harvest(&self, map: MapRef, handle: u32, character: u64) -> EngineResult<usize> {
        let mob = self.mob_by_handle(map, handle)?;
        let spawn = self
            .data
            .spawn_point(mob.spawn_id)
            .ok_or(EngineError::MissingSpawn(mob.spawn_id))?;
        if spawn.attackable {
            return Err(EngineError::Rejected("only resource nodes can be harvested"));
        }
        let harvester = self
            .directory
            .find_character(character)
            .ok_or(EngineError::UnknownCharacter(character))?;
        if harvester.map != mob.map {
            return Err(EngineError::Rejected("character is on another map"));
        }

        let now = self.now();
        let placed = {
            let mut state = mob.state();
            if !state.enabled || !state.is_alive() {
                return Err(EngineError::Rejected("node is not available"));
            }
            if !state.harvested_by.insert(character) {
                return Err(EngineError::Rejected("already harvested this visit"));
            }
            state.observers.insert(character);
            loot::drop_loot(self, mob, state.position, false, &harvester, now)
        };
        self.schedule(placed.jobs);
        Ok(placed.count)
    }

    /// Pick up a ground item into the character's inventory
    pub fn pickup_item(&self, character: u64, entity_id: u64) -> EngineResult<ItemGrant> {
        let item = self
            .world_items
            .take(entity_id, character, self.now())
            .map_err(|e| match e {
                TakeError::Missing => EngineError::UnknownWorldItem(entity_id),
                TakeError::Protected => EngineError::Rejected("item is reserved for its owner"),
            })?;

        let grant = ItemGrant {
            item_id: item.item_id,
            quantity: item.quantity,
            plus: item.plus,
        };
        match self.rewards.add_item(character, grant) {
            Ok(update) => {
                self.broadcaster
                    .notify(Scope::Map(item.map), ServerMessage::ItemDespawn { entity_id });
                self.broadcaster.notify(
                    Scope::NearCharacter(character),
                    ServerMessage::ItemGranted {
                        character_id: character,
                        item_id: grant.item_id,
                        quantity: update.quantity,
                        plus: grant.plus,
                        slot: update.slot,
                    },
                );
                Ok(grant)
            }
            Err(e) => {
                self.world_items.restore(item);
                Err(e.into())
            }
        }
    }

    /// Stop a mob for good
    pub fn disable(&self, map: MapRef, handle: u32) -> EngineResult<()> {
        let mob = self.mob_by_handle(map, handle)?;
        {
            let mut state = mob.state();
            state.enabled = false;
            state.target = None;
            state.halt();
        }
        self.scheduler.lock().cancel_movement(mob.id);
        info!("Mob {} on map {} disabled", handle, map.map);
        self.broadcaster.notify(
            Scope::NearMob { map, handle },
            ServerMessage::MobDespawn { handle },
        );
        Ok(())
    }

    /// Register a character as watching a mob
    pub fn add_observer(&self, map: MapRef, handle: u32, character: u64) -> EngineResult<()> {
        let mob = self.mob_by_handle(map, handle)?;
        mob.state().observers.insert(character);
        Ok(())
    }
}
