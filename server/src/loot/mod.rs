//! Loot resolution.
//!
//! A kill (or a harvest) walks the mob's drop node: each draw either misses,
//! lands on a container that refines into a chained node, or lands on an
//! item that gets awarded before the walk starts over at the root. The walk
//! stops on a miss once the minimum count is met, or when a cap is hit.

mod offsets;
mod plus;

pub use offsets::{offset, ring_cell};
pub use plus::roll_plus;

use log::{debug, warn};
use rand::Rng;
use warband_shared::{DropNode, ItemDef, NpcDef, ServerMessage, PER_MILLE};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::entities::{Mob, WorldItem};
use crate::geometry::Vec2;
use crate::scheduler::{Job, Scheduled};
use crate::world::{CharacterView, ItemGrant, ReferenceData, Scope};

/// One resolved reward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootRoll {
    pub item_id: u32,
    pub quantity: u32,
    pub plus: u8,
}

/// Drop-rate multiplier for a claimant killing `npc` on a map weighted
/// `zone_weight`
pub fn effective_rate(config: &EngineConfig, npc: &NpcDef, claimant: &CharacterView, zone_weight: f64) -> f64 {
    let mut rate = config.drop_rate * claimant.drop_rate * claimant.bonus_drop_rate * zone_weight;
    if npc.is_boss() {
        rate += config.boss_drop_bonus * f64::from(npc.boss_tier);
    }
    rate.max(0.0)
}

/// Cumulative per-mille thresholds of `node` after applying `rate`.
///
/// Above the ceiling the table is multiplied directly and capped at 1000.
/// Otherwise only the no-drop gap shrinks (or grows) by the rate, so item
/// weights keep their proportions. The last threshold never exceeds 1000.
pub fn scaled_cumulative(node: &DropNode, rate: f64, no_drop_ceiling: u32) -> Vec<f64> {
    let total = f64::from(node.total());
    let scale = f64::from(PER_MILLE);
    if total <= 0.0 || rate <= 0.0 || !rate.is_finite() {
        return vec![0.0; node.cumulative.len()];
    }

    if total * rate > f64::from(no_drop_ceiling) {
        return node
            .cumulative
            .iter()
            .map(|c| (f64::from(*c) * rate).min(scale))
            .collect();
    }

    let gap = ((scale - total) / rate).min(scale);
    let factor = (scale - gap) / total;
    node.cumulative.iter().map(|c| f64::from(*c) * factor).collect()
}

/// Index of the item hit by a fresh seed, `None` for "no drop"
fn draw<R: Rng + ?Sized>(rng: &mut R, node: &DropNode, rate: f64, no_drop_ceiling: u32) -> Option<usize> {
    let thresholds = scaled_cumulative(node, rate, no_drop_ceiling);
    let seed = rng.gen_range(0.0..f64::from(PER_MILLE));
    let index = thresholds.partition_point(|threshold| *threshold <= seed);
    (index < node.items.len()).then_some(index)
}

/// Walk `root` and return everything it yields. `rate` applies to draws on
/// the root only; chained nodes are rolled as defined.
pub fn resolve<R: Rng + ?Sized>(
    rng: &mut R,
    config: &EngineConfig,
    data: &ReferenceData,
    root: &DropNode,
    rate: f64,
    min_drops: u32,
) -> Vec<LootRoll> {
    let mut rolls = Vec::new();
    let mut node = root;
    let mut iterations = 0;

    while iterations < config.loot_iteration_cap && rolls.len() < config.loot_item_cap as usize {
        iterations += 1;
        let node_rate = if std::ptr::eq(node, root) { rate } else { 1.0 };

        let Some(index) = draw(rng, node, node_rate, config.no_drop_ceiling) else {
            if rolls.len() >= min_drops as usize {
                break;
            }
            continue;
        };
        let item_id = node.items[index];

        if let Some(next) = node.chained.get(&item_id) {
            match data.drop_node(*next) {
                Some(chained) => node = chained,
                None => {
                    warn!("Drop node {} chains to missing node {}", node.id, next);
                    node = root;
                }
            }
            continue;
        }

        let Some(item) = data.item(item_id) else {
            warn!("Drop node {} lists unknown item {}", node.id, item_id);
            continue;
        };
        if !item.item_type.drops_loose() {
            continue;
        }

        let quantity = match node.quantities.get(&item_id) {
            Some(range) => rng.gen_range(range.min.min(range.max)..=range.min.max(range.max)),
            None if item.timed => config.timed_item_quantity,
            None => 1,
        }
        .max(1);
        rolls.push(LootRoll {
            item_id,
            quantity,
            plus: roll_plus(rng, config, item),
        });
        node = root;
    }

    if iterations >= config.loot_iteration_cap {
        debug!("Drop node {} hit the iteration cap with {} drops", root.id, rolls.len());
    }
    rolls
}

/// What placing the rolls produced
#[derive(Debug, Default)]
pub(crate) struct Placed {
    /// Despawn timers of ground drops
    pub jobs: Vec<Scheduled>,
    /// Items that made it to the ground or into the inventory
    pub count: usize,
}

/// Resolve `mob`'s drop table for `claimant` and place the result
pub(crate) fn drop_loot(
    engine: &Engine,
    mob: &Mob,
    position: Vec2,
    attackable: bool,
    claimant: &CharacterView,
    now: u64,
) -> Placed {
    let data = engine.data();
    let Some(npc) = data.npc(mob.npc_id) else {
        return Placed::default();
    };
    let Some(table) = npc.drop_table else {
        return Placed::default();
    };
    let Some(root) = data.drop_node(table) else {
        warn!("NPC {} references missing drop node {}", npc.id, table);
        return Placed::default();
    };

    let mut rng = rand::thread_rng();
    let config = engine.config();
    let rate = effective_rate(config, npc, claimant, data.zone_weight(mob.map.map));
    let rolls = resolve(&mut rng, config, data, root, rate, config.min_drops_for(npc.boss_tier));
    debug!("Mob {} yields {} drops for {}", mob.handle, rolls.len(), claimant.name);
    place(engine, mob, position, attackable, claimant, &rolls, now)
}

fn place(
    engine: &Engine,
    mob: &Mob,
    position: Vec2,
    attackable: bool,
    claimant: &CharacterView,
    rolls: &[LootRoll],
    now: u64,
) -> Placed {
    let config = engine.config();
    let mut placed = Placed::default();
    let mut ring_index = 0;

    for roll in rolls {
        let Some(item) = engine.data().item(roll.item_id) else {
            continue;
        };

        if item.relic {
            if grant_relic(engine, claimant, item, roll) {
                placed.count += 1;
            }
            continue;
        }

        if !attackable {
            if grant(engine, claimant, roll) {
                placed.count += 1;
            }
            continue;
        }

        let drop_at = position + offset(ring_index, config.drop_spacing);
        ring_index += 1;
        let entity_id = engine.world_items().insert(WorldItem {
            entity_id: 0,
            item_id: roll.item_id,
            quantity: roll.quantity,
            plus: roll.plus,
            map: mob.map,
            position: drop_at,
            owner: Some(claimant.id),
            protected_until: now + config.owner_protection_ms,
        });
        engine.broadcaster().notify(
            Scope::NearMob { map: mob.map, handle: mob.handle },
            ServerMessage::ItemSpawn {
                entity_id,
                item_id: roll.item_id,
                quantity: roll.quantity,
                plus: roll.plus,
                position: drop_at.to_array(),
                owner: Some(claimant.id),
            },
        );
        placed
            .jobs
            .push(Scheduled::after(config.item_lifetime_ms, Job::DespawnItem(entity_id)));
        placed.count += 1;
    }
    placed
}

/// Trade a relic's prerequisites for the relic. The prerequisites are only
/// kept when the relic lands in the inventory.
fn grant_relic(engine: &Engine, claimant: &CharacterView, item: &ItemDef, roll: &LootRoll) -> bool {
    let rewards = engine.rewards();
    if !rewards.holds_items(claimant.id, &item.prerequisites) {
        debug!("{} lacks the prerequisites for relic {}", claimant.name, item.name);
        return false;
    }
    if !rewards.has_free_slot(claimant.id) {
        debug!("{} has no room for relic {}", claimant.name, item.name);
        return false;
    }

    let mut consumed = Vec::with_capacity(item.prerequisites.len());
    for prerequisite in &item.prerequisites {
        if !rewards.decrement_stack(claimant.id, *prerequisite, 1) {
            warn!("Could not consume prerequisites of relic {} for {}", item.name, claimant.name);
            refund(engine, claimant, &consumed);
            return false;
        }
        consumed.push(*prerequisite);
    }

    if grant(engine, claimant, roll) {
        true
    } else {
        refund(engine, claimant, &consumed);
        false
    }
}

/// Hand back prerequisites taken for a relic that was not granted
fn refund(engine: &Engine, claimant: &CharacterView, item_ids: &[u32]) {
    for item_id in item_ids {
        let back = ItemGrant {
            item_id: *item_id,
            quantity: 1,
            plus: 0,
        };
        if let Err(e) = engine.rewards().add_item(claimant.id, back) {
            warn!("Could not return item {} to {}: {}", item_id, claimant.name, e);
        }
    }
}

/// Put an item straight into the claimant's inventory. A refused grant is
/// abandoned.
fn grant(engine: &Engine, claimant: &CharacterView, roll: &LootRoll) -> bool {
    let request = ItemGrant {
        item_id: roll.item_id,
        quantity: roll.quantity,
        plus: roll.plus,
    };
    match engine.rewards().add_item(claimant.id, request) {
        Ok(update) => {
            engine.broadcaster().notify(
                Scope::NearCharacter(claimant.id),
                ServerMessage::ItemGranted {
                    character_id: claimant.id,
                    item_id: roll.item_id,
                    quantity: update.quantity,
                    plus: roll.plus,
                    slot: update.slot,
                },
            );
            true
        }
        Err(e) => {
            warn!("Dropping item {} for {}: {}", roll.item_id, claimant.name, e);
            false
        }
    }
}
