//! Tuning values for the mob simulation.
//!
//! Every field has a default so a config file only needs to list what it
//! changes. Probabilities are in `[0, 1]` unless the name says per mille.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use warband_shared::PlusFamily;

use crate::error::LoadError;

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- scheduling ---
    /// Fixed part of the delay between two ticks of one mob
    pub tick_base_ms: u64,
    /// Random extra delay added on top of `tick_base_ms`
    pub tick_jitter_ms: u64,
    /// Granularity of the async driver
    pub driver_resolution_ms: u64,

    // --- perception ---
    /// Characters this close become observers
    pub sight_radius: f32,
    /// Characters this close are aggro candidates
    pub aggro_radius: f32,
    /// Targets further than this are dropped
    pub chase_range: f32,
    /// Per-candidate admission roll during target acquisition
    pub aggro_admission_chance: f64,
    /// Chance an admitted player's pet is targeted instead of the player
    pub pet_priority_chance: f64,
    /// Margin outside the patrol bounds tolerated before retreating
    pub leash_margin: f32,

    // --- behaviour ---
    /// Chance an idle mob starts wandering on a tick
    pub wander_chance: f64,
    /// Chance an engaged mob with an affordable skill casts it
    pub skill_chance: f64,
    /// Radius of the random point picked around a chased target
    pub chase_offset: f32,

    // --- movement ---
    pub step_interval_ms: u64,
    pub arrive_epsilon: f32,

    // --- combat ---
    pub damage_floor: u32,
    /// Level gap below which attackers never miss in PvE
    pub miss_level_threshold: u32,
    /// Accuracy needed per level of gap to be sure to hit
    pub accuracy_per_level: f64,
    /// Boss NPC ids dealing a fixed share of the defender's max health
    pub boss_damage_pct: HashMap<u32, u32>,
    pub pvp_min_scale: f64,
    pub pvp_max_scale: f64,
    pub pvp_defense_factor: f64,
    /// Dodge checks only apply within this level gap
    pub pvp_dodge_level_window: u32,
    pub pvp_dodge_per_level: f64,
    pub pvp_max_dodge: f64,

    // --- death & respawn ---
    pub death_clear_delay_ms: u64,
    /// Share of respawn position taken from the last position
    pub respawn_position_bias: f32,
    pub party_share_radius: f32,
    pub exp_rate: f64,
    pub gold_rate: f64,

    // --- loot ---
    pub drop_rate: f64,
    /// Additive drop-rate bonus per boss tier
    pub boss_drop_bonus: f64,
    /// Minimum number of items a boss tier always drops
    pub boss_min_drops: HashMap<u8, u32>,
    /// Scaled drop totals above this switch to direct rescaling
    pub no_drop_ceiling: u32,
    pub loot_iteration_cap: u32,
    pub loot_item_cap: u32,
    pub timed_item_quantity: u32,
    /// Cumulative per-mille chances of +0, +1, ... per item family
    pub plus_rates: HashMap<PlusFamily, Vec<u32>>,
    pub item_lifetime_ms: u64,
    pub owner_protection_ms: u64,
    /// Distance between neighbouring drops of one kill
    pub drop_spacing: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut plus_rates = HashMap::new();
        plus_rates.insert(PlusFamily::Weapon, vec![700, 900, 970, 995, 1000]);
        plus_rates.insert(PlusFamily::Armor, vec![750, 920, 980, 1000]);
        plus_rates.insert(PlusFamily::Accessory, vec![850, 970, 1000]);
        plus_rates.insert(PlusFamily::Socket, vec![900, 1000]);

        let mut boss_min_drops = HashMap::new();
        boss_min_drops.insert(2, 1);
        boss_min_drops.insert(3, 3);

        Self {
            tick_base_ms: 1000,
            tick_jitter_ms: 500,
            driver_resolution_ms: 50,
            sight_radius: 40.0,
            aggro_radius: 10.0,
            chase_range: 30.0,
            aggro_admission_chance: 0.5,
            pet_priority_chance: 0.5,
            leash_margin: 5.0,
            wander_chance: 0.3,
            skill_chance: 0.3,
            chase_offset: 1.0,
            step_interval_ms: 1000,
            arrive_epsilon: 0.1,
            damage_floor: 3,
            miss_level_threshold: 5,
            accuracy_per_level: 20.0,
            boss_damage_pct: HashMap::new(),
            pvp_min_scale: 1.02,
            pvp_max_scale: 0.97,
            pvp_defense_factor: 0.6,
            pvp_dodge_level_window: 15,
            pvp_dodge_per_level: 1.0,
            pvp_max_dodge: 0.5,
            death_clear_delay_ms: 2000,
            respawn_position_bias: 2.0 / 3.0,
            party_share_radius: 50.0,
            exp_rate: 1.0,
            gold_rate: 1.0,
            drop_rate: 1.0,
            boss_drop_bonus: 0.5,
            boss_min_drops,
            no_drop_ceiling: 950,
            loot_iteration_cap: 64,
            loot_item_cap: 12,
            timed_item_quantity: 1,
            plus_rates,
            item_lifetime_ms: 60_000,
            owner_protection_ms: 15_000,
            drop_spacing: 1.0,
        }
    }
}

impl EngineConfig {
    /// Load config from a JSON file, falling back to defaults if it is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No {:?} found, using default engine config", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(LoadError::Io(path.display().to_string(), e)),
        };

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| LoadError::Json(path.display().to_string(), e))?;
        config.check();
        info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    fn check(&self) {
        if self.step_interval_ms == 0 {
            warn!("step_interval_ms is 0, movement will finish in a single burst");
        }
        if self.loot_iteration_cap == 0 {
            warn!("loot_iteration_cap is 0, nothing will ever drop");
        }
    }

    /// Minimum drop count for a boss tier
    pub fn min_drops_for(&self, boss_tier: u8) -> u32 {
        self.boss_min_drops.get(&boss_tier).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "aggro_admission_chance": 0.25, "boss_min_drops": { "4": 6 } }"#)
                .unwrap();
        assert_eq!(config.aggro_admission_chance, 0.25);
        assert_eq!(config.min_drops_for(4), 6);
        assert_eq!(config.min_drops_for(0), 0);
        assert_eq!(config.damage_floor, 3);
        assert_eq!(config.plus_rates.get(&PlusFamily::Weapon).map(|r| r.len()), Some(5));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_or_default("definitely/not/here.json").unwrap();
        assert_eq!(config.step_interval_ms, 1000);
    }
}
