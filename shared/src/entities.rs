//! Reference records for mobs and the spawn points they live on.

use serde::{Deserialize, Serialize};

use crate::{Empire, MapRef};

/// Combat-relevant stats of anything that fights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub level: u32,
    pub health: u32,
    pub max_health: u32,
    pub min_attack: u32,
    pub max_attack: u32,
    pub min_arts: u32,
    pub max_arts: u32,
    pub defense: u32,
    pub arts_defense: u32,
    pub accuracy: u32,
    pub dodge: u32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            level: 1,
            health: 100,
            max_health: 100,
            min_attack: 8,
            max_attack: 12,
            min_arts: 8,
            max_arts: 12,
            defense: 5,
            arts_defense: 5,
            accuracy: 50,
            dodge: 10,
        }
    }
}

/// NPC type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcDef {
    pub id: u32,
    pub name: String,
    pub level: u32,
    pub max_health: u32,
    #[serde(default)]
    pub max_mana: u32,
    pub min_attack: u32,
    pub max_attack: u32,
    #[serde(default)]
    pub min_arts: u32,
    #[serde(default)]
    pub max_arts: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub arts_defense: u32,
    #[serde(default)]
    pub accuracy: u32,
    #[serde(default)]
    pub dodge: u32,
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Distance at which basic attacks and skills connect
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    /// Picks targets on its own; passive mobs only hit back
    #[serde(default)]
    pub aggressive: bool,
    /// Sees invisible characters
    #[serde(default)]
    pub detects_invisible: bool,
    /// Faction guard mobs ignore their own empire
    #[serde(default)]
    pub faction: Option<Empire>,
    #[serde(default)]
    pub experience: u64,
    #[serde(default)]
    pub gold_min: u64,
    #[serde(default)]
    pub gold_max: u64,
    #[serde(default)]
    pub skills: Vec<u32>,
    /// 0 for regular mobs; higher tiers get drop bonuses
    #[serde(default)]
    pub boss_tier: u8,
    #[serde(default)]
    pub announce_death: bool,
    #[serde(default)]
    pub drop_table: Option<u32>,
}

fn default_attack_range() -> f32 {
    2.0
}

impl NpcDef {
    /// Stats of a fresh instance of this NPC
    pub fn combat_stats(&self) -> CombatStats {
        CombatStats {
            level: self.level,
            health: self.max_health,
            max_health: self.max_health,
            min_attack: self.min_attack,
            max_attack: self.max_attack,
            min_arts: self.min_arts,
            max_arts: self.max_arts,
            defense: self.defense,
            arts_defense: self.arts_defense,
            accuracy: self.accuracy,
            dodge: self.dodge,
        }
    }

    pub fn is_boss(&self) -> bool {
        self.boss_tier > 0
    }
}

/// Rectangle in map coordinates a mob patrols inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatrolBounds {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

impl PatrolBounds {
    pub fn from_corners(min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_z: min_z.min(max_z),
            max_x: min_x.max(max_x),
            max_z: min_z.max(max_z),
        }
    }
}

/// Kind of scripted encounter a spawn point takes part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterKind {
    /// Kill the guardians of an area to capture it
    AreaCapture,
    /// Kill every mob of a dungeon wave
    DungeonWave,
}

/// Scripted encounter reference on a spawn point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterRef {
    pub kind: EncounterKind,
    /// Area or dungeon id
    pub key: u32,
    /// Wave number, 0 for area captures
    #[serde(default)]
    pub wave: u32,
    pub required_kills: u32,
    #[serde(default)]
    pub announcement: Option<String>,
}

/// Where a mob lives and how it comes back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPointDef {
    pub id: u32,
    pub npc_id: u32,
    pub map: MapRef,
    pub bounds: PatrolBounds,
    pub respawn_delay_ms: u64,
    /// Combat mob; false for harvestable resource nodes
    #[serde(default = "default_attackable")]
    pub attackable: bool,
    /// Event mob that never respawns
    #[serde(default)]
    pub one_shot: bool,
    #[serde(default)]
    pub encounter: Option<EncounterRef>,
}

fn default_attackable() -> bool {
    true
}

/// Per-map tuning of drop rates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDef {
    pub map: u32,
    #[serde(default = "default_drop_weight")]
    pub drop_weight: f64,
}

fn default_drop_weight() -> f64 {
    1.0
}
