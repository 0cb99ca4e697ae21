//! Mob skill definitions.

use serde::{Deserialize, Serialize};

/// Skill a mob may cast instead of a basic attack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDef {
    /// Unique skill ID
    pub id: u32,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Mana spent per cast
    #[serde(default)]
    pub mana_cost: u32,
    /// Rolls against the arts stat pair instead of physical attack
    #[serde(default = "default_arts")]
    pub arts: bool,
    /// Damage scale applied to the rolled value, in percent
    #[serde(default = "default_power")]
    pub power_pct: u32,
}

fn default_arts() -> bool {
    true
}

fn default_power() -> u32 {
    100
}

impl SkillDef {
    /// Whether a caster with `mana` left can afford this skill
    pub fn affordable(&self, mana: u32) -> bool {
        mana >= self.mana_cost
    }
}
