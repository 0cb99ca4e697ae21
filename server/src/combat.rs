//! Damage formulas.
//!
//! Everything here is a pure function of the stats, the config and the RNG.
//! A result of 0 is a miss or a dodge, never an error.

use log::trace;
use rand::Rng;
use warband_shared::{CombatStats, SkillDef};

use crate::config::EngineConfig;

/// What kind of blow is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    Basic,
    /// Skills roll arts stats when `arts` is set and scale by `power_pct`
    Skill { arts: bool, power_pct: u32 },
}

impl AttackKind {
    pub fn from_skill(skill: &SkillDef) -> Self {
        Self::Skill {
            arts: skill.arts,
            power_pct: skill.power_pct,
        }
    }

    fn uses_arts(&self) -> bool {
        matches!(self, Self::Skill { arts: true, .. })
    }

    fn power(&self) -> f64 {
        match self {
            Self::Basic => 1.0,
            Self::Skill { power_pct, .. } => f64::from(*power_pct) / 100.0,
        }
    }
}

fn attack_pair(stats: &CombatStats, kind: AttackKind) -> (u32, u32) {
    let (min, max) = if kind.uses_arts() {
        (stats.min_arts, stats.max_arts)
    } else {
        (stats.min_attack, stats.max_attack)
    };
    (min.min(max), min.max(max))
}

fn defense_for(stats: &CombatStats, kind: AttackKind) -> u32 {
    if kind.uses_arts() {
        stats.arts_defense
    } else {
        stats.defense
    }
}

/// Keep a landed hit at or above the floor and at or below what the
/// defender has left (unless that is below the floor itself)
fn floor_and_cap(raw: u32, defender: &CombatStats, floor: u32) -> u32 {
    raw.max(floor).min(defender.health.max(floor))
}

/// Accuracy check for attackers far below their defender's level
pub fn pve_misses<R: Rng + ?Sized>(
    rng: &mut R,
    config: &EngineConfig,
    attacker: &CombatStats,
    defender: &CombatStats,
) -> bool {
    let gap = defender.level.saturating_sub(attacker.level);
    if gap <= config.miss_level_threshold {
        return false;
    }
    let required = f64::from(gap) * config.accuracy_per_level;
    let hit_chance = if required > 0.0 {
        (f64::from(attacker.accuracy) / required).clamp(0.0, 1.0)
    } else {
        1.0
    };
    !rng.gen_bool(hit_chance)
}

/// Player-versus-mob or mob-versus-player damage.
///
/// `attacker_npc` is the NPC id when a mob is attacking; bosses listed in
/// `boss_damage_pct` hit for a fixed share of the defender's max health.
pub fn pve_damage<R: Rng + ?Sized>(
    rng: &mut R,
    config: &EngineConfig,
    attacker: &CombatStats,
    attacker_npc: Option<u32>,
    defender: &CombatStats,
    kind: AttackKind,
) -> u32 {
    if pve_misses(rng, config, attacker, defender) {
        trace!(
            "PvE miss: level {} vs {}, accuracy {}",
            attacker.level,
            defender.level,
            attacker.accuracy
        );
        return 0;
    }

    if let Some(pct) = attacker_npc.and_then(|id| config.boss_damage_pct.get(&id)) {
        let fixed = (u64::from(defender.max_health) * u64::from(*pct) / 100) as u32;
        return floor_and_cap(fixed, defender, config.damage_floor);
    }

    let (min, max) = attack_pair(attacker, kind);
    let rolled = (f64::from(rng.gen_range(min..=max)) * kind.power()) as u32;
    let raw = rolled.saturating_sub(defense_for(defender, kind));
    floor_and_cap(raw, defender, config.damage_floor)
}

/// Dodge check for character-versus-character fights
pub fn pvp_dodges<R: Rng + ?Sized>(
    rng: &mut R,
    config: &EngineConfig,
    attacker: &CombatStats,
    defender: &CombatStats,
) -> bool {
    let level_diff = i64::from(defender.level) - i64::from(attacker.level);
    if level_diff.unsigned_abs() > u64::from(config.pvp_dodge_level_window) {
        return false;
    }
    let percent = i64::from(defender.dodge) - i64::from(attacker.accuracy)
        + (level_diff as f64 * config.pvp_dodge_per_level) as i64;
    let chance = (percent as f64 / 100.0).clamp(0.0, config.pvp_max_dodge.clamp(0.0, 1.0));
    chance > 0.0 && rng.gen_bool(chance)
}

/// Character-versus-character damage
pub fn pvp_damage<R: Rng + ?Sized>(
    rng: &mut R,
    config: &EngineConfig,
    attacker: &CombatStats,
    defender: &CombatStats,
    kind: AttackKind,
) -> u32 {
    if pvp_dodges(rng, config, attacker, defender) {
        trace!("PvP dodge: dodge {} vs accuracy {}", defender.dodge, attacker.accuracy);
        return 0;
    }

    let (min, max) = attack_pair(attacker, kind);
    let low = f64::from(min) * config.pvp_min_scale;
    let high = f64::from(max) * config.pvp_max_scale;
    let rolled = if high > low { rng.gen_range(low..=high) } else { low.max(high) };
    let raw = rolled * kind.power() - f64::from(defense_for(defender, kind)) * config.pvp_defense_factor;

    if raw <= 0.0 {
        return 0;
    }
    floor_and_cap(raw.round() as u32, defender, config.damage_floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stats(level: u32, min: u32, max: u32, defense: u32) -> CombatStats {
        CombatStats {
            level,
            health: 500,
            max_health: 500,
            min_attack: min,
            max_attack: max,
            min_arts: min * 2,
            max_arts: max * 2,
            defense,
            arts_defense: defense,
            accuracy: 50,
            dodge: 10,
        }
    }

    #[test]
    fn test_pve_damage_stays_in_expected_band() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let attacker = stats(10, 10, 20, 0);
        let defender = stats(10, 0, 0, 5);
        for _ in 0..1000 {
            let dmg = pve_damage(&mut rng, &config, &attacker, None, &defender, AttackKind::Basic);
            assert!((3..=15).contains(&dmg), "damage {} out of band", dmg);
        }
    }

    #[test]
    fn test_damage_is_zero_or_at_least_floor() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for level in [1, 5, 20, 40] {
            let attacker = stats(level, 1, 30, 0);
            let defender = stats(25, 1, 30, 18);
            for _ in 0..300 {
                let pve = pve_damage(&mut rng, &config, &attacker, None, &defender, AttackKind::Basic);
                let pvp = pvp_damage(&mut rng, &config, &attacker, &defender, AttackKind::Basic);
                assert!(pve == 0 || pve >= 3);
                assert!(pvp == 0 || pvp >= 3);
            }
        }
    }

    #[test]
    fn test_damage_capped_at_remaining_health() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let attacker = stats(10, 100, 120, 0);
        let mut defender = stats(10, 0, 0, 0);
        defender.health = 40;
        let dmg = pve_damage(&mut rng, &config, &attacker, None, &defender, AttackKind::Basic);
        assert_eq!(dmg, 40);
    }

    #[test]
    fn test_low_level_attacker_without_accuracy_always_misses() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut attacker = stats(1, 10, 20, 0);
        attacker.accuracy = 0;
        let defender = stats(30, 0, 0, 0);
        for _ in 0..100 {
            assert_eq!(
                pve_damage(&mut rng, &config, &attacker, None, &defender, AttackKind::Basic),
                0
            );
        }
        // Within the threshold nobody misses
        let close = stats(5, 0, 0, 0);
        assert!(!pve_misses(&mut rng, &config, &attacker, &close));
    }

    #[test]
    fn test_boss_hits_for_share_of_max_health() {
        let mut config = EngineConfig::default();
        config.boss_damage_pct.insert(900, 25);
        let mut rng = StdRng::seed_from_u64(3);
        let boss = stats(60, 1, 2, 0);
        let defender = stats(60, 0, 0, 1000);
        let dmg = pve_damage(&mut rng, &config, &boss, Some(900), &defender, AttackKind::Basic);
        assert_eq!(dmg, 125);
    }

    #[test]
    fn test_skills_use_arts_stats() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let attacker = stats(10, 10, 10, 0);
        let defender = stats(10, 0, 0, 0);
        let skill = AttackKind::Skill { arts: true, power_pct: 150 };
        assert_eq!(pve_damage(&mut rng, &config, &attacker, None, &defender, skill), 30);
    }

    #[test]
    fn test_pvp_roll_is_scaled_and_dampened() {
        let mut config = EngineConfig::default();
        config.pvp_dodge_level_window = 0;
        let mut rng = StdRng::seed_from_u64(9);
        let attacker = stats(10, 100, 200, 0);
        let mut defender = stats(30, 0, 0, 50);
        defender.health = 10_000;
        for _ in 0..500 {
            let dmg = pvp_damage(&mut rng, &config, &attacker, &defender, AttackKind::Basic);
            // [102, 194] minus 30
            assert!((72..=164).contains(&dmg), "pvp damage {}", dmg);
        }
    }

    #[test]
    fn test_pvp_heavy_armor_absorbs_everything() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let attacker = stats(10, 1, 2, 0);
        let defender = stats(40, 0, 0, 500);
        assert_eq!(pvp_damage(&mut rng, &config, &attacker, &defender, AttackKind::Basic), 0);
    }
}
