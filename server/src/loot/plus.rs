//! Upgrade level of a freshly dropped item.

use rand::Rng;
use warband_shared::{ItemDef, PER_MILLE};

use crate::config::EngineConfig;

/// Roll the `+N` level for an item. Items with a fixed level always get it;
/// items outside the upgradable families are always `+0`.
pub fn roll_plus<R: Rng + ?Sized>(rng: &mut R, config: &EngineConfig, item: &ItemDef) -> u8 {
    if let Some(plus) = item.fixed_plus {
        return plus;
    }
    let Some(table) = item
        .item_type
        .plus_family()
        .and_then(|family| config.plus_rates.get(&family))
    else {
        return 0;
    };
    if table.is_empty() {
        return 0;
    }

    let seed = rng.gen_range(0..PER_MILLE);
    let level = table.partition_point(|cumulative| *cumulative <= seed);
    level.min(table.len() - 1).min(u8::MAX as usize) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use warband_shared::ItemType;

    fn item(item_type: ItemType, fixed_plus: Option<u8>) -> ItemDef {
        ItemDef {
            id: 1,
            name: "Test".into(),
            item_type,
            max_stack: 1,
            timed: false,
            relic: false,
            prerequisites: Vec::new(),
            fixed_plus,
        }
    }

    #[test]
    fn test_weapon_levels_follow_table() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(13);
        let sword = item(ItemType::Weapon, None);
        let mut counts = [0u32; 5];
        for _ in 0..5000 {
            counts[roll_plus(&mut rng, &config, &sword) as usize] += 1;
        }
        // +0 covers 70% of the table
        assert!(counts[0] > 3000 && counts[0] < 4000, "{:?}", counts);
        assert!(counts[0] > counts[1] && counts[1] > counts[2]);
    }

    #[test]
    fn test_fixed_and_plain_items() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_plus(&mut rng, &config, &item(ItemType::Armor, Some(7))), 7);
        for _ in 0..100 {
            assert_eq!(roll_plus(&mut rng, &config, &item(ItemType::Material, None)), 0);
        }
    }
}
