//! Item and drop-table definitions shared between the simulation and its host.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Probability scale used by drop tables
pub const PER_MILLE: u32 = 1000;

/// Item definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: u32,
    pub name: String,
    pub item_type: ItemType,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Expires after a while; quantity carries the duration
    #[serde(default)]
    pub timed: bool,
    /// Controlled relic only granted to holders of `prerequisites`
    #[serde(default)]
    pub relic: bool,
    #[serde(default)]
    pub prerequisites: Vec<u32>,
    /// Always drops with this upgrade level
    #[serde(default)]
    pub fixed_plus: Option<u8>,
}

fn default_max_stack() -> u32 {
    1
}

/// Item types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Weapon,
    Armor,
    Accessory,
    Socket,
    Consumable,
    Material,
    Quest,
    Ingredient,
}

impl ItemType {
    /// Quest and ingredient items are never dropped loose
    pub fn drops_loose(&self) -> bool {
        !matches!(self, Self::Quest | Self::Ingredient)
    }

    /// Upgradable item families with their own plus-rate table
    pub fn plus_family(&self) -> Option<PlusFamily> {
        match self {
            Self::Weapon => Some(PlusFamily::Weapon),
            Self::Armor => Some(PlusFamily::Armor),
            Self::Accessory => Some(PlusFamily::Accessory),
            Self::Socket => Some(PlusFamily::Socket),
            _ => None,
        }
    }
}

/// Families of upgradable items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlusFamily {
    Weapon,
    Armor,
    Accessory,
    Socket,
}

/// Inclusive quantity range for a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRange {
    pub min: u32,
    pub max: u32,
}

/// One weighted drop table.
///
/// `cumulative[i]` is the running per-mille total up to and including
/// `items[i]`. Anything above the last entry is the "no drop" gap. An item id
/// listed in `chained` is a container refined by rolling the referenced node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropNode {
    pub id: u32,
    pub items: Vec<u32>,
    pub cumulative: Vec<u32>,
    #[serde(default)]
    pub quantities: HashMap<u32, QuantityRange>,
    #[serde(default)]
    pub chained: HashMap<u32, u32>,
}

impl DropNode {
    /// Total per-mille chance that something drops
    pub fn total(&self) -> u32 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Check the table is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.items.len() != self.cumulative.len() {
            return Err(format!(
                "drop node {} has {} items but {} probabilities",
                self.id,
                self.items.len(),
                self.cumulative.len()
            ));
        }
        if self.cumulative.windows(2).any(|w| w[0] > w[1]) {
            return Err(format!("drop node {} probabilities are not ascending", self.id));
        }
        if self.total() > PER_MILLE {
            return Err(format!("drop node {} exceeds {} per mille", self.id, PER_MILLE));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(cumulative: Vec<u32>) -> DropNode {
        DropNode {
            id: 1,
            items: (0..cumulative.len() as u32).collect(),
            cumulative,
            ..Default::default()
        }
    }

    #[test]
    fn test_drop_node_validation() {
        assert!(node(vec![100, 250, 400]).validate().is_ok());
        assert!(node(vec![100, 50]).validate().is_err());
        assert!(node(vec![600, 1200]).validate().is_err());

        let mut mismatched = node(vec![100]);
        mismatched.items.push(9);
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_quest_items_never_drop_loose() {
        assert!(!ItemType::Quest.drops_loose());
        assert!(!ItemType::Ingredient.drops_loose());
        assert!(ItemType::Weapon.drops_loose());
        assert_eq!(ItemType::Socket.plus_family(), Some(PlusFamily::Socket));
        assert_eq!(ItemType::Material.plus_family(), None);
    }
}
