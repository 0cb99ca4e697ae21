//! Semantic payloads the simulation hands to the host for fan-out.
//!
//! The host owns the wire format. These messages only carry what observers
//! need to know; `serialize` frames them with bincode for hosts that forward
//! them as-is.

use serde::{Deserialize, Serialize};

// =============================================================================
// Identity Types
// =============================================================================

/// Empire (faction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Empire {
    Red = 0,
    Yellow = 1,
    Blue = 2,
}

impl Empire {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Red),
            1 => Some(Self::Yellow),
            2 => Some(Self::Blue),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "Shinsoo",
            Self::Yellow => "Chunjo",
            Self::Blue => "Jinno",
        }
    }
}

/// Something that can hit or be hit by a mob: a character or a companion pet.
///
/// Pets are addressed by their per-map handle, characters by persistent id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantId {
    Character(u64),
    Pet(u64),
}

/// Server shard and map a thing lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapRef {
    pub server: u16,
    pub map: u32,
}

impl MapRef {
    pub fn new(server: u16, map: u32) -> Self {
        Self { server, map }
    }
}

// =============================================================================
// Server -> Observer Messages
// =============================================================================

/// Messages produced by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Mob is walking or running from `start` to `end`
    MobMove {
        handle: u32,
        start: [f32; 2],
        end: [f32; 2],
        speed: f32,
    },

    /// Mob landed (or missed, `damage == 0`) a basic attack
    MobAttack {
        handle: u32,
        target: CombatantId,
        damage: u32,
        target_new_health: u32,
    },

    /// Mob cast a skill on its target
    MobSkill {
        handle: u32,
        skill_id: u32,
        target: CombatantId,
        damage: u32,
        target_new_health: u32,
    },

    /// Mob was hit by something
    MobDamaged {
        handle: u32,
        attacker: CombatantId,
        damage: u32,
        health: u32,
        max_health: u32,
    },

    /// Mob died
    MobDeath {
        handle: u32,
        killer: Option<CombatantId>,
    },

    /// Mob came back at a fresh position
    MobRespawn {
        handle: u32,
        position: [f32; 2],
        health: u32,
    },

    /// One-time mob removed for good
    MobDespawn {
        handle: u32,
    },

    /// Item dropped on the ground
    ItemSpawn {
        entity_id: u64,
        item_id: u32,
        quantity: u32,
        plus: u8,
        position: [f32; 2],
        owner: Option<u64>,
    },

    /// Item was picked up or expired
    ItemDespawn {
        entity_id: u64,
    },

    /// Item went straight into a character's inventory
    ItemGranted {
        character_id: u64,
        item_id: u32,
        quantity: u32,
        plus: u8,
        slot: u16,
    },

    /// Gold credited from a kill
    GoldGained {
        character_id: u64,
        amount: u64,
    },

    /// Experience credited from a kill
    ExperienceGained {
        character_id: u64,
        amount: u64,
    },

    /// Announcement text (boss kills, captured areas, cleared waves)
    Announcement {
        text: String,
    },
}

impl ServerMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Mob handle this message is about, if any
    pub fn mob_handle(&self) -> Option<u32> {
        match self {
            Self::MobMove { handle, .. }
            | Self::MobAttack { handle, .. }
            | Self::MobSkill { handle, .. }
            | Self::MobDamaged { handle, .. }
            | Self::MobDeath { handle, .. }
            | Self::MobRespawn { handle, .. }
            | Self::MobDespawn { handle } => Some(*handle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framed_message_keeps_payload() {
        let msg = ServerMessage::MobAttack {
            handle: 7,
            target: CombatantId::Pet(33),
            damage: 12,
            target_new_health: 88,
        };
        let bytes = msg.serialize().unwrap();
        assert_eq!(ServerMessage::deserialize(&bytes).unwrap(), msg);
        assert_eq!(msg.mob_handle(), Some(7));
    }

    #[test]
    fn test_empire_from_u8() {
        assert_eq!(Empire::from_u8(2), Some(Empire::Blue));
        assert_eq!(Empire::from_u8(9), None);
    }
}
