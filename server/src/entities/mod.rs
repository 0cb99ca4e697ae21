//! Server-side entity definitions.

mod damage_ledger;
mod item;
mod mob;
pub mod player;

pub use damage_ledger::DamageLedger;
pub use item::{TakeError, WorldItem, WorldItems};
pub use mob::{Mob, MobId, MobState, Phase};
pub use player::{InventorySlot, ServerPet, ServerPlayer, INVENTORY_SIZE};
