//! Error types for the mob simulation.

use thiserror::Error;

/// Failures of engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// No mob with that handle
    #[error("unknown mob handle {0}")]
    UnknownMob(u32),
    /// Reference data has no NPC with that id
    #[error("missing NPC definition {0}")]
    MissingNpc(u32),
    /// Reference data has no spawn point with that id
    #[error("missing spawn point {0}")]
    MissingSpawn(u32),
    /// No character with that id is online
    #[error("unknown character {0}")]
    UnknownCharacter(u64),
    /// No item on the ground with that id
    #[error("unknown world item {0}")]
    UnknownWorldItem(u64),
    /// The action is not allowed right now
    #[error("{0}")]
    Rejected(&'static str),
    /// Inventory collaborator refused the grant
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Failures reported by the inventory collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// No free slot for the item
    #[error("inventory full")]
    Full,
    /// Character is not known to the inventory service
    #[error("character {0} not found")]
    UnknownCharacter(u64),
}

/// Failures loading configuration or reference data
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Json(String, #[source] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
