//! Mob simulation engine.
//!
//! Perception, movement, combat, death and loot of every NPC on a game
//! server. The host owns characters, inventories and networking and plugs
//! them in through the traits in `world`.

pub mod ai;
pub mod combat;
pub mod commands;
pub mod config;
pub mod death;
pub mod driver;
pub mod engine;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod loot;
pub mod movement;
pub mod scheduler;
pub mod world;

pub use config::EngineConfig;
pub use engine::{Collaborators, Engine};
pub use error::{EngineError, EngineResult, InventoryError, LoadError};
