//! Static reference data: NPCs, spawn points, drop tables, items, skills.
//!
//! Loaded once at startup and never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use warband_shared::{DropNode, ItemDef, NpcDef, SkillDef, SpawnPointDef, ZoneDef};

use crate::error::LoadError;

/// On-disk layout of the reference data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceDocument {
    pub npcs: Vec<NpcDef>,
    pub spawn_points: Vec<SpawnPointDef>,
    pub drop_tables: Vec<DropNode>,
    pub items: Vec<ItemDef>,
    pub skills: Vec<SkillDef>,
    pub zones: Vec<ZoneDef>,
}

/// Indexed reference data
#[derive(Debug, Default)]
pub struct ReferenceData {
    npcs: HashMap<u32, NpcDef>,
    /// Kept in file order so mob ids are stable between runs
    spawn_points: Vec<SpawnPointDef>,
    spawn_index: HashMap<u32, usize>,
    drop_nodes: HashMap<u32, DropNode>,
    items: HashMap<u32, ItemDef>,
    skills: HashMap<u32, SkillDef>,
    zone_weights: HashMap<u32, f64>,
}

impl ReferenceData {
    /// Load and index a reference document from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(path.display().to_string(), e))?;
        let doc: ReferenceDocument = serde_json::from_str(&content)
            .map_err(|e| LoadError::Json(path.display().to_string(), e))?;
        Ok(Self::from_document(doc))
    }

    /// Index a document, dropping entries that cannot be used
    pub fn from_document(doc: ReferenceDocument) -> Self {
        let npcs: HashMap<u32, NpcDef> = doc.npcs.into_iter().map(|n| (n.id, n)).collect();

        let mut drop_nodes = HashMap::new();
        for node in doc.drop_tables {
            match node.validate() {
                Ok(()) => {
                    drop_nodes.insert(node.id, node);
                }
                Err(e) => warn!("Skipping drop table: {}", e),
            }
        }

        let spawn_points: Vec<SpawnPointDef> = doc
            .spawn_points
            .into_iter()
            .filter(|sp| {
                let known = npcs.contains_key(&sp.npc_id);
                if !known {
                    warn!("Spawn point {} references unknown NPC {}", sp.id, sp.npc_id);
                }
                known
            })
            .collect();

        let spawn_index = spawn_points
            .iter()
            .enumerate()
            .map(|(idx, sp)| (sp.id, idx))
            .collect();

        let data = Self {
            npcs,
            spawn_points,
            spawn_index,
            drop_nodes,
            items: doc.items.into_iter().map(|i| (i.id, i)).collect(),
            skills: doc.skills.into_iter().map(|s| (s.id, s)).collect(),
            zone_weights: doc.zones.into_iter().map(|z| (z.map, z.drop_weight)).collect(),
        };

        info!(
            "Reference data: {} NPCs, {} spawn points, {} drop tables, {} items, {} skills",
            data.npcs.len(),
            data.spawn_points.len(),
            data.drop_nodes.len(),
            data.items.len(),
            data.skills.len()
        );
        data
    }

    pub fn npc(&self, id: u32) -> Option<&NpcDef> {
        self.npcs.get(&id)
    }

    pub fn spawn_points(&self) -> &[SpawnPointDef] {
        &self.spawn_points
    }

    pub fn spawn_point(&self, id: u32) -> Option<&SpawnPointDef> {
        self.spawn_index.get(&id).and_then(|idx| self.spawn_points.get(*idx))
    }

    pub fn drop_node(&self, id: u32) -> Option<&DropNode> {
        self.drop_nodes.get(&id)
    }

    pub fn item(&self, id: u32) -> Option<&ItemDef> {
        self.items.get(&id)
    }

    pub fn skill(&self, id: u32) -> Option<&SkillDef> {
        self.skills.get(&id)
    }

    /// Drop-rate weight of a map, 1.0 when unlisted
    pub fn zone_weight(&self, map: u32) -> f64 {
        self.zone_weights.get(&map).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rows_are_dropped() {
        let doc: ReferenceDocument = serde_json::from_str(
            r#"{
                "npcs": [{ "id": 1, "name": "Boar", "level": 2, "max_health": 40,
                           "min_attack": 3, "max_attack": 5, "walk_speed": 1.5, "run_speed": 4.0 }],
                "spawn_points": [
                    { "id": 10, "npc_id": 1, "map": { "server": 1, "map": 4 },
                      "bounds": { "min_x": 0, "min_z": 0, "max_x": 10, "max_z": 10 },
                      "respawn_delay_ms": 10000 },
                    { "id": 11, "npc_id": 99, "map": { "server": 1, "map": 4 },
                      "bounds": { "min_x": 0, "min_z": 0, "max_x": 10, "max_z": 10 },
                      "respawn_delay_ms": 10000 }
                ],
                "drop_tables": [
                    { "id": 5, "items": [1, 2], "cumulative": [100, 300] },
                    { "id": 6, "items": [1, 2], "cumulative": [300, 100] }
                ],
                "zones": [{ "map": 4, "drop_weight": 1.5 }]
            }"#,
        )
        .unwrap();

        let data = ReferenceData::from_document(doc);
        assert_eq!(data.spawn_points().len(), 1);
        assert!(data.spawn_point(10).map(|sp| sp.attackable).unwrap_or(false));
        assert!(data.drop_node(5).is_some());
        assert!(data.drop_node(6).is_none());
        assert_eq!(data.zone_weight(4), 1.5);
        assert_eq!(data.zone_weight(5), 1.0);
    }
}
