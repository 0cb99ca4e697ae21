//! Kill counters for scripted encounters shared by many mobs.

use std::collections::HashMap;

use log::{debug, info};
use parking_lot::Mutex;
use warband_shared::{EncounterKind, EncounterRef, MapRef};

type EncounterKey = (MapRef, EncounterKind, u32, u32);

/// Result of counting one kill
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncounterProgress {
    /// Still short of the requirement
    Counting { kills: u32, required: u32 },
    /// This kill completed the encounter
    Completed,
}

/// Counters for area captures and dungeon waves.
///
/// One lock for all counters; each kill holds it only long enough to bump a
/// number.
#[derive(Debug, Default)]
pub struct EncounterCounters {
    counters: Mutex<HashMap<EncounterKey, u32>>,
}

impl EncounterCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a kill. A completed encounter starts counting again from zero.
    pub fn record_kill(&self, map: MapRef, encounter: &EncounterRef) -> EncounterProgress {
        let key = (map, encounter.kind, encounter.key, encounter.wave);
        let mut counters = self.counters.lock();
        let kills = counters.entry(key).or_insert(0);
        *kills += 1;

        if *kills >= encounter.required_kills.max(1) {
            counters.remove(&key);
            info!(
                "{:?} {} (wave {}) completed on map {}",
                encounter.kind, encounter.key, encounter.wave, map.map
            );
            EncounterProgress::Completed
        } else {
            debug!(
                "{:?} {} progress {}/{}",
                encounter.kind, encounter.key, kills, encounter.required_kills
            );
            EncounterProgress::Counting {
                kills: *kills,
                required: encounter.required_kills,
            }
        }
    }

    /// Kills counted so far toward an encounter
    pub fn kills(&self, map: MapRef, encounter: &EncounterRef) -> u32 {
        let key = (map, encounter.kind, encounter.key, encounter.wave);
        self.counters.lock().get(&key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(required_kills: u32) -> EncounterRef {
        EncounterRef {
            kind: EncounterKind::DungeonWave,
            key: 7,
            wave: 2,
            required_kills,
            announcement: Some("Wave cleared".into()),
        }
    }

    #[test]
    fn test_wave_completes_on_last_kill() {
        let counters = EncounterCounters::new();
        let map = MapRef::new(1, 301);
        let encounter = wave(3);

        assert_eq!(
            counters.record_kill(map, &encounter),
            EncounterProgress::Counting { kills: 1, required: 3 }
        );
        counters.record_kill(map, &encounter);
        assert_eq!(counters.record_kill(map, &encounter), EncounterProgress::Completed);
        assert_eq!(counters.kills(map, &encounter), 0);
    }

    #[test]
    fn test_maps_count_separately() {
        let counters = EncounterCounters::new();
        let encounter = wave(5);
        counters.record_kill(MapRef::new(1, 301), &encounter);
        counters.record_kill(MapRef::new(2, 301), &encounter);
        assert_eq!(counters.kills(MapRef::new(1, 301), &encounter), 1);
        assert_eq!(counters.kills(MapRef::new(2, 301), &encounter), 1);
    }
}
