//! Cancellable movement stepper.
//!
//! Starting a movement stamps the mob with a fresh token. Every scheduled leg
//! carries the token it was started with and does nothing once the mob's
//! token has moved on.

use log::{debug, trace};
use rand::Rng;
use warband_shared::ServerMessage;

use crate::config::EngineConfig;
use crate::entities::{Mob, MobState};
use crate::geometry::Vec2;
use crate::scheduler::{Job, MoveStep, Scheduled};
use crate::world::{Broadcaster, Scope};

/// Begin moving towards `end`, invalidating any movement in flight.
/// Returns the first leg, due immediately.
pub fn start_movement<R: Rng + ?Sized>(
    rng: &mut R,
    mob: &Mob,
    state: &mut MobState,
    end: Vec2,
    speed: f32,
) -> Scheduled {
    let mut token = rng.gen::<u64>();
    while state.movement_token == Some(token) {
        token = rng.gen::<u64>();
    }
    state.movement_token = Some(token);
    trace!("Mob {} moving to ({:.1}, {:.1}) at {}", mob.handle, end.x, end.z, speed);

    Scheduled::now(Job::MoveStep(MoveStep {
        mob: mob.id,
        token,
        start: state.position,
        end,
        speed,
    }))
}

/// Run one leg. Returns the next leg, or `None` when the chain ends.
pub fn step(
    config: &EngineConfig,
    broadcaster: &dyn Broadcaster,
    mob: &Mob,
    state: &mut MobState,
    leg: MoveStep,
) -> Option<Scheduled> {
    if state.movement_token != Some(leg.token) {
        trace!("Mob {} dropped stale movement step", mob.handle);
        return None;
    }

    let remaining = leg.start.distance_to(leg.end);
    if remaining < config.arrive_epsilon {
        state.position = leg.end;
        state.halt();
        return None;
    }
    if leg.speed <= 0.0 {
        debug!("Mob {} cannot move at speed {}", mob.handle, leg.speed);
        state.halt();
        return None;
    }

    broadcaster.notify(
        Scope::NearMob { map: mob.map, handle: mob.handle },
        ServerMessage::MobMove {
            handle: mob.handle,
            start: leg.start.to_array(),
            end: leg.end.to_array(),
            speed: leg.speed,
        },
    );

    if config.step_interval_ms == 0 {
        state.position = leg.end;
        state.halt();
        return None;
    }

    let interval_secs = config.step_interval_ms as f32 / 1000.0;
    let travel = leg.speed * interval_secs;
    let next_start = leg.start.move_towards(leg.end, travel);
    state.position = next_start;

    let left = next_start.distance_to(leg.end);
    let delay_ms = if left <= travel {
        (left / leg.speed * 1000.0).round() as u64
    } else {
        config.step_interval_ms
    };

    Some(Scheduled::after(
        delay_ms,
        Job::MoveStep(MoveStep { start: next_start, ..leg }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MobId;
    use crate::world::sandbox::RecordingBroadcaster;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use warband_shared::{MapRef, NpcDef, PatrolBounds, SpawnPointDef};

    fn mob() -> Mob {
        let npc: NpcDef = serde_json::from_str(
            r#"{ "id": 1, "name": "Boar", "level": 1, "max_health": 10,
                 "min_attack": 1, "max_attack": 2, "walk_speed": 2.0, "run_speed": 5.0 }"#,
        )
        .unwrap();
        let spawn = SpawnPointDef {
            id: 1,
            npc_id: 1,
            map: MapRef::new(1, 1),
            bounds: PatrolBounds::from_corners(0.0, 0.0, 0.0, 0.0),
            respawn_delay_ms: 1000,
            attackable: true,
            one_shot: false,
            encounter: None,
        };
        Mob::new(MobId(0), 1, &spawn, &npc)
    }

    fn as_leg(scheduled: &Scheduled) -> MoveStep {
        match scheduled.job {
            Job::MoveStep(leg) => leg,
            other => panic!("expected a movement leg, got {:?}", other),
        }
    }

    #[test]
    fn test_reaches_target_in_three_steps() {
        let config = EngineConfig::default();
        let broadcaster = RecordingBroadcaster::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mob = mob();
        let mut state = mob.state();

        let mut next = Some(start_movement(&mut rng, &mob, &mut state, Vec2::new(10.0, 0.0), 5.0));
        let mut steps = 0;
        let mut delays = Vec::new();
        while let Some(scheduled) = next {
            steps += 1;
            delays.push(scheduled.delay_ms);
            next = step(&config, &broadcaster, &mob, &mut state, as_leg(&scheduled));
            assert!(steps <= 3);
        }

        assert_eq!(steps, 3);
        assert_eq!(delays, vec![0, 1000, 0]);
        assert_eq!(state.position, Vec2::new(10.0, 0.0));
        assert!(!state.is_moving());
        assert_eq!(broadcaster.messages().len(), 2);
    }

    #[test]
    fn test_stale_leg_is_a_no_op() {
        let config = EngineConfig::default();
        let broadcaster = RecordingBroadcaster::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mob = mob();
        let mut state = mob.state();

        let old = start_movement(&mut rng, &mob, &mut state, Vec2::new(50.0, 0.0), 5.0);
        let fresh = start_movement(&mut rng, &mob, &mut state, Vec2::new(0.0, 50.0), 5.0);
        assert_ne!(as_leg(&old).token, as_leg(&fresh).token);

        assert!(step(&config, &broadcaster, &mob, &mut state, as_leg(&old)).is_none());
        assert!(broadcaster.messages().is_empty());
        assert_eq!(state.position, Vec2::default());
        assert!(state.is_moving());

        assert!(step(&config, &broadcaster, &mob, &mut state, as_leg(&fresh)).is_some());
        assert_eq!(state.position, Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_partial_final_leg_uses_proportional_delay() {
        let config = EngineConfig::default();
        let broadcaster = RecordingBroadcaster::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mob = mob();
        let mut state = mob.state();

        let first = start_movement(&mut rng, &mob, &mut state, Vec2::new(7.0, 0.0), 5.0);
        let second = step(&config, &broadcaster, &mob, &mut state, as_leg(&first)).unwrap();
        // 2 units left at 5 units per second
        assert_eq!(second.delay_ms, 400);
    }

    #[test]
    fn test_zero_interval_finishes_in_one_burst() {
        let config = EngineConfig {
            step_interval_ms: 0,
            ..EngineConfig::default()
        };
        let broadcaster = RecordingBroadcaster::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mob = mob();
        let mut state = mob.state();

        let first = start_movement(&mut rng, &mob, &mut state, Vec2::new(10.0, 0.0), 5.0);
        assert!(step(&config, &broadcaster, &mob, &mut state, as_leg(&first)).is_none());
        assert_eq!(state.position, Vec2::new(10.0, 0.0));
        assert!(!state.is_moving());
        assert_eq!(broadcaster.messages().len(), 1);
    }
}
