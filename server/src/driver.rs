//! Real-time driver: maps wall-clock time onto the engine's job queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{error, info, warn};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::engine::Engine;

/// Drive `engine` until `shutdown` resolves.
///
/// Every interval the jobs that fell due are taken off the queue and each
/// runs as its own task. A panicking job is recovered the same way the
/// synchronous driver does it. Follow-ups count from the drain time, so
/// tick periods stretch by up to one `driver_resolution_ms`.
pub async fn run<S>(engine: Arc<Engine>, shutdown: S)
where
    S: Future<Output = ()>,
{
    let resolution = Duration::from_millis(engine.config().driver_resolution_ms.max(1));
    let mut ticker = interval(resolution);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let origin = engine.now();
    let started = Instant::now();
    engine.start();
    info!("Driver running at {:?} resolution", resolution);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Driver stopping with {} jobs pending", engine.pending_jobs());
                break;
            }
            _ = ticker.tick() => {
                let now = origin + started.elapsed().as_millis() as u64;
                let due = engine.drain_due(now);
                if due.is_empty() {
                    continue;
                }

                let tasks: Vec<_> = due
                    .iter()
                    .map(|job| {
                        let engine = Arc::clone(&engine);
                        let job = *job;
                        tokio::spawn(async move { engine.execute(job) })
                    })
                    .collect();

                for (job, result) in due.into_iter().zip(join_all(tasks).await) {
                    match result {
                        Ok(follow_ups) => engine.schedule(follow_ups),
                        Err(e) if e.is_panic() => {
                            error!("Job {:?} panicked, recovering", job);
                            engine.schedule(engine.recover(job));
                        }
                        Err(e) => warn!("Job {:?} did not finish: {}", job, e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Collaborators;
    use crate::world::sandbox::{RecordingBroadcaster, SandboxWorld};
    use crate::world::{ReferenceData, ReferenceDocument};

    #[tokio::test]
    async fn test_driver_runs_ticks_until_shutdown() {
        let doc: ReferenceDocument = serde_json::from_str(
            r#"{
                "npcs": [{ "id": 1, "name": "Rat", "level": 1, "max_health": 10,
                           "min_attack": 1, "max_attack": 2, "walk_speed": 1.0, "run_speed": 2.0 }],
                "spawn_points": [
                    { "id": 1, "npc_id": 1, "map": { "server": 1, "map": 1 },
                      "bounds": { "min_x": 0, "min_z": 0, "max_x": 5, "max_z": 5 },
                      "respawn_delay_ms": 1000 }
                ]
            }"#,
        )
        .unwrap();
        let config = EngineConfig {
            tick_base_ms: 10,
            tick_jitter_ms: 0,
            driver_resolution_ms: 5,
            ..EngineConfig::default()
        };
        let world = Arc::new(SandboxWorld::new());
        let engine = Arc::new(Engine::new(
            config,
            ReferenceData::from_document(doc),
            Collaborators {
                directory: world.clone(),
                rewards: world,
                broadcaster: Arc::new(RecordingBroadcaster::new()),
            },
        ));

        run(engine.clone(), tokio::time::sleep(Duration::from_millis(200))).await;

        assert!(engine.now() > 0);
        // the mob's tick loop re-arms itself
        assert_eq!(engine.pending_jobs(), 1);
    }
}
