//! Headless mob simulation server
//!
//! Loads the reference data and a sandbox population, runs the engine in
//! real time and accepts operator commands on stdin.

use std::sync::Arc;

use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use warband_server::commands;
use warband_server::driver;
use warband_server::world::sandbox::{LogBroadcaster, SandboxWorld};
use warband_server::world::ReferenceData;
use warband_server::{Collaborators, Engine, EngineConfig};

const CONFIG_PATH: &str = "config.json";
const REFERENCE_PATH: &str = "data/reference.json";
const SANDBOX_PATH: &str = "data/sandbox.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting mob server...");

    let mut args = std::env::args().skip(1);
    let reference_path = args.next().unwrap_or_else(|| REFERENCE_PATH.to_string());
    let sandbox_path = args.next().unwrap_or_else(|| SANDBOX_PATH.to_string());

    let config = EngineConfig::load_or_default(CONFIG_PATH)?;
    let data = ReferenceData::load(&reference_path)?;
    let world = Arc::new(SandboxWorld::load(&sandbox_path)?);

    let engine = Arc::new(Engine::new(
        config,
        data,
        Collaborators {
            directory: world.clone(),
            rewards: world,
            broadcaster: Arc::new(LogBroadcaster),
        },
    ));
    info!("Spawned {} mobs", engine.mobs().len());

    // Operator console
    let console_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(result) = commands::parse_and_execute(&line, &console_engine) {
                        if result.success {
                            println!("{}", result.message);
                        } else {
                            println!("error: {}", result.message);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Console read failed: {}", e);
                    break;
                }
            }
        }
    });

    driver::run(engine, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!("Server stopped");
    Ok(())
}
