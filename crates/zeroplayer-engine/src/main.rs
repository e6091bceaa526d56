//! Engine binary for the zeroplayer simulation.
//!
//! Loads configuration, builds or resumes a world, and runs the tick loop
//! until the tick limit or extinction.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `zeroplayer-config.yaml` (or
//!    `ZEROPLAYER_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the starting world, or restore it from a snapshot file
//! 4. Run the simulation loop, rendering every `render_every` ticks
//! 5. Log the result and save a snapshot if configured

mod error;
mod render;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroplayer_core::{LoggingConfig, Simulation, SimulationConfig, log_simulation_end, run};
use zeroplayer_world::WorldSnapshot;

use crate::error::EngineError;
use crate::render::RenderCallback;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, world construction, the run, or a
/// snapshot file fails.
fn main() -> Result<(), EngineError> {
    let config_path = SimulationConfig::resolve_path();
    let config = SimulationConfig::load_or_default(&config_path)?;

    init_logging(&config.logging);
    info!("zeroplayer-engine starting");
    info!(
        path = %config_path.display(),
        seed = config.world.seed,
        max_ticks = config.world.max_ticks,
        kinds = config.catalog.kinds.len(),
        "Configuration loaded"
    );

    let mut simulation = match &config.world.resume_path {
        Some(path) => {
            let snapshot = load_snapshot(path)?;
            let simulation = Simulation::restore(&config.catalog, &snapshot, config.world.seed)?;
            info!(
                path = %path.display(),
                entities = simulation.world().len(),
                population = simulation.population(),
                "World resumed from snapshot"
            );
            simulation
        }
        None => {
            let simulation = Simulation::from_config(&config)?;
            info!(
                entities = simulation.world().len(),
                population = simulation.population(),
                "Starting world created"
            );
            simulation
        }
    };

    let mut callback = RenderCallback::new(config.world.render_every);
    let result = run(&mut simulation, config.world.max_ticks, &mut callback)?;
    log_simulation_end(&result);

    if let Some(path) = &config.world.save_path {
        save_snapshot(&simulation, path)?;
        info!(path = %path.display(), "World snapshot saved");
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` overrides the configured
/// level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn load_snapshot(path: &Path) -> Result<WorldSnapshot, EngineError> {
    let contents = std::fs::read_to_string(path).map_err(|source| EngineError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| EngineError::SnapshotFormat {
        path: path.to_path_buf(),
        source,
    })
}

fn save_snapshot(simulation: &Simulation, path: &Path) -> Result<(), EngineError> {
    let snapshot = simulation.snapshot()?;
    let json = serde_json::to_string_pretty(&snapshot).map_err(|source| EngineError::SnapshotFormat {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| EngineError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })
}
