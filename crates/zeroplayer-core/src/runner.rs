//! Simulation loop runner.
//!
//! [`run`] drives [`Simulation::tick`] until one of the end conditions is
//! met:
//!
//! - **Tick limit**: `max_ticks` ticks have run (zero means no limit)
//! - **Extinction**: no living creature is left
//!
//! A [`TickCallback`] observes every completed tick, e.g. to render the
//! world.

use tracing::{info, warn};

use crate::tick::{Simulation, TickError, TickSummary};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// The configured number of ticks ran.
    MaxTicksReached,
    /// Every creature died.
    Extinction,
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct RunResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Effect failures across the whole run.
    pub total_failures: usize,
}

/// Callback invoked after each tick completes.
pub trait TickCallback {
    /// Called after a tick completes.
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) {}
}

/// Run the simulation until a termination condition is met.
///
/// A world that starts without creatures still runs until `max_ticks`;
/// extinction is only declared when the last creature dies during the run.
///
/// # Errors
///
/// Returns [`TickError`] if a tick fails unrecoverably.
pub fn run(
    simulation: &mut Simulation,
    max_ticks: u64,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, TickError> {
    let mut total_ticks: u64 = 0;
    let mut total_failures: usize = 0;
    let started_with_life = simulation.population() > 0;

    info!(
        max_ticks,
        population = simulation.population(),
        entities = simulation.world().len(),
        "Simulation starting"
    );

    if max_ticks == 0 && !started_with_life {
        warn!("Unbounded run over a world without creatures would never end");
        return Ok(RunResult {
            end_reason: SimulationEndReason::Extinction,
            final_summary: None,
            total_ticks,
            total_failures,
        });
    }

    loop {
        let summary = simulation.tick()?;
        total_ticks = total_ticks.saturating_add(1);
        total_failures = total_failures.saturating_add(summary.failures.len());

        callback.on_tick(&summary, simulation);

        if started_with_life && summary.population == 0 {
            info!(tick = summary.tick, "All creatures dead -- extinction");
            return Ok(RunResult {
                end_reason: SimulationEndReason::Extinction,
                final_summary: Some(summary),
                total_ticks,
                total_failures,
            });
        }

        if max_ticks > 0 && total_ticks >= max_ticks {
            info!(tick = summary.tick, max_ticks, "Tick limit reached");
            return Ok(RunResult {
                end_reason: SimulationEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
                total_failures,
            });
        }
    }
}

/// Log the end of a run.
pub fn log_simulation_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        total_failures = result.total_failures,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_population = result.final_summary.as_ref().map(|s| s.population),
        "Simulation ended"
    );
    if result.total_ticks == 0 {
        warn!("Simulation ended with no ticks executed");
    }
}
