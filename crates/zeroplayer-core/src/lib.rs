//! Configuration, tick driver, and run loop for the zeroplayer simulation.
//!
//! This crate owns the two-pass tick that drives the simulation: a decide
//! pass that schedules effects and an apply pass that drains them in phase
//! order.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `zeroplayer-config.yaml` into
//!   strongly-typed structs.
//! - [`runner`] -- The run loop with its end conditions.
//! - [`tick`] -- [`Simulation`] and the single-tick cycle.

pub mod config;
pub mod runner;
pub mod tick;

// Re-export primary types at crate root.
pub use config::{ConfigError, LoggingConfig, SimulationConfig, WorldConfig};
pub use runner::{NoOpCallback, RunResult, SimulationEndReason, TickCallback, log_simulation_end, run};
pub use tick::{Simulation, TickError, TickSummary};
