//! Action queue, step priorities, and entity behaviours for the zeroplayer
//! simulation.
//!
//! A tick has two passes. During the decide pass ([`schedule::decide`])
//! every entity schedules deferred effects on a [`SimQueue`] without
//! touching the world. During the apply pass the queue is drained in
//! [`StepPriority`] order, so every effect of a phase sees the world as
//! left by the phases before it.
//!
//! # Modules
//!
//! - [`actions`] -- The generic action queue and the tick phase order.
//! - [`context`] -- [`SimContext`]: world, catalog, and random source.
//! - [`creature`] -- Hunger, aging, starvation, migration, procreation.
//! - [`decaying`] -- Integrity decay.
//! - [`error`] -- [`ActionError`].
//! - [`hunter`] -- Prey search, leap attacks, wandering.
//! - [`killable`] -- Death resolution and residues.
//! - [`location`] -- Per-tick spawn rolls.
//! - [`movement`] -- Stepping towards a move target.
//! - [`resource`] -- Settlement and resource decay.
//! - [`schedule`] -- The decide pass.

pub mod actions;
pub mod context;
pub mod creature;
pub mod decaying;
pub mod error;
pub mod hunter;
pub mod killable;
pub mod location;
pub mod movement;
pub mod resource;
pub mod schedule;

// Re-export primary types at crate root.
pub use actions::{
    ActionFailure, ActionQueue, ActionResult, Effect, PerformReport, SimQueue, StepPriority,
};
pub use context::SimContext;
pub use error::ActionError;
pub use schedule::{decide, enqueue_entity};
