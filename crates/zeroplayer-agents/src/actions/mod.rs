//! Deferred effects and the order they run in.
//!
//! # Submodules
//!
//! - [`priority`] -- The [`StepPriority`] total order of tick phases.
//! - [`queue`] -- The generic [`ActionQueue`] and its drain report.

pub mod priority;
pub mod queue;

pub use priority::StepPriority;
pub use queue::{ActionFailure, ActionQueue, Effect, PerformReport};

use crate::context::SimContext;
use crate::error::ActionError;

/// The queue the simulation runs on.
pub type SimQueue = ActionQueue<StepPriority, SimContext, ActionError>;

/// Result type of simulation effects.
pub type ActionResult = Result<(), ActionError>;
