//! Error types for the zeroplayer-agents crate.
//!
//! Effects return [`ActionError`] instead of panicking. The action queue logs
//! a failed effect and moves on, so one invalid operation never stops a tick.

use zeroplayer_types::EntityId;
use zeroplayer_world::WorldError;

/// Errors raised by scheduled effects.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The entity must be placed on a grid for this operation.
    #[error("entity {0} is not placed on a grid")]
    NotPlaced(EntityId),

    /// The entity must be owned by a location for this operation.
    #[error("entity {0} is not on a location")]
    NotOnLocation(EntityId),

    /// The entity lacks a capability the effect was scheduled for.
    #[error("entity {entity} has no {capability} capability")]
    MissingCapability {
        /// The entity operated on.
        entity: EntityId,
        /// Name of the missing capability.
        capability: &'static str,
    },

    /// A world-graph operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}
