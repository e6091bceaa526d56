//! Error types for the `zeroplayer-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use zeroplayer_types::{EntityId, EntityKind, SnapshotError};

use crate::grid::Cell;

/// Errors that can occur during world-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An entity was not found in the world graph.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity has no grid, so nothing can be placed on it.
    #[error("entity {0} is not a location")]
    NotALocation(EntityId),

    /// The entity is not placed on any location grid.
    #[error("entity {0} is not placed on a location")]
    NotPlaced(EntityId),

    /// The target cell is held by another entity.
    #[error("cell ({}, {}) of location {location} is occupied by {occupant}", cell.x, cell.y)]
    CellOccupied {
        /// The location owning the grid.
        location: EntityId,
        /// The contested cell.
        cell: Cell,
        /// The entity already there.
        occupant: EntityId,
    },

    /// Linking `child` under `parent` would make the graph cyclic.
    #[error("linking {child} under {parent} would create a cycle")]
    WouldCycle {
        /// The requested parent.
        parent: EntityId,
        /// The requested child.
        child: EntityId,
    },

    /// The root entity cannot be reparented or despawned.
    #[error("the root entity {0} cannot be moved or removed")]
    RootImmovable(EntityId),

    /// A duplicate entity was inserted where uniqueness is required.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// A spawn rule period below one.
    #[error("spawn rule for {kind} has period {period}; period must be at least 1")]
    InvalidSpawnPeriod {
        /// Kind the rule spawns.
        kind: EntityKind,
        /// The rejected period.
        period: u32,
    },

    /// A spawn rule chance outside `[0, 1]`.
    #[error("spawn rule for {kind} has chance {chance}; chance must be within [0, 1]")]
    InvalidSpawnChance {
        /// Kind the rule spawns.
        kind: EntityKind,
        /// The rejected chance.
        chance: f64,
    },

    /// A location grid with a zero dimension.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A kind profile with values the simulation cannot run with.
    #[error("invalid profile for {kind}: {reason}")]
    InvalidProfile {
        /// The misconfigured kind.
        kind: EntityKind,
        /// What is wrong with it.
        reason: String,
    },

    /// No profile is registered for the kind.
    #[error("no catalog profile for kind {0}")]
    UnknownKind(EntityKind),

    /// The entity lacks a capability the operation needs.
    #[error("entity {entity} has no {capability} capability")]
    MissingCapability {
        /// The entity operated on.
        entity: EntityId,
        /// Name of the missing capability.
        capability: &'static str,
    },

    /// A graph invariant does not hold.
    #[error("graph inconsistency at {entity}: {reason}")]
    Inconsistent {
        /// The entity where the check failed.
        entity: EntityId,
        /// Which invariant is broken.
        reason: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: SnapshotError,
    },
}
