//! Shared type definitions for the zeroplayer simulation.
//!
//! This crate holds the small vocabulary every other crate speaks: entity
//! identifiers, the closed set of entity kinds, and the snapshot bag used
//! for save and restore.
//!
//! # Modules
//!
//! - [`ids`] -- Integer entity identifiers and the [`IdAllocator`]
//! - [`enums`] -- Entity kinds, kind categories and filters, gender
//! - [`snapshot`] -- Sectioned key-value bags and the [`Snapshotable`] trait

pub mod enums;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use enums::{EntityKind, Gender, KindCategory, KindFilter};
pub use ids::{EntityId, IdAllocator};
pub use snapshot::{Snapshot, SnapshotError, Snapshotable};
