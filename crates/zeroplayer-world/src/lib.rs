//! Entity graph, location grids, spawn rules, and resources for the
//! zeroplayer simulation.
//!
//! This crate models the state of the world and every mutation that keeps
//! it consistent. It does not decide anything: per-tick behaviour lives in
//! `zeroplayer-agents`, which reads this state and schedules effects that
//! call back into it.
//!
//! # Modules
//!
//! - [`animals`] -- The built-in kind table (forests, fields, plants,
//!   herbivores, predators, remains).
//! - [`catalog`] -- Data-only kind profiles and the [`Catalog`] that builds
//!   entities from them.
//! - [`components`] -- Optional capabilities carried by an entity.
//! - [`entity`] -- The [`Entity`] record.
//! - [`error`] -- Error types for world-graph operations.
//! - [`grid`] -- Location grids, cells, and shift patterns.
//! - [`location`] -- [`LocationState`] and per-tick spawn rolls.
//! - [`resource`] -- Resource stock and two-phase distribution.
//! - [`snapshot`] -- Whole-world save and restore.
//! - [`spawn`] -- Periodic, probabilistic spawn rules.
//! - [`starting_world`] -- Initial locations and population.
//! - [`world_map`] -- The world graph: ownership, neighbours, placement,
//!   and lifecycle.

pub mod animals;
pub mod catalog;
pub mod components;
pub mod entity;
pub mod error;
pub mod grid;
pub mod location;
pub mod resource;
pub mod snapshot;
pub mod spawn;
pub mod starting_world;
pub mod world_map;

// Re-export primary types at crate root.
pub use catalog::{Catalog, CatalogConfig, KindProfile};
pub use components::{Creature, Decaying, Hunter, IntakeRule, Killable, Movable, Procreation};
pub use entity::Entity;
pub use error::WorldError;
pub use grid::{Cell, Grid, ShiftPattern};
pub use location::{LocationState, roll_spawns};
pub use resource::{Receiver, ResourceStock, Settlement, distribute};
pub use snapshot::{EntitySnapshot, WorldSnapshot};
pub use spawn::{SpawnArgs, SpawnRule, SpawnRuleDef, SpawnTemplate};
pub use starting_world::StartingWorld;
pub use world_map::{Journal, WorldMap};
