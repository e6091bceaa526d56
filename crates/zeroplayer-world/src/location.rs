//! Location state: a grid plus the spawn rules that populate it.
//!
//! A location fires every one of its [`SpawnRule`]s once per tick while
//! spawning is enabled. Each spawned entity is dropped on a uniformly random
//! cell; if that cell is already taken the spawn is discarded. A freshly
//! created location also runs a configured number of catch-up rounds so
//! the world does not start barren.

use rand::Rng;
use tracing::trace;
use zeroplayer_types::{EntityId, Snapshot, SnapshotError, Snapshotable};

use crate::catalog::Catalog;
use crate::error::WorldError;
use crate::grid::Grid;
use crate::spawn::SpawnRule;
use crate::world_map::WorldMap;

/// Mutable runtime state of a location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    /// Cell occupancy.
    pub(crate) grid: Grid,
    /// Rules fired once per tick, in order.
    pub(crate) rules: Vec<SpawnRule>,
    /// Whether the per-tick rules fire at all.
    pub spawning_enabled: bool,
    /// Catch-up rounds run when the location is created non-empty.
    pub initial_rolls: u32,
}

impl LocationState {
    /// Create a location with an empty grid.
    pub const fn new(grid: Grid, rules: Vec<SpawnRule>, initial_rolls: u32) -> Self {
        Self {
            grid,
            rules,
            spawning_enabled: true,
            initial_rolls,
        }
    }

    /// The location grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The spawn rules in firing order.
    pub fn rules(&self) -> &[SpawnRule] {
        &self.rules
    }
}

impl Snapshotable for LocationState {
    const SECTION: &'static str = "location";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        snapshot.set(Self::SECTION, "width", &self.grid.width())?;
        snapshot.set(Self::SECTION, "height", &self.grid.height())?;
        snapshot.set(Self::SECTION, "spawning_enabled", &self.spawning_enabled)?;
        let calls: Vec<u64> = self.rules.iter().map(SpawnRule::calls).collect();
        snapshot.set(Self::SECTION, "rule_calls", &calls)
    }

    /// Restores flags and rule counters. Grid dimensions are read by the
    /// world snapshot loader, which rebuilds the grid before placing
    /// anything on it.
    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.spawning_enabled = snapshot.require(Self::SECTION, "spawning_enabled")?;
        let calls: Vec<u64> = snapshot.get(Self::SECTION, "rule_calls")?.unwrap_or_default();
        for (rule, count) in self.rules.iter_mut().zip(calls) {
            rule.set_calls(count);
        }
        Ok(())
    }
}

/// Fire every rule of `location` once, placing each spawn at a random cell.
///
/// Returns the ids of entities that were spawned and placed. Spawns landing
/// on an occupied cell are despawned immediately and not returned.
///
/// # Errors
///
/// Returns [`WorldError::NotALocation`] if `location` has no grid, or any
/// error raised while instantiating a spawn.
pub fn roll_spawns<R: Rng + ?Sized>(
    world: &mut WorldMap,
    catalog: &Catalog,
    location: EntityId,
    rng: &mut R,
) -> Result<Vec<EntityId>, WorldError> {
    let mut rules = std::mem::take(&mut world.location_mut(location)?.rules);
    let result = fire_rules(world, catalog, location, &mut rules, rng);
    world.location_mut(location)?.rules = rules;
    result
}

fn fire_rules<R: Rng + ?Sized>(
    world: &mut WorldMap,
    catalog: &Catalog,
    location: EntityId,
    rules: &mut [SpawnRule],
    rng: &mut R,
) -> Result<Vec<EntityId>, WorldError> {
    let mut placed = Vec::new();
    for rule in rules {
        let Some(spawned) = rule.spawn(world, catalog, rng)? else {
            continue;
        };
        if world.place_randomly(location, spawned, rng)?.is_some() {
            trace!(location = %location, entity = %spawned, kind = %rule.template().kind, "Spawned");
            placed.push(spawned);
        } else {
            world.despawn(spawned)?;
        }
    }
    Ok(placed)
}

/// Run the configured number of catch-up rounds on a new location.
pub fn initial_rolls<R: Rng + ?Sized>(
    world: &mut WorldMap,
    catalog: &Catalog,
    location: EntityId,
    rng: &mut R,
) -> Result<Vec<EntityId>, WorldError> {
    let rounds = world.location(location)?.initial_rolls;
    let mut placed = Vec::new();
    for _ in 0..rounds {
        placed.extend(roll_spawns(world, catalog, location, rng)?);
    }
    Ok(placed)
}
