//! The mutable state every effect runs against.

use rand::SeedableRng;
use rand::rngs::StdRng;
use zeroplayer_world::{Catalog, WorldMap};

/// World, kind table, and the single random source of a simulation.
///
/// All randomness in a run is drawn from `rng`, so a seed and a starting
/// world fully determine the run.
#[derive(Debug)]
pub struct SimContext {
    /// The world graph.
    pub world: WorldMap,
    /// Kind table used to spawn entities.
    pub catalog: Catalog,
    /// Random source.
    pub rng: StdRng,
}

impl SimContext {
    /// Bundle a world and catalog with a seeded random source.
    pub fn new(world: WorldMap, catalog: Catalog, seed: u64) -> Self {
        Self {
            world,
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}
