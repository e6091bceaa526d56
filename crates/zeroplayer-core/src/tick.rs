//! Tick cycle: the two-pass step that drives the zeroplayer simulation.
//!
//! Each tick runs two passes:
//!
//! 1. **Decide** -- walk the world depth-first from the root and let every
//!    entity schedule its effects on the action queue. Nothing in the world
//!    changes during this pass.
//!
//! 2. **Apply** -- drain the queue in [`StepPriority`] order. Effects may
//!    schedule follow-ups, which run within the same drain.
//!
//! After the apply pass the world graph is checked for consistency in debug
//! builds. The cycle is deterministic given the same world and seed.
//!
//! [`StepPriority`]: zeroplayer_agents::StepPriority

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use zeroplayer_agents::{ActionFailure, SimContext, SimQueue, StepPriority, decide};
use zeroplayer_types::{EntityId, KindFilter};
use zeroplayer_world::{Catalog, CatalogConfig, StartingWorld, WorldError, WorldMap, WorldSnapshot};

use crate::config::SimulationConfig;

/// Errors that can occur while building or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A world operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// The tick counter cannot advance.
    #[error("tick counter overflow at tick {tick}")]
    Overflow {
        /// The last tick executed.
        tick: u64,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The tick number that was executed, starting at 1.
    pub tick: u64,
    /// Entities visited by the decide pass.
    pub scheduled_entities: usize,
    /// Effects enqueued, including follow-ups scheduled while draining.
    pub enqueued: u64,
    /// Effects that completed.
    pub executed: usize,
    /// Effects that failed and were skipped.
    pub failures: Vec<ActionFailure<StepPriority>>,
    /// Entities inserted during the tick.
    pub spawned: Vec<EntityId>,
    /// Entities removed during the tick.
    pub despawned: Vec<EntityId>,
    /// Living creatures at the end of the tick.
    pub population: usize,
}

/// The mutable simulation state: world, catalog, random source, queue, and
/// tick counter.
#[derive(Debug)]
pub struct Simulation {
    ctx: SimContext,
    queue: SimQueue,
    tick: u64,
}

impl Simulation {
    /// Wrap an existing world.
    pub fn new(world: WorldMap, catalog: Catalog, seed: u64) -> Self {
        Self {
            ctx: SimContext::new(world, catalog, seed),
            queue: SimQueue::new(),
            tick: 0,
        }
    }

    /// Build the starting world described by `shape`.
    ///
    /// The world is built from the same random stream the simulation then
    /// runs on.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::World`] if the catalog is invalid or the world
    /// cannot be built.
    pub fn from_shape(catalog_config: &CatalogConfig, shape: &StartingWorld, seed: u64) -> Result<Self, TickError> {
        let catalog = Catalog::from_config(catalog_config)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = zeroplayer_world::starting_world::build(&catalog, shape, &mut rng)?;
        world.take_journal();
        Ok(Self {
            ctx: SimContext {
                world,
                catalog,
                rng,
            },
            queue: SimQueue::new(),
            tick: 0,
        })
    }

    /// Build a fresh simulation from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::World`] if the catalog is invalid or the world
    /// cannot be built.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, TickError> {
        Self::from_shape(&config.catalog, &config.world.starting, config.world.seed)
    }

    /// Restore a simulation from a snapshot.
    ///
    /// The random stream is reseeded from `seed`; the tick counter starts
    /// again at zero.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::World`] if the catalog is invalid or the
    /// snapshot does not match it.
    pub fn restore(catalog_config: &CatalogConfig, snapshot: &WorldSnapshot, seed: u64) -> Result<Self, TickError> {
        let catalog = Catalog::from_config(catalog_config)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let world = snapshot.restore(&catalog, &mut rng)?;
        Ok(Self {
            ctx: SimContext {
                world,
                catalog,
                rng,
            },
            queue: SimQueue::new(),
            tick: 0,
        })
    }

    /// Capture the current world.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::World`] if an entity fails to serialize.
    pub fn snapshot(&self) -> Result<WorldSnapshot, TickError> {
        Ok(WorldSnapshot::capture(&self.ctx.world)?)
    }

    /// The world graph.
    pub const fn world(&self) -> &WorldMap {
        &self.ctx.world
    }

    /// Mutable access to the world, for setting up scenarios.
    pub const fn world_mut(&mut self) -> &mut WorldMap {
        &mut self.ctx.world
    }

    /// The kind table.
    pub const fn catalog(&self) -> &Catalog {
        &self.ctx.catalog
    }

    /// The last tick executed; zero before the first.
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Living creatures anywhere in the world.
    pub fn population(&self) -> usize {
        count_creatures(&self.ctx.world)
    }

    /// Execute one complete tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Overflow`] if the tick counter is exhausted.
    /// Individual effect failures do not fail the tick; they are reported
    /// in [`TickSummary::failures`].
    pub fn tick(&mut self) -> Result<TickSummary, TickError> {
        let tick = self
            .tick
            .checked_add(1)
            .ok_or(TickError::Overflow { tick: self.tick })?;
        self.tick = tick;

        let scheduled_entities = decide(&self.ctx.world, &mut self.queue);
        debug!(tick, scheduled_entities, pending = self.queue.len(), "Decide pass complete");

        let report = self.queue.perform(&mut self.ctx);
        let enqueued = self.queue.take_enqueued();
        debug!(tick, executed = report.executed, failed = report.failures.len(), "Apply pass complete");

        debug_assert!(
            self.ctx.world.check_consistency().is_ok(),
            "world graph inconsistent after tick {tick}"
        );

        let journal = self.ctx.world.take_journal();
        let population = count_creatures(&self.ctx.world);
        info!(
            tick,
            population,
            spawned = journal.spawned.len(),
            despawned = journal.despawned.len(),
            failures = report.failures.len(),
            "Tick completed"
        );

        Ok(TickSummary {
            tick,
            scheduled_entities,
            enqueued,
            executed: report.executed,
            failures: report.failures,
            spawned: journal.spawned,
            despawned: journal.despawned,
            population,
        })
    }
}

fn count_creatures(world: &WorldMap) -> usize {
    world
        .entities()
        .filter(|entity| entity.is_a(KindFilter::Creature) && !entity.is_killed())
        .count()
}
