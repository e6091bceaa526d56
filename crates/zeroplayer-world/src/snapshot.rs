//! Whole-world save and restore.
//!
//! A [`WorldSnapshot`] records each entity's kind, graph links, and the
//! per-capability [`Snapshot`] bag it fills. Restoring rebuilds every
//! entity through the [`Catalog`] (so static parameters come from the
//! current kind table) and then overwrites the mutable state from the bag.
//! The id allocator resumes past the largest id seen.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroplayer_types::{EntityId, EntityKind, IdAllocator, Snapshot, Snapshotable};

use crate::catalog::Catalog;
use crate::entity::Entity;
use crate::error::WorldError;
use crate::grid::Grid;
use crate::location::LocationState;
use crate::spawn::SpawnTemplate;
use crate::world_map::WorldMap;

/// Saved form of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Identifier.
    pub id: EntityId,
    /// Kind, used to rebuild capabilities from the catalog.
    pub kind: EntityKind,
    /// Owner, if linked.
    #[serde(default)]
    pub parent: Option<EntityId>,
    /// Grid cell on the owner, if placed.
    #[serde(default)]
    pub position: Option<[u32; 2]>,
    /// Neighbour links.
    #[serde(default)]
    pub neighbours: Vec<EntityId>,
    /// Capability state.
    #[serde(default)]
    pub state: Snapshot,
}

/// Saved form of a whole world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Root entity id.
    pub root: EntityId,
    /// Next id the allocator would have handed out.
    pub next_id: u64,
    /// Every non-root entity in ascending id order.
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// Capture the current state of `world`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Snapshot`] if any capability fails to encode.
    pub fn capture(world: &WorldMap) -> Result<Self, WorldError> {
        let root = world.root();
        let entities = world
            .entities()
            .filter(|entity| entity.id() != root)
            .map(|entity| -> Result<EntitySnapshot, WorldError> {
                Ok(EntitySnapshot {
                    id: entity.id(),
                    kind: entity.kind(),
                    parent: entity.parent(),
                    position: entity.position().map(|cell| [cell.x, cell.y]),
                    neighbours: entity.neighbours().iter().copied().collect(),
                    state: entity.form_snapshot()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root,
            next_id: world.next_id(),
            entities,
        })
    }

    /// Rebuild a world from this snapshot.
    ///
    /// `rng` is only consumed by the catalog while building capabilities;
    /// every randomized field it sets is then overwritten from the saved
    /// state.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownKind`] for a kind missing from the
    /// catalog, [`WorldError::Snapshot`] for a malformed state bag, or a
    /// graph error if the saved links do not form a valid tree.
    pub fn restore<R: Rng + ?Sized>(&self, catalog: &Catalog, rng: &mut R) -> Result<WorldMap, WorldError> {
        let max_id = self
            .entities
            .iter()
            .map(|entity| entity.id.into_inner())
            .chain(std::iter::once(self.root.into_inner()))
            .max()
            .unwrap_or_default();
        let next = self.next_id.max(max_id.saturating_add(1));
        let mut world = WorldMap::from_parts(
            Entity::new(self.root, EntityKind::Root),
            IdAllocator::starting_at(next),
        );

        for saved in &self.entities {
            let mut entity = catalog.build(saved.id, &SpawnTemplate::of(saved.kind), rng)?;
            if let Some(location) = entity.location.as_mut() {
                resize_grid(location, &saved.state)?;
            }
            entity.restore_from_snapshot(&saved.state)?;
            world.insert(entity)?;
        }

        for saved in &self.entities {
            let Some(parent) = saved.parent else {
                continue;
            };
            match saved.position {
                Some([x, y]) => {
                    world.place_at(parent, saved.id, i64::from(x), i64::from(y))?;
                }
                None => world.add_children(parent, &[saved.id])?,
            }
        }
        for saved in &self.entities {
            for &other in &saved.neighbours {
                world.add_neighbours(saved.id, other)?;
            }
        }

        world.take_journal();
        world.check_consistency()?;
        debug!(entities = world.len(), next_id = world.next_id(), "World restored");
        Ok(world)
    }
}

fn resize_grid(location: &mut LocationState, state: &Snapshot) -> Result<(), WorldError> {
    let width = state.get::<u32>(LocationState::SECTION, "width")?;
    let height = state.get::<u32>(LocationState::SECTION, "height")?;
    if let (Some(width), Some(height)) = (width, height) {
        if width != location.grid.width() || height != location.grid.height() {
            location.grid = Grid::new(width, height)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use zeroplayer_types::Gender;

    use super::*;
    use crate::grid::Cell;
    use crate::spawn::SpawnRule;
    use crate::starting_world::{self, StartingWorld};

    #[test]
    fn round_trip_preserves_graph_and_state() {
        let catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(12);
        let mut world = starting_world::build(&catalog, &StartingWorld::default(), &mut rng).unwrap();

        let forest = world.children(world.root()).next().unwrap();
        let mouse = catalog
            .instantiate(&mut world, SpawnTemplate::with_gender(EntityKind::Mouse, Gender::Female), &mut rng)
            .unwrap();
        world.place_on_free_cell(forest, mouse, &mut rng).unwrap();
        if let Some(entity) = world.get_mut(mouse) {
            if let Some(movable) = entity.movable.as_mut() {
                movable.target = Some(Cell::new(5, 5));
            }
            if let Some(rule) = entity.killable.as_mut().and_then(|k| k.residue.first_mut()) {
                rule.set_calls(4);
            }
            let offspring = entity
                .creature
                .as_mut()
                .and_then(|c| c.procreation.as_mut())
                .and_then(|p| p.offspring.first_mut());
            if let Some(rule) = offspring {
                rule.set_calls(6);
            }
        }

        let saved = WorldSnapshot::capture(&world).unwrap();
        let json = serde_json::to_string(&saved).unwrap();
        let loaded: WorldSnapshot = serde_json::from_str(&json).unwrap();
        let mut other_rng = StdRng::seed_from_u64(999);
        let restored = loaded.restore(&catalog, &mut other_rng).unwrap();

        assert_eq!(restored.len(), world.len());
        assert_eq!(restored.next_id(), world.next_id());
        for entity in world.entities() {
            let twin = restored.get(entity.id()).unwrap();
            assert_eq!(twin.kind(), entity.kind());
            assert_eq!(twin.parent(), entity.parent());
            assert_eq!(twin.position(), entity.position());
            assert_eq!(twin.neighbours(), entity.neighbours());
        }
        let twin = restored.get(mouse).unwrap();
        assert_eq!(twin.move_target(), Some(Cell::new(5, 5)));
        assert_eq!(twin.creature.as_ref().unwrap().gender, Gender::Female);
        let residue_calls = twin.killable.as_ref().and_then(|k| k.residue.first()).map(SpawnRule::calls);
        assert_eq!(residue_calls, Some(4));
        let offspring_calls = twin
            .creature
            .as_ref()
            .and_then(|c| c.procreation.as_ref())
            .and_then(|p| p.offspring.first())
            .map(SpawnRule::calls);
        assert_eq!(offspring_calls, Some(6));
        assert!(restored.check_consistency().is_ok());
    }

    #[test]
    fn allocator_resumes_past_largest_id() {
        let snapshot = WorldSnapshot {
            root: EntityId(0),
            next_id: 1,
            entities: vec![EntitySnapshot {
                id: EntityId(40),
                kind: EntityKind::Carcass,
                parent: Some(EntityId(0)),
                position: None,
                neighbours: Vec::new(),
                state: {
                    let mut state = Snapshot::new();
                    state.set("entity", "lifetime", &3_u64).unwrap();
                    state.set("decaying", "integrity", &0.5_f64).unwrap();
                    state
                },
            }],
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut world = snapshot.restore(&Catalog::default(), &mut rng).unwrap();
        assert_eq!(world.allocate_id(), EntityId(41));
        let carcass = world.get(EntityId(40)).unwrap();
        assert_eq!(carcass.lifetime, 3);
        assert!(carcass.integrity().is_some_and(|i| (i - 0.5).abs() < f64::EPSILON));
    }
}
