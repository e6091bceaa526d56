//! Construction of the initial world: locations under the root, linked as
//! mutual neighbours, seeded with a starting population.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroplayer_types::{EntityId, EntityKind};

use crate::catalog::Catalog;
use crate::error::WorldError;
use crate::spawn::SpawnTemplate;
use crate::world_map::WorldMap;

/// Shape of the starting world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingWorld {
    /// Number of forests.
    #[serde(default = "default_forests")]
    pub forests: u32,
    /// Number of fields.
    #[serde(default = "default_fields")]
    pub fields: u32,
    /// Create locations without their initial spawn rounds.
    #[serde(default)]
    pub start_empty: bool,
    /// Creatures dropped onto random free cells, per kind.
    #[serde(default = "default_creatures")]
    pub creatures: BTreeMap<EntityKind, u32>,
}

const fn default_forests() -> u32 {
    2
}

const fn default_fields() -> u32 {
    1
}

fn default_creatures() -> BTreeMap<EntityKind, u32> {
    BTreeMap::from([
        (EntityKind::Mouse, 6),
        (EntityKind::Rabbit, 4),
        (EntityKind::Owl, 2),
        (EntityKind::Fox, 2),
    ])
}

impl Default for StartingWorld {
    fn default() -> Self {
        Self {
            forests: default_forests(),
            fields: default_fields(),
            start_empty: false,
            creatures: default_creatures(),
        }
    }
}

/// Build the starting world.
///
/// Creatures that find no free cell on the location drawn for them are
/// discarded with a warning.
///
/// # Errors
///
/// Returns any [`WorldError`] raised while instantiating or placing an
/// entity, such as [`WorldError::UnknownKind`] for a kind missing from the
/// catalog.
pub fn build<R: Rng + ?Sized>(
    catalog: &Catalog,
    shape: &StartingWorld,
    rng: &mut R,
) -> Result<WorldMap, WorldError> {
    let mut world = WorldMap::new();
    let root = world.root();

    let mut locations: Vec<EntityId> = Vec::new();
    let plan = [
        (EntityKind::Forest, shape.forests),
        (EntityKind::Field, shape.fields),
    ];
    for (kind, count) in plan {
        for _ in 0..count {
            let mut template = SpawnTemplate::of(kind);
            if shape.start_empty {
                template = template.empty();
            }
            let id = catalog.instantiate(&mut world, template, rng)?;
            world.add_children(root, &[id])?;
            locations.push(id);
        }
    }
    for (i, &a) in locations.iter().enumerate() {
        for &b in locations.iter().skip(i.saturating_add(1)) {
            world.add_neighbours(a, b)?;
        }
    }

    let mut placed: u32 = 0;
    for (&kind, &count) in &shape.creatures {
        for _ in 0..count {
            let Some(&location) = locations.choose(rng) else {
                warn!(kind = %kind, "No location to place starting creature on");
                break;
            };
            let creature = catalog.instantiate(&mut world, SpawnTemplate::of(kind), rng)?;
            if world.place_on_free_cell(location, creature, rng)?.is_some() {
                placed = placed.saturating_add(1);
            } else {
                warn!(kind = %kind, location = %location, "Location full, starting creature dropped");
                world.despawn(creature)?;
            }
        }
    }

    debug!(
        locations = locations.len(),
        creatures = placed,
        entities = world.len(),
        "Starting world built"
    );
    Ok(world)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use zeroplayer_types::KindFilter;

    use super::*;

    #[test]
    fn default_world_has_three_linked_locations() {
        let catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(42);
        let world = build(&catalog, &StartingWorld::default(), &mut rng).unwrap();
        let root = world.root();

        let locations: Vec<EntityId> = world.children(root).collect();
        assert_eq!(locations.len(), 3);
        for &location in &locations {
            assert_eq!(world.neighbours(location).len(), 2);
        }
        assert!(world.check_consistency().is_ok());
    }

    #[test]
    fn starting_creatures_are_placed() {
        let catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(3);
        let shape = StartingWorld {
            start_empty: true,
            creatures: BTreeMap::from([(EntityKind::Mouse, 5)]),
            ..StartingWorld::default()
        };
        let world = build(&catalog, &shape, &mut rng).unwrap();
        let root = world.root();

        let mice: Vec<EntityId> = world
            .children(root)
            .flat_map(|location| world.children_by_type(location, KindFilter::Creature))
            .collect();
        assert_eq!(mice.len(), 5);
        assert!(mice.iter().all(|id| world.position(*id).is_some()));
    }

    #[test]
    fn empty_start_has_no_plants() {
        let catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(8);
        let shape = StartingWorld {
            start_empty: true,
            creatures: BTreeMap::new(),
            ..StartingWorld::default()
        };
        let world = build(&catalog, &shape, &mut rng).unwrap();
        // root plus three locations
        assert_eq!(world.len(), 4);
    }
}
