//! The entity record: identity, graph links, and optional capabilities.
//!
//! Graph links (parent, children, neighbours, grid position) are private and
//! only changed through [`WorldMap`](crate::world_map::WorldMap), which keeps
//! both sides of every link in step. Capabilities are public optional
//! components; a kind's set of capabilities is fixed by its catalog profile.

use std::collections::BTreeSet;

use zeroplayer_types::{EntityId, EntityKind, KindFilter, Snapshot, SnapshotError, Snapshotable};

use crate::components::{Creature, Decaying, Hunter, Killable, Movable};
use crate::grid::Cell;
use crate::location::LocationState;
use crate::resource::ResourceStock;

/// One node of the world graph.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    /// Ticks survived since creation.
    pub lifetime: u64,
    parent: Option<EntityId>,
    children: BTreeSet<EntityId>,
    neighbours: BTreeSet<EntityId>,
    position: Option<Cell>,

    /// Deferred death and residue.
    pub killable: Option<Killable>,
    /// Wearing integrity.
    pub decaying: Option<Decaying>,
    /// Movement towards a target cell.
    pub movable: Option<Movable>,
    /// Prey search and leap attacks.
    pub hunter: Option<Hunter>,
    /// Hunger, age, and procreation.
    pub creature: Option<Creature>,
    /// Distributable value.
    pub resource: Option<ResourceStock>,
    /// Grid and spawn rules.
    pub location: Option<LocationState>,
}

impl Entity {
    /// A bare, unlinked entity with no capabilities.
    pub const fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            lifetime: 0,
            parent: None,
            children: BTreeSet::new(),
            neighbours: BTreeSet::new(),
            position: None,
            killable: None,
            decaying: None,
            movable: None,
            hunter: None,
            creature: None,
            resource: None,
            location: None,
        }
    }

    /// Identifier.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Concrete kind.
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Owning entity, `None` for the root and for detached entities.
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Owned entities in ascending id order.
    pub const fn children(&self) -> &BTreeSet<EntityId> {
        &self.children
    }

    /// Symmetric neighbour links.
    pub const fn neighbours(&self) -> &BTreeSet<EntityId> {
        &self.neighbours
    }

    /// Cell on the parent location's grid, if placed.
    pub const fn position(&self) -> Option<Cell> {
        self.position
    }

    /// Whether the entity has been condemned this tick.
    pub fn is_killed(&self) -> bool {
        self.killable.as_ref().is_some_and(|k| k.killed)
    }

    /// Whether this entity is-a `filter`.
    ///
    /// The `Creature` and `Resource` groups follow the attached capability
    /// rather than the kind, so a kind configured with creature state or a
    /// resource stock joins the matching group.
    pub fn is_a(&self, filter: KindFilter) -> bool {
        match filter {
            KindFilter::Creature => self.creature.is_some(),
            KindFilter::Resource => self.resource.is_some(),
            other => other.matches(self.kind),
        }
    }

    /// Current satiety, for creatures.
    pub fn satiety(&self) -> Option<f64> {
        self.creature.as_ref().map(|c| c.satiety)
    }

    /// Current integrity, for decaying entities.
    pub fn integrity(&self) -> Option<f64> {
        self.decaying.as_ref().map(Decaying::integrity)
    }

    /// Current move target, for movable entities.
    pub fn move_target(&self) -> Option<Cell> {
        self.movable.as_ref().and_then(|m| m.target)
    }

    pub(crate) const fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    pub(crate) const fn set_position(&mut self, position: Option<Cell>) {
        self.position = position;
    }

    pub(crate) fn children_mut(&mut self) -> &mut BTreeSet<EntityId> {
        &mut self.children
    }

    pub(crate) fn neighbours_mut(&mut self) -> &mut BTreeSet<EntityId> {
        &mut self.neighbours
    }

    /// Whether the entity has no links at all.
    pub(crate) fn is_unlinked(&self) -> bool {
        self.parent.is_none()
            && self.children.is_empty()
            && self.neighbours.is_empty()
            && self.position.is_none()
    }
}

/// Writes the `entity` section plus one section per attached capability.
impl Snapshotable for Entity {
    const SECTION: &'static str = "entity";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        snapshot.set(Self::SECTION, "lifetime", &self.lifetime)?;
        if let Some(killable) = &self.killable {
            killable.fill_snapshot(snapshot)?;
        }
        if let Some(decaying) = &self.decaying {
            decaying.fill_snapshot(snapshot)?;
        }
        if let Some(movable) = &self.movable {
            movable.fill_snapshot(snapshot)?;
        }
        if let Some(creature) = &self.creature {
            creature.fill_snapshot(snapshot)?;
        }
        if let Some(resource) = &self.resource {
            resource.fill_snapshot(snapshot)?;
        }
        if let Some(location) = &self.location {
            location.fill_snapshot(snapshot)?;
        }
        Ok(())
    }

    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.lifetime = snapshot.require(Self::SECTION, "lifetime")?;
        if let Some(killable) = &mut self.killable {
            killable.restore_from_snapshot(snapshot)?;
        }
        if let Some(decaying) = &mut self.decaying {
            decaying.restore_from_snapshot(snapshot)?;
        }
        if let Some(movable) = &mut self.movable {
            movable.restore_from_snapshot(snapshot)?;
        }
        if let Some(creature) = &mut self.creature {
            creature.restore_from_snapshot(snapshot)?;
        }
        if let Some(resource) = &mut self.resource {
            resource.restore_from_snapshot(snapshot)?;
        }
        if let Some(location) = &mut self.location {
            location.restore_from_snapshot(snapshot)?;
        }
        Ok(())
    }
}
