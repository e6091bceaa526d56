//! World graph: an arena of entities linked by ownership and neighbourhood.
//!
//! The [`WorldMap`] owns every [`Entity`] together with the [`IdAllocator`]
//! that names them. Ownership forms a tree under a single root entity;
//! locations own a grid on which their children may be placed. Every
//! mutation here updates both sides of a link in the same call, so the
//! graph is consistent between any two calls:
//!
//! - `child.parent == Some(p)` exactly when `p.children` contains `child`
//! - neighbour links are symmetric
//! - `child.position == Some(cell)` exactly when the parent's grid holds
//!   `child` at `cell`
//!
//! [`check_consistency`](WorldMap::check_consistency) verifies all three.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::trace;
use zeroplayer_types::{EntityId, EntityKind, IdAllocator, KindFilter};

use crate::entity::Entity;
use crate::error::WorldError;
use crate::grid::{Cell, square_shifts};
use crate::location::LocationState;

/// Ids spawned and despawned since the journal was last taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    /// Entities inserted, in insertion order.
    pub spawned: Vec<EntityId>,
    /// Entities removed, in removal order.
    pub despawned: Vec<EntityId>,
}

/// The world graph.
#[derive(Debug)]
pub struct WorldMap {
    entities: BTreeMap<EntityId, Entity>,
    ids: IdAllocator,
    root: EntityId,
    journal: Journal,
}

impl WorldMap {
    /// Create a world holding only the root entity.
    pub fn new() -> Self {
        let mut ids = IdAllocator::new();
        let root = ids.allocate();
        Self::from_parts(Entity::new(root, EntityKind::Root), ids)
    }

    /// Create a world around an existing root and allocator (restore path).
    pub(crate) fn from_parts(root: Entity, ids: IdAllocator) -> Self {
        let root_id = root.id();
        let mut entities = BTreeMap::new();
        entities.insert(root_id, root);
        Self {
            entities,
            ids,
            root: root_id,
            journal: Journal::default(),
        }
    }

    // -------------------------------------------------------------------
    // Arena
    // -------------------------------------------------------------------

    /// The root entity.
    pub const fn root(&self) -> EntityId {
        self.root
    }

    /// Reserve a fresh id.
    pub const fn allocate_id(&mut self) -> EntityId {
        self.ids.allocate()
    }

    /// The id the allocator will hand out next.
    pub const fn next_id(&self) -> u64 {
        self.ids.peek_next()
    }

    /// Look up an entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up an entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Look up an entity, failing if it does not exist.
    pub fn entity(&self, id: EntityId) -> Result<&Entity, WorldError> {
        self.entities.get(&id).ok_or(WorldError::EntityNotFound(id))
    }

    /// Look up an entity mutably, failing if it does not exist.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, WorldError> {
        self.entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))
    }

    /// Whether the entity exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities, root included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.entities.len() <= 1
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Kind of an entity.
    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.get(id).map(Entity::kind)
    }

    /// Insert a freshly built, unlinked entity.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateEntity`] if the id is taken or the
    /// entity already carries links.
    pub fn insert(&mut self, entity: Entity) -> Result<EntityId, WorldError> {
        let id = entity.id();
        if self.entities.contains_key(&id) || !entity.is_unlinked() {
            return Err(WorldError::DuplicateEntity(id));
        }
        self.entities.insert(id, entity);
        self.journal.spawned.push(id);
        Ok(id)
    }

    /// Drain the spawn/despawn journal.
    pub fn take_journal(&mut self) -> Journal {
        std::mem::take(&mut self.journal)
    }

    // -------------------------------------------------------------------
    // Ownership
    // -------------------------------------------------------------------

    /// Parent of an entity.
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.get(id).and_then(Entity::parent)
    }

    /// Children of an entity in ascending id order; empty if it is missing.
    pub fn children(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|entity| entity.children().iter().copied())
    }

    /// Children that are-a `filter` (see [`Entity::is_a`]).
    pub fn children_by_type(&self, parent: EntityId, filter: impl Into<KindFilter>) -> Vec<EntityId> {
        let filter = filter.into();
        self.children_where(parent, |child| child.is_a(filter))
    }

    /// Children satisfying a predicate.
    pub fn children_where(
        &self,
        parent: EntityId,
        predicate: impl Fn(&Entity) -> bool,
    ) -> Vec<EntityId> {
        self.children(parent)
            .filter(|id| self.get(*id).is_some_and(&predicate))
            .collect()
    }

    /// Whether `ancestor` is `id` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Link each child under `parent`, first breaking any previous parent
    /// link of that child.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotFound`] for a missing entity,
    /// [`WorldError::RootImmovable`] if a child is the root, or
    /// [`WorldError::WouldCycle`] if a child is `parent` or one of its
    /// ancestors. Children before the failing one stay linked.
    pub fn add_children(&mut self, parent: EntityId, children: &[EntityId]) -> Result<(), WorldError> {
        self.entity(parent)?;
        for &child in children {
            self.check_linkable(parent, child)?;
            if self.parent(child) == Some(parent) {
                continue;
            }
            self.detach(child)?;
            self.attach(parent, child)?;
        }
        Ok(())
    }

    /// Unlink `child` from `parent`.
    ///
    /// Returns `false` without changing anything if `child` is not a child
    /// of `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> Result<bool, WorldError> {
        self.entity(parent)?;
        if self.parent(child) != Some(parent) {
            return Ok(false);
        }
        self.detach(child)?;
        Ok(true)
    }

    /// Move every child of `from` under `to`.
    ///
    /// Children keep their coordinates when `to` is a location and the same
    /// cell is free there; otherwise they arrive unplaced. Returns the
    /// moved ids.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WouldCycle`] if `to` lies inside the subtree of
    /// `from` (other than `from` itself); in that case nothing is moved.
    pub fn transfer_children(&mut self, from: EntityId, to: EntityId) -> Result<Vec<EntityId>, WorldError> {
        self.entity(to)?;
        let moved: Vec<EntityId> = self.children(from).collect();
        if from == to {
            return Ok(moved);
        }
        if let Some(&blocked) = moved.iter().find(|&&child| self.is_ancestor(child, to)) {
            return Err(WorldError::WouldCycle {
                parent: to,
                child: blocked,
            });
        }
        for &child in &moved {
            let old_cell = self.position(child);
            self.detach(child)?;
            self.attach(to, child)?;
            if let Some(cell) = old_cell {
                if self.location(to).is_ok_and(|loc| loc.grid.is_free(cell)) {
                    self.occupy(to, child, cell)?;
                }
            }
        }
        trace!(from = %from, to = %to, count = moved.len(), "Children transferred");
        Ok(moved)
    }

    fn check_linkable(&self, parent: EntityId, child: EntityId) -> Result<(), WorldError> {
        self.entity(child)?;
        if child == self.root {
            return Err(WorldError::RootImmovable(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(WorldError::WouldCycle { parent, child });
        }
        Ok(())
    }

    /// Break the parent link of `child`, vacating its cell.
    fn detach(&mut self, child: EntityId) -> Result<(), WorldError> {
        let (parent, position) = {
            let entity = self.entity(child)?;
            (entity.parent(), entity.position())
        };
        let Some(parent) = parent else {
            return Ok(());
        };
        let owner = self.entity_mut(parent)?;
        owner.children_mut().remove(&child);
        if let (Some(cell), Some(location)) = (position, owner.location.as_mut()) {
            location.grid.vacate(cell, child);
        }
        let entity = self.entity_mut(child)?;
        entity.set_parent(None);
        entity.set_position(None);
        Ok(())
    }

    fn attach(&mut self, parent: EntityId, child: EntityId) -> Result<(), WorldError> {
        self.entity_mut(parent)?.children_mut().insert(child);
        self.entity_mut(child)?.set_parent(Some(parent));
        Ok(())
    }

    /// Depth-first traversal from `from`: parents before children, children
    /// in ascending id order.
    pub fn depth_first(&self, from: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(entity) = self.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(entity.children().iter().rev().copied());
        }
        order
    }

    // -------------------------------------------------------------------
    // Neighbours
    // -------------------------------------------------------------------

    /// Link `a` and `b` as neighbours.
    pub fn add_neighbours(&mut self, a: EntityId, b: EntityId) -> Result<(), WorldError> {
        self.entity(a)?;
        self.entity(b)?;
        if a == b {
            return Ok(());
        }
        self.entity_mut(a)?.neighbours_mut().insert(b);
        self.entity_mut(b)?.neighbours_mut().insert(a);
        Ok(())
    }

    /// Remove the neighbour link between `a` and `b`, if any.
    pub fn remove_neighbours(&mut self, a: EntityId, b: EntityId) -> bool {
        let removed = self
            .get_mut(a)
            .is_some_and(|entity| entity.neighbours_mut().remove(&b));
        if let Some(entity) = self.get_mut(b) {
            entity.neighbours_mut().remove(&a);
        }
        removed
    }

    /// Neighbours of an entity in ascending id order.
    pub fn neighbours(&self, id: EntityId) -> Vec<EntityId> {
        self.get(id)
            .map(|entity| entity.neighbours().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Move every neighbour link of `from` over to `to`.
    pub fn transfer_neighbours(&mut self, from: EntityId, to: EntityId) -> Result<(), WorldError> {
        self.entity(to)?;
        for other in self.neighbours(from) {
            self.remove_neighbours(from, other);
            if other != to {
                self.add_neighbours(to, other)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Placement
    // -------------------------------------------------------------------

    /// Grid cell of a placed entity.
    pub fn position(&self, id: EntityId) -> Option<Cell> {
        self.get(id).and_then(Entity::position)
    }

    /// The location an entity is placed on.
    pub fn location_of(&self, id: EntityId) -> Option<EntityId> {
        let entity = self.get(id)?;
        entity.position().and(entity.parent())
    }

    /// Location state of an entity.
    pub fn location(&self, id: EntityId) -> Result<&LocationState, WorldError> {
        self.entity(id)?
            .location
            .as_ref()
            .ok_or(WorldError::NotALocation(id))
    }

    /// Location state of an entity, mutably.
    pub fn location_mut(&mut self, id: EntityId) -> Result<&mut LocationState, WorldError> {
        self.entity_mut(id)?
            .location
            .as_mut()
            .ok_or(WorldError::NotALocation(id))
    }

    /// Entity on a cell of a location.
    pub fn occupant(&self, location: EntityId, cell: Cell) -> Option<EntityId> {
        self.location(location)
            .ok()
            .and_then(|loc| loc.grid.occupant(cell))
    }

    /// Clamp a coordinate into a location's grid.
    pub fn clamp(&self, location: EntityId, x: i64, y: i64) -> Result<Cell, WorldError> {
        Ok(self.location(location)?.grid.clamp(x, y))
    }

    /// Place `entity` on `location` at the clamped coordinate, reparenting
    /// it under `location` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotALocation`] if `location` has no grid,
    /// [`WorldError::CellOccupied`] if another entity holds the cell, or a
    /// linking error if `entity` cannot become a child of `location`.
    pub fn place_at(&mut self, location: EntityId, entity: EntityId, x: i64, y: i64) -> Result<Cell, WorldError> {
        let cell = self.clamp(location, x, y)?;
        if let Some(occupant) = self.occupant(location, cell) {
            if occupant != entity {
                return Err(WorldError::CellOccupied {
                    location,
                    cell,
                    occupant,
                });
            }
        }
        self.check_linkable(location, entity)?;

        if self.parent(entity) == Some(location) {
            if let Some(old) = self.position(entity) {
                self.location_mut(location)?.grid.vacate(old, entity);
            }
        } else {
            self.detach(entity)?;
            self.attach(location, entity)?;
        }
        self.occupy(location, entity, cell)?;
        Ok(cell)
    }

    fn occupy(&mut self, location: EntityId, entity: EntityId, cell: Cell) -> Result<(), WorldError> {
        self.location_mut(location)?.grid.occupy(cell, entity);
        self.entity_mut(entity)?.set_position(Some(cell));
        Ok(())
    }

    /// Move a placed entity to another cell of its own location.
    ///
    /// Returns `false` if the cell is held by someone else.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotPlaced`] if the entity is not on a grid.
    pub fn move_within(&mut self, entity: EntityId, cell: Cell) -> Result<bool, WorldError> {
        let location = self.location_of(entity).ok_or(WorldError::NotPlaced(entity))?;
        match self.occupant(location, cell) {
            Some(occupant) if occupant != entity => Ok(false),
            _ => {
                self.place_at(location, entity, i64::from(cell.x), i64::from(cell.y))?;
                Ok(true)
            }
        }
    }

    /// Take an entity off its grid without unlinking it from its parent.
    pub fn unplace(&mut self, entity: EntityId) -> Result<Option<Cell>, WorldError> {
        let Some(location) = self.location_of(entity) else {
            return Ok(None);
        };
        let cell = self.position(entity);
        if let Some(cell) = cell {
            self.location_mut(location)?.grid.vacate(cell, entity);
        }
        self.entity_mut(entity)?.set_position(None);
        Ok(cell)
    }

    /// Place `entity` on one uniformly random cell of `location`.
    ///
    /// Returns `None`, leaving the entity untouched, if that cell is taken.
    pub fn place_randomly<R: Rng + ?Sized>(
        &mut self,
        location: EntityId,
        entity: EntityId,
        rng: &mut R,
    ) -> Result<Option<Cell>, WorldError> {
        let cell = self.location(location)?.grid.random_cell(rng);
        if !self.location(location)?.grid.is_free(cell) {
            return Ok(None);
        }
        self.place_at(location, entity, i64::from(cell.x), i64::from(cell.y))
            .map(Some)
    }

    /// Place `entity` on a random free cell of `location`.
    ///
    /// Returns `None` if the grid is full.
    pub fn place_on_free_cell<R: Rng + ?Sized>(
        &mut self,
        location: EntityId,
        entity: EntityId,
        rng: &mut R,
    ) -> Result<Option<Cell>, WorldError> {
        let free = self.location(location)?.grid.free_cells();
        self.place_on_one_of(location, entity, &free, rng)
    }

    /// Free cells adjacent to `origin` (eight-neighbourhood, clamped).
    pub fn free_cells_near(&self, location: EntityId, origin: Cell) -> Result<Vec<Cell>, WorldError> {
        let grid = &self.location(location)?.grid;
        let mut cells = grid.destinations(origin, &square_shifts(1));
        cells.sort_unstable();
        cells.dedup();
        cells.retain(|cell| grid.is_free(*cell));
        Ok(cells)
    }

    /// Place `entity` on a random free cell adjacent to `origin`.
    ///
    /// Returns `None` if every adjacent cell is taken.
    pub fn place_near<R: Rng + ?Sized>(
        &mut self,
        location: EntityId,
        entity: EntityId,
        origin: Cell,
        rng: &mut R,
    ) -> Result<Option<Cell>, WorldError> {
        let free = self.free_cells_near(location, origin)?;
        self.place_on_one_of(location, entity, &free, rng)
    }

    fn place_on_one_of<R: Rng + ?Sized>(
        &mut self,
        location: EntityId,
        entity: EntityId,
        cells: &[Cell],
        rng: &mut R,
    ) -> Result<Option<Cell>, WorldError> {
        let Some(&cell) = cells.choose(rng) else {
            return Ok(None);
        };
        self.place_at(location, entity, i64::from(cell.x), i64::from(cell.y))
            .map(Some)
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Condemn an entity. Returns `false` if it cannot be killed.
    pub fn mark_killed(&mut self, id: EntityId, no_residue: bool) -> Result<bool, WorldError> {
        let entity = self.entity_mut(id)?;
        match entity.killable.as_mut() {
            Some(killable) => {
                killable.kill(no_residue);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether an entity exists and has been condemned.
    pub fn is_killed(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_killed)
    }

    /// Remove an entity and everything it still owns.
    ///
    /// Returns the removed ids in depth-first order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RootImmovable`] for the root.
    pub fn despawn(&mut self, id: EntityId) -> Result<Vec<EntityId>, WorldError> {
        if id == self.root {
            return Err(WorldError::RootImmovable(id));
        }
        self.detach(id)?;
        let removed = self.depth_first(id);
        for &gone in &removed {
            for other in self.neighbours(gone) {
                self.remove_neighbours(gone, other);
            }
        }
        for &gone in &removed {
            self.entities.remove(&gone);
            self.journal.despawned.push(gone);
        }
        Ok(removed)
    }

    // -------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------

    /// Verify that every link is mutual.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Inconsistent`] describing the first broken
    /// invariant found.
    pub fn check_consistency(&self) -> Result<(), WorldError> {
        let broken = |entity: EntityId, reason: String| WorldError::Inconsistent { entity, reason };

        for entity in self.entities.values() {
            let id = entity.id();
            if let Some(parent) = entity.parent() {
                let owner = self
                    .get(parent)
                    .ok_or_else(|| broken(id, format!("parent {parent} does not exist")))?;
                if !owner.children().contains(&id) {
                    return Err(broken(id, format!("parent {parent} does not list it")));
                }
            } else if id != self.root && entity.position().is_some() {
                return Err(broken(id, String::from("placed without a parent")));
            }

            for child in entity.children() {
                let linked = self.get(*child).and_then(Entity::parent);
                if linked != Some(id) {
                    return Err(broken(id, format!("child {child} points elsewhere")));
                }
            }

            for other in entity.neighbours() {
                let mutual = self
                    .get(*other)
                    .is_some_and(|n| n.neighbours().contains(&id));
                if !mutual {
                    return Err(broken(id, format!("neighbour {other} is not mutual")));
                }
            }

            if let Some(cell) = entity.position() {
                let held = entity
                    .parent()
                    .and_then(|parent| self.occupant(parent, cell));
                if held != Some(id) {
                    return Err(broken(id, format!("cell {cell} is not held by it")));
                }
            }

            if let Some(location) = &entity.location {
                for (cell, occupant) in location.grid.occupied() {
                    let placed = self.get(occupant).is_some_and(|o| {
                        o.parent() == Some(id) && o.position() == Some(cell)
                    });
                    if !placed {
                        return Err(broken(id, format!("cell {cell} holds stale {occupant}")));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for WorldMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use zeroplayer_types::KindCategory;

    use super::*;
    use crate::grid::Grid;
    use crate::resource::ResourceStock;

    fn add(world: &mut WorldMap, kind: EntityKind) -> EntityId {
        let id = world.allocate_id();
        world.insert(Entity::new(id, kind)).unwrap()
    }

    fn add_location(world: &mut WorldMap, width: u32, height: u32) -> EntityId {
        let id = world.allocate_id();
        let mut entity = Entity::new(id, EntityKind::Forest);
        entity.location = Some(LocationState::new(Grid::new(width, height).unwrap(), Vec::new(), 0));
        world.insert(entity).unwrap();
        let root = world.root();
        world.add_children(root, &[id]).unwrap();
        id
    }

    #[test]
    fn add_children_links_both_sides() {
        let mut world = WorldMap::new();
        let a = add(&mut world, EntityKind::Forest);
        let b = add(&mut world, EntityKind::Mouse);
        world.add_children(a, &[b]).unwrap();
        assert_eq!(world.parent(b), Some(a));
        assert_eq!(world.children(a).collect::<Vec<_>>(), vec![b]);
        assert!(world.check_consistency().is_ok());
    }

    #[test]
    fn reparenting_breaks_previous_link() {
        let mut world = WorldMap::new();
        let a = add(&mut world, EntityKind::Forest);
        let b = add(&mut world, EntityKind::Field);
        let c = add(&mut world, EntityKind::Mouse);
        world.add_children(a, &[c]).unwrap();
        world.add_children(b, &[c]).unwrap();
        assert_eq!(world.children(a).count(), 0);
        assert_eq!(world.parent(c), Some(b));
        assert!(world.check_consistency().is_ok());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut world = WorldMap::new();
        let a = add(&mut world, EntityKind::Forest);
        let b = add(&mut world, EntityKind::Mouse);
        world.add_children(a, &[b]).unwrap();
        assert!(matches!(
            world.add_children(b, &[a]),
            Err(WorldError::WouldCycle { .. })
        ));
        assert!(matches!(
            world.add_children(a, &[a]),
            Err(WorldError::WouldCycle { .. })
        ));
        let root = world.root();
        assert!(matches!(
            world.add_children(a, &[root]),
            Err(WorldError::RootImmovable(_))
        ));
    }

    #[test]
    fn remove_child_is_noop_for_strangers() {
        let mut world = WorldMap::new();
        let a = add(&mut world, EntityKind::Forest);
        let b = add(&mut world, EntityKind::Mouse);
        assert!(!world.remove_child(a, b).unwrap());
        world.add_children(a, &[b]).unwrap();
        assert!(world.remove_child(a, b).unwrap());
        assert_eq!(world.parent(b), None);
    }

    #[test]
    fn transfer_children_moves_whole_set() {
        let mut world = WorldMap::new();
        let from = add(&mut world, EntityKind::Mouse);
        let to = add(&mut world, EntityKind::MouseMeat);
        let kids: Vec<EntityId> = (0..3).map(|_| add(&mut world, EntityKind::Grass)).collect();
        world.add_children(from, &kids).unwrap();

        let moved = world.transfer_children(from, to).unwrap();
        assert_eq!(moved, kids);
        assert_eq!(world.children(from).count(), 0);
        assert_eq!(world.children(to).collect::<Vec<_>>(), kids);
        assert!(world.check_consistency().is_ok());
    }

    #[test]
    fn transfer_into_own_subtree_is_rejected() {
        let mut world = WorldMap::new();
        let from = add(&mut world, EntityKind::Forest);
        let child = add(&mut world, EntityKind::Mouse);
        world.add_children(from, &[child]).unwrap();
        assert!(world.transfer_children(from, child).is_err());
        assert_eq!(world.parent(child), Some(from));
    }

    #[test]
    fn children_by_type_uses_is_a() {
        let catalog = crate::catalog::Catalog::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut world = WorldMap::new();
        let loc = add(&mut world, EntityKind::Forest);
        let mut spawn = |world: &mut WorldMap, kind| {
            catalog
                .instantiate(world, crate::spawn::SpawnTemplate::of(kind), &mut rng)
                .unwrap()
        };
        let mouse = spawn(&mut world, EntityKind::Mouse);
        let owl = spawn(&mut world, EntityKind::Owl);
        let grass = spawn(&mut world, EntityKind::Grass);
        world.add_children(loc, &[mouse, owl, grass]).unwrap();

        assert_eq!(world.children_by_type(loc, EntityKind::Mouse), vec![mouse]);
        assert_eq!(world.children_by_type(loc, KindFilter::Creature), vec![mouse, owl]);
        assert_eq!(world.children_by_type(loc, KindFilter::Resource), vec![grass]);
        assert_eq!(
            world.children_by_type(loc, KindCategory::Plant),
            vec![grass]
        );
        assert!(world.children_by_type(loc, EntityKind::Fox).is_empty());
    }

    #[test]
    fn capability_groups_follow_components() {
        let mut world = WorldMap::new();
        let loc = add(&mut world, EntityKind::Forest);
        // a bare rabbit record has no creature state
        let rabbit = add(&mut world, EntityKind::Rabbit);
        let carcass = add(&mut world, EntityKind::Carcass);
        if let Some(entity) = world.get_mut(carcass) {
            entity.resource = Some(ResourceStock::new(2.0, 0.1, 0.0, 0.0));
        }
        world.add_children(loc, &[rabbit, carcass]).unwrap();

        assert!(world.children_by_type(loc, KindFilter::Creature).is_empty());
        assert_eq!(world.children_by_type(loc, KindFilter::Resource), vec![carcass]);
        assert_eq!(world.children_by_type(loc, KindCategory::Herbivore), vec![rabbit]);
    }

    #[test]
    fn depth_first_visits_parents_first_in_id_order() {
        let mut world = WorldMap::new();
        let root = world.root();
        let a = add(&mut world, EntityKind::Forest);
        let b = add(&mut world, EntityKind::Field);
        let a1 = add(&mut world, EntityKind::Mouse);
        let b1 = add(&mut world, EntityKind::Rabbit);
        world.add_children(root, &[b, a]).unwrap();
        world.add_children(a, &[a1]).unwrap();
        world.add_children(b, &[b1]).unwrap();
        assert_eq!(world.depth_first(root), vec![root, a, a1, b, b1]);
    }

    #[test]
    fn place_at_clamps_and_rejects_occupied() {
        let mut world = WorldMap::new();
        let loc = add_location(&mut world, 4, 4);
        let m1 = add(&mut world, EntityKind::Mouse);
        let m2 = add(&mut world, EntityKind::Mouse);

        assert_eq!(world.place_at(loc, m1, 10, -3).unwrap(), Cell::new(3, 0));
        assert_eq!(world.parent(m1), Some(loc));
        assert!(matches!(
            world.place_at(loc, m2, 3, 0),
            Err(WorldError::CellOccupied { .. })
        ));
        // The failed placement left m2 untouched.
        assert_eq!(world.parent(m2), None);
        assert!(world.check_consistency().is_ok());
    }

    #[test]
    fn place_on_non_location_fails() {
        let mut world = WorldMap::new();
        let mouse = add(&mut world, EntityKind::Mouse);
        let other = add(&mut world, EntityKind::Mouse);
        assert!(matches!(
            world.place_at(mouse, other, 0, 0),
            Err(WorldError::NotALocation(_))
        ));
    }

    #[test]
    fn moving_between_locations_vacates_old_cell() {
        let mut world = WorldMap::new();
        let a = add_location(&mut world, 3, 3);
        let b = add_location(&mut world, 3, 3);
        let mouse = add(&mut world, EntityKind::Mouse);
        world.place_at(a, mouse, 1, 1).unwrap();
        world.place_at(b, mouse, 2, 2).unwrap();
        assert_eq!(world.occupant(a, Cell::new(1, 1)), None);
        assert_eq!(world.occupant(b, Cell::new(2, 2)), Some(mouse));
        assert!(world.check_consistency().is_ok());
    }

    #[test]
    fn move_within_refuses_taken_cell() {
        let mut world = WorldMap::new();
        let loc = add_location(&mut world, 3, 3);
        let a = add(&mut world, EntityKind::Mouse);
        let b = add(&mut world, EntityKind::Mouse);
        world.place_at(loc, a, 0, 0).unwrap();
        world.place_at(loc, b, 1, 0).unwrap();
        assert!(!world.move_within(a, Cell::new(1, 0)).unwrap());
        assert!(world.move_within(a, Cell::new(0, 1)).unwrap());
        assert_eq!(world.position(a), Some(Cell::new(0, 1)));
        assert!(matches!(
            world.move_within(loc, Cell::new(0, 0)),
            Err(WorldError::NotPlaced(_))
        ));
    }

    #[test]
    fn place_near_uses_adjacent_free_cells() {
        let mut world = WorldMap::new();
        let mut rng = StdRng::seed_from_u64(9);
        let loc = add_location(&mut world, 3, 3);
        let mother = add(&mut world, EntityKind::Mouse);
        world.place_at(loc, mother, 0, 0).unwrap();
        let child = add(&mut world, EntityKind::Mouse);
        let cell = world.place_near(loc, child, Cell::new(0, 0), &mut rng).unwrap();
        let cell = cell.unwrap();
        assert!(cell.distance(Cell::new(0, 0)) < 1.5);
        assert_ne!(cell, Cell::new(0, 0));
    }

    #[test]
    fn despawn_removes_subtree_and_links() {
        let mut world = WorldMap::new();
        let loc = add_location(&mut world, 3, 3);
        let other = add_location(&mut world, 3, 3);
        world.add_neighbours(loc, other).unwrap();
        let mouse = add(&mut world, EntityKind::Mouse);
        world.place_at(loc, mouse, 1, 1).unwrap();

        let removed = world.despawn(loc).unwrap();
        assert_eq!(removed, vec![loc, mouse]);
        assert!(!world.contains(mouse));
        assert!(world.neighbours(other).is_empty());
        assert!(world.children(world.root()).all(|id| id != loc));
        assert!(world.check_consistency().is_ok());

        let journal = world.take_journal();
        assert_eq!(journal.despawned, vec![loc, mouse]);
        assert!(world.take_journal().despawned.is_empty());
    }

    #[test]
    fn root_cannot_be_despawned() {
        let mut world = WorldMap::new();
        let root = world.root();
        assert!(matches!(world.despawn(root), Err(WorldError::RootImmovable(_))));
    }

    #[test]
    fn neighbour_links_are_symmetric_and_transferable() {
        let mut world = WorldMap::new();
        let a = add(&mut world, EntityKind::Forest);
        let b = add(&mut world, EntityKind::Field);
        let c = add(&mut world, EntityKind::Forest);
        world.add_neighbours(a, b).unwrap();
        assert_eq!(world.neighbours(b), vec![a]);
        world.transfer_neighbours(a, c).unwrap();
        assert!(world.neighbours(a).is_empty());
        assert_eq!(world.neighbours(b), vec![c]);
        assert!(world.check_consistency().is_ok());
    }
}
