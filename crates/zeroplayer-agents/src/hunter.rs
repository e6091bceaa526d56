//! Hunting: scanning for prey, leap attacks, and wandering.
//!
//! A hunter runs four effects per tick:
//!
//! 1. [`StepPriority::Search`]: scan the vision square and keep the closest
//!    prey cell as the move target.
//! 2. [`StepPriority::LeapAttack`]: if a live prey stands on the target
//!    within leap distance, kill it outright (no residue) and feed.
//! 3. [`StepPriority::Wander`]: with no target and no leap, pick a random
//!    cell to walk to.
//! 4. [`StepPriority::LeapMove`]: after kills are resolved, step onto the
//!    cell the prey vacated.

use rand::Rng;
use tracing::debug;
use zeroplayer_types::EntityId;
use zeroplayer_world::grid::square_shifts;
use zeroplayer_world::{Cell, Entity, WorldMap};

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::context::SimContext;
use crate::error::ActionError;

/// Schedule the hunting effects of a hunter.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.hunter.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Search, Some(id), move |ctx, _| {
        search(&mut ctx.world, id).map(|_| ())
    });
    queue.enqueue(StepPriority::LeapAttack, Some(id), move |ctx, _| {
        leap_attack(&mut ctx.world, id).map(|_| ())
    });
    queue.enqueue(StepPriority::Wander, Some(id), move |ctx, _| wander(ctx, id));
    queue.enqueue(StepPriority::LeapMove, Some(id), move |ctx, _| leap_move(&mut ctx.world, id));
}

/// Scan for prey and update the move target. Returns the new target.
///
/// A prey cell replaces the current target if it is strictly closer, or if
/// nothing stands on the current target any more.
pub fn search(world: &mut WorldMap, id: EntityId) -> Result<Option<Cell>, ActionError> {
    let Some(entity) = world.get(id) else {
        return Ok(None);
    };
    if entity.is_killed() {
        return Ok(None);
    }
    let (Some(hunter), Some(movable)) = (entity.hunter.as_ref(), entity.movable) else {
        return Ok(None);
    };
    let here = entity.position().ok_or(ActionError::NotPlaced(id))?;
    let location = world.location_of(id).ok_or(ActionError::NotPlaced(id))?;
    let grid = world.location(location)?.grid();

    let mut best = movable.target;
    for shift in square_shifts(hunter.vision) {
        let (x, y) = here.shifted(shift);
        let cell = grid.clamp(x, y);
        let Some(occupant) = grid.occupant(cell) else {
            continue;
        };
        let is_prey = occupant != id
            && world
                .get(occupant)
                .is_some_and(|prey| hunter.hunts(prey.kind()) && !prey.is_killed());
        if !is_prey {
            continue;
        }
        let closer = best.is_none_or(|current| here.distance(cell) < here.distance(current));
        let current_empty = best.is_some_and(|current| grid.occupant(current).is_none());
        if closer || current_empty {
            best = Some(cell);
        }
    }

    if best != movable.target {
        if let Some(movable) = world.get_mut(id).and_then(|e| e.movable.as_mut()) {
            movable.target = best;
        }
    }
    Ok(best)
}

/// Strike the prey on the target cell if it is within leap distance.
///
/// Returns the prey that was taken.
pub fn leap_attack(world: &mut WorldMap, id: EntityId) -> Result<Option<EntityId>, ActionError> {
    let Some(entity) = world.get_mut(id) else {
        return Ok(None);
    };
    if let Some(hunter) = entity.hunter.as_mut() {
        hunter.leap = None;
    }
    if entity.is_killed() {
        return Ok(None);
    }
    let (Some(hunter), Some(target)) = (entity.hunter.as_ref(), entity.move_target()) else {
        return Ok(None);
    };
    let here = entity.position().ok_or(ActionError::NotPlaced(id))?;
    if here.distance(target) > hunter.leap_distance {
        return Ok(None);
    }
    let location = world.location_of(id).ok_or(ActionError::NotPlaced(id))?;
    let Some(prey) = world.occupant(location, target) else {
        return Ok(None);
    };
    let Some(prey_entity) = world.get(prey) else {
        return Ok(None);
    };
    let hunter = world.entity(id)?.hunter.as_ref();
    let Some(multiplier) = hunter.and_then(|h| h.prey.get(&prey_entity.kind())).copied() else {
        return Ok(None);
    };
    if prey_entity.is_killed() || prey_entity.killable.is_none() {
        return Ok(None);
    }
    let prey_kind = prey_entity.kind();
    let prey_value = prey_entity
        .satiety()
        .or_else(|| prey_entity.integrity())
        .unwrap_or(1.0);

    world.mark_killed(prey, true)?;
    let entity = world.entity_mut(id)?;
    if let Some(hunter) = entity.hunter.as_mut() {
        hunter.leap = Some(target);
    }
    if let Some(movable) = entity.movable.as_mut() {
        movable.target = None;
    }
    if let Some(creature) = entity.creature.as_mut() {
        creature.eat(multiplier * prey_value);
    }
    debug!(hunter = %id, prey = %prey, prey_kind = %prey_kind, cell = %target, "Leap attack");
    Ok(Some(prey))
}

/// Pick a random destination when idle.
pub fn wander(ctx: &mut SimContext, id: EntityId) -> ActionResult {
    let Some(entity) = ctx.world.get(id) else {
        return Ok(());
    };
    if entity.is_killed() {
        return Ok(());
    }
    let leapt = entity.hunter.as_ref().is_some_and(|h| h.leap.is_some());
    if leapt || entity.move_target().is_some() {
        return Ok(());
    }
    let cell = random_target(&ctx.world, id, &mut ctx.rng)?;
    if let Some(movable) = ctx.world.get_mut(id).and_then(|e| e.movable.as_mut()) {
        movable.target = Some(cell);
    }
    Ok(())
}

/// Step onto the cell of the prey taken this tick.
pub fn leap_move(world: &mut WorldMap, id: EntityId) -> ActionResult {
    let Some(entity) = world.get_mut(id) else {
        return Ok(());
    };
    if entity.is_killed() {
        return Ok(());
    }
    let Some(cell) = entity.hunter.as_mut().and_then(|h| h.leap.take()) else {
        return Ok(());
    };
    world.move_within(id, cell)?;
    Ok(())
}

/// Whether the hunter is chasing something.
pub fn has_target(entity: &Entity) -> bool {
    entity.hunter.is_some() && entity.move_target().is_some()
}

/// Choose a uniformly random cell of the hunter's grid.
pub fn random_target<R: Rng + ?Sized>(
    world: &WorldMap,
    id: EntityId,
    rng: &mut R,
) -> Result<Cell, ActionError> {
    let location = world.location_of(id).ok_or(ActionError::NotPlaced(id))?;
    Ok(world.location(location)?.grid().random_cell(rng))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zeroplayer_types::{EntityKind, Gender};
    use zeroplayer_world::{Catalog, SpawnTemplate};

    use super::*;
    use crate::killable;
    use crate::test_support::{context, empty_forest};

    fn setup(seed: u64) -> (SimContext, EntityId) {
        let mut ctx = context(Catalog::default(), seed);
        let forest = empty_forest(&mut ctx);
        (ctx, forest)
    }

    fn put(ctx: &mut SimContext, forest: EntityId, kind: EntityKind, x: i64, y: i64) -> EntityId {
        let id = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::with_gender(kind, Gender::Male), &mut ctx.rng)
            .unwrap();
        ctx.world.place_at(forest, id, x, y).unwrap();
        id
    }

    #[test]
    fn search_targets_closest_prey() {
        let (mut ctx, forest) = setup(1);
        let owl = put(&mut ctx, forest, EntityKind::Owl, 0, 0);
        put(&mut ctx, forest, EntityKind::Mouse, 4, 4);
        put(&mut ctx, forest, EntityKind::Mouse, 2, 1);
        put(&mut ctx, forest, EntityKind::Rabbit, 1, 0);

        let target = search(&mut ctx.world, owl).unwrap();
        assert_eq!(target, Some(Cell::new(2, 1)));
        assert_eq!(ctx.world.get(owl).and_then(Entity::move_target), Some(Cell::new(2, 1)));
    }

    #[test]
    fn search_keeps_target_unless_strictly_closer() {
        let (mut ctx, forest) = setup(2);
        let owl = put(&mut ctx, forest, EntityKind::Owl, 5, 5);
        put(&mut ctx, forest, EntityKind::Mouse, 7, 5);
        put(&mut ctx, forest, EntityKind::Mouse, 3, 5);
        if let Some(movable) = ctx.world.get_mut(owl).and_then(|e| e.movable.as_mut()) {
            movable.target = Some(Cell::new(7, 5));
        }
        let target = search(&mut ctx.world, owl).unwrap();
        assert_eq!(target, Some(Cell::new(7, 5)));
    }

    #[test]
    fn search_drops_stale_target() {
        let (mut ctx, forest) = setup(3);
        let owl = put(&mut ctx, forest, EntityKind::Owl, 5, 5);
        put(&mut ctx, forest, EntityKind::Mouse, 9, 5);
        if let Some(movable) = ctx.world.get_mut(owl).and_then(|e| e.movable.as_mut()) {
            movable.target = Some(Cell::new(6, 5));
        }
        let target = search(&mut ctx.world, owl).unwrap();
        assert_eq!(target, Some(Cell::new(9, 5)));
    }

    #[test]
    fn leap_kills_prey_feeds_and_moves_in() {
        let (mut ctx, forest) = setup(4);
        let owl = put(&mut ctx, forest, EntityKind::Owl, 0, 0);
        let mouse = put(&mut ctx, forest, EntityKind::Mouse, 1, 1);
        if let Some(creature) = ctx.world.get_mut(owl).and_then(|e| e.creature.as_mut()) {
            creature.satiety = 0.1;
        }

        search(&mut ctx.world, owl).unwrap();
        let taken = leap_attack(&mut ctx.world, owl).unwrap();
        assert_eq!(taken, Some(mouse));
        assert!(ctx.world.is_killed(mouse));

        // 0.1 + 0.9 * 0.8
        let satiety = ctx.world.get(owl).and_then(Entity::satiety).unwrap();
        assert!((satiety - 0.82).abs() < 1e-9);

        killable::resolve(&mut ctx, mouse).unwrap();
        assert!(ctx.world.children_by_type(forest, EntityKind::MouseMeat).is_empty());
        leap_move(&mut ctx.world, owl).unwrap();
        assert_eq!(ctx.world.position(owl), Some(Cell::new(1, 1)));
    }

    #[test]
    fn prey_out_of_reach_is_not_taken() {
        let (mut ctx, forest) = setup(5);
        let owl = put(&mut ctx, forest, EntityKind::Owl, 0, 0);
        let mouse = put(&mut ctx, forest, EntityKind::Mouse, 3, 0);
        search(&mut ctx.world, owl).unwrap();
        assert_eq!(leap_attack(&mut ctx.world, owl).unwrap(), None);
        assert!(!ctx.world.is_killed(mouse));
    }

    #[test]
    fn idle_hunter_wanders() {
        let (mut ctx, forest) = setup(6);
        let fox = put(&mut ctx, forest, EntityKind::Fox, 0, 0);
        search(&mut ctx.world, fox).unwrap();
        assert!(ctx.world.get(fox).and_then(Entity::move_target).is_none());
        wander(&mut ctx, fox).unwrap();
        assert!(ctx.world.get(fox).and_then(Entity::move_target).is_some());
    }
}
