//! Grid movement towards a persistent target.
//!
//! Each tick a movable entity takes one shift from its [`ShiftPattern`]:
//! the one landing closest to the target among cells that are free (its
//! own cell counts as free). Ties go to the shift listed first, and "stay"
//! is always listed first, so a blocked entity waits in place.
//!
//! [`ShiftPattern`]: zeroplayer_world::ShiftPattern

use tracing::trace;
use zeroplayer_types::EntityId;
use zeroplayer_world::{Cell, Entity, WorldMap};

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::context::SimContext;
use crate::error::ActionError;

/// Schedule one movement step for a movable entity.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.movable.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Move, Some(id), move |ctx, _| {
        step_towards_target(&mut ctx.world, id).map(|_| ())
    });
}

/// Set the move target, clamped into the grid the entity stands on.
pub fn set_target(world: &mut WorldMap, id: EntityId, x: i64, y: i64) -> Result<Cell, ActionError> {
    let location = world.location_of(id).ok_or(ActionError::NotPlaced(id))?;
    let cell = world.clamp(location, x, y)?;
    let movable = world
        .entity_mut(id)?
        .movable
        .as_mut()
        .ok_or(ActionError::MissingCapability {
            entity: id,
            capability: "movable",
        })?;
    movable.target = Some(cell);
    Ok(cell)
}

/// Jump straight to a cell of the current grid. Returns `false` if the cell
/// is taken.
pub fn move_to_instant(world: &mut WorldMap, id: EntityId, x: i64, y: i64) -> Result<bool, ActionError> {
    let location = world.location_of(id).ok_or(ActionError::NotPlaced(id))?;
    let cell = world.clamp(location, x, y)?;
    Ok(world.move_within(id, cell)?)
}

/// Take one shift towards the target. Returns the cell moved to, if any.
///
/// Killed entities and entities without a target stay put. The target is
/// cleared on arrival.
pub fn step_towards_target(world: &mut WorldMap, id: EntityId) -> Result<Option<Cell>, ActionError> {
    let Some(entity) = world.get(id) else {
        return Ok(None);
    };
    if entity.is_killed() {
        return Ok(None);
    }
    let Some(movable) = entity.movable else {
        return Ok(None);
    };
    let Some(target) = movable.target else {
        return Ok(None);
    };
    let here = entity.position().ok_or(ActionError::NotPlaced(id))?;
    let location = world.location_of(id).ok_or(ActionError::NotPlaced(id))?;

    if here == target {
        clear_target(world, id);
        return Ok(None);
    }

    let grid = world.location(location)?.grid();
    let mut options = grid.destinations(here, &movable.shifts.shifts());
    options.sort_by(|a, b| a.distance(target).total_cmp(&b.distance(target)));
    let Some(next) = options
        .into_iter()
        .find(|cell| *cell == here || grid.is_free(*cell))
    else {
        return Ok(None);
    };

    if next != here {
        world.move_within(id, next)?;
        trace!(entity = %id, from = %here, to = %next, "Moved");
    }
    if next == target {
        clear_target(world, id);
    }
    Ok(Some(next))
}

fn clear_target(world: &mut WorldMap, id: EntityId) {
    if let Some(movable) = world.get_mut(id).and_then(|e| e.movable.as_mut()) {
        movable.target = None;
    }
}
