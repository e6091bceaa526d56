//! Per-tick spawning on locations.

use zeroplayer_types::EntityId;
use zeroplayer_world::{Entity, roll_spawns};

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::context::SimContext;

/// Schedule a spawn roll for a location.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.location.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Spawn, Some(id), move |ctx, _| spawn(ctx, id));
}

/// Fire every spawn rule of the location once, if spawning is enabled.
pub fn spawn(ctx: &mut SimContext, id: EntityId) -> ActionResult {
    let enabled = ctx
        .world
        .get(id)
        .and_then(|e| e.location.as_ref())
        .is_some_and(|location| location.spawning_enabled);
    if enabled {
        roll_spawns(&mut ctx.world, &ctx.catalog, id, &mut ctx.rng)?;
    }
    Ok(())
}
