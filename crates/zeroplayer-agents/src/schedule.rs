//! The decide pass: walking the world and scheduling every entity's
//! effects for one tick.
//!
//! Nothing here mutates the world. The walk is depth-first from the root,
//! parents before children and children in id order, so a fixed world and
//! seed always produce the same queue.

use zeroplayer_types::EntityId;
use zeroplayer_world::{Entity, WorldMap};

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::{creature, decaying, hunter, killable, location, movement, resource};

/// Schedule the effects of one entity.
///
/// Every entity ages; each capability it carries adds its own effects.
pub fn enqueue_entity(entity: &Entity, queue: &mut SimQueue) {
    let id = entity.id();
    queue.enqueue(StepPriority::Lifetime, Some(id), move |ctx, _| {
        grow_older(&mut ctx.world, id)
    });
    killable::enqueue(entity, queue);
    decaying::enqueue(entity, queue);
    movement::enqueue(entity, queue);
    hunter::enqueue(entity, queue);
    creature::enqueue(entity, queue);
    resource::enqueue(entity, queue);
    location::enqueue(entity, queue);
}

/// Walk the world from the root and schedule every entity's effects.
///
/// Returns how many entities were visited. The root itself only owns the
/// world and schedules nothing.
pub fn decide(world: &WorldMap, queue: &mut SimQueue) -> usize {
    let root = world.root();
    let mut visited = 0_usize;
    for id in world.depth_first(root) {
        if id == root {
            continue;
        }
        if let Some(entity) = world.get(id) {
            enqueue_entity(entity, queue);
            visited = visited.saturating_add(1);
        }
    }
    visited
}

fn grow_older(world: &mut WorldMap, id: EntityId) -> ActionResult {
    if let Some(entity) = world.get_mut(id) {
        entity.lifetime = entity.lifetime.saturating_add(1);
    }
    Ok(())
}
