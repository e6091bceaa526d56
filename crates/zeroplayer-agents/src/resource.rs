//! Resource settlement and decay.
//!
//! Requests signed during [`StepPriority::Hunger`] are settled at
//! [`StepPriority::Distribute`]. Decay and the exhaustion check follow at
//! [`StepPriority::Decay`], so a resource emptied by distribution is
//! condemned in the same tick.

use tracing::trace;
use zeroplayer_types::EntityId;
use zeroplayer_world::{Entity, WorldMap, distribute};

use crate::actions::{ActionResult, SimQueue, StepPriority};

/// Schedule settlement and decay for a resource.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.resource.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Distribute, Some(id), move |ctx, _| {
        settle(&mut ctx.world, id)
    });
    queue.enqueue(StepPriority::Decay, Some(id), move |ctx, _| {
        decay_and_check(&mut ctx.world, id)
    });
}

/// Hand out everything requested from the resource this tick.
pub fn settle(world: &mut WorldMap, id: EntityId) -> ActionResult {
    if world.get(id).is_none_or(Entity::is_killed) {
        return Ok(());
    }
    distribute(world, id)?;
    Ok(())
}

/// Apply one tick of decay and condemn the resource if it ran out.
pub fn decay_and_check(world: &mut WorldMap, id: EntityId) -> ActionResult {
    let Some(entity) = world.get_mut(id) else {
        return Ok(());
    };
    if entity.is_killed() {
        return Ok(());
    }
    let Some(stock) = entity.resource.as_mut() else {
        return Ok(());
    };
    stock.decay();
    if stock.is_exhausted() {
        trace!(resource = %id, value = stock.value, "Resource exhausted");
        world.mark_killed(id, false)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zeroplayer_types::EntityKind;
    use zeroplayer_world::{Catalog, SpawnTemplate};

    use super::*;
    use crate::test_support::context;

    #[test]
    fn growing_grass_survives_and_wheat_runs_out() {
        let mut ctx = context(Catalog::default(), 1);
        let grass = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::with_value(EntityKind::Grass, 1.0), &mut ctx.rng)
            .unwrap();
        let wheat = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::with_value(EntityKind::Wheat, 1.5), &mut ctx.rng)
            .unwrap();

        // wheat: 1.5 - 1.0 = 0.5, then 0.5 - 1.25 < 0
        decay_and_check(&mut ctx.world, wheat).unwrap();
        assert!(!ctx.world.is_killed(wheat));
        decay_and_check(&mut ctx.world, wheat).unwrap();
        assert!(ctx.world.is_killed(wheat));

        // grass grows back: 1 + 2, then 3 + 1
        decay_and_check(&mut ctx.world, grass).unwrap();
        decay_and_check(&mut ctx.world, grass).unwrap();
        assert!(!ctx.world.is_killed(grass));
        let value = ctx.world.get(grass).and_then(|e| e.resource.as_ref()).map(|r| r.value);
        assert!(value.is_some_and(|v| (v - 4.0).abs() < 1e-9));
    }

    #[test]
    fn condemned_resource_is_not_settled() {
        let mut ctx = context(Catalog::default(), 2);
        let grass = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Grass), &mut ctx.rng)
            .unwrap();
        ctx.world.mark_killed(grass, false).unwrap();
        settle(&mut ctx.world, grass).unwrap();
        decay_and_check(&mut ctx.world, grass).unwrap();
        assert!(ctx.world.is_killed(grass));
    }
}
