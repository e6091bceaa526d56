//! Integrity decay.

use tracing::trace;
use zeroplayer_types::EntityId;
use zeroplayer_world::Entity;

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::context::SimContext;

/// Schedule one tick of decay for a decaying entity.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.decaying.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Decay, Some(id), move |ctx, _| decay(ctx, id));
}

/// Wear integrity down and condemn the entity once it reaches zero.
pub fn decay(ctx: &mut SimContext, id: EntityId) -> ActionResult {
    let Some(entity) = ctx.world.get_mut(id) else {
        return Ok(());
    };
    if entity.is_killed() {
        return Ok(());
    }
    let Some(decaying) = entity.decaying.as_mut() else {
        return Ok(());
    };
    if decaying.decay() {
        trace!(entity = %id, "Decayed away");
        ctx.world.mark_killed(id, false)?;
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
    fn carcass_decays_then_is_condemned() {
        let mut ctx = context(Catalog::default(), 1);
        let carcass = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Carcass), &mut ctx.rng)
            .unwrap();

        // integrity 1.0 at 0.2 per tick
        for _ in 0..4 {
            decay(&mut ctx, carcass).unwrap();
        }
        assert!(!ctx.world.is_killed(carcass));
        let left = ctx.world.get(carcass).and_then(Entity::integrity).unwrap();
        assert!((left - 0.2).abs() < 1e-9);

        decay(&mut ctx, carcass).unwrap();
        decay(&mut ctx, carcass).unwrap();
        assert!(ctx.world.is_killed(carcass));
    }
}
