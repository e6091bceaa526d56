//! Death resolution: residue spawning, hand-over, and removal.
//!
//! Entities are condemned by flag during earlier phases; the flag is only
//! acted on at [`StepPriority::Kill`], after every other effect of the tick
//! has seen the entity alive.

use tracing::{debug, warn};
use zeroplayer_types::EntityId;
use zeroplayer_world::{Cell, Entity, SpawnRule, WorldMap};

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::context::SimContext;
use crate::error::ActionError;

/// Schedule kill resolution for a killable entity.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.killable.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Kill, Some(id), move |ctx, _| resolve(ctx, id));
}

/// Condemn an entity. Returns `false` if it cannot be killed.
pub fn kill(world: &mut WorldMap, id: EntityId, no_residue: bool) -> Result<bool, ActionError> {
    Ok(world.mark_killed(id, no_residue)?)
}

/// Remove a condemned entity, leaving its residue behind.
///
/// Residues become children of the dying entity's parent. The first is
/// placed on the vacated cell and later ones on free adjacent cells; a
/// residue with no free cell stays unplaced. Children and neighbour links
/// optionally pass to the last residue. Anything still owned afterwards
/// is removed with the entity.
///
/// If a residue cannot be spawned, the residues made so far are removed,
/// the entity returns to its cell with its rules intact, and the error is
/// returned. The entity stays condemned.
pub fn resolve(ctx: &mut SimContext, id: EntityId) -> ActionResult {
    let Some(entity) = ctx.world.get_mut(id) else {
        return Ok(());
    };
    let kind = entity.kind();
    let parent = entity.parent();
    let Some(killable) = entity.killable.as_mut().filter(|k| k.killed) else {
        return Ok(());
    };
    let no_residue = killable.no_residue;
    let transfer_children = killable.transfer_children;
    let transfer_neighbours = killable.transfer_neighbours;
    let mut rules = std::mem::take(&mut killable.residue);

    let location = ctx.world.location_of(id);
    let vacated = ctx.world.unplace(id)?;

    let mut residues = Vec::new();
    if let (false, Some(parent)) = (no_residue, parent) {
        let site = location.zip(vacated);
        if let Err(error) = spawn_residues(ctx, parent, site, &mut rules, &mut residues) {
            roll_back(&mut ctx.world, id, site, rules, &residues)?;
            return Err(error);
        }
    }

    if let Some(&last) = residues.last() {
        if transfer_children {
            ctx.world.transfer_children(id, last)?;
        }
        if transfer_neighbours {
            ctx.world.transfer_neighbours(id, last)?;
        }
    }

    let removed = ctx.world.despawn(id)?;
    debug!(
        entity = %id,
        kind = %kind,
        residues = residues.len(),
        removed = removed.len(),
        "Entity died"
    );
    Ok(())
}

fn spawn_residues(
    ctx: &mut SimContext,
    parent: EntityId,
    site: Option<(EntityId, Cell)>,
    rules: &mut [SpawnRule],
    residues: &mut Vec<EntityId>,
) -> ActionResult {
    for rule in rules {
        let Some(residue) = rule.spawn_as_child(&mut ctx.world, &ctx.catalog, parent, &mut ctx.rng)? else {
            continue;
        };
        residues.push(residue);
        if let Some((location, cell)) = site {
            if residues.len() == 1 {
                ctx.world
                    .place_at(location, residue, i64::from(cell.x), i64::from(cell.y))?;
            } else {
                ctx.world.place_near(location, residue, cell, &mut ctx.rng)?;
            }
        }
    }
    Ok(())
}

/// Undo a failed resolution.
fn roll_back(
    world: &mut WorldMap,
    id: EntityId,
    site: Option<(EntityId, Cell)>,
    rules: Vec<SpawnRule>,
    residues: &[EntityId],
) -> ActionResult {
    for &residue in residues {
        world.despawn(residue)?;
    }
    if let Some((location, cell)) = site {
        world.place_at(location, id, i64::from(cell.x), i64::from(cell.y))?;
    }
    if let Some(killable) = world.get_mut(id).and_then(|e| e.killable.as_mut()) {
        killable.residue = rules;
    }
    warn!(entity = %id, discarded = residues.len(), "Death resolution rolled back");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zeroplayer_types::{EntityKind, Gender, KindFilter};
    use zeroplayer_world::{Catalog, Cell, SpawnTemplate};

    use super::*;
    use crate::test_support::{context, empty_forest};

    #[test]
    fn killed_mouse_leaves_meat_on_its_cell() {
        let mut ctx = context(Catalog::default(), 1);
        let forest = empty_forest(&mut ctx);
        let mouse = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::with_gender(EntityKind::Mouse, Gender::Male), &mut ctx.rng)
            .unwrap();
        ctx.world.place_at(forest, mouse, 3, 4).unwrap();

        kill(&mut ctx.world, mouse, false).unwrap();
        resolve(&mut ctx, mouse).unwrap();

        assert!(!ctx.world.contains(mouse));
        let meat = ctx.world.children_by_type(forest, EntityKind::MouseMeat);
        assert_eq!(meat.len(), 1);
        assert_eq!(ctx.world.position(*meat.first().unwrap()), Some(Cell::new(3, 4)));
        assert!(ctx.world.check_consistency().is_ok());
    }

    #[test]
    fn failed_residue_spawn_leaves_entity_intact() {
        let mut ctx = context(Catalog::default(), 3);
        let forest = empty_forest(&mut ctx);
        let mouse = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Mouse), &mut ctx.rng)
            .unwrap();
        ctx.world.place_at(forest, mouse, 2, 2).unwrap();
        let residue_rules = |ctx: &SimContext| {
            ctx.world
                .get(mouse)
                .and_then(|e| e.killable.as_ref())
                .map(|k| k.residue.len())
        };
        let before = residue_rules(&ctx);
        assert!(before.is_some_and(|n| n > 0));

        // no kind can be spawned from an empty table
        ctx.catalog = Catalog::from_config(&zeroplayer_world::CatalogConfig::empty()).unwrap();
        kill(&mut ctx.world, mouse, false).unwrap();
        assert!(resolve(&mut ctx, mouse).is_err());

        assert!(ctx.world.contains(mouse));
        assert!(ctx.world.get(mouse).is_some_and(Entity::is_killed));
        assert_eq!(ctx.world.position(mouse), Some(Cell::new(2, 2)));
        assert_eq!(residue_rules(&ctx), before);
        assert_eq!(ctx.world.children_by_type(forest, KindFilter::Any), vec![mouse]);
        assert!(ctx.world.check_consistency().is_ok());

        // a later resolution with a working table completes
        ctx.catalog = Catalog::default();
        resolve(&mut ctx, mouse).unwrap();
        assert!(!ctx.world.contains(mouse));
        assert_eq!(ctx.world.children_by_type(forest, EntityKind::MouseMeat).len(), 1);
    }

    #[test]
    fn no_residue_kill_leaves_nothing() {
        let mut ctx = context(Catalog::default(), 2);
        let forest = empty_forest(&mut ctx);
        let mouse = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Mouse), &mut ctx.rng)
            .unwrap();
        ctx.world.place_at(forest, mouse, 0, 0).unwrap();

        kill(&mut ctx.world, mouse, true).unwrap();
        resolve(&mut ctx, mouse).unwrap();

        assert!(ctx.world.children_by_type(forest, KindFilter::Any).is_empty());
        assert_eq!(ctx.world.occupant(forest, Cell::new(0, 0)), None);
    }

    #[test]
    fn unflagged_entity_survives_resolution() {
        let mut ctx = context(Catalog::default(), 3);
        let forest = empty_forest(&mut ctx);
        let mouse = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Mouse), &mut ctx.rng)
            .unwrap();
        ctx.world.place_at(forest, mouse, 0, 0).unwrap();
        resolve(&mut ctx, mouse).unwrap();
        assert!(ctx.world.contains(mouse));
    }

    #[test]
    fn children_pass_to_last_residue() {
        let mut ctx = context(Catalog::default(), 4);
        let forest = empty_forest(&mut ctx);
        let mouse = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Mouse), &mut ctx.rng)
            .unwrap();
        ctx.world.place_at(forest, mouse, 1, 1).unwrap();
        let keepsake = ctx
            .catalog
            .instantiate(&mut ctx.world, SpawnTemplate::of(EntityKind::Carcass), &mut ctx.rng)
            .unwrap();
        ctx.world.add_children(mouse, &[keepsake]).unwrap();
        if let Some(killable) = ctx.world.get_mut(mouse).and_then(|e| e.killable.as_mut()) {
            killable.transfer_children = true;
        }

        kill(&mut ctx.world, mouse, false).unwrap();
        resolve(&mut ctx, mouse).unwrap();

        let meat = *ctx.world.children_by_type(forest, EntityKind::MouseMeat).first().unwrap();
        assert_eq!(ctx.world.parent(keepsake), Some(meat));
        assert!(ctx.world.check_consistency().is_ok());
    }
}
