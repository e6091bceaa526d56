//! Creature life cycle: hunger, aging, starvation, migration, procreation.
//!
//! Per tick, in phase order:
//!
//! - **Hunger**: satiety drops by the hunger rate. A hungry creature then
//!   looks for edible resources among its siblings and signs a request on
//!   each, sized by how starved it is. Finding nothing, a creature that
//!   migrates schedules a move to a random neighbouring location.
//! - **Age**: the creature dies once its lifetime reaches the cap.
//! - **Decay**: the creature dies once satiety is gone.
//! - **Procreation**: a female off cooldown, with enough male siblings of
//!   her kind, fires her offspring rules onto free adjacent cells.

use rand::seq::IndexedRandom;
use tracing::{debug, trace};
use zeroplayer_types::{EntityId, EntityKind, Gender};
use zeroplayer_world::{Entity, Receiver, Settlement, WorldMap};

use crate::actions::{ActionResult, SimQueue, StepPriority};
use crate::context::SimContext;
use crate::error::ActionError;
use crate::hunter;

/// Schedule the life-cycle effects of a creature.
pub fn enqueue(entity: &Entity, queue: &mut SimQueue) {
    if entity.creature.is_none() {
        return;
    }
    let id = entity.id();
    queue.enqueue(StepPriority::Hunger, Some(id), move |ctx, queue| hunger(ctx, queue, id));
    queue.enqueue(StepPriority::Age, Some(id), move |ctx, _| age(&mut ctx.world, id));
    queue.enqueue(StepPriority::Decay, Some(id), move |ctx, _| starvation(&mut ctx.world, id));
    queue.enqueue(StepPriority::Procreation, Some(id), move |ctx, _| {
        procreate(ctx, id).map(|_| ())
    });
}

// ---------------------------------------------------------------------------
// Hunger
// ---------------------------------------------------------------------------

/// Lose one tick of satiety, then sign up for food if hungry.
pub fn hunger(ctx: &mut SimContext, queue: &mut SimQueue, id: EntityId) -> ActionResult {
    let Some(entity) = ctx.world.get_mut(id) else {
        return Ok(());
    };
    if entity.is_killed() {
        return Ok(());
    }
    let Some(creature) = entity.creature.as_mut() else {
        return Ok(());
    };
    creature.hunger();
    if !creature.is_hungry() {
        return Ok(());
    }

    let signed = request_food(&mut ctx.world, id)?;
    let wants_to_leave = ctx.world.get(id).is_some_and(|e| {
        e.creature.as_ref().is_some_and(|c| c.migrate_when_starving) && !hunter::has_target(e)
    });
    if signed == 0 && wants_to_leave {
        queue.enqueue(StepPriority::Move, Some(id), move |ctx, _| {
            migrate(ctx, id).map(|_| ())
        });
    }
    Ok(())
}

/// Sign a request on every edible sibling resource. Returns how many were
/// signed.
pub fn request_food(world: &mut WorldMap, id: EntityId) -> Result<usize, ActionError> {
    let entity = world.entity(id)?;
    let Some(parent) = entity.parent() else {
        return Ok(0);
    };
    let Some(creature) = entity.creature.as_ref() else {
        return Ok(0);
    };
    let found: Vec<(EntityId, EntityKind)> = world
        .children_where(parent, |sibling| {
            sibling.resource.is_some()
                && !sibling.is_killed()
                && creature.intake.contains_key(&sibling.kind())
        })
        .into_iter()
        .filter_map(|sibling| world.kind_of(sibling).map(|kind| (sibling, kind)))
        .collect();
    let kinds: Vec<EntityKind> = found.iter().map(|(_, kind)| *kind).collect();
    let sizes = creature.request_sizes(&kinds);

    let mut signed = 0_usize;
    for ((resource, _), amount) in found.into_iter().zip(sizes) {
        if let Some(stock) = world.get_mut(resource).and_then(|e| e.resource.as_mut()) {
            stock.sign(amount, feed(id));
            signed = signed.saturating_add(1);
        }
    }
    if signed > 0 {
        trace!(creature = %id, sources = signed, "Signed up for food");
    }
    Ok(signed)
}

/// Receiver crediting a settlement to a creature's satiety.
fn feed(id: EntityId) -> Receiver {
    Box::new(move |world: &mut WorldMap, settlement: Settlement| {
        if let Some(creature) = world.get_mut(id).and_then(|e| e.creature.as_mut()) {
            creature.receive(settlement.resource, settlement.amount);
        }
    })
}

/// Move to a free cell of a random neighbouring location. Returns the
/// location moved to.
///
/// A creature whose location has no neighbours, or whose destination is
/// full, stays where it is.
pub fn migrate(ctx: &mut SimContext, id: EntityId) -> Result<Option<EntityId>, ActionError> {
    if ctx.world.get(id).is_none_or(Entity::is_killed) {
        return Ok(None);
    }
    let location = ctx.world.location_of(id).ok_or(ActionError::NotOnLocation(id))?;
    let destinations: Vec<EntityId> = ctx
        .world
        .neighbours(location)
        .into_iter()
        .filter(|n| ctx.world.location(*n).is_ok())
        .collect();
    let Some(&destination) = destinations.choose(&mut ctx.rng) else {
        return Ok(None);
    };
    if ctx
        .world
        .place_on_free_cell(destination, id, &mut ctx.rng)?
        .is_none()
    {
        return Ok(None);
    }
    if let Some(movable) = ctx.world.get_mut(id).and_then(|e| e.movable.as_mut()) {
        movable.target = None;
    }
    debug!(creature = %id, from = %location, to = %destination, "Migrated");
    Ok(Some(destination))
}

// ---------------------------------------------------------------------------
// Death
// ---------------------------------------------------------------------------

/// Condemn a creature that has reached its lifetime cap.
pub fn age(world: &mut WorldMap, id: EntityId) -> ActionResult {
    let Some(entity) = world.get(id) else {
        return Ok(());
    };
    let too_old = entity
        .creature
        .as_ref()
        .is_some_and(|c| c.is_too_old(entity.lifetime));
    if too_old && !entity.is_killed() {
        trace!(creature = %id, lifetime = entity.lifetime, "Died of old age");
        world.mark_killed(id, false)?;
    }
    Ok(())
}

/// Condemn a creature whose satiety is gone.
pub fn starvation(world: &mut WorldMap, id: EntityId) -> ActionResult {
    let Some(entity) = world.get(id) else {
        return Ok(());
    };
    let starved = entity.creature.as_ref().is_some_and(|c| c.is_starved());
    if starved && !entity.is_killed() {
        trace!(creature = %id, "Starved");
        world.mark_killed(id, false)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Procreation
// ---------------------------------------------------------------------------

/// Give birth if the creature is a female off cooldown with enough males
/// around. Returns the offspring that found a cell.
///
/// # Errors
///
/// Returns [`ActionError::NotOnLocation`] if the creature is not placed on
/// a location grid.
pub fn procreate(ctx: &mut SimContext, id: EntityId) -> Result<Vec<EntityId>, ActionError> {
    let Some(entity) = ctx.world.get(id) else {
        return Ok(Vec::new());
    };
    if entity.is_killed() {
        return Ok(Vec::new());
    }
    let kind = entity.kind();
    let Some(creature) = entity.creature.as_ref() else {
        return Ok(Vec::new());
    };
    if creature.gender != Gender::Female || creature.procreation.is_none() {
        return Ok(Vec::new());
    }
    let (Some(location), Some(here)) = (ctx.world.location_of(id), entity.position()) else {
        return Err(ActionError::NotOnLocation(id));
    };

    let entity = ctx.world.entity_mut(id)?;
    let Some(procreation) = entity.creature.as_mut().and_then(|c| c.procreation.as_mut()) else {
        return Ok(Vec::new());
    };
    if !procreation.tick_cooldown() {
        return Ok(Vec::new());
    }
    let threshold = procreation.male_threshold;
    let males = count_males(&ctx.world, location, kind);
    if males < threshold {
        return Ok(Vec::new());
    }

    let entity = ctx.world.entity_mut(id)?;
    let Some(procreation) = entity.creature.as_mut().and_then(|c| c.procreation.as_mut()) else {
        return Ok(Vec::new());
    };
    let spawn_count = procreation.spawn_count;
    let mut rules = std::mem::take(&mut procreation.offspring);
    let born = give_birth(ctx, location, here, spawn_count, &mut rules);

    if let Some(procreation) = ctx
        .world
        .get_mut(id)
        .and_then(|e| e.creature.as_mut())
        .and_then(|c| c.procreation.as_mut())
    {
        procreation.offspring = rules;
        procreation.reset_cooldown();
    }
    let born = born?;
    if !born.is_empty() {
        debug!(mother = %id, kind = %kind, offspring = born.len(), males, "Offspring born");
    }
    Ok(born)
}

fn count_males(world: &WorldMap, location: EntityId, kind: EntityKind) -> usize {
    world
        .children_where(location, |sibling| {
            sibling.kind() == kind
                && !sibling.is_killed()
                && sibling
                    .creature
                    .as_ref()
                    .is_some_and(|c| c.gender == Gender::Male)
        })
        .len()
}

fn give_birth(
    ctx: &mut SimContext,
    location: EntityId,
    here: zeroplayer_world::Cell,
    spawn_count: u32,
    rules: &mut [zeroplayer_world::SpawnRule],
) -> Result<Vec<EntityId>, ActionError> {
    let mut born = Vec::new();
    for _ in 0..spawn_count {
        for rule in rules.iter_mut() {
            let Some(child) = rule.spawn_as_child(&mut ctx.world, &ctx.catalog, location, &mut ctx.rng)? else {
                continue;
            };
            if ctx.world.place_near(location, child, here, &mut ctx.rng)?.is_some() {
                born.push(child);
            } else {
                ctx.world.despawn(child)?;
            }
        }
    }
    Ok(born)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zeroplayer_types::KindFilter;
    use zeroplayer_world::{Catalog, Cell, SpawnTemplate, distribute};

    use super::*;
    use crate::test_support::{context, empty_forest};

    fn put(ctx: &mut SimContext, location: EntityId, template: SpawnTemplate, x: i64, y: i64) -> EntityId {
        let id = ctx.catalog.instantiate(&mut ctx.world, template, &mut ctx.rng).unwrap();
        ctx.world.place_at(location, id, x, y).unwrap();
        id
    }

    fn set_satiety(ctx: &mut SimContext, id: EntityId, satiety: f64) {
        if let Some(creature) = ctx.world.get_mut(id).and_then(|e| e.creature.as_mut()) {
            creature.satiety = satiety;
        }
    }

    fn make_ready(ctx: &mut SimContext, id: EntityId) {
        if let Some(procreation) = ctx
            .world
            .get_mut(id)
            .and_then(|e| e.creature.as_mut())
            .and_then(|c| c.procreation.as_mut())
        {
            procreation.cooldown_left = 0;
            for rule in &mut procreation.offspring {
                *rule = zeroplayer_world::SpawnRule::new(*rule.template(), 1, 1.0).unwrap();
            }
        }
    }

    #[test]
    fn two_mice_share_one_grass_then_it_dies() {
        let mut ctx = context(Catalog::default(), 1);
        let forest = empty_forest(&mut ctx);
        let grass = put(&mut ctx, forest, SpawnTemplate::with_value(EntityKind::Grass, 1.0), 0, 0);
        if let Some(stock) = ctx.world.get_mut(grass).and_then(|e| e.resource.as_mut()) {
            stock.decay_speed = 0.05;
            stock.decay_acceleration = 0.0;
        }
        let a = put(&mut ctx, forest, SpawnTemplate::of(EntityKind::Mouse), 1, 0);
        let b = put(&mut ctx, forest, SpawnTemplate::of(EntityKind::Mouse), 2, 0);
        set_satiety(&mut ctx, a, 0.0);
        set_satiety(&mut ctx, b, 0.0);

        request_food(&mut ctx.world, a).unwrap();
        request_food(&mut ctx.world, b).unwrap();
        let handed_out = distribute(&mut ctx.world, grass).unwrap();
        assert!((handed_out - 1.0).abs() < 1e-9);

        // each mouse got 0.5 grass worth 0.2 satiety per unit
        for mouse in [a, b] {
            let satiety = ctx.world.get(mouse).and_then(Entity::satiety).unwrap();
            assert!((satiety - 0.1).abs() < 1e-9);
        }

        crate::resource::decay_and_check(&mut ctx.world, grass).unwrap();
        assert!(ctx.world.is_killed(grass));
    }

    #[test]
    fn sated_creature_does_not_sign_up() {
        let mut ctx = context(Catalog::default(), 2);
        let forest = empty_forest(&mut ctx);
        let grass = put(&mut ctx, forest, SpawnTemplate::with_value(EntityKind::Grass, 5.0), 0, 0);
        let mouse = put(&mut ctx, forest, SpawnTemplate::of(EntityKind::Mouse), 1, 0);
        let mut queue = SimQueue::new();

        hunger(&mut ctx, &mut queue, mouse).unwrap();
        let pending = ctx.world.get(grass).and_then(|e| e.resource.as_ref()).map(|r| r.pending());
        assert_eq!(pending, Some(0));
        // 0.8 - 0.2
        let satiety = ctx.world.get(mouse).and_then(Entity::satiety).unwrap();
        assert!((satiety - 0.6).abs() < 1e-9);
    }

    #[test]
    fn hungry_creature_without_food_migrates() {
        let mut ctx = context(Catalog::default(), 3);
        let here = empty_forest(&mut ctx);
        let there = empty_forest(&mut ctx);
        ctx.world.add_neighbours(here, there).unwrap();
        let mouse = put(&mut ctx, here, SpawnTemplate::of(EntityKind::Mouse), 0, 0);
        set_satiety(&mut ctx, mouse, 0.3);

        let mut queue = SimQueue::new();
        hunger(&mut ctx, &mut queue, mouse).unwrap();
        assert_eq!(queue.len(), 1);
        queue.perform(&mut ctx);

        assert_eq!(ctx.world.parent(mouse), Some(there));
        assert!(ctx.world.position(mouse).is_some());
        assert!(ctx.world.check_consistency().is_ok());
    }

    #[test]
    fn old_and_starved_creatures_are_condemned() {
        let mut ctx = context(Catalog::default(), 4);
        let forest = empty_forest(&mut ctx);
        let old = put(&mut ctx, forest, SpawnTemplate::of(EntityKind::Mouse), 0, 0);
        let hungry = put(&mut ctx, forest, SpawnTemplate::of(EntityKind::Mouse), 1, 0);
        if let Some(entity) = ctx.world.get_mut(old) {
            entity.lifetime = 15;
        }
        set_satiety(&mut ctx, hungry, 0.0);

        age(&mut ctx.world, old).unwrap();
        age(&mut ctx.world, hungry).unwrap();
        starvation(&mut ctx.world, hungry).unwrap();
        assert!(ctx.world.is_killed(old));
        assert!(ctx.world.is_killed(hungry));
    }

    #[test]
    fn procreation_needs_enough_males() {
        let mut ctx = context(Catalog::default(), 5);
        let forest = empty_forest(&mut ctx);
        let mother = put(
            &mut ctx,
            forest,
            SpawnTemplate::with_gender(EntityKind::Rabbit, Gender::Female),
            5,
            5,
        );
        make_ready(&mut ctx, mother);

        // no males: nothing happens, the cooldown stays elapsed
        assert!(procreate(&mut ctx, mother).unwrap().is_empty());

        put(
            &mut ctx,
            forest,
            SpawnTemplate::with_gender(EntityKind::Rabbit, Gender::Male),
            0,
            0,
        );
        let born = procreate(&mut ctx, mother).unwrap();
        // spawn count 2, one certain rule
        assert_eq!(born.len(), 2);
        for child in &born {
            assert_eq!(ctx.world.parent(*child), Some(forest));
            let cell = ctx.world.position(*child).unwrap();
            assert!(cell.distance(Cell::new(5, 5)) < 1.5);
        }

        // cooldown restarted
        assert!(procreate(&mut ctx, mother).unwrap().is_empty());
        assert!(ctx.world.check_consistency().is_ok());
    }

    #[test]
    fn males_do_not_procreate() {
        let mut ctx = context(Catalog::default(), 6);
        let forest = empty_forest(&mut ctx);
        let male = put(
            &mut ctx,
            forest,
            SpawnTemplate::with_gender(EntityKind::Mouse, Gender::Male),
            0,
            0,
        );
        put(
            &mut ctx,
            forest,
            SpawnTemplate::with_gender(EntityKind::Mouse, Gender::Male),
            1,
            1,
        );
        make_ready(&mut ctx, male);
        assert!(procreate(&mut ctx, male).unwrap().is_empty());
        assert_eq!(ctx.world.children_by_type(forest, KindFilter::Creature).len(), 2);
    }

    #[test]
    fn procreating_off_grid_is_invalid() {
        let mut ctx = context(Catalog::default(), 7);
        let mother = ctx
            .catalog
            .instantiate(
                &mut ctx.world,
                SpawnTemplate::with_gender(EntityKind::Mouse, Gender::Female),
                &mut ctx.rng,
            )
            .unwrap();
        assert!(matches!(
            procreate(&mut ctx, mother),
            Err(ActionError::NotOnLocation(_))
        ));
    }
}
