//! The built-in animals table: two kinds of location, two plants, two
//! herbivores with their meat, two predators, and predator carcasses.

use std::collections::BTreeMap;

use zeroplayer_types::EntityKind;

use crate::catalog::{
    CreatureProfile, DecayingProfile, HunterProfile, KillableProfile, KindProfile,
    LocationProfile, MovableProfile, ProcreationProfile, ResourceProfile,
};
use crate::components::IntakeRule;
use crate::grid::ShiftPattern;
use crate::spawn::SpawnRuleDef;

/// Profiles of every spawnable kind in the animals table.
pub fn default_kinds() -> BTreeMap<EntityKind, KindProfile> {
    BTreeMap::from([
        (EntityKind::Forest, forest()),
        (EntityKind::Field, field()),
        (EntityKind::Grass, resource(-2.0, 1.0)),
        (EntityKind::Wheat, resource(1.0, 0.25)),
        (EntityKind::Mouse, mouse()),
        (EntityKind::Rabbit, rabbit()),
        (EntityKind::Owl, owl()),
        (EntityKind::Fox, fox()),
        (EntityKind::MouseMeat, meat()),
        (EntityKind::RabbitMeat, meat()),
        (EntityKind::Carcass, carcass()),
    ])
}

// --- Locations ---

fn forest() -> KindProfile {
    location(vec![
        SpawnRuleDef::always(EntityKind::Grass).value(2.0).chance(0.3),
        SpawnRuleDef::always(EntityKind::Grass)
            .value(8.0)
            .chance(0.2)
            .period(3),
    ])
}

fn field() -> KindProfile {
    location(vec![
        SpawnRuleDef::always(EntityKind::Wheat)
            .value(10.0)
            .chance(0.7)
            .period(8),
        SpawnRuleDef::always(EntityKind::Wheat)
            .value(8.0)
            .chance(0.4)
            .period(2),
        SpawnRuleDef::always(EntityKind::Wheat).value(4.0).chance(0.2),
        SpawnRuleDef::always(EntityKind::Grass).value(2.0).chance(0.2),
    ])
}

fn location(rules: Vec<SpawnRuleDef>) -> KindProfile {
    KindProfile {
        location: Some(LocationProfile {
            rules,
            ..LocationProfile::default()
        }),
        ..KindProfile::default()
    }
}

// --- Resources ---

fn meat() -> KindProfile {
    resource(0.1, 0.1)
}

fn resource(decay_speed: f64, decay_acceleration: f64) -> KindProfile {
    KindProfile {
        killable: Some(KillableProfile::default()),
        resource: Some(ResourceProfile {
            value: 1.0,
            decay_speed,
            decay_acceleration,
            death_threshold: 0.0,
        }),
        ..KindProfile::default()
    }
}

fn carcass() -> KindProfile {
    KindProfile {
        killable: Some(KillableProfile::default()),
        decaying: Some(DecayingProfile {
            speed: 0.2,
            ..DecayingProfile::default()
        }),
        ..KindProfile::default()
    }
}

// --- Herbivores ---

fn intake(value_mult: f64, request_starved: f64, request_stuffed: f64, request_weight: f64) -> IntakeRule {
    IntakeRule {
        value_mult,
        request_starved,
        request_stuffed,
        request_weight,
    }
}

fn mouse() -> KindProfile {
    creature(
        EntityKind::Mouse,
        CreatureProfile {
            hunger_rate: 0.2,
            max_lifetime: Some(15),
            intake: BTreeMap::from([
                (EntityKind::Wheat, intake(0.2, 8.0, 0.8, 3.0)),
                (EntityKind::Grass, intake(0.2, 6.0, 0.8, 1.0)),
            ]),
            migrate_when_starving: true,
            ..CreatureProfile::default()
        },
        3,
        0.4,
        EntityKind::MouseMeat,
    )
}

fn rabbit() -> KindProfile {
    creature(
        EntityKind::Rabbit,
        CreatureProfile {
            max_lifetime: Some(20),
            intake: BTreeMap::from([(EntityKind::Grass, intake(0.2, 8.0, 0.8, 1.0))]),
            migrate_when_starving: true,
            ..CreatureProfile::default()
        },
        2,
        0.5,
        EntityKind::RabbitMeat,
    )
}

// --- Predators ---

fn owl() -> KindProfile {
    predator(
        EntityKind::Owl,
        EntityKind::MouseMeat,
        intake(0.3, 3.0, 0.5, 1.0),
        8,
        EntityKind::Mouse,
    )
}

fn fox() -> KindProfile {
    predator(
        EntityKind::Fox,
        EntityKind::RabbitMeat,
        intake(0.3, 2.0, 0.5, 1.0),
        6,
        EntityKind::Rabbit,
    )
}

fn predator(
    kind: EntityKind,
    food: EntityKind,
    food_rule: IntakeRule,
    vision: u32,
    prey: EntityKind,
) -> KindProfile {
    let mut profile = creature(
        kind,
        CreatureProfile {
            hunger_rate: 0.2,
            max_lifetime: Some(50),
            intake: BTreeMap::from([(food, food_rule)]),
            migrate_when_starving: true,
            ..CreatureProfile::default()
        },
        1,
        0.5,
        EntityKind::Carcass,
    );
    profile.movable = Some(MovableProfile {
        shifts: ShiftPattern::Square { radius: 2 },
    });
    profile.hunter = Some(HunterProfile {
        vision,
        leap_distance: 1.5,
        prey: BTreeMap::from([(prey, 0.9)]),
    });
    profile
}

fn creature(
    kind: EntityKind,
    mut profile: CreatureProfile,
    spawn_count: u32,
    offspring_chance: f64,
    residue: EntityKind,
) -> KindProfile {
    profile.procreation = Some(ProcreationProfile {
        male_threshold: 1,
        spawn_count,
        cooldown: 5,
        offspring: vec![SpawnRuleDef::always(kind).chance(offspring_chance)],
    });
    KindProfile {
        killable: Some(KillableProfile {
            residue: vec![SpawnRuleDef::always(residue).value(1.0)],
            ..KillableProfile::default()
        }),
        movable: Some(MovableProfile::default()),
        creature: Some(profile),
        ..KindProfile::default()
    }
}
