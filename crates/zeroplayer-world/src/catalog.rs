//! Kind catalog: data-only profiles that say what each entity kind is made of.
//!
//! A [`KindProfile`] lists the capabilities an entity of that kind carries
//! and their starting parameters. Profiles are plain serde data, so the whole
//! table can be swapped out from YAML without touching the scheduler. The
//! [`Catalog`] validates a [`CatalogConfig`] once, up front, and then turns
//! [`SpawnTemplate`]s into fully equipped [`Entity`] records.
//!
//! Spawn rules are declared as [`SpawnRuleDef`]s and instantiated per
//! entity, so each location or creature keeps its own invocation counters.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;
use zeroplayer_types::{EntityId, EntityKind, Gender};

use crate::animals;
use crate::components::{Creature, Decaying, Hunter, IntakeRule, Killable, Movable, Procreation};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::grid::{Grid, ShiftPattern};
use crate::location::{self, LocationState};
use crate::resource::ResourceStock;
use crate::spawn::{SpawnRule, SpawnRuleDef, SpawnTemplate};
use crate::world_map::WorldMap;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// The full kind table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Profile per kind. Kinds without a profile cannot be spawned.
    #[serde(default = "animals::default_kinds")]
    pub kinds: BTreeMap<EntityKind, KindProfile>,
}

impl CatalogConfig {
    /// A table with no kinds at all.
    pub const fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }
}

impl Default for CatalogConfig {
    /// The built-in animals table.
    fn default() -> Self {
        Self {
            kinds: animals::default_kinds(),
        }
    }
}

/// Capabilities and parameters of one kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindProfile {
    /// Deferred death with residue.
    #[serde(default)]
    pub killable: Option<KillableProfile>,
    /// Wearing integrity.
    #[serde(default)]
    pub decaying: Option<DecayingProfile>,
    /// Grid movement.
    #[serde(default)]
    pub movable: Option<MovableProfile>,
    /// Prey search and leap attacks.
    #[serde(default)]
    pub hunter: Option<HunterProfile>,
    /// Hunger, age, and procreation.
    #[serde(default)]
    pub creature: Option<CreatureProfile>,
    /// Distributable value.
    #[serde(default)]
    pub resource: Option<ResourceProfile>,
    /// Grid and spawn rules.
    #[serde(default)]
    pub location: Option<LocationProfile>,
}

/// What a dying entity leaves behind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KillableProfile {
    /// Residue rules, fired in order at death.
    #[serde(default)]
    pub residue: Vec<SpawnRuleDef>,
    /// Hand children over to the last residue.
    #[serde(default)]
    pub transfer_children: bool,
    /// Hand neighbour links over to the last residue.
    #[serde(default)]
    pub transfer_neighbours: bool,
}

/// Integrity decay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayingProfile {
    /// Starting integrity.
    #[serde(default = "default_one")]
    pub integrity: f64,
    /// Integrity cap.
    #[serde(default = "default_one")]
    pub cap: f64,
    /// Integrity lost per tick.
    #[serde(default)]
    pub speed: f64,
    /// Added to `speed` every tick.
    #[serde(default)]
    pub acceleration: f64,
}

impl Default for DecayingProfile {
    fn default() -> Self {
        Self {
            integrity: 1.0,
            cap: 1.0,
            speed: 0.0,
            acceleration: 0.0,
        }
    }
}

/// Movement parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovableProfile {
    /// Shifts available per tick.
    #[serde(default)]
    pub shifts: ShiftPattern,
}

/// Hunting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterProfile {
    /// Radius of the scanned square.
    pub vision: u32,
    /// Largest distance a leap covers.
    #[serde(default = "default_leap_distance")]
    pub leap_distance: f64,
    /// Prey kinds and the share of the prey's satiety gained per kill.
    pub prey: BTreeMap<EntityKind, f64>,
}

/// Offspring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcreationProfile {
    /// Male siblings of the same kind required.
    #[serde(default = "default_male_threshold")]
    pub male_threshold: usize,
    /// Repetitions of the offspring rules per procreation.
    #[serde(default = "default_spawn_count")]
    pub spawn_count: u32,
    /// Ticks between procreations.
    #[serde(default = "default_cooldown")]
    pub cooldown: u32,
    /// Offspring rules.
    #[serde(default)]
    pub offspring: Vec<SpawnRuleDef>,
}

/// Creature parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureProfile {
    /// Satiety at birth.
    #[serde(default = "default_starting_satiety")]
    pub starting_satiety: f64,
    /// Satiety lost per tick.
    #[serde(default = "default_hunger_rate")]
    pub hunger_rate: f64,
    /// Satiety at or below which the creature eats.
    #[serde(default = "default_sated_threshold")]
    pub sated_threshold: f64,
    /// Age of death; `None` for no limit.
    #[serde(default)]
    pub max_lifetime: Option<u64>,
    /// Probability that a newborn is female.
    #[serde(default = "default_female_chance")]
    pub female_chance: f64,
    /// Edible resources.
    #[serde(default)]
    pub intake: BTreeMap<EntityKind, IntakeRule>,
    /// Leave for a neighbouring location when hungry and nothing is found.
    #[serde(default)]
    pub migrate_when_starving: bool,
    /// Offspring policy.
    #[serde(default)]
    pub procreation: Option<ProcreationProfile>,
}

impl Default for CreatureProfile {
    fn default() -> Self {
        Self {
            starting_satiety: default_starting_satiety(),
            hunger_rate: default_hunger_rate(),
            sated_threshold: default_sated_threshold(),
            max_lifetime: None,
            female_chance: default_female_chance(),
            intake: BTreeMap::new(),
            migrate_when_starving: false,
            procreation: None,
        }
    }
}

/// Resource parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceProfile {
    /// Starting value when the template carries none.
    #[serde(default)]
    pub value: f64,
    /// Value lost per tick; negative grows.
    #[serde(default)]
    pub decay_speed: f64,
    /// Added to the decay speed every tick.
    #[serde(default)]
    pub decay_acceleration: f64,
    /// Value at or below which the resource dies.
    #[serde(default)]
    pub death_threshold: f64,
}

/// Location parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationProfile {
    /// Grid width.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Grid height.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Catch-up rounds on creation.
    #[serde(default = "default_initial_rolls")]
    pub initial_rolls: u32,
    /// Whether the rules fire every tick.
    #[serde(default = "default_true")]
    pub spawning_enabled: bool,
    /// Spawn rules fired once per tick.
    #[serde(default)]
    pub rules: Vec<SpawnRuleDef>,
}

impl Default for LocationProfile {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            initial_rolls: default_initial_rolls(),
            spawning_enabled: true,
            rules: Vec::new(),
        }
    }
}

const fn default_one() -> f64 {
    1.0
}

const fn default_true() -> bool {
    true
}

const fn default_leap_distance() -> f64 {
    1.5
}

const fn default_male_threshold() -> usize {
    1
}

const fn default_spawn_count() -> u32 {
    1
}

const fn default_cooldown() -> u32 {
    5
}

const fn default_starting_satiety() -> f64 {
    0.8
}

const fn default_hunger_rate() -> f64 {
    0.1
}

const fn default_sated_threshold() -> f64 {
    0.4
}

const fn default_female_chance() -> f64 {
    0.5
}

const fn default_width() -> u32 {
    12
}

const fn default_height() -> u32 {
    8
}

const fn default_initial_rolls() -> u32 {
    3
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A validated kind table that builds entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    kinds: BTreeMap<EntityKind, KindProfile>,
}

impl Catalog {
    /// Validate a kind table.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSpawnPeriod`] or
    /// [`WorldError::InvalidSpawnChance`] for a bad rule,
    /// [`WorldError::InvalidDimensions`] for an empty grid,
    /// [`WorldError::UnknownKind`] for a rule spawning an unlisted kind, or
    /// [`WorldError::InvalidProfile`] for out-of-range parameters.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, WorldError> {
        for (&kind, profile) in &config.kinds {
            validate_profile(&config.kinds, kind, profile)?;
        }
        Ok(Self {
            kinds: config.kinds.clone(),
        })
    }

    /// Profile of a kind.
    pub fn profile(&self, kind: EntityKind) -> Option<&KindProfile> {
        self.kinds.get(&kind)
    }

    /// Kinds with a profile, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.kinds.keys().copied()
    }

    /// Build an unlinked entity from a template.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownKind`] if the kind has no profile.
    pub fn build<R: Rng + ?Sized>(
        &self,
        id: EntityId,
        template: &SpawnTemplate,
        rng: &mut R,
    ) -> Result<Entity, WorldError> {
        let profile = self
            .kinds
            .get(&template.kind)
            .ok_or(WorldError::UnknownKind(template.kind))?;
        let mut entity = Entity::new(id, template.kind);

        if let Some(killable) = &profile.killable {
            entity.killable = Some(Killable {
                residue: rules_from(&killable.residue)?,
                transfer_children: killable.transfer_children,
                transfer_neighbours: killable.transfer_neighbours,
                ..Killable::default()
            });
        }
        if let Some(decaying) = &profile.decaying {
            entity.decaying = Some(Decaying::new(
                decaying.integrity,
                decaying.cap,
                decaying.speed,
                decaying.acceleration,
            ));
        }
        if let Some(movable) = &profile.movable {
            entity.movable = Some(Movable {
                target: None,
                shifts: movable.shifts,
            });
        }
        if let Some(hunter) = &profile.hunter {
            entity.hunter = Some(Hunter {
                vision: hunter.vision,
                leap_distance: hunter.leap_distance,
                prey: hunter.prey.clone(),
                leap: None,
            });
        }
        if let Some(creature) = &profile.creature {
            entity.creature = Some(build_creature(creature, template, rng)?);
        }
        if let Some(resource) = &profile.resource {
            entity.resource = Some(ResourceStock::new(
                template.args.value.unwrap_or(resource.value),
                resource.decay_speed,
                resource.decay_acceleration,
                resource.death_threshold,
            ));
        }
        if let Some(location) = &profile.location {
            let mut state = LocationState::new(
                Grid::new(location.width, location.height)?,
                rules_from(&location.rules)?,
                location.initial_rolls,
            );
            state.spawning_enabled = location.spawning_enabled;
            entity.location = Some(state);
        }
        Ok(entity)
    }

    /// Allocate an id, build the entity, and insert it into the world.
    ///
    /// Locations then run their catch-up spawn rounds unless the template is
    /// flagged empty. The new entity is not linked to any parent.
    pub fn instantiate<R: Rng + ?Sized>(
        &self,
        world: &mut WorldMap,
        template: SpawnTemplate,
        rng: &mut R,
    ) -> Result<EntityId, WorldError> {
        let id = world.allocate_id();
        let entity = self.build(id, &template, rng)?;
        let is_location = entity.location.is_some();
        world.insert(entity)?;
        trace!(entity = %id, kind = %template.kind, "Entity created");

        if is_location && !template.args.empty {
            location::initial_rolls(world, self, id, rng)?;
        }
        Ok(id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            kinds: animals::default_kinds(),
        }
    }
}

fn rules_from(defs: &[SpawnRuleDef]) -> Result<Vec<SpawnRule>, WorldError> {
    defs.iter().map(SpawnRule::from_def).collect()
}

fn build_creature<R: Rng + ?Sized>(
    profile: &CreatureProfile,
    template: &SpawnTemplate,
    rng: &mut R,
) -> Result<Creature, WorldError> {
    let gender = template.args.gender.unwrap_or_else(|| {
        if rng.random::<f64>() < profile.female_chance {
            Gender::Female
        } else {
            Gender::Male
        }
    });
    let procreation = match &profile.procreation {
        Some(p) => Some(Procreation {
            male_threshold: p.male_threshold,
            spawn_count: p.spawn_count,
            cooldown: p.cooldown,
            cooldown_left: p.cooldown,
            offspring: rules_from(&p.offspring)?,
        }),
        None => None,
    };
    Ok(Creature {
        satiety: profile.starting_satiety.min(1.0),
        gender,
        max_lifetime: profile.max_lifetime,
        hunger_rate: profile.hunger_rate,
        sated_threshold: profile.sated_threshold,
        intake: profile.intake.clone(),
        migrate_when_starving: profile.migrate_when_starving,
        procreation,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_profile(
    kinds: &BTreeMap<EntityKind, KindProfile>,
    kind: EntityKind,
    profile: &KindProfile,
) -> Result<(), WorldError> {
    let invalid = |reason: &str| WorldError::InvalidProfile {
        kind,
        reason: reason.to_owned(),
    };
    let check_rules = |defs: &[SpawnRuleDef]| -> Result<(), WorldError> {
        for def in defs {
            SpawnRule::from_def(def)?;
            if !kinds.contains_key(&def.kind) {
                return Err(WorldError::UnknownKind(def.kind));
            }
        }
        Ok(())
    };

    if kind == EntityKind::Root {
        return Err(invalid("the root kind cannot be spawned"));
    }
    if let Some(killable) = &profile.killable {
        check_rules(&killable.residue)?;
    }
    if let Some(decaying) = &profile.decaying {
        if decaying.cap <= 0.0 {
            return Err(invalid("decaying cap must be positive"));
        }
    }
    if let Some(hunter) = &profile.hunter {
        if hunter.leap_distance < 0.0 {
            return Err(invalid("leap distance must not be negative"));
        }
        if hunter.prey.is_empty() {
            return Err(invalid("a hunter needs at least one prey kind"));
        }
        if profile.movable.is_none() {
            return Err(invalid("a hunter must be movable"));
        }
    }
    if let Some(creature) = &profile.creature {
        if creature.sated_threshold <= 0.0 {
            return Err(invalid("sated threshold must be positive"));
        }
        if !(0.0..=1.0).contains(&creature.female_chance) {
            return Err(invalid("female chance must be within [0, 1]"));
        }
        if profile.killable.is_none() {
            return Err(invalid("a creature must be killable"));
        }
        if let Some(procreation) = &creature.procreation {
            check_rules(&procreation.offspring)?;
        }
    }
    if let Some(location) = &profile.location {
        Grid::new(location.width, location.height)?;
        check_rules(&location.rules)?;
    }
    Ok(())
}
