//! Spawn rules: stateful periodic, probabilistic entity creation.
//!
//! A [`SpawnRule`] counts its invocations and fires only on every
//! `period`-th call, and then only if a Bernoulli trial at `chance`
//! succeeds. The rule carries a [`SpawnTemplate`] (kind plus constructor
//! arguments); turning a template into an entity is the [`Catalog`]'s job.
//!
//! Rules are declared as data ([`SpawnRuleDef`]) in the catalog
//! configuration and validated when the catalog is built, so a bad period
//! or chance fails at construction rather than mid-simulation.
//!
//! [`Catalog`]: crate::catalog::Catalog

use std::num::NonZeroU32;

use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroplayer_types::{EntityId, EntityKind, Gender};

use crate::catalog::Catalog;
use crate::error::WorldError;
use crate::world_map::WorldMap;

/// Constructor arguments for a spawned entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnArgs {
    /// Starting resource value, overriding the kind profile.
    #[serde(default)]
    pub value: Option<f64>,
    /// Forced creature gender, overriding the random roll.
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Create a location without its initial catch-up spawns.
    #[serde(default)]
    pub empty: bool,
}

/// What a spawn rule creates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnTemplate {
    /// Kind of the spawned entity.
    pub kind: EntityKind,
    /// Constructor arguments.
    #[serde(default)]
    pub args: SpawnArgs,
}

impl SpawnTemplate {
    /// Template with default arguments.
    pub fn of(kind: EntityKind) -> Self {
        Self {
            kind,
            args: SpawnArgs::default(),
        }
    }

    /// Template for a resource with a starting value.
    pub fn with_value(kind: EntityKind, value: f64) -> Self {
        Self {
            kind,
            args: SpawnArgs {
                value: Some(value),
                ..SpawnArgs::default()
            },
        }
    }

    /// Template for a creature of a fixed gender.
    pub fn with_gender(kind: EntityKind, gender: Gender) -> Self {
        Self {
            kind,
            args: SpawnArgs {
                gender: Some(gender),
                ..SpawnArgs::default()
            },
        }
    }

    /// Same template, flagged to skip initial location spawns.
    #[must_use]
    pub const fn empty(mut self) -> Self {
        self.args.empty = true;
        self
    }
}

/// Declarative form of a spawn rule, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRuleDef {
    /// Kind of the spawned entity.
    pub kind: EntityKind,
    /// Starting resource value.
    #[serde(default)]
    pub value: Option<f64>,
    /// Forced creature gender.
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Fire on every `period`-th call.
    #[serde(default = "default_period")]
    pub period: u32,
    /// Probability of spawning when the period matches.
    #[serde(default = "default_chance")]
    pub chance: f64,
}

const fn default_period() -> u32 {
    1
}

const fn default_chance() -> f64 {
    1.0
}

impl SpawnRuleDef {
    /// A rule that fires every call with certainty.
    pub const fn always(kind: EntityKind) -> Self {
        Self {
            kind,
            value: None,
            gender: None,
            period: 1,
            chance: 1.0,
        }
    }

    /// Set the starting resource value.
    #[must_use]
    pub const fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the period.
    #[must_use]
    pub const fn period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    /// Set the chance.
    #[must_use]
    pub const fn chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }

    /// The template this rule spawns.
    pub fn template(&self) -> SpawnTemplate {
        SpawnTemplate {
            kind: self.kind,
            args: SpawnArgs {
                value: self.value,
                gender: self.gender,
                empty: false,
            },
        }
    }
}

/// A validated spawn rule with its invocation counter.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRule {
    template: SpawnTemplate,
    period: NonZeroU32,
    chance: f64,
    calls: u64,
}

impl SpawnRule {
    /// Create a rule.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSpawnPeriod`] if `period` is zero, or
    /// [`WorldError::InvalidSpawnChance`] if `chance` is not within `[0, 1]`.
    pub fn new(template: SpawnTemplate, period: u32, chance: f64) -> Result<Self, WorldError> {
        let period = NonZeroU32::new(period).ok_or(WorldError::InvalidSpawnPeriod {
            kind: template.kind,
            period,
        })?;
        if !(0.0..=1.0).contains(&chance) {
            return Err(WorldError::InvalidSpawnChance {
                kind: template.kind,
                chance,
            });
        }
        Ok(Self {
            template,
            period,
            chance,
            calls: 0,
        })
    }

    /// Validate a declarative rule.
    pub fn from_def(def: &SpawnRuleDef) -> Result<Self, WorldError> {
        Self::new(def.template(), def.period, def.chance)
    }

    /// The template this rule spawns.
    pub const fn template(&self) -> &SpawnTemplate {
        &self.template
    }

    /// Fire period.
    pub const fn period(&self) -> u32 {
        self.period.get()
    }

    /// Spawn probability.
    pub const fn chance(&self) -> f64 {
        self.chance
    }

    /// How many times the rule has been invoked.
    pub const fn calls(&self) -> u64 {
        self.calls
    }

    /// Overwrite the invocation counter (used on restore).
    pub const fn set_calls(&mut self, calls: u64) {
        self.calls = calls;
    }

    /// Count one invocation and decide whether it fires.
    ///
    /// The chance is only rolled on period-matching calls, so a rule that
    /// is off-period does not consume randomness.
    pub fn fire<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<SpawnTemplate> {
        self.calls = self.calls.saturating_add(1);
        if self.calls.checked_rem(u64::from(self.period.get())) != Some(0) {
            return None;
        }
        if rng.random::<f64>() >= self.chance {
            return None;
        }
        Some(self.template)
    }

    /// Invoke the rule and instantiate its template if it fires.
    ///
    /// The new entity is inserted into `world` unlinked.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        world: &mut WorldMap,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<Option<EntityId>, WorldError> {
        match self.fire(rng) {
            Some(template) => catalog.instantiate(world, template, rng).map(Some),
            None => Ok(None),
        }
    }

    /// Invoke the rule and link the new entity under `parent`.
    pub fn spawn_as_child<R: Rng + ?Sized>(
        &mut self,
        world: &mut WorldMap,
        catalog: &Catalog,
        parent: EntityId,
        rng: &mut R,
    ) -> Result<Option<EntityId>, WorldError> {
        let Some(child) = self.spawn(world, catalog, rng)? else {
            return Ok(None);
        };
        world.add_children(parent, &[child])?;
        Ok(Some(child))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn zero_period_fails_at_construction() {
        let result = SpawnRule::new(SpawnTemplate::of(EntityKind::Grass), 0, 0.5);
        assert!(matches!(
            result,
            Err(WorldError::InvalidSpawnPeriod { period: 0, .. })
        ));
    }

    #[test]
    fn chance_outside_unit_interval_fails() {
        for chance in [-0.1, 1.5, f64::NAN] {
            let result = SpawnRule::new(SpawnTemplate::of(EntityKind::Grass), 1, chance);
            assert!(matches!(result, Err(WorldError::InvalidSpawnChance { .. })));
        }
    }

    #[test]
    fn period_three_fires_on_multiples_of_three() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut rule = SpawnRule::new(SpawnTemplate::of(EntityKind::Grass), 3, 1.0).unwrap();
        let mut fired = Vec::new();
        for _ in 0..12 {
            if rule.fire(&mut rng).is_some() {
                fired.push(rule.calls());
            }
        }
        assert_eq!(fired, vec![3, 6, 9, 12]);
    }

    #[test]
    fn zero_chance_never_fires() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rule = SpawnRule::new(SpawnTemplate::of(EntityKind::Wheat), 1, 0.0).unwrap();
        assert!((0..100).all(|_| rule.fire(&mut rng).is_none()));
        assert_eq!(rule.calls(), 100);
    }

    #[test]
    fn fired_template_carries_arguments() {
        let mut rng = StdRng::seed_from_u64(3);
        let def = SpawnRuleDef::always(EntityKind::Grass).value(8.0);
        let mut rule = SpawnRule::from_def(&def).unwrap();
        let template = rule.fire(&mut rng).unwrap();
        assert_eq!(template.kind, EntityKind::Grass);
        assert_eq!(template.args.value, Some(8.0));
    }

    #[test]
    fn def_defaults_from_yaml_shaped_json() {
        let def: SpawnRuleDef = serde_json::from_str(r#"{"kind": "grass", "value": 2.0}"#).unwrap();
        assert_eq!(def.period, 1);
        assert!((def.chance - 1.0).abs() < f64::EPSILON);
    }
}
