//! Capability components attached to entity records.
//!
//! Each capability is an independent struct stored as an optional field on
//! [`Entity`](crate::entity::Entity). Behaviour lives in the agents crate;
//! this module holds only state, the small pure state transitions, and the
//! snapshot mapping of each capability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroplayer_types::{EntityKind, Gender, Snapshot, SnapshotError, Snapshotable};

use crate::grid::{Cell, ShiftPattern};
use crate::spawn::SpawnRule;

// ---------------------------------------------------------------------------
// Killable
// ---------------------------------------------------------------------------

/// Deferred death with optional residue.
///
/// [`kill`](Self::kill) only raises a flag; the entity is removed during
/// the kill phase of the tick, after every other effect has seen it alive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Killable {
    /// Set once the entity has been condemned this tick.
    pub killed: bool,
    /// Skip residue spawning (prey eaten whole).
    pub no_residue: bool,
    /// Rules spawning what is left behind, fired in order.
    pub residue: Vec<SpawnRule>,
    /// Hand children over to the last spawned residue.
    pub transfer_children: bool,
    /// Hand neighbour links over to the last spawned residue.
    pub transfer_neighbours: bool,
}

impl Killable {
    /// Condemn the entity. A no-residue kill cannot be undone by a later
    /// ordinary kill in the same tick.
    pub const fn kill(&mut self, no_residue: bool) {
        self.killed = true;
        self.no_residue = self.no_residue || no_residue;
    }
}

impl Snapshotable for Killable {
    const SECTION: &'static str = "killable";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        snapshot.set(Self::SECTION, "killed", &self.killed)?;
        snapshot.set(Self::SECTION, "no_residue", &self.no_residue)?;
        snapshot.set(Self::SECTION, "residue_calls", &rule_calls(&self.residue))
    }

    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.killed = snapshot.get(Self::SECTION, "killed")?.unwrap_or(false);
        self.no_residue = snapshot.get(Self::SECTION, "no_residue")?.unwrap_or(false);
        let calls = snapshot.get(Self::SECTION, "residue_calls")?.unwrap_or_default();
        restore_rule_calls(&mut self.residue, calls);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decaying
// ---------------------------------------------------------------------------

/// Integrity that wears down every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Decaying {
    integrity: f64,
    /// Upper bound for integrity.
    pub cap: f64,
    /// Integrity lost per tick.
    pub speed: f64,
    /// Added to `speed` after every tick.
    pub acceleration: f64,
}

impl Decaying {
    /// Create with `integrity` clamped into `[0, cap]`.
    pub fn new(integrity: f64, cap: f64, speed: f64, acceleration: f64) -> Self {
        let mut decaying = Self {
            integrity: 0.0,
            cap,
            speed,
            acceleration,
        };
        decaying.set_integrity(integrity);
        decaying
    }

    /// Current integrity.
    pub const fn integrity(&self) -> f64 {
        self.integrity
    }

    /// Set integrity, clamped into `[0, cap]`.
    pub fn set_integrity(&mut self, integrity: f64) {
        self.integrity = integrity.clamp(0.0, self.cap.max(0.0));
    }

    /// Increase integrity, never past the cap.
    pub fn repair(&mut self, delta: f64) {
        self.set_integrity(self.integrity + delta);
    }

    /// Apply one tick of decay. Returns `true` once integrity is gone.
    pub fn decay(&mut self) -> bool {
        self.set_integrity(self.integrity - self.speed);
        self.speed += self.acceleration;
        self.integrity <= 0.0
    }
}

impl Snapshotable for Decaying {
    const SECTION: &'static str = "decaying";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        snapshot.set(Self::SECTION, "integrity", &self.integrity)?;
        snapshot.set(Self::SECTION, "speed", &self.speed)
    }

    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let integrity = snapshot.require(Self::SECTION, "integrity")?;
        self.set_integrity(integrity);
        if let Some(speed) = snapshot.get(Self::SECTION, "speed")? {
            self.speed = speed;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Movable
// ---------------------------------------------------------------------------

/// Incremental movement towards a persistent target cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Movable {
    /// Cell to approach one shift per tick; cleared on arrival.
    pub target: Option<Cell>,
    /// Shifts available each tick.
    pub shifts: ShiftPattern,
}

impl Snapshotable for Movable {
    const SECTION: &'static str = "movable";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        let coords = self.target.map(|cell| [cell.x, cell.y]);
        snapshot.set(Self::SECTION, "move_target", &coords)
    }

    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let coords = snapshot
            .get::<Option<[u32; 2]>>(Self::SECTION, "move_target")?
            .flatten();
        self.target = coords.map(|[x, y]| Cell::new(x, y));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hunter
// ---------------------------------------------------------------------------

/// Vision, prey table, and the pending leap of a hunting creature.
#[derive(Debug, Clone, PartialEq)]
pub struct Hunter {
    /// Radius of the square the hunter scans.
    pub vision: u32,
    /// Largest distance a leap attack covers.
    pub leap_distance: f64,
    /// Prey kinds and the satiety each kill is worth.
    pub prey: BTreeMap<EntityKind, f64>,
    /// Cell the hunter leapt at this tick, awaiting the follow-up move.
    pub leap: Option<Cell>,
}

impl Hunter {
    /// Whether `kind` is on the prey table.
    pub fn hunts(&self, kind: EntityKind) -> bool {
        self.prey.contains_key(&kind)
    }
}

// ---------------------------------------------------------------------------
// Creature
// ---------------------------------------------------------------------------

/// How a creature eats one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntakeRule {
    /// Satiety gained per unit received.
    pub value_mult: f64,
    /// Amount requested at zero satiety.
    pub request_starved: f64,
    /// Amount requested at the sated threshold.
    pub request_stuffed: f64,
    /// Share of the meal this kind gets relative to other found food.
    #[serde(default = "default_weight")]
    pub request_weight: f64,
}

const fn default_weight() -> f64 {
    1.0
}

/// Offspring policy of a creature.
#[derive(Debug, Clone, PartialEq)]
pub struct Procreation {
    /// Male siblings of the same kind needed before a female procreates.
    pub male_threshold: usize,
    /// How many times the offspring rules are fired per procreation.
    pub spawn_count: u32,
    /// Ticks to wait between procreations.
    pub cooldown: u32,
    /// Ticks left until the next procreation may happen.
    pub cooldown_left: u32,
    /// Rules spawning offspring.
    pub offspring: Vec<SpawnRule>,
}

impl Procreation {
    /// Count down one tick. Returns `true` if the cooldown has elapsed.
    pub const fn tick_cooldown(&mut self) -> bool {
        if self.cooldown_left > 0 {
            self.cooldown_left = self.cooldown_left.saturating_sub(1);
            return false;
        }
        true
    }

    /// Restart the cooldown after a procreation.
    pub const fn reset_cooldown(&mut self) {
        self.cooldown_left = self.cooldown;
    }
}

/// Hunger, aging, and procreation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    /// Nourishment in `(0, 1]`; death at or below zero.
    pub satiety: f64,
    /// Fixed at creation.
    pub gender: Gender,
    /// Age at which the creature dies.
    pub max_lifetime: Option<u64>,
    /// Satiety lost per tick.
    pub hunger_rate: f64,
    /// Satiety at or below which the creature looks for food.
    pub sated_threshold: f64,
    /// Edible resource kinds.
    pub intake: BTreeMap<EntityKind, IntakeRule>,
    /// Move to a neighbouring location when hungry and no food is around.
    pub migrate_when_starving: bool,
    /// Offspring policy; `None` for sterile kinds.
    pub procreation: Option<Procreation>,
}

impl Creature {
    /// Whether the creature will look for food this tick.
    pub fn is_hungry(&self) -> bool {
        self.satiety <= self.sated_threshold
    }

    /// Whether the creature has starved.
    pub fn is_starved(&self) -> bool {
        self.satiety <= 0.0
    }

    /// Whether a creature of this age dies of old age.
    pub fn is_too_old(&self, lifetime: u64) -> bool {
        self.max_lifetime.is_some_and(|max| lifetime >= max)
    }

    /// Lose one tick of satiety.
    pub fn hunger(&mut self) {
        self.satiety -= self.hunger_rate;
    }

    /// Gain satiety, capped at 1.
    pub fn eat(&mut self, gain: f64) {
        self.satiety = (self.satiety + gain).min(1.0);
    }

    /// Credit a settled amount of `resource`.
    pub fn receive(&mut self, resource: EntityKind, amount: f64) {
        if let Some(rule) = self.intake.get(&resource) {
            self.eat(amount * rule.value_mult);
        }
    }

    /// Request sizes for each found food source, in the order given.
    ///
    /// Each request interpolates between the starved and stuffed sizes by
    /// satiety relative to the sated threshold, then takes its weight's
    /// share of the summed weights of all found sources.
    pub fn request_sizes(&self, found: &[EntityKind]) -> Vec<f64> {
        let weight_sum: f64 = found
            .iter()
            .filter_map(|kind| self.intake.get(kind))
            .map(|rule| rule.request_weight)
            .sum();
        if weight_sum <= 0.0 {
            return vec![0.0; found.len()];
        }
        let fullness = self.satiety / self.sated_threshold;
        found
            .iter()
            .map(|kind| {
                self.intake.get(kind).map_or(0.0, |rule| {
                    lerp_clamped(rule.request_starved, rule.request_stuffed, fullness)
                        * rule.request_weight
                        / weight_sum
                })
            })
            .collect()
    }
}

impl Snapshotable for Creature {
    const SECTION: &'static str = "creature";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        snapshot.set(Self::SECTION, "satiety", &self.satiety)?;
        snapshot.set(Self::SECTION, "gender", &self.gender)?;
        let cooldown = self.procreation.as_ref().map(|p| p.cooldown_left);
        snapshot.set(Self::SECTION, "procreation_cd", &cooldown)?;
        let calls = self.procreation.as_ref().map(|p| rule_calls(&p.offspring));
        snapshot.set(Self::SECTION, "offspring_calls", &calls)
    }

    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.satiety = snapshot.require(Self::SECTION, "satiety")?;
        self.gender = snapshot.require(Self::SECTION, "gender")?;
        let cooldown = snapshot
            .get::<Option<u32>>(Self::SECTION, "procreation_cd")?
            .flatten();
        if let (Some(procreation), Some(left)) = (self.procreation.as_mut(), cooldown) {
            procreation.cooldown_left = left;
        }
        let calls = snapshot
            .get::<Option<Vec<u64>>>(Self::SECTION, "offspring_calls")?
            .flatten();
        if let (Some(procreation), Some(calls)) = (self.procreation.as_mut(), calls) {
            restore_rule_calls(&mut procreation.offspring, calls);
        }
        Ok(())
    }
}

fn rule_calls(rules: &[SpawnRule]) -> Vec<u64> {
    rules.iter().map(SpawnRule::calls).collect()
}

/// Counters are matched to rules by position; extra entries on either
/// side are ignored.
fn restore_rule_calls(rules: &mut [SpawnRule], calls: Vec<u64>) {
    for (rule, count) in rules.iter_mut().zip(calls) {
        rule.set_calls(count);
    }
}

/// Linear interpolation from `a` to `b` with `t` clamped into `[0, 1]`.
pub fn lerp_clamped(a: f64, b: f64, t: f64) -> f64 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    (b - a).mul_add(t, a)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::spawn::SpawnTemplate;

    fn mouse() -> Creature {
        let mut intake = BTreeMap::new();
        intake.insert(
            EntityKind::Wheat,
            IntakeRule {
                value_mult: 0.2,
                request_starved: 8.0,
                request_stuffed: 0.8,
                request_weight: 3.0,
            },
        );
        intake.insert(
            EntityKind::Grass,
            IntakeRule {
                value_mult: 0.2,
                request_starved: 6.0,
                request_stuffed: 0.8,
                request_weight: 1.0,
            },
        );
        Creature {
            satiety: 0.0,
            gender: Gender::Female,
            max_lifetime: Some(15),
            hunger_rate: 0.2,
            sated_threshold: 0.4,
            intake,
            migrate_when_starving: true,
            procreation: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn lerp_clamps_parameter() {
        assert!(close(lerp_clamped(8.0, 0.8, -1.0), 8.0));
        assert!(close(lerp_clamped(8.0, 0.8, 0.5), 4.4));
        assert!(close(lerp_clamped(8.0, 0.8, 3.0), 0.8));
    }

    #[test]
    fn starved_requests_are_weighted_over_all_sources() {
        let sizes = mouse().request_sizes(&[EntityKind::Wheat, EntityKind::Grass]);
        // weights 3 and 1 over a sum of 4
        assert!(close(sizes.first().copied().unwrap_or_default(), 8.0 * 3.0 / 4.0));
        assert!(close(sizes.get(1).copied().unwrap_or_default(), 6.0 / 4.0));
    }

    #[test]
    fn two_patches_of_one_kind_split_its_weight() {
        let sizes = mouse().request_sizes(&[EntityKind::Grass, EntityKind::Grass]);
        assert!(sizes.iter().all(|s| close(*s, 3.0)));
    }

    #[test]
    fn stuffed_creature_requests_stuffed_size() {
        let mut creature = mouse();
        creature.satiety = 0.4;
        let sizes = creature.request_sizes(&[EntityKind::Grass]);
        assert!(close(sizes.first().copied().unwrap_or_default(), 0.8));
    }

    #[test]
    fn eating_is_capped_at_one() {
        let mut creature = mouse();
        creature.receive(EntityKind::Wheat, 100.0);
        assert!(close(creature.satiety, 1.0));
    }

    #[test]
    fn unknown_food_is_ignored() {
        let mut creature = mouse();
        creature.receive(EntityKind::MouseMeat, 1.0);
        assert!(close(creature.satiety, 0.0));
    }

    #[test]
    fn decay_clamps_and_reports_exhaustion() {
        let mut decaying = Decaying::new(0.25, 1.0, 0.1, 0.2);
        assert!(!decaying.decay());
        assert!(close(decaying.integrity(), 0.15));
        assert!(close(decaying.speed, 0.3));
        assert!(decaying.decay());
        assert!(close(decaying.integrity(), 0.0));
    }

    #[test]
    fn repair_stops_at_cap() {
        let mut decaying = Decaying::new(0.9, 1.0, 0.1, 0.0);
        decaying.repair(0.5);
        assert!(close(decaying.integrity(), 1.0));
    }

    #[test]
    fn no_residue_kill_is_sticky() {
        let mut killable = Killable::default();
        killable.kill(true);
        killable.kill(false);
        assert!(killable.killed);
        assert!(killable.no_residue);
    }

    #[test]
    fn cooldown_counts_down_then_allows() {
        let mut procreation = Procreation {
            male_threshold: 1,
            spawn_count: 1,
            cooldown: 2,
            cooldown_left: 2,
            offspring: Vec::new(),
        };
        assert!(!procreation.tick_cooldown());
        assert!(!procreation.tick_cooldown());
        assert!(procreation.tick_cooldown());
        procreation.reset_cooldown();
        assert_eq!(procreation.cooldown_left, 2);
    }

    #[test]
    fn movable_target_round_trips() {
        let movable = Movable {
            target: Some(Cell::new(5, 5)),
            shifts: ShiftPattern::Cardinal,
        };
        let snapshot = movable.form_snapshot().ok().unwrap_or_default();
        let mut restored = Movable::default();
        assert!(restored.restore_from_snapshot(&snapshot).is_ok());
        assert_eq!(restored.target, Some(Cell::new(5, 5)));
    }

    fn every_third(kind: EntityKind, calls: u64) -> SpawnRule {
        let mut rule = SpawnRule::new(SpawnTemplate::of(kind), 3, 1.0).unwrap();
        rule.set_calls(calls);
        rule
    }

    #[test]
    fn residue_counters_survive_a_snapshot() {
        let killable = Killable {
            residue: vec![every_third(EntityKind::MouseMeat, 2)],
            ..Killable::default()
        };
        let snapshot = killable.form_snapshot().unwrap();

        let mut restored = Killable {
            residue: vec![every_third(EntityKind::MouseMeat, 0)],
            ..Killable::default()
        };
        restored.restore_from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.residue.first().map(SpawnRule::calls), Some(2));

        // the third call fires, exactly as it would have without the round trip
        let mut rng = StdRng::seed_from_u64(1);
        let fired = restored.residue.first_mut().and_then(|rule| rule.fire(&mut rng));
        assert!(fired.is_some());
    }

    #[test]
    fn offspring_counters_survive_a_snapshot() {
        let with_offspring = |calls: u64| {
            let mut creature = mouse();
            creature.procreation = Some(Procreation {
                male_threshold: 1,
                spawn_count: 1,
                cooldown: 5,
                cooldown_left: 4,
                offspring: vec![
                    every_third(EntityKind::Mouse, calls),
                    every_third(EntityKind::Mouse, calls.saturating_add(1)),
                ],
            });
            creature
        };
        let snapshot = with_offspring(7).form_snapshot().unwrap();

        let mut restored = with_offspring(0);
        restored.restore_from_snapshot(&snapshot).unwrap();
        let procreation = restored.procreation.unwrap();
        assert_eq!(procreation.cooldown_left, 4);
        let calls: Vec<u64> = procreation.offspring.iter().map(SpawnRule::calls).collect();
        assert_eq!(calls, vec![7, 8]);
    }

    #[test]
    fn snapshot_without_counters_keeps_fresh_rules() {
        let mut restored = Killable {
            residue: vec![every_third(EntityKind::Carcass, 1)],
            ..Killable::default()
        };
        restored.restore_from_snapshot(&Snapshot::default()).unwrap();
        assert_eq!(restored.residue.first().map(SpawnRule::calls), Some(1));
    }
}
