//! Step priorities: the total order in which deferred effects run.

use serde::{Deserialize, Serialize};

/// Phase of a tick. Lower variants execute first.
///
/// Distribution runs before decay so resources are shared out of last
/// tick's value. Leap movement runs after kills so the prey's cell is
/// already empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPriority {
    /// Lifetime counters advance.
    Lifetime,
    /// Hunters scan for prey.
    Search,
    /// Hunters strike prey within reach.
    LeapAttack,
    /// Idle hunters pick a random destination.
    Wander,
    /// Creatures get hungry and sign up for food.
    Hunger,
    /// Movables step towards their targets; migrations.
    Move,
    /// Old creatures die.
    Age,
    /// Resources settle pending requests.
    Distribute,
    /// Decay, starvation, and resource exhaustion.
    Decay,
    /// Condemned entities are removed and leave residue.
    Kill,
    /// Hunters move onto the cell of the prey they took.
    LeapMove,
    /// Females give birth.
    Procreation,
    /// Locations roll their spawn rules.
    Spawn,
}

impl StepPriority {
    /// Every priority in execution order.
    pub const ALL: [Self; 13] = [
        Self::Lifetime,
        Self::Search,
        Self::LeapAttack,
        Self::Wander,
        Self::Hunger,
        Self::Move,
        Self::Age,
        Self::Distribute,
        Self::Decay,
        Self::Kill,
        Self::LeapMove,
        Self::Procreation,
        Self::Spawn,
    ];
}

impl core::fmt::Display for StepPriority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Lifetime => "lifetime",
            Self::Search => "search",
            Self::LeapAttack => "leap_attack",
            Self::Wander => "wander",
            Self::Hunger => "hunger",
            Self::Move => "move",
            Self::Age => "age",
            Self::Distribute => "distribute",
            Self::Decay => "decay",
            Self::Kill => "kill",
            Self::LeapMove => "leap_move",
            Self::Procreation => "procreation",
            Self::Spawn => "spawn",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted() {
        let mut sorted = StepPriority::ALL;
        sorted.sort();
        assert_eq!(sorted, StepPriority::ALL);
    }

    #[test]
    fn distribution_precedes_decay_and_kill_precedes_leap_move() {
        assert!(StepPriority::Distribute < StepPriority::Decay);
        assert!(StepPriority::Kill < StepPriority::LeapMove);
        assert!(StepPriority::Lifetime < StepPriority::Spawn);
    }
}
