//! Enumeration types for the zeroplayer simulation.
//!
//! The set of entity kinds is closed and known at compile time, so kind
//! dispatch (catalog lookups, display glyphs, typed child queries) is done
//! with `match` over [`EntityKind`] instead of runtime type inspection.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The concrete kind of an entity in the world graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The single root of the world graph. Owns every location.
    Root,

    // --- Locations ---
    /// Wooded location where grass grows.
    Forest,
    /// Open location where wheat and some grass grow.
    Field,

    // --- Plants ---
    /// Fast-regrowing plant resource.
    Grass,
    /// Rich plant resource that rots quickly.
    Wheat,

    // --- Herbivores ---
    /// Small herbivore eating wheat and grass.
    Mouse,
    /// Herbivore eating grass.
    Rabbit,

    // --- Predators ---
    /// Predator hunting mice.
    Owl,
    /// Predator hunting rabbits.
    Fox,

    // --- Remains ---
    /// Meat left behind by a dead mouse.
    MouseMeat,
    /// Meat left behind by a dead rabbit.
    RabbitMeat,
    /// Decaying remains of a dead predator.
    Carcass,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Root,
        Self::Forest,
        Self::Field,
        Self::Grass,
        Self::Wheat,
        Self::Mouse,
        Self::Rabbit,
        Self::Owl,
        Self::Fox,
        Self::MouseMeat,
        Self::RabbitMeat,
        Self::Carcass,
    ];

    /// Stable lowercase name, matching the serde representation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Forest => "forest",
            Self::Field => "field",
            Self::Grass => "grass",
            Self::Wheat => "wheat",
            Self::Mouse => "mouse",
            Self::Rabbit => "rabbit",
            Self::Owl => "owl",
            Self::Fox => "fox",
            Self::MouseMeat => "mouse_meat",
            Self::RabbitMeat => "rabbit_meat",
            Self::Carcass => "carcass",
        }
    }

    /// The category this kind belongs to.
    pub const fn category(self) -> KindCategory {
        match self {
            Self::Root => KindCategory::Root,
            Self::Forest | Self::Field => KindCategory::Location,
            Self::Grass | Self::Wheat => KindCategory::Plant,
            Self::Mouse | Self::Rabbit => KindCategory::Herbivore,
            Self::Owl | Self::Fox => KindCategory::Predator,
            Self::MouseMeat | Self::RabbitMeat | Self::Carcass => KindCategory::Remains,
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse grouping of [`EntityKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindCategory {
    /// The world root.
    Root,
    /// Places with a grid that own other entities.
    Location,
    /// Growing resources.
    Plant,
    /// Plant-eating creatures.
    Herbivore,
    /// Hunting creatures.
    Predator,
    /// What is left behind after a death.
    Remains,
}

// ---------------------------------------------------------------------------
// Kind filters
// ---------------------------------------------------------------------------

/// A "kind or supertype" query used by typed child lookups.
///
/// A child matches when its kind *is-a* the filter: an exact kind matches
/// only itself and a category matches every kind inside it. `Creature` and
/// `Resource` are capability groups: world lookups decide them from the
/// components an entity carries, and [`KindFilter::matches`] on a bare kind
/// only knows the built-in kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    /// Matches every kind.
    Any,
    /// Matches exactly one kind.
    Exact(EntityKind),
    /// Matches every kind in a category.
    Category(KindCategory),
    /// Herbivores and predators.
    Creature,
    /// Anything that can be eaten through distribution: plants and meat.
    Resource,
}

impl KindFilter {
    /// Whether an entity of `kind` satisfies this filter, judged by kind
    /// alone.
    pub fn matches(self, kind: EntityKind) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(wanted) => wanted == kind,
            Self::Category(category) => category == kind.category(),
            Self::Creature => matches!(
                kind.category(),
                KindCategory::Herbivore | KindCategory::Predator
            ),
            Self::Resource => matches!(
                kind,
                EntityKind::Grass | EntityKind::Wheat | EntityKind::MouseMeat | EntityKind::RabbitMeat
            ),
        }
    }
}

impl From<EntityKind> for KindFilter {
    fn from(kind: EntityKind) -> Self {
        Self::Exact(kind)
    }
}

impl From<KindCategory> for KindFilter {
    fn from(category: KindCategory) -> Self {
        Self::Category(category)
    }
}

// ---------------------------------------------------------------------------
// Creature gender
// ---------------------------------------------------------------------------

/// Binary creature gender. Only females procreate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Counted towards a female's procreation threshold.
    Male,
    /// Spawns offspring.
    Female,
}
