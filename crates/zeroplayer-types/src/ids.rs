//! Integer identifiers and the allocator that hands them out.
//!
//! Every entity in the simulation is addressed by an [`EntityId`]. Ids are
//! allocated by an explicit [`IdAllocator`] owned by the world graph: they
//! increase monotonically, are never reused, and are only reset by creating
//! a fresh allocator at process start (or restore) time.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an entity (location, creature, resource, or
    /// remains) in the world graph.
    EntityId
}

/// Monotonic id source.
///
/// The allocator saturates at `u64::MAX` instead of wrapping back into the
/// range of ids already in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create an allocator whose first id is `0`.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Create an allocator whose first id is `next`.
    ///
    /// Used when restoring a world so new ids continue past every id that
    /// already exists.
    pub const fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Hand out the next id.
    pub const fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub const fn peek_next(&self) -> u64 {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_monotonically() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), EntityId(0));
        assert_eq!(ids.allocate(), EntityId(1));
        assert_eq!(ids.peek_next(), 2);
    }

    #[test]
    fn starting_at_skips_existing_ids() {
        let mut ids = IdAllocator::starting_at(42);
        assert_eq!(ids.allocate(), EntityId(42));
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let mut ids = IdAllocator::starting_at(u64::MAX);
        assert_eq!(ids.allocate(), EntityId(u64::MAX));
        assert_eq!(ids.peek_next(), u64::MAX);
    }

    #[test]
    fn display_and_serde_are_plain_integers() {
        let id = EntityId(7);
        assert_eq!(id.to_string(), "#7");
        assert_eq!(serde_json::to_string(&id).ok(), Some(String::from("7")));
    }
}
