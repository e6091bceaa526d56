//! Finite, decaying resources and the two-phase distribution protocol.
//!
//! Consumers never take from a resource directly. During the decide part of
//! a tick they [`sign`](ResourceStock::sign) a request carrying the amount
//! they want and a receiver callback. At the distribution phase the
//! resource settles every pending request at once:
//!
//! - `total = sum(requested)`
//! - `multiplier = min(1, value / total)`
//! - each receiver gets `requested * multiplier`
//!
//! so contention is rationed proportionally and signup order never matters.
//! Decay and exhaustion run in a later phase, which means distribution
//! always sees the value left over from the previous tick.

use tracing::trace;
use zeroplayer_types::{EntityId, EntityKind, Snapshot, SnapshotError, Snapshotable};

use crate::error::WorldError;
use crate::world_map::WorldMap;

/// What a receiver is handed at settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    /// Amount delivered.
    pub amount: f64,
    /// Kind of the resource it came from.
    pub resource: EntityKind,
}

/// Callback invoked with a settled amount.
pub type Receiver = Box<dyn FnOnce(&mut WorldMap, Settlement)>;

/// A signed, not yet settled request.
struct PendingRequest {
    amount: f64,
    receiver: Receiver,
}

/// Value, decay, and pending requests of a resource entity.
pub struct ResourceStock {
    /// Units left.
    pub value: f64,
    /// Units lost per tick; negative values grow the resource.
    pub decay_speed: f64,
    /// Added to `decay_speed` after every tick.
    pub decay_acceleration: f64,
    /// The resource dies once `value` drops to or below this.
    pub death_threshold: f64,
    requests: Vec<PendingRequest>,
}

impl core::fmt::Debug for ResourceStock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceStock")
            .field("value", &self.value)
            .field("decay_speed", &self.decay_speed)
            .field("decay_acceleration", &self.decay_acceleration)
            .field("death_threshold", &self.death_threshold)
            .field("pending", &self.requests.len())
            .finish()
    }
}

impl ResourceStock {
    /// Create a stock with no pending requests.
    pub const fn new(
        value: f64,
        decay_speed: f64,
        decay_acceleration: f64,
        death_threshold: f64,
    ) -> Self {
        Self {
            value,
            decay_speed,
            decay_acceleration,
            death_threshold,
            requests: Vec::new(),
        }
    }

    /// Record a request. Nothing is delivered until [`settle`](Self::settle).
    pub fn sign(&mut self, amount: f64, receiver: Receiver) {
        self.requests.push(PendingRequest {
            amount: amount.max(0.0),
            receiver,
        });
    }

    /// Number of pending requests.
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Sum of all pending request amounts.
    pub fn total_requested(&self) -> f64 {
        self.requests.iter().map(|r| r.amount).sum()
    }

    /// Resolve all pending requests against the current value.
    ///
    /// Returns each receiver paired with its settled amount, in signup
    /// order, and clears the pending list. When the stock is rationed the
    /// value ends at exactly zero.
    pub fn settle(&mut self) -> Vec<(f64, Receiver)> {
        if self.requests.is_empty() {
            return Vec::new();
        }
        let total = self.total_requested();
        let multiplier = settlement_multiplier(self.value, total);
        if multiplier < 1.0 {
            self.value = 0.0;
        } else {
            self.value -= total;
        }
        self.requests
            .drain(..)
            .map(|request| (request.amount * multiplier, request.receiver))
            .collect()
    }

    /// Apply one tick of decay and accelerate it.
    pub fn decay(&mut self) {
        self.value -= self.decay_speed;
        self.decay_speed += self.decay_acceleration;
    }

    /// Whether the resource has run out.
    pub fn is_exhausted(&self) -> bool {
        self.value <= self.death_threshold
    }
}

/// Fraction of each request that can be honoured: `min(1, value / total)`,
/// never negative.
pub fn settlement_multiplier(value: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 1.0;
    }
    (value / total).clamp(0.0, 1.0)
}

/// Settle every request pending on `resource` and invoke the receivers.
///
/// Returns the total amount handed out.
///
/// # Errors
///
/// Returns [`WorldError::EntityNotFound`] if the resource does not exist, or
/// [`WorldError::MissingCapability`] if it holds no stock.
pub fn distribute(world: &mut WorldMap, resource: EntityId) -> Result<f64, WorldError> {
    let entity = world.entity_mut(resource)?;
    let kind = entity.kind();
    let settled = entity
        .resource
        .as_mut()
        .ok_or(WorldError::MissingCapability {
            entity: resource,
            capability: "resource",
        })?
        .settle();

    let mut handed_out = 0.0;
    for (amount, receiver) in settled {
        handed_out += amount;
        receiver(
            world,
            Settlement {
                amount,
                resource: kind,
            },
        );
    }
    if handed_out > 0.0 {
        trace!(resource = %resource, kind = %kind, handed_out, "Resource distributed");
    }
    Ok(handed_out)
}

impl Snapshotable for ResourceStock {
    const SECTION: &'static str = "resource";

    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        snapshot.set(Self::SECTION, "value", &self.value)?;
        snapshot.set(Self::SECTION, "decay_speed", &self.decay_speed)
    }

    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.value = snapshot.require(Self::SECTION, "value")?;
        self.decay_speed = snapshot.require(Self::SECTION, "decay_speed")?;
        self.requests.clear();
        Ok(())
    }
}
