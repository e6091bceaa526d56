//! A stable priority queue of deferred effects.
//!
//! Effects are enqueued during the decide pass and only run when the queue
//! is drained with [`ActionQueue::perform`]. Draining always takes the
//! lowest priority next; effects of equal priority run in enqueue order.
//! An effect receives the queue itself, so it may schedule follow-ups,
//! which slot in by priority and run within the same drain.

use std::collections::BTreeMap;

use tracing::warn;
use zeroplayer_types::EntityId;

/// A deferred effect over context `C`.
pub type Effect<P, C, E> = Box<dyn FnOnce(&mut C, &mut ActionQueue<P, C, E>) -> Result<(), E>>;

struct Action<P, C, E> {
    entity: Option<EntityId>,
    effect: Effect<P, C, E>,
}

/// One effect that returned an error while draining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure<P> {
    /// Priority the effect ran at.
    pub priority: P,
    /// Entity the effect was bound to.
    pub entity: Option<EntityId>,
    /// Rendered error.
    pub message: String,
}

/// Outcome of one drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformReport<P> {
    /// Effects that completed.
    pub executed: usize,
    /// Effects that failed, in execution order.
    pub failures: Vec<ActionFailure<P>>,
}

impl<P> Default for PerformReport<P> {
    fn default() -> Self {
        Self {
            executed: 0,
            failures: Vec::new(),
        }
    }
}

/// Priority queue of effects with FIFO tie-breaking.
pub struct ActionQueue<P, C, E> {
    pending: BTreeMap<(P, u64), Action<P, C, E>>,
    next_seq: u64,
    enqueued: u64,
}

impl<P: core::fmt::Debug, C, E> core::fmt::Debug for ActionQueue<P, C, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionQueue")
            .field("pending", &self.pending.len())
            .field("enqueued", &self.enqueued)
            .finish()
    }
}

impl<P, C, E> Default for ActionQueue<P, C, E> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_seq: 0,
            enqueued: 0,
        }
    }
}

impl<P, C, E> ActionQueue<P, C, E>
where
    P: Ord + Copy + core::fmt::Display,
    E: core::fmt::Display,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an effect. Nothing runs until [`perform`](Self::perform).
    pub fn enqueue<F>(&mut self, priority: P, entity: Option<EntityId>, effect: F)
    where
        F: FnOnce(&mut C, &mut Self) -> Result<(), E> + 'static,
    {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.enqueued = self.enqueued.saturating_add(1);
        self.pending.insert(
            (priority, seq),
            Action {
                entity,
                effect: Box::new(effect),
            },
        );
    }

    /// Number of effects waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Priority and entity of every waiting effect, in the order a drain
    /// would run them.
    pub fn pending(&self) -> Vec<(P, Option<EntityId>)> {
        self.pending
            .iter()
            .map(|((priority, _), action)| (*priority, action.entity))
            .collect()
    }

    /// Effects enqueued since the counter was last taken.
    pub const fn take_enqueued(&mut self) -> u64 {
        let count = self.enqueued;
        self.enqueued = 0;
        count
    }

    /// Drain the queue, running every effect in order.
    ///
    /// A failing effect is logged at `warn` and skipped; draining continues.
    /// The queue is empty afterwards.
    pub fn perform(&mut self, ctx: &mut C) -> PerformReport<P> {
        let mut report = PerformReport::default();
        while let Some(((priority, _), action)) = self.pending.pop_first() {
            match (action.effect)(ctx, self) {
                Ok(()) => report.executed = report.executed.saturating_add(1),
                Err(error) => {
                    warn!(
                        priority = %priority,
                        entity = ?action.entity.map(EntityId::into_inner),
                        error = %error,
                        "Action failed, skipped"
                    );
                    report.failures.push(ActionFailure {
                        priority,
                        entity: action.entity,
                        message: error.to_string(),
                    });
                }
            }
        }
        self.next_seq = 0;
        report
    }
}
