/// Deterministic event scheduler with cancellation.
///
/// A `BinaryHeap` with reversed `Ord` on `Event` acts as a min-heap
/// keyed by `(scheduled_at, event_id)`. Event IDs are strictly
/// increasing, so two runs with the same schedule calls always dispatch
/// in the same order, and equal-time events fire in submission order.
///
/// Cancellation is lazy: the heap entry stays where it is, and
/// `pop_next` / `peek_next` skip over withdrawn IDs. The `pending` set
/// tracks live events so `cancel` can tell a withdrawable event from
/// one that already fired.

use std::collections::{BTreeSet, BinaryHeap};

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventIdGen, EventKind};
use crate::time::VirtualTime;

/// The core deterministic scheduler. Owns the queue and the ID
/// generator; all scheduling goes through it.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Min-heap (via reversed Ord on Event).
    queue: BinaryHeap<Event>,

    /// Monotonic event-ID generator.
    id_gen: EventIdGen,

    /// IDs scheduled but not yet dispatched or cancelled.
    pending: BTreeSet<EventId>,

    /// IDs withdrawn by `cancel`; skipped when they surface.
    cancelled: BTreeSet<EventId>,
}

impl Scheduler {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event at the given virtual time.
    ///
    /// Returns the `EventId`, which doubles as the cancellation handle.
    pub fn schedule(&mut self, at: VirtualTime, kind: EventKind) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.push(Event::new(id, at, kind));
        self.pending.insert(id);
        id
    }

    /// Withdraw a pending event so it never fires.
    ///
    /// Fails with `AlreadyFired` if the event was already dispatched or
    /// cancelled.
    pub fn cancel(&mut self, id: EventId) -> SimResult<()> {
        if self.pending.remove(&id) {
            self.cancelled.insert(id);
            Ok(())
        } else {
            Err(SimError::AlreadyFired(id))
        }
    }

    /// Pop the next live event (earliest time, lowest ID).
    ///
    /// Returns `None` when no live events remain.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.skip_cancelled();
        let event = self.queue.pop()?;
        self.pending.remove(&event.id);
        Some(event)
    }

    /// Peek at the next live event without removing it.
    pub fn peek_next(&mut self) -> Option<&Event> {
        self.skip_cancelled();
        self.queue.peek()
    }

    /// Drop cancelled events sitting at the head of the heap.
    fn skip_cancelled(&mut self) {
        while let Some(head) = self.queue.peek() {
            if self.cancelled.remove(&head.id) {
                self.queue.pop();
            } else {
                break;
            }
        }
    }

    /// `true` if no live events remain.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of live (non-cancelled) pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drain all live events in dispatch order. Used by tests.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.pending.len());
        while let Some(e) = self.pop_next() {
            events.push(e);
        }
        events
    }
}
