/// Event records for the simulation kernel.
///
/// Every effect in the simulator is an `Event` placed on the scheduler's
/// priority queue and dispatched in `(scheduled_at, id)` order. The
/// monotone `EventId` is what makes equal-time dispatch FIFO.

use std::cmp::Ordering;

use crate::packet::Packet;
use crate::time::VirtualTime;
use crate::topo::DeviceId;

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly increasing event identifier, minted per simulation.
///
/// Doubles as the cancellation handle: `Simulation::cancel` takes the
/// `EventId` returned at schedule time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// The raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID generator ────────────────────────────────────────────────

/// Deterministic event-ID generator. Each `Scheduler` owns exactly one;
/// the simulation is single-threaded, so the counter is trivially
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// A generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// The ID the next call to `next_id` will return.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Event kind ────────────────────────────────────────────────────────

/// The payload of a scheduled event.
///
/// `Transmit` asks the topology to put a packet on the sending device's
/// channel; the topology answers by scheduling one `Deliver` per peer
/// device, offset by serialization time plus propagation delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Does nothing when dispatched. Used for tests and time padding.
    Noop,

    /// A trace marker carrying a free-form message.
    Log(String),

    /// Start transmitting `packet` from `from` onto its channel.
    Transmit { from: DeviceId, packet: Packet },

    /// `packet` arrives at device `to`, having left device `from`.
    Deliver {
        from: DeviceId,
        to: DeviceId,
        packet: Packet,
    },
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Noop => write!(f, "Noop"),
            EventKind::Log(msg) => write!(f, "Log({})", msg),
            EventKind::Transmit { from, packet } => {
                write!(f, "Transmit({}, {})", from, packet)
            }
            EventKind::Deliver { from, to, packet } => {
                write!(f, "Deliver({} → {}, {})", from, to, packet)
            }
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single scheduled event: when, what, and its cancellation handle.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Event {
    /// Unique, monotonically increasing identifier.
    pub id: EventId,

    /// Virtual time at which this event fires.
    pub scheduled_at: VirtualTime,

    /// What happens when it fires.
    pub kind: EventKind,
}

impl Event {
    pub fn new(id: EventId, scheduled_at: VirtualTime, kind: EventKind) -> Self {
        Event {
            id,
            scheduled_at,
            kind,
        }
    }
}

/// Reversed ordering so `BinaryHeap` (a max-heap) pops the smallest
/// `(scheduled_at, id)` key first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
