//! Delivery log entries recorded by the topology.

use crate::time::VirtualTime;

use super::id::DeviceId;

/// Outcome of one transmit fan-out leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryVerdict {
    /// The packet will arrive at `arrival`.
    Delivered { arrival: VirtualTime },
    /// The channel's loss model dropped the packet.
    Dropped,
}

/// A record of a single transmit decision: one entry per destination
/// device per transmit call. Appended in dispatch order, so the log is
/// itself deterministic and suitable for equality assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEntry {
    /// Time the transmission started.
    pub time: VirtualTime,
    pub from: DeviceId,
    pub to: DeviceId,
    pub verdict: DeliveryVerdict,
}

impl std::fmt::Display for DeliveryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.verdict {
            DeliveryVerdict::Delivered { arrival } => write!(
                f,
                "[{}] {} → {} arriving {}",
                self.time, self.from, self.to, arrival
            ),
            DeliveryVerdict::Dropped => {
                write!(f, "[{}] {} → {} dropped", self.time, self.from, self.to)
            }
        }
    }
}
