//! Structured error types.
//!
//! All fallible public APIs return `Result<T, SimError>`. Every variant
//! names the link, device, or pool that triggered it, so a failed
//! topology build points straight at the offending line of the scenario.

use std::net::Ipv4Addr;

use crate::event::EventId;
use crate::time::VirtualTime;
use crate::topo::{ChannelId, DeviceId, NodeId};

/// The top-level error type for the simulation kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    // ── Scheduling errors ─────────────────────────────────

    /// Attempted to schedule an event before the current time.
    /// With unsigned ticks this is the only way to express a
    /// negative delay.
    InvalidDelay {
        requested: VirtualTime,
        current: VirtualTime,
    },

    /// Attempted to cancel an event that already fired (or was
    /// already cancelled).
    AlreadyFired(EventId),

    // ── Topology errors ───────────────────────────────────

    /// A device was attached to a second node, channel, or address.
    /// `what` is one of `"node"`, `"channel"`, `"address"`.
    DuplicateAttachment {
        device: DeviceId,
        what: &'static str,
    },

    /// The scenario description is inconsistent; the message names
    /// the offending group, link, or endpoint.
    InvalidTopology(String),

    /// A node ID was referenced but never created.
    NodeNotFound(NodeId),

    /// A device ID was referenced but never created.
    DeviceNotFound(DeviceId),

    /// A channel ID was referenced but never created.
    ChannelNotFound(ChannelId),

    /// A transmit was requested on a device with no channel.
    NotConnected(DeviceId),

    /// A packet exceeded the sending device's MTU.
    MtuExceeded {
        device: DeviceId,
        size: usize,
        mtu: u16,
    },

    // ── Addressing errors ─────────────────────────────────

    /// The subnet's host space is fully allocated.
    PoolExhausted { base: Ipv4Addr, mask: Ipv4Addr },

    // ── Configuration errors ──────────────────────────────

    /// A data rate, delay, or probability failed to parse or validate.
    InvalidConfig(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidDelay { requested, current } => write!(
                f,
                "cannot schedule at {} when the clock reads {}",
                requested, current
            ),
            SimError::AlreadyFired(id) => {
                write!(f, "event {} already fired or was cancelled", id)
            }
            SimError::DuplicateAttachment { device, what } => {
                write!(f, "device {} already has a {}", device, what)
            }
            SimError::InvalidTopology(msg) => write!(f, "invalid topology: {}", msg),
            SimError::NodeNotFound(id) => write!(f, "node {} not found", id),
            SimError::DeviceNotFound(id) => write!(f, "device {} not found", id),
            SimError::ChannelNotFound(id) => write!(f, "channel {} not found", id),
            SimError::NotConnected(id) => {
                write!(f, "device {} is not connected to a channel", id)
            }
            SimError::MtuExceeded { device, size, mtu } => write!(
                f,
                "packet of {} bytes exceeds MTU {} on device {}",
                size, mtu, device
            ),
            SimError::PoolExhausted { base, mask } => {
                write!(f, "address pool {}/{} is exhausted", base, mask)
            }
            SimError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
