//! Device — a node's attachment point to a channel.

use std::net::Ipv4Addr;

use crate::config::DeviceConfig;

use super::id::{ChannelId, DeviceId, NodeId};

/// A network interface. Belongs to at most one node, connects to at
/// most one channel, and carries at most one IPv4 address; all three
/// bindings are set once during topology construction and never rebound.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: DeviceId,
    /// Owning node, set by `Topology::attach`.
    pub node: Option<NodeId>,
    /// Connected channel, set by `Topology::connect`.
    pub channel: Option<ChannelId>,
    /// Assigned address, set by `Topology::assign`.
    pub address: Option<Ipv4Addr>,
    pub config: DeviceConfig,
}

impl Device {
    pub(crate) fn new(id: DeviceId, config: DeviceConfig) -> Self {
        Device {
            id,
            node: None,
            channel: None,
            address: None,
            config,
        }
    }
}
