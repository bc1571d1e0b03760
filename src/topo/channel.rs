//! Channel — a shared medium connecting devices.

use crate::config::ChannelConfig;

use super::id::{ChannelId, DeviceId};

/// A transmission medium. Two attached devices make a point-to-point
/// link; more make a shared bus. Holds non-owning back-references to
/// the devices connected to it, in connection order.
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: ChannelId,
    pub config: ChannelConfig,
    /// Connected devices, in connection order.
    pub attached: Vec<DeviceId>,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, config: ChannelConfig) -> Self {
        Channel {
            id,
            config,
            attached: Vec::new(),
        }
    }

    /// Devices on this channel other than `from` — the delivery fan-out
    /// of a transmission.
    pub fn peers_of(&self, from: DeviceId) -> Vec<DeviceId> {
        self.attached
            .iter()
            .copied()
            .filter(|d| *d != from)
            .collect()
    }
}
