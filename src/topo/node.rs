//! Node — an addressable endpoint holding attached devices.

use super::id::{DeviceId, NodeId};

/// A simulated host. Created at topology-build time, never destroyed
/// during a run. Owns its devices in attachment order.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Attached devices, in attachment order. The position of a device
    /// in this list is its "slot" for scenario endpoint pinning.
    pub devices: Vec<DeviceId>,
}

impl Node {
    pub(crate) fn new(id: NodeId) -> Self {
        Node {
            id,
            devices: Vec::new(),
        }
    }

    /// The device in slot `slot`, if attached.
    pub fn device_at(&self, slot: usize) -> Option<DeviceId> {
        self.devices.get(slot).copied()
    }
}
