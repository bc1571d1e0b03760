//! `Topology` — owns all nodes, devices, and channels, and dispatches
//! packet events between them.
//!
//! Implements [`EventHandler`] so it can be passed directly to
//! [`Simulation::run`](crate::simulation::Simulation::run): `Transmit`
//! events fan out into one `Deliver` per peer device on the sender's
//! channel, offset by serialization time plus propagation delay, and
//! `Deliver` events invoke the destination device's [`PacketSink`].

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use log::{debug, trace, warn};

use crate::addr::AddressPool;
use crate::config::{ChannelConfig, DeviceConfig};
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventKind};
use crate::packet::Packet;
use crate::simulation::{EventHandler, SimulationContext};

use super::channel::Channel;
use super::device::Device;
use super::id::{ChannelId, DeviceId, NodeId};
use super::node::Node;
use super::sink::PacketSink;
use super::trace::{DeliveryEntry, DeliveryVerdict};

// ── Deterministic RNG ─────────────────────────────────────────────────

/// SplitMix64 — a small deterministic PRNG used by the channel loss
/// model. Identical sequences for a given seed on every platform; with
/// all channels lossless it is never consulted.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        DeterministicRng { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// Uniform f64 in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

// ── Topology ──────────────────────────────────────────────────────────

/// The complete topology of a simulation instance: node, device, and
/// channel arenas plus per-device sinks.
///
/// All construction APIs fail fast; an `Err` from any of them means the
/// topology should be discarded, not run.
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    devices: BTreeMap<DeviceId, Device>,
    channels: BTreeMap<ChannelId, Channel>,
    sinks: BTreeMap<DeviceId, Box<dyn PacketSink>>,
    next_node: u64,
    next_device: u64,
    next_channel: u64,
    rng: DeterministicRng,
    /// Append-only log of every transmit decision.
    pub log: Vec<DeliveryEntry>,
}

impl Topology {
    /// An empty topology with the default loss-model seed.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// An empty topology with an explicit loss-model seed.
    pub fn with_seed(seed: u64) -> Self {
        Topology {
            nodes: BTreeMap::new(),
            devices: BTreeMap::new(),
            channels: BTreeMap::new(),
            sinks: BTreeMap::new(),
            next_node: 0,
            next_device: 0,
            next_channel: 0,
            rng: DeterministicRng::new(seed),
            log: Vec::new(),
        }
    }

    // ── Construction ──────────────────────────────────────────────

    /// Create a node.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(id));
        id
    }

    /// Create `count` nodes, returned in creation order.
    pub fn add_nodes(&mut self, count: u32) -> Vec<NodeId> {
        (0..count).map(|_| self.add_node()).collect()
    }

    /// Create a detached device.
    pub fn add_device(&mut self, config: DeviceConfig) -> DeviceId {
        let id = DeviceId::new(self.next_device);
        self.next_device += 1;
        self.devices.insert(id, Device::new(id, config));
        id
    }

    /// Create a channel.
    pub fn add_channel(&mut self, config: ChannelConfig) -> ChannelId {
        let id = ChannelId::new(self.next_channel);
        self.next_channel += 1;
        self.channels.insert(id, Channel::new(id, config));
        id
    }

    /// Attach a device to a node.
    ///
    /// Fails with `DuplicateAttachment` if the device already belongs
    /// to any node (including this one).
    pub fn attach(&mut self, node: NodeId, device: DeviceId) -> SimResult<()> {
        if !self.nodes.contains_key(&node) {
            return Err(SimError::NodeNotFound(node));
        }
        let dev = self
            .devices
            .get_mut(&device)
            .ok_or(SimError::DeviceNotFound(device))?;
        if dev.node.is_some() {
            return Err(SimError::DuplicateAttachment {
                device,
                what: "node",
            });
        }
        dev.node = Some(node);
        self.nodes
            .get_mut(&node)
            .expect("checked above")
            .devices
            .push(device);
        Ok(())
    }

    /// Connect a device to a channel.
    ///
    /// Fails with `DuplicateAttachment` if the device is already on a
    /// channel.
    pub fn connect(&mut self, channel: ChannelId, device: DeviceId) -> SimResult<()> {
        if !self.channels.contains_key(&channel) {
            return Err(SimError::ChannelNotFound(channel));
        }
        let dev = self
            .devices
            .get_mut(&device)
            .ok_or(SimError::DeviceNotFound(device))?;
        if dev.channel.is_some() {
            return Err(SimError::DuplicateAttachment {
                device,
                what: "channel",
            });
        }
        dev.channel = Some(channel);
        self.channels
            .get_mut(&channel)
            .expect("checked above")
            .attached
            .push(device);
        Ok(())
    }

    /// Create a device, attach it to `node`, and connect it to
    /// `channel` in one step.
    pub fn install(
        &mut self,
        node: NodeId,
        channel: ChannelId,
        config: DeviceConfig,
    ) -> SimResult<DeviceId> {
        if !self.nodes.contains_key(&node) {
            return Err(SimError::NodeNotFound(node));
        }
        if !self.channels.contains_key(&channel) {
            return Err(SimError::ChannelNotFound(channel));
        }
        let device = self.add_device(config);
        self.attach(node, device)?;
        self.connect(channel, device)?;
        debug!("installed {} on {} via {}", device, node, channel);
        Ok(device)
    }

    /// Assign the next address from `pool` to a device.
    ///
    /// A device is addressed at most once; the pool's monotonic
    /// allocation keeps every address on a channel unique.
    pub fn assign(&mut self, device: DeviceId, pool: &mut AddressPool) -> SimResult<Ipv4Addr> {
        let dev = self
            .devices
            .get_mut(&device)
            .ok_or(SimError::DeviceNotFound(device))?;
        if dev.address.is_some() {
            return Err(SimError::DuplicateAttachment {
                device,
                what: "address",
            });
        }
        let addr = pool.allocate()?;
        dev.address = Some(addr);
        debug!("assigned {} to {}", addr, device);
        Ok(addr)
    }

    /// Register the receive callback for a device.
    pub fn set_sink(&mut self, device: DeviceId, sink: Box<dyn PacketSink>) -> SimResult<()> {
        if !self.devices.contains_key(&device) {
            return Err(SimError::DeviceNotFound(device));
        }
        self.sinks.insert(device, sink);
        Ok(())
    }

    // ── Inspection ────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// The address assigned to a device, if any.
    pub fn address_of(&self, device: DeviceId) -> Option<Ipv4Addr> {
        self.devices.get(&device)?.address
    }

    /// Downcast a device's sink for inspection.
    pub fn sink<T: PacketSink + 'static>(&self, device: DeviceId) -> Option<&T> {
        self.sinks.get(&device)?.as_any().downcast_ref::<T>()
    }

    /// Count of log entries with a `Delivered` verdict.
    pub fn delivered_count(&self) -> usize {
        self.log
            .iter()
            .filter(|e| matches!(e.verdict, DeliveryVerdict::Delivered { .. }))
            .count()
    }

    /// Count of log entries with a `Dropped` verdict.
    pub fn dropped_count(&self) -> usize {
        self.log
            .iter()
            .filter(|e| e.verdict == DeliveryVerdict::Dropped)
            .count()
    }

    // ── Packet delivery ───────────────────────────────────────────

    /// Put `packet` on `from`'s channel.
    ///
    /// Schedules one `Deliver` event per other attached device at
    /// `now + serialization_time + propagation_delay`. Point-to-point
    /// channels have exactly one peer; shared media fan out to all.
    pub fn transmit(
        &mut self,
        ctx: &mut SimulationContext,
        from: DeviceId,
        packet: &Packet,
    ) -> SimResult<()> {
        let dev = self
            .devices
            .get(&from)
            .ok_or(SimError::DeviceNotFound(from))?;
        if packet.len() > dev.config.mtu as usize {
            return Err(SimError::MtuExceeded {
                device: from,
                size: packet.len(),
                mtu: dev.config.mtu,
            });
        }
        let channel_id = dev.channel.ok_or(SimError::NotConnected(from))?;
        let tx_ticks = dev.config.data_rate.serialization_ticks(packet.len());

        let (delay_ticks, drop_probability, peers) = {
            let ch = self
                .channels
                .get(&channel_id)
                .ok_or(SimError::ChannelNotFound(channel_id))?;
            (
                ch.config.delay.ticks(),
                ch.config.drop_probability,
                ch.peers_of(from),
            )
        };

        for to in peers {
            let dropped = drop_probability > 0.0 && self.rng.next_f64() < drop_probability;
            if dropped {
                trace!("{} → {}: dropped by loss model", from, to);
                self.log.push(DeliveryEntry {
                    time: ctx.now(),
                    from,
                    to,
                    verdict: DeliveryVerdict::Dropped,
                });
                continue;
            }
            let id = ctx.schedule_after(
                tx_ticks + delay_ticks,
                EventKind::Deliver {
                    from,
                    to,
                    packet: packet.clone(),
                },
            );
            let arrival = ctx
                .now()
                .plus(tx_ticks + delay_ticks)
                .expect("VirtualTime overflow when scheduling");
            trace!("{} → {}: arriving {} ({})", from, to, arrival, id);
            self.log.push(DeliveryEntry {
                time: ctx.now(),
                from,
                to,
                verdict: DeliveryVerdict::Delivered { arrival },
            });
        }
        Ok(())
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for Topology {
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) {
        match &event.kind {
            EventKind::Transmit { from, packet } => {
                // Setup mistakes surface here when a transmit was
                // seeded on a misconfigured device.
                if let Err(e) = self.transmit(ctx, *from, packet) {
                    warn!("transmit from {} failed: {}", from, e);
                }
            }

            EventKind::Deliver { from, to, packet } => {
                if let Some(sink) = self.sinks.get_mut(to) {
                    sink.on_packet(ctx, *to, *from, packet);
                } else {
                    trace!("{}: delivery from {} with no sink", to, from);
                }
            }

            // System-level events — nothing to dispatch.
            EventKind::Noop | EventKind::Log(_) => {}
        }
    }
}
