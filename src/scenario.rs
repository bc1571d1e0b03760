//! Declarative scenario descriptions.
//!
//! A [`ScenarioSpec`] is the structured form of a simulation setup:
//! node groups with counts, links between named endpoints, per-link
//! subnets, sinks, and seeded traffic. Specs deserialize from YAML, so
//! a whole experiment can live in a file:
//!
//! ```yaml
//! groups:
//!   - { name: lan, count: 4 }
//!   - { name: srv, count: 1 }
//! links:
//!   - name: uplink
//!     endpoints: ["lan.3", "srv.0"]
//!     data_rate: 5Mbps
//!     delay: 2ms
//!     subnet: { base: 172.30.1.0, mask: 255.255.255.0 }
//! ```
//!
//! Building is fail-fast: any inconsistency aborts with
//! `InvalidTopology` naming the offending group, link, or endpoint, and
//! no partial topology is returned.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use log::info;
use serde::Deserialize;

use crate::addr::AddressPool;
use crate::config::{ChannelConfig, DataRate, Delay, DeviceConfig};
use crate::error::{SimError, SimResult};
use crate::event::EventKind;
use crate::packet::Packet;
use crate::simulation::Simulation;
use crate::time::VirtualTime;
use crate::topo::{CaptureSink, DeviceId, EchoSink, NodeId, Topology};

// ── Spec types ────────────────────────────────────────────────────────

/// A batch of identical nodes. Node `i` of group `g` is addressed in
/// link endpoints as `"g.i"`.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub count: u32,
}

/// An IPv4 subnet to address a link's devices from.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SubnetSpec {
    pub base: Ipv4Addr,
    pub mask: Ipv4Addr,
}

/// One channel plus the devices it connects.
///
/// Two endpoints make a point-to-point link; more make a shared
/// segment. An endpoint `"group.idx"` may carry a `":slot"` suffix
/// pinning which device slot it must occupy on that node.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    /// Defaults to `link<index>`. Device `i` of this link is addressed
    /// elsewhere as `"<name>.<i>"`.
    #[serde(default)]
    pub name: Option<String>,
    pub endpoints: Vec<String>,
    pub data_rate: DataRate,
    pub delay: Delay,
    #[serde(default)]
    pub drop_probability: f64,
    #[serde(default)]
    pub mtu: Option<u16>,
    #[serde(default)]
    pub subnet: Option<SubnetSpec>,
}

/// Receive behavior installed on a link device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Capture,
    Echo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkSpec {
    /// Device key, e.g. `"uplink.1"`.
    pub endpoint: String,
    pub kind: SinkKind,
}

/// Seeded traffic: `count` transmissions from a device, `interval`
/// apart, starting at `at`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficSpec {
    /// Sending device key, e.g. `"uplink.0"`.
    pub from: String,
    /// Payload size in bytes.
    pub size: u32,
    pub at: Delay,
    #[serde(default)]
    pub interval: Option<Delay>,
    #[serde(default = "default_traffic_count")]
    pub count: u32,
}

fn default_traffic_count() -> u32 {
    1
}

/// A complete scenario description.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub groups: Vec<GroupSpec>,
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
    #[serde(default)]
    pub traffic: Vec<TrafficSpec>,
    /// Events past this time are never dispatched.
    #[serde(default)]
    pub stop: Option<Delay>,
    /// Seed for the channel loss model.
    #[serde(default)]
    pub seed: Option<u64>,
}

// ── Built result ──────────────────────────────────────────────────────

/// A scenario turned into runnable state, with name → ID maps so
/// callers can locate entities the way the spec named them.
pub struct BuiltTopology {
    pub sim: Simulation,
    pub topo: Topology,
    /// `"group.idx"` → node.
    pub nodes: BTreeMap<String, NodeId>,
    /// `"linkname.idx"` → device.
    pub devices: BTreeMap<String, DeviceId>,
}

impl BuiltTopology {
    /// Look up a device by its `"linkname.idx"` key.
    pub fn device(&self, key: &str) -> Option<DeviceId> {
        self.devices.get(key).copied()
    }

    /// Look up a node by its `"group.idx"` key.
    pub fn node(&self, key: &str) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    /// Run to completion (or the stop time). Returns events processed.
    pub fn run(&mut self) -> u64 {
        let Self { sim, topo, .. } = self;
        sim.run(topo)
    }
}

// ── Building ──────────────────────────────────────────────────────────

/// `"group.idx"` with an optional `":slot"` suffix.
fn parse_endpoint(raw: &str, link: &str) -> SimResult<(String, Option<u32>)> {
    let (node_key, slot) = match raw.split_once(':') {
        Some((n, s)) => {
            let slot = s.parse::<u32>().map_err(|_| {
                SimError::InvalidTopology(format!(
                    "link '{}': endpoint '{}' has a malformed slot",
                    link, raw
                ))
            })?;
            (n, Some(slot))
        }
        None => (raw, None),
    };
    Ok((node_key.to_string(), slot))
}

impl ScenarioSpec {
    /// Parse a spec from YAML text.
    pub fn from_yaml(text: &str) -> SimResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| SimError::InvalidConfig(format!("scenario parse error: {}", e)))
    }

    /// Build the scenario into a runnable simulation + topology.
    pub fn build(&self) -> SimResult<BuiltTopology> {
        let mut topo = Topology::with_seed(self.seed.unwrap_or(0));
        let mut sim = Simulation::new();
        let mut nodes: BTreeMap<String, NodeId> = BTreeMap::new();
        let mut devices: BTreeMap<String, DeviceId> = BTreeMap::new();

        // Groups, in declaration order.
        for group in &self.groups {
            if self.groups.iter().filter(|g| g.name == group.name).count() > 1 {
                return Err(SimError::InvalidTopology(format!(
                    "duplicate group '{}'",
                    group.name
                )));
            }
            for (i, id) in topo.add_nodes(group.count).into_iter().enumerate() {
                nodes.insert(format!("{}.{}", group.name, i), id);
            }
            info!("group '{}': {} nodes", group.name, group.count);
        }

        // Links, in declaration order; one allocate() per endpoint
        // device in endpoint order.
        for (li, link) in self.links.iter().enumerate() {
            let link_name = link
                .name
                .clone()
                .unwrap_or_else(|| format!("link{}", li));
            if link.endpoints.len() < 2 {
                return Err(SimError::InvalidTopology(format!(
                    "link '{}' needs at least two endpoints",
                    link_name
                )));
            }

            let channel_cfg = ChannelConfig::lossy(link.delay, link.drop_probability)
                .map_err(|e| {
                    SimError::InvalidTopology(format!("link '{}': {}", link_name, e))
                })?;
            let channel = topo.add_channel(channel_cfg);

            let mut device_cfg = DeviceConfig::new(link.data_rate);
            if let Some(mtu) = link.mtu {
                device_cfg = device_cfg.with_mtu(mtu);
            }

            let mut link_devices = Vec::with_capacity(link.endpoints.len());
            for (ei, raw) in link.endpoints.iter().enumerate() {
                let (node_key, slot) = parse_endpoint(raw, &link_name)?;
                let node = *nodes.get(&node_key).ok_or_else(|| {
                    SimError::InvalidTopology(format!(
                        "link '{}' references undeclared node '{}'",
                        link_name, node_key
                    ))
                })?;
                // The device this endpoint creates occupies the next
                // slot on its node; a pinned slot must match it.
                let next_slot = topo.node(node).expect("resolved above").devices.len() as u32;
                if let Some(slot) = slot {
                    if slot != next_slot {
                        return Err(SimError::InvalidTopology(format!(
                            "link '{}': device slot {} on '{}' is already claimed",
                            link_name, slot, node_key
                        )));
                    }
                }
                let dev = topo.install(node, channel, device_cfg)?;
                let key = format!("{}.{}", link_name, ei);
                if devices.insert(key.clone(), dev).is_some() {
                    return Err(SimError::InvalidTopology(format!(
                        "duplicate link name '{}'",
                        link_name
                    )));
                }
                link_devices.push(dev);
            }

            if let Some(subnet) = link.subnet {
                let mut pool =
                    AddressPool::new(subnet.base, subnet.mask).map_err(|e| {
                        SimError::InvalidTopology(format!("link '{}': {}", link_name, e))
                    })?;
                for dev in &link_devices {
                    topo.assign(*dev, &mut pool)?;
                }
            }
            info!(
                "link '{}': {} devices at {} / {}",
                link_name,
                link_devices.len(),
                link.data_rate,
                link.delay
            );
        }

        // Sinks.
        for sink in &self.sinks {
            let dev = *devices.get(&sink.endpoint).ok_or_else(|| {
                SimError::InvalidTopology(format!(
                    "sink references unknown device '{}'",
                    sink.endpoint
                ))
            })?;
            let boxed: Box<dyn crate::topo::PacketSink> = match sink.kind {
                SinkKind::Capture => Box::new(CaptureSink::new()),
                SinkKind::Echo => Box::new(EchoSink::new()),
            };
            topo.set_sink(dev, boxed)?;
        }

        // Traffic.
        for traffic in &self.traffic {
            let dev = *devices.get(&traffic.from).ok_or_else(|| {
                SimError::InvalidTopology(format!(
                    "traffic references unknown device '{}'",
                    traffic.from
                ))
            })?;
            if traffic.count > 1 && traffic.interval.is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "traffic from '{}' needs an interval when count > 1",
                    traffic.from
                )));
            }
            let interval = traffic.interval.unwrap_or(Delay::ZERO).ticks();
            let mut at = VirtualTime::new(traffic.at.ticks());
            for k in 0..traffic.count {
                sim.schedule(
                    at,
                    EventKind::Transmit {
                        from: dev,
                        packet: Packet::Fill(traffic.size),
                    },
                )?;
                if k + 1 < traffic.count {
                    at = at.plus(interval).ok_or_else(|| {
                        SimError::InvalidConfig(format!(
                            "traffic from '{}' overflows the clock",
                            traffic.from
                        ))
                    })?;
                }
            }
        }

        if let Some(stop) = self.stop {
            sim.set_stop_time(VirtualTime::new(stop.ticks()));
        }

        Ok(BuiltTopology {
            sim,
            topo,
            nodes,
            devices,
        })
    }
}
