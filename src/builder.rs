//! Fluent topology construction.
//!
//! [`TopologyBuilder`] assembles the same [`ScenarioSpec`] the YAML
//! loader produces, but from chained method calls, so small experiments
//! read top to bottom:
//!
//! ```
//! use wireline::builder::TopologyBuilder;
//!
//! let mut built = TopologyBuilder::new()
//!     .group("host", 2)
//!     .p2p("wire", "host.0", "host.1", "5Mbps", "2ms")
//!     .subnet("172.30.1.0", "255.255.255.0")
//!     .capture("wire.1")
//!     .traffic("wire.0", 1024, "1s")
//!     .build()
//!     .unwrap();
//! built.run();
//! ```
//!
//! Parse errors in rate, delay, or address strings are held and
//! reported by [`build`](TopologyBuilder::build), so the chain itself
//! never panics.

use std::net::Ipv4Addr;

use crate::error::{SimError, SimResult};
use crate::scenario::{
    BuiltTopology, GroupSpec, LinkSpec, ScenarioSpec, SinkKind, SinkSpec, SubnetSpec,
    TrafficSpec,
};
use crate::topo::PacketSink;

/// Builder over [`ScenarioSpec`] with deferred error reporting.
pub struct TopologyBuilder {
    spec: ScenarioSpec,
    /// Custom sinks, applied after the spec builds. Built-in kinds go
    /// through the spec's own sink list.
    custom_sinks: Vec<(String, Box<dyn PacketSink>)>,
    /// First error hit while chaining; surfaced by `build`.
    deferred: Option<SimError>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        TopologyBuilder {
            spec: ScenarioSpec {
                name: None,
                groups: Vec::new(),
                links: Vec::new(),
                sinks: Vec::new(),
                traffic: Vec::new(),
                stop: None,
                seed: None,
            },
            custom_sinks: Vec::new(),
            deferred: None,
        }
    }

    fn defer(&mut self, err: SimError) {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }

    fn parse<T: std::str::FromStr<Err = SimError>>(&mut self, s: &str) -> Option<T> {
        match s.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                self.defer(e);
                None
            }
        }
    }

    // ── Nodes and links ───────────────────────────────────────────

    /// Declare `count` nodes addressable as `"name.0"` .. `"name.count-1"`.
    pub fn group(mut self, name: &str, count: u32) -> Self {
        self.spec.groups.push(GroupSpec {
            name: name.to_string(),
            count,
        });
        self
    }

    /// A point-to-point link between two node endpoints. Its devices
    /// become `"name.0"` and `"name.1"`.
    pub fn p2p(self, name: &str, a: &str, b: &str, data_rate: &str, delay: &str) -> Self {
        self.shared(name, &[a, b], data_rate, delay)
    }

    /// A shared segment connecting every listed endpoint.
    pub fn shared(
        mut self,
        name: &str,
        endpoints: &[&str],
        data_rate: &str,
        delay: &str,
    ) -> Self {
        let data_rate = match self.parse(data_rate) {
            Some(r) => r,
            // The placeholder never runs: build() reports the parse
            // error before the spec is used.
            None => "1bps".parse().expect("literal rate"),
        };
        let delay = match self.parse(delay) {
            Some(d) => d,
            None => crate::config::Delay::ZERO,
        };
        self.spec.links.push(LinkSpec {
            name: Some(name.to_string()),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            data_rate,
            delay,
            drop_probability: 0.0,
            mtu: None,
            subnet: None,
        });
        self
    }

    fn last_link(&mut self, what: &str) -> SimResult<&mut LinkSpec> {
        self.spec.links.last_mut().ok_or_else(|| {
            SimError::InvalidTopology(format!("{} set before any link", what))
        })
    }

    /// Address the most recent link's devices from a subnet.
    pub fn subnet(mut self, base: &str, mask: &str) -> Self {
        let parsed = base
            .parse::<Ipv4Addr>()
            .and_then(|b| mask.parse::<Ipv4Addr>().map(|m| (b, m)))
            .map_err(|_| {
                SimError::InvalidConfig(format!("bad subnet '{}'/'{}'", base, mask))
            });
        match parsed {
            Ok((base, mask)) => match self.last_link("subnet") {
                Ok(link) => link.subnet = Some(SubnetSpec { base, mask }),
                Err(e) => self.defer(e),
            },
            Err(e) => self.defer(e),
        }
        self
    }

    /// Make the most recent link lossy.
    pub fn drop_probability(mut self, p: f64) -> Self {
        match self.last_link("drop probability") {
            Ok(link) => link.drop_probability = p,
            Err(e) => self.defer(e),
        }
        self
    }

    /// Override the MTU on the most recent link's devices.
    pub fn mtu(mut self, mtu: u16) -> Self {
        match self.last_link("mtu") {
            Ok(link) => link.mtu = Some(mtu),
            Err(e) => self.defer(e),
        }
        self
    }

    // ── Sinks ─────────────────────────────────────────────────────

    /// Record every delivery at a device.
    pub fn capture(mut self, endpoint: &str) -> Self {
        self.spec.sinks.push(SinkSpec {
            endpoint: endpoint.to_string(),
            kind: SinkKind::Capture,
        });
        self
    }

    /// Echo every delivery at a device back onto its channel.
    pub fn echo(mut self, endpoint: &str) -> Self {
        self.spec.sinks.push(SinkSpec {
            endpoint: endpoint.to_string(),
            kind: SinkKind::Echo,
        });
        self
    }

    /// Install a custom sink on a device.
    pub fn sink(mut self, endpoint: &str, sink: Box<dyn PacketSink>) -> Self {
        self.custom_sinks.push((endpoint.to_string(), sink));
        self
    }

    // ── Traffic and run control ───────────────────────────────────

    /// One transmission of `size` bytes from a device at time `at`.
    pub fn traffic(self, from: &str, size: u32, at: &str) -> Self {
        self.periodic_traffic(from, size, at, None, 1)
    }

    /// `count` transmissions, `interval` apart, starting at `at`.
    pub fn periodic_traffic(
        mut self,
        from: &str,
        size: u32,
        at: &str,
        interval: Option<&str>,
        count: u32,
    ) -> Self {
        let at = match self.parse(at) {
            Some(d) => d,
            None => crate::config::Delay::ZERO,
        };
        let interval = match interval {
            Some(s) => self.parse(s),
            None => None,
        };
        self.spec.traffic.push(TrafficSpec {
            from: from.to_string(),
            size,
            at,
            interval,
            count,
        });
        self
    }

    /// Halt the run at this time; later events never dispatch.
    pub fn stop(mut self, at: &str) -> Self {
        self.spec.stop = self.parse(at);
        self
    }

    /// Seed the channel loss model.
    pub fn seed(mut self, seed: u64) -> Self {
        self.spec.seed = Some(seed);
        self
    }

    /// Validate everything and produce a runnable topology.
    pub fn build(self) -> SimResult<BuiltTopology> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        let mut built = self.spec.build()?;
        for (endpoint, sink) in self.custom_sinks {
            let dev = built.device(&endpoint).ok_or_else(|| {
                SimError::InvalidTopology(format!(
                    "sink references unknown device '{}'",
                    endpoint
                ))
            })?;
            built.topo.set_sink(dev, sink)?;
        }
        Ok(built)
    }

    /// Build and run to completion. Returns the finished topology and
    /// the number of events processed.
    pub fn run(self) -> SimResult<(BuiltTopology, u64)> {
        let mut built = self.build()?;
        let processed = built.run();
        Ok((built, processed))
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::VirtualTime;
    use crate::topo::CaptureSink;

    #[test]
    fn test_fluent_p2p_round_trip() {
        let (built, _) = TopologyBuilder::new()
            .group("host", 2)
            .p2p("wire", "host.0", "host.1", "5Mbps", "2ms")
            .subnet("172.30.1.0", "255.255.255.0")
            .echo("wire.1")
            .capture("wire.0")
            .traffic("wire.0", 1024, "0s")
            .run()
            .unwrap();

        let dev = built.device("wire.0").unwrap();
        let capture = built.topo.sink::<CaptureSink>(dev).unwrap();
        assert_eq!(capture.received.len(), 1);
        // Two legs of 1.6384 ms serialization + 2 ms propagation.
        assert_eq!(
            capture.received[0].0,
            VirtualTime::new(2 * (1_638_400 + 2_000_000))
        );
    }

    #[test]
    fn test_bad_rate_surfaces_at_build() {
        let err = TopologyBuilder::new()
            .group("host", 2)
            .p2p("wire", "host.0", "host.1", "fast", "2ms")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_subnet_before_link_fails() {
        let err = TopologyBuilder::new()
            .group("host", 2)
            .subnet("172.30.1.0", "255.255.255.0")
            .p2p("wire", "host.0", "host.1", "5Mbps", "2ms")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::InvalidTopology(_)));
    }

    #[test]
    fn test_first_error_wins() {
        let err = TopologyBuilder::new()
            .group("host", 2)
            .p2p("wire", "host.0", "host.1", "fast", "slow")
            .stop("never")
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("fast"), "was: {}", err);
    }

    #[test]
    fn test_custom_sink_installed() {
        let (built, _) = TopologyBuilder::new()
            .group("host", 2)
            .p2p("wire", "host.0", "host.1", "5Mbps", "2ms")
            .sink("wire.1", Box::new(CaptureSink::new()))
            .traffic("wire.0", 64, "0s")
            .run()
            .unwrap();

        let dev = built.device("wire.1").unwrap();
        let capture = built.topo.sink::<CaptureSink>(dev).unwrap();
        assert_eq!(capture.received.len(), 1);
    }

    #[test]
    fn test_periodic_traffic_with_stop() {
        let (built, _) = TopologyBuilder::new()
            .group("host", 2)
            .p2p("wire", "host.0", "host.1", "5Mbps", "2ms")
            .capture("wire.1")
            .periodic_traffic("wire.0", 1024, "10s", Some("1s"), 100)
            .stop("20s")
            .run()
            .unwrap();

        let dev = built.device("wire.1").unwrap();
        let capture = built.topo.sink::<CaptureSink>(dev).unwrap();
        assert_eq!(capture.received.len(), 10);
    }
}
