//! Cross-module scenarios: topology + kernel + sinks together.

use std::net::Ipv4Addr;

use crate::addr::AddressPool;
use crate::config::{ChannelConfig, DataRate, Delay, DeviceConfig};
use crate::event::EventKind;
use crate::packet::Packet;
use crate::simulation::Simulation;
use crate::time::VirtualTime;
use crate::topo::{CaptureSink, DeviceId, EchoSink, Topology};

fn rate(s: &str) -> DataRate {
    s.parse().unwrap()
}

/// Build the shape of the original example: a 4-device shared segment
/// (3 hosts + 1 relay) and a point-to-point link from the relay to a
/// final node, both 5 Mbps / 2 ms, with the p2p side addressed from
/// 172.30.1.0/24.
fn relay_topology() -> (Topology, Vec<DeviceId>, DeviceId, DeviceId) {
    let mut topo = Topology::new();

    let hosts = topo.add_nodes(3);
    let relay = topo.add_node();
    let server = topo.add_node();

    let lan = topo.add_channel(ChannelConfig::new(Delay::from_millis(2)));
    let lan_devs: Vec<DeviceId> = hosts
        .iter()
        .chain(std::iter::once(&relay))
        .map(|n| {
            topo.install(*n, lan, DeviceConfig::new(rate("5Mbps")))
                .unwrap()
        })
        .collect();

    let p2p = topo.add_channel(ChannelConfig::new(Delay::from_millis(2)));
    let relay_p2p = topo
        .install(relay, p2p, DeviceConfig::new(rate("5Mbps")))
        .unwrap();
    let server_p2p = topo
        .install(server, p2p, DeviceConfig::new(rate("5Mbps")))
        .unwrap();

    let mut pool = AddressPool::new(
        Ipv4Addr::new(172, 30, 1, 0),
        Ipv4Addr::new(255, 255, 255, 0),
    )
    .unwrap();
    topo.assign(relay_p2p, &mut pool).unwrap();
    topo.assign(server_p2p, &mut pool).unwrap();

    (topo, lan_devs, relay_p2p, server_p2p)
}

#[test]
fn test_relay_topology_addressing() {
    let (topo, lan_devs, relay_p2p, server_p2p) = relay_topology();

    assert_eq!(topo.node_count(), 5);
    assert_eq!(topo.device_count(), 6);
    assert_eq!(topo.channel_count(), 2);

    // Only the p2p endpoints are addressed, in installation order.
    assert_eq!(
        topo.address_of(relay_p2p),
        Some(Ipv4Addr::new(172, 30, 1, 1))
    );
    assert_eq!(
        topo.address_of(server_p2p),
        Some(Ipv4Addr::new(172, 30, 1, 2))
    );
    for d in &lan_devs {
        assert_eq!(topo.address_of(*d), None);
    }
}

#[test]
fn test_echo_round_trip_over_p2p() {
    let (mut topo, _, relay_p2p, server_p2p) = relay_topology();
    topo.set_sink(relay_p2p, Box::new(CaptureSink::new())).unwrap();
    topo.set_sink(server_p2p, Box::new(EchoSink::new())).unwrap();

    let mut sim = Simulation::new();
    sim.schedule(
        VirtualTime::ZERO,
        EventKind::Transmit {
            from: relay_p2p,
            packet: Packet::Fill(1024),
        },
    ).unwrap();
    sim.run(&mut topo);

    // One leg: 1.6384 ms serialization + 2 ms propagation.
    let leg = 1_638_400 + 2_000_000;
    let echo = topo.sink::<EchoSink>(server_p2p).unwrap();
    assert_eq!(echo.echo_count, 1);

    let capture = topo.sink::<CaptureSink>(relay_p2p).unwrap();
    assert_eq!(capture.received.len(), 1);
    assert_eq!(capture.received[0].0, VirtualTime::new(2 * leg));
    assert_eq!(capture.received[0].2, Packet::Fill(1024));
}

#[test]
fn test_periodic_traffic_with_stop_time() {
    let (mut topo, _, relay_p2p, server_p2p) = relay_topology();
    topo.set_sink(server_p2p, Box::new(CaptureSink::new())).unwrap();

    let mut sim = Simulation::new();
    // One packet per simulated second from t=10s, stop at 20s.
    for i in 0..100u64 {
        sim.schedule(
            VirtualTime::new((10 + i) * 1_000_000_000),
            EventKind::Transmit {
                from: relay_p2p,
                packet: Packet::Fill(1024),
            },
        ).unwrap();
    }
    sim.set_stop_time(VirtualTime::new(20_000_000_000));
    sim.run(&mut topo);

    // Sends at 10..=19s arrive before; the send at 20s fires but its
    // delivery lands past the stop time.
    let capture = topo.sink::<CaptureSink>(server_p2p).unwrap();
    assert_eq!(capture.received.len(), 10);
    assert!(!sim.is_finished());
}

#[test]
fn test_lan_broadcast_reaches_all_segment_devices() {
    let (mut topo, lan_devs, _, _) = relay_topology();
    for d in &lan_devs[1..] {
        topo.set_sink(*d, Box::new(CaptureSink::new())).unwrap();
    }

    let mut sim = Simulation::new();
    sim.schedule(
        VirtualTime::ZERO,
        EventKind::Transmit {
            from: lan_devs[0],
            packet: Packet::Text("arp".into()),
        },
    ).unwrap();
    sim.run(&mut topo);

    for d in &lan_devs[1..] {
        let capture = topo.sink::<CaptureSink>(*d).unwrap();
        assert_eq!(capture.received.len(), 1, "device {} missed broadcast", d);
    }
    // Delivery log has one entry per destination.
    assert_eq!(topo.delivered_count(), 3);
}

#[test]
fn test_whole_run_is_deterministic() {
    fn run() -> Vec<String> {
        let (mut topo, lan_devs, relay_p2p, server_p2p) = relay_topology();
        topo.set_sink(server_p2p, Box::new(EchoSink::new())).unwrap();
        topo.set_sink(relay_p2p, Box::new(CaptureSink::new())).unwrap();

        let mut sim = Simulation::new();
        for i in 0..5u64 {
            sim.schedule(
                VirtualTime::from_millis(i * 7),
                EventKind::Transmit {
                    from: relay_p2p,
                    packet: Packet::Fill(512),
                },
            ).unwrap();
            sim.schedule(
                VirtualTime::from_millis(i * 7),
                EventKind::Transmit {
                    from: lan_devs[0],
                    packet: Packet::Fill(256),
                },
            ).unwrap();
        }
        sim.run(&mut topo);
        topo.log.iter().map(|e| e.to_string()).collect()
    }

    assert_eq!(run(), run());
}
