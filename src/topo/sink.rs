//! `PacketSink` trait and built-in sinks.
//!
//! A sink is the receive callback of a device: when a `Deliver` event
//! fires, the topology hands the packet to the sink registered on the
//! destination device. Sinks may schedule follow-up events through the
//! context (e.g. echoing the packet back), but must route every side
//! effect through it and stay deterministic for equal inputs.

use crate::event::EventKind;
use crate::packet::Packet;
use crate::simulation::SimulationContext;
use crate::time::VirtualTime;

use super::id::DeviceId;

// ── PacketSink ────────────────────────────────────────────────────────

/// Receive callback for a device.
pub trait PacketSink {
    /// Called when `packet` arrives at `device`, sent by `from`.
    fn on_packet(
        &mut self,
        ctx: &mut SimulationContext,
        device: DeviceId,
        from: DeviceId,
        packet: &Packet,
    );

    /// Downcast support — lets tests inspect concrete sink state via
    /// `Topology::sink::<T>()`.
    fn as_any(&self) -> &dyn std::any::Any;
}

// ── CaptureSink ───────────────────────────────────────────────────────

/// A sink that records every delivery and does nothing else.
///
/// The workhorse of delivery assertions: tests check `received` for
/// counts, arrival times, and payloads.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    /// Deliveries in arrival order: `(time, sender device, packet)`.
    pub received: Vec<(VirtualTime, DeviceId, Packet)>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacketSink for CaptureSink {
    fn on_packet(
        &mut self,
        ctx: &mut SimulationContext,
        _device: DeviceId,
        from: DeviceId,
        packet: &Packet,
    ) {
        self.received.push((ctx.now(), from, packet.clone()));
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ── EchoSink ──────────────────────────────────────────────────────────

/// A sink that retransmits every received packet back onto its own
/// channel. The retransmission goes through the normal `Transmit`
/// path, so it pays serialization and propagation delay again.
#[derive(Debug, Clone, Default)]
pub struct EchoSink {
    /// Packets echoed so far.
    pub echo_count: u64,
}

impl EchoSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacketSink for EchoSink {
    fn on_packet(
        &mut self,
        ctx: &mut SimulationContext,
        device: DeviceId,
        _from: DeviceId,
        packet: &Packet,
    ) {
        self.echo_count += 1;
        ctx.schedule_after(
            0,
            EventKind::Transmit {
                from: device,
                packet: packet.clone(),
            },
        );
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
