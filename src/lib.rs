//! # Wireline — Deterministic Network Simulation Kernel
//!
//! A discrete-event kernel for simulating packet networks with full
//! determinism. No async, no threads, no wall-clock time — just a
//! virtual clock, an ordered event queue, and a topology of nodes,
//! devices, and channels exchanging packets through it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │       Topology           │ ← nodes, devices, channels, sinks
//! │  ┌────────────────────┐  │
//! │  │    Simulation      │  │ ← execution loop + stop time
//! │  │  ┌──────────────┐  │  │
//! │  │  │  Scheduler   │  │  │ ← deterministic min-heap
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │   Events     │  │  │ ← Transmit / Deliver records
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │ VirtualTime  │  │  │ ← nanosecond-tick clock
//! │  │  └──────────────┘  │  │
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```
//!
//! Topologies come from three places: direct [`Topology`] calls, the
//! fluent [`builder::TopologyBuilder`], or a YAML
//! [`scenario::ScenarioSpec`]. All three end in the same place — an
//! event queue whose replay is bit-identical for identical inputs.

pub mod addr;
pub mod builder;
pub mod config;
pub mod error;
pub mod event;
pub mod packet;
pub mod scenario;
pub mod scheduler;
pub mod simulation;
pub mod time;
pub mod topo;

// Re-exports for convenience.
pub use addr::AddressPool;
pub use builder::TopologyBuilder;
pub use config::{ChannelConfig, DataRate, Delay, DeviceConfig};
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventIdGen, EventKind};
pub use packet::Packet;
pub use scenario::{BuiltTopology, ScenarioSpec};
pub use scheduler::Scheduler;
pub use simulation::{EventHandler, Simulation, SimulationContext};
pub use time::VirtualTime;
pub use topo::{
    CaptureSink, ChannelId, DeviceId, EchoSink, NodeId, PacketSink, Topology,
};
