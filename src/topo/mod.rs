//! Topology model: nodes, devices, channels, and packet dispatch.
//!
//! Entities live in arenas inside [`Topology`] and reference each other
//! by ID. All interaction between devices is mediated by the
//! deterministic scheduler — no shared mutable state exists outside the
//! `Topology` instance.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`], [`DeviceId`], [`ChannelId`] newtypes |
//! | [`node`] | [`Node`] record |
//! | [`device`] | [`Device`] record |
//! | [`channel`] | [`Channel`] record |
//! | [`sink`] | [`PacketSink`] trait, [`CaptureSink`], [`EchoSink`] |
//! | [`trace`] | [`DeliveryEntry`] delivery log |
//! | [`runtime`] | [`Topology`] arena + event dispatch |

pub mod channel;
pub mod device;
pub mod id;
pub mod node;
pub mod runtime;
pub mod sink;
pub mod trace;

pub use channel::Channel;
pub use device::Device;
pub use id::{ChannelId, DeviceId, NodeId};
pub use node::Node;
pub use runtime::{DeterministicRng, Topology};
pub use sink::{CaptureSink, EchoSink, PacketSink};
pub use trace::{DeliveryEntry, DeliveryVerdict};

#[cfg(test)]
mod tests;
