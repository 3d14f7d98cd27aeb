//! JamNet protocol core
//!
//! This module contains the protocol pieces shared by gateways and end devices:
//! - Wire codec for the eight packet types
//! - Channel plan and the half-duplex channel arbiter
//! - Gateway-side address registry and mailbox store

/// Per-address mailbox storage
pub mod mailbox;

/// Packet types and wire codec
pub mod packet;

/// Channel arbiter (PHY layer)
pub mod phy;

/// Channel-to-frequency plan
pub mod region;

/// Admitted address registry
pub mod registry;

pub use mailbox::{MailboxEntry, MailboxStore, StoreError, Stored};
pub use packet::{Address, App, DecodeError, Packet, PacketType, Payload, Resp};
pub use phy::{ChannelArbiter, RadioFault};
pub use region::ChannelPlan;
pub use registry::{AddressRegistry, AdmissionError};
