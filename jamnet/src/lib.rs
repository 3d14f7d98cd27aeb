//! JamNet: a minimal LoRa network with a store-and-forward gateway
//!
//! End devices never talk to each other directly. They scan for a gateway,
//! join it under a 16-bit address, leave messages for other addresses and
//! poll for messages left for them. The gateway keeps an address registry and
//! a bounded FIFO mailbox per address, and answers every request on a
//! separate downlink channel.
//!
//! # Features
//! - Compact little-endian wire codec for the eight packet types
//! - Half-duplex channel arbitration (never listen and transmit at once)
//! - Gateway relay and end-device roles behind one polling loop
//! - Interrupt-safe event queue; no heap allocation
//! - Hardware abstraction layer for radio drivers
//!
//! # Example
//! ```no_run
//! use jamnet::{
//!     config::device::DeviceConfig,
//!     device::JamNetDevice,
//!     events::{self, Event, EventQueue},
//!     jamnet::packet::NetworkName,
//! };
//!
//! # fn run<R: jamnet::radio::Radio>(radio: R) {
//! let name = NetworkName::new("jamnet").unwrap();
//! let config = DeviceConfig::new_gateway(0xCAFE, name);
//! let mut gateway = JamNetDevice::new(radio, config).unwrap();
//!
//! let mut queue: EventQueue<8> = EventQueue::new();
//! let (mut irq, mut events) = events::split(&mut queue);
//!
//! // In the radio's DIO interrupt:
//! irq.signal(Event::PacketReady);
//!
//! // In the main loop:
//! while let Ok(outcome) = gateway.poll(&mut events) {
//!     // inspect `outcome`
//! #   let _ = outcome;
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![no_std]

/// Device and network configuration
pub mod config;

/// High-level device interface
pub mod device;

/// Interrupt-to-loop event channel
pub mod events;

/// JamNet protocol implementation
pub mod jamnet;

/// Radio hardware abstraction layer
pub mod radio;

/// Gateway and end-device roles
pub mod role;

pub use device::{DeviceError, JamNetDevice};
pub use role::{DeviceRole, Outcome};
