//! Device and network configuration
//!
//! This module contains the types used to configure a JamNet node:
//! - Role selection (gateway or end device)
//! - Addresses and the uplink/downlink channel pair
//! - Gateway mailbox limits and housekeeping timing

/// Device configuration
pub mod device;

pub use device::{ConfigError, DeviceConfig, Role};
