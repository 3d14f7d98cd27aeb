//! High-level JamNet device interface
//!
//! [`JamNetDevice`] wraps either role behind one type so firmware can pick the
//! role from configuration at start-up.

use core::fmt;
use core::time::Duration;

use log::info;

use crate::{
    config::device::{ConfigError, DeviceConfig, Role},
    events::EventReceiver,
    jamnet::{packet::App, phy::RadioFault},
    radio::traits::Radio,
    role::{DeviceRole, EndDevice, Gateway, Outcome},
};

/// JamNet device error type
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError<E> {
    /// Configuration rejected by `DeviceConfig::validate`
    Config(ConfigError),
    /// Radio could not be brought up or returned to listening
    Radio(RadioFault<E>),
    /// Operation only exists for the other role
    WrongRole(Role),
}

impl<E> From<ConfigError> for DeviceError<E> {
    fn from(error: ConfigError) -> Self {
        DeviceError::Config(error)
    }
}

impl<E> From<RadioFault<E>> for DeviceError<E> {
    fn from(error: RadioFault<E>) -> Self {
        DeviceError::Radio(error)
    }
}

impl<E: fmt::Debug> fmt::Display for DeviceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Config(e) => write!(f, "invalid configuration: {}", e),
            DeviceError::Radio(e) => write!(f, "radio fault: {}", e),
            DeviceError::WrongRole(role) => write!(f, "not available on a {:?}", role),
        }
    }
}

/// JamNet device in either role
pub enum JamNetDevice<R: Radio> {
    /// Relay
    Gateway(Gateway<R>),
    /// Leaf node
    EndDevice(EndDevice<R>),
}

impl<R: Radio> JamNetDevice<R> {
    /// Create a device and put the radio in its initial listening state
    pub fn new(radio: R, config: DeviceConfig) -> Result<Self, DeviceError<R::Error>> {
        config.validate()?;
        info!("Bringing up {:?} 0x{:04X}", config.role, config.address);

        let mut device = match config.role {
            Role::Gateway => JamNetDevice::Gateway(Gateway::new(radio, config)),
            Role::EndDevice => JamNetDevice::EndDevice(EndDevice::new(radio, config)),
        };
        match &mut device {
            JamNetDevice::Gateway(gateway) => gateway.start()?,
            JamNetDevice::EndDevice(end_device) => end_device.start()?,
        }
        Ok(device)
    }

    /// Role of this device
    pub fn role(&self) -> Role {
        match self {
            JamNetDevice::Gateway(_) => Role::Gateway,
            JamNetDevice::EndDevice(_) => Role::EndDevice,
        }
    }

    /// Gateway state, if this is a gateway
    pub fn as_gateway(&self) -> Option<&Gateway<R>> {
        match self {
            JamNetDevice::Gateway(gateway) => Some(gateway),
            JamNetDevice::EndDevice(_) => None,
        }
    }

    /// Mutable gateway state, if this is a gateway
    pub fn as_gateway_mut(&mut self) -> Option<&mut Gateway<R>> {
        match self {
            JamNetDevice::Gateway(gateway) => Some(gateway),
            JamNetDevice::EndDevice(_) => None,
        }
    }

    /// End-device state, if this is an end device
    pub fn as_end_device(&self) -> Option<&EndDevice<R>> {
        match self {
            JamNetDevice::EndDevice(end_device) => Some(end_device),
            JamNetDevice::Gateway(_) => None,
        }
    }

    /// Mutable end-device state, if this is an end device
    pub fn as_end_device_mut(&mut self) -> Option<&mut EndDevice<R>> {
        match self {
            JamNetDevice::EndDevice(end_device) => Some(end_device),
            JamNetDevice::Gateway(_) => None,
        }
    }

    fn active(&mut self) -> &mut dyn DeviceRole<R> {
        match self {
            JamNetDevice::Gateway(gateway) => gateway,
            JamNetDevice::EndDevice(end_device) => end_device,
        }
    }

    fn end_device(&mut self) -> Result<&mut EndDevice<R>, DeviceError<R::Error>> {
        match self {
            JamNetDevice::EndDevice(end_device) => Ok(end_device),
            JamNetDevice::Gateway(_) => Err(DeviceError::WrongRole(Role::Gateway)),
        }
    }

    /// Process one received frame
    pub fn submit_received_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<Outcome<R::Error>, DeviceError<R::Error>> {
        Ok(self.active().submit_received_bytes(bytes)?)
    }

    /// Send (end device) or store (gateway) a user-triggered message
    pub fn user_transmit_request(
        &mut self,
        app: App,
        payload: &[u8],
    ) -> Result<Outcome<R::Error>, DeviceError<R::Error>> {
        Ok(self.active().user_transmit_request(app, payload)?)
    }

    /// Periodic housekeeping
    pub fn tick(&mut self, now: Duration) {
        self.active().tick(now)
    }

    /// Handle at most one event
    pub fn poll<const N: usize>(
        &mut self,
        events: &mut EventReceiver<'_, N>,
    ) -> nb::Result<Outcome<R::Error>, DeviceError<R::Error>> {
        let result = match self {
            JamNetDevice::Gateway(gateway) => gateway.poll(events),
            JamNetDevice::EndDevice(end_device) => end_device.poll(events),
        };
        result.map_err(|e| e.map(DeviceError::Radio))
    }

    /// Look for a gateway (end device only)
    pub fn scan(&mut self) -> Result<Outcome<R::Error>, DeviceError<R::Error>> {
        Ok(self.end_device()?.scan()?)
    }

    /// Join the network (end device only)
    pub fn join(&mut self) -> Result<Outcome<R::Error>, DeviceError<R::Error>> {
        Ok(self.end_device()?.join()?)
    }

    /// Fetch waiting mail (end device only)
    pub fn request_data(&mut self) -> Result<Outcome<R::Error>, DeviceError<R::Error>> {
        Ok(self.end_device()?.request_data()?)
    }
}
