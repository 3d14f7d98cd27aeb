use core::fmt;
use core::time::Duration;

use crate::jamnet::mailbox::{DEFAULT_MAILBOX_CAPACITY, MAX_MAILBOX_DEPTH};
use crate::jamnet::packet::{
    payload_from_slice, Address, App, NetworkIdentity, NetworkName, Payload,
};
use crate::jamnet::region::ChannelPlan;

/// Default gateway address
pub const DEFAULT_GATEWAY_ADDRESS: Address = 0xCAFE;

/// Default uplink channel index
pub const DEFAULT_UPLINK_CHANNEL: u8 = 10;

/// Default downlink channel index
pub const DEFAULT_DOWNLINK_CHANNEL: u8 = 11;

/// Default interval between housekeeping reports
pub const DEFAULT_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(15);

/// Default time an end device waits for a reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// Network role of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Admits joins and relays mail; listens on uplink, transmits on downlink
    Gateway,
    /// Talks only to the gateway; listens on downlink, transmits on uplink
    EndDevice,
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Uplink and downlink must be different channels
    SameChannels,
    /// Channel index not covered by the channel plan
    ChannelOutOfRange(u8),
    /// Mailbox capacity must be between 1 and `MAX_MAILBOX_DEPTH`
    InvalidMailboxCapacity(usize),
    /// End device configured with the gateway's address
    ReservedAddress(Address),
    /// Network name too long or not printable
    InvalidNetworkName,
    /// Button payload larger than the data slot
    PayloadTooLarge(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SameChannels => f.write_str("uplink and downlink channels are equal"),
            ConfigError::ChannelOutOfRange(ch) => write!(f, "channel {} outside the plan", ch),
            ConfigError::InvalidMailboxCapacity(n) => write!(
                f,
                "mailbox capacity {} not in 1..={}",
                n, MAX_MAILBOX_DEPTH
            ),
            ConfigError::ReservedAddress(a) => write!(f, "address 0x{:04X} is reserved", a),
            ConfigError::InvalidNetworkName => f.write_str("invalid network name"),
            ConfigError::PayloadTooLarge(n) => write!(f, "payload of {} bytes too large", n),
        }
    }
}

/// Device configuration for both roles
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Gateway or end device
    pub role: Role,
    /// This device's address
    pub address: Address,
    /// Address of the gateway (equal to `address` for a gateway)
    pub gateway_address: Address,
    /// Uplink channel index
    pub uplink_channel: u8,
    /// Downlink channel index
    pub downlink_channel: u8,
    /// Network name advertised by a gateway
    pub network_name: NetworkName,
    /// Per-address mailbox capacity (gateway only)
    pub mailbox_capacity: usize,
    /// Channel to frequency mapping
    pub channel_plan: ChannelPlan,
    /// Recipient of user-triggered transmissions
    pub default_target: Option<Address>,
    /// Application tag sent on a button press
    pub button_app: App,
    /// Payload sent on a button press
    pub button_payload: Payload,
    /// Interval between housekeeping reports
    pub housekeeping_interval: Duration,
    /// How long an end device waits for a reply (end device only)
    pub reply_timeout: Duration,
}

impl DeviceConfig {
    /// Create a new gateway configuration
    pub fn new_gateway(address: Address, network_name: NetworkName) -> Self {
        Self {
            role: Role::Gateway,
            address,
            gateway_address: address,
            network_name,
            ..Self::base()
        }
    }

    /// Create a new end device configuration
    pub fn new_end_device(address: Address) -> Self {
        Self {
            role: Role::EndDevice,
            address,
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            role: Role::EndDevice,
            address: 0,
            gateway_address: DEFAULT_GATEWAY_ADDRESS,
            uplink_channel: DEFAULT_UPLINK_CHANNEL,
            downlink_channel: DEFAULT_DOWNLINK_CHANNEL,
            network_name: NetworkName::from_raw([0; 16]),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            channel_plan: ChannelPlan::default(),
            default_target: None,
            button_app: App::Button,
            button_payload: Payload::new(),
            housekeeping_interval: DEFAULT_HOUSEKEEPING_INTERVAL,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Use a different channel pair
    pub fn with_channels(mut self, uplink_channel: u8, downlink_channel: u8) -> Self {
        self.uplink_channel = uplink_channel;
        self.downlink_channel = downlink_channel;
        self
    }

    /// Use a different channel plan
    pub fn with_channel_plan(mut self, plan: ChannelPlan) -> Self {
        self.channel_plan = plan;
        self
    }

    /// Set the per-address mailbox capacity
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Set the gateway an end device talks to
    pub fn with_gateway_address(mut self, gateway_address: Address) -> Self {
        self.gateway_address = gateway_address;
        self
    }

    /// Set the recipient of user-triggered transmissions
    pub fn with_default_target(mut self, target: Address) -> Self {
        self.default_target = Some(target);
        self
    }

    /// Set what a button press sends
    pub fn with_button_message(mut self, app: App, payload: &[u8]) -> Result<Self, ConfigError> {
        self.button_app = app;
        self.button_payload =
            payload_from_slice(payload).map_err(|_| ConfigError::PayloadTooLarge(payload.len()))?;
        Ok(self)
    }

    /// Set the housekeeping interval
    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    /// Set the end-device reply timeout
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Identity a gateway advertises in scan responses
    pub fn identity(&self) -> NetworkIdentity {
        NetworkIdentity {
            uplink_channel: self.uplink_channel,
            downlink_channel: self.downlink_channel,
            name: self.network_name,
        }
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uplink_channel == self.downlink_channel {
            return Err(ConfigError::SameChannels);
        }
        for channel in [self.uplink_channel, self.downlink_channel] {
            if self.channel_plan.frequency(channel).is_none() {
                return Err(ConfigError::ChannelOutOfRange(channel));
            }
        }
        if self.mailbox_capacity == 0 || self.mailbox_capacity > MAX_MAILBOX_DEPTH {
            return Err(ConfigError::InvalidMailboxCapacity(self.mailbox_capacity));
        }
        if self.role == Role::EndDevice && self.address == self.gateway_address {
            return Err(ConfigError::ReservedAddress(self.address));
        }
        Ok(())
    }
}
