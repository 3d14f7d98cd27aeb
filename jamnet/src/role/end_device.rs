use core::time::Duration;

use heapless::Deque;
use log::{debug, info, warn};

use super::{DeviceRole, Outcome};
use crate::config::device::{DeviceConfig, Role};
use crate::jamnet::{
    packet::{
        payload_from_slice, Ack, Address, App, DataRequest, DataResponse, DataUplink,
        JoinRequest, JoinResponse, NetworkIdentity, Packet, PacketType, Payload, Scan,
    },
    phy::{ChannelArbiter, RadioFault},
};
use crate::radio::Radio;

/// Number of delivered messages an end device keeps until they are taken
pub const INBOX_CAPACITY: usize = 4;

/// A message fetched from the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    /// Application tag
    pub app: App,
    /// Payload bytes
    pub payload: Payload,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    reply: PacketType,
    deadline: Duration,
}

/// End device: talks to the network only through its gateway
pub struct EndDevice<R: Radio> {
    arbiter: ChannelArbiter<R>,
    config: DeviceConfig,
    gateway_address: Address,
    identity: Option<NetworkIdentity>,
    joined: bool,
    pending: Option<Pending>,
    last_ack: Option<Ack>,
    inbox: Deque<InboxMessage, INBOX_CAPACITY>,
    remaining: u8,
    now: Duration,
}

impl<R: Radio> EndDevice<R> {
    /// Create an end device. Call [`Self::start`] before sending anything.
    pub fn new(radio: R, config: DeviceConfig) -> Self {
        let arbiter = ChannelArbiter::new(
            radio,
            Role::EndDevice,
            config.channel_plan,
            config.uplink_channel,
            config.downlink_channel,
        );
        Self {
            arbiter,
            gateway_address: config.gateway_address,
            config,
            identity: None,
            joined: false,
            pending: None,
            last_ack: None,
            inbox: Deque::new(),
            remaining: 0,
            now: Duration::from_secs(0),
        }
    }

    /// Tune to the downlink channel and start listening
    pub fn start(&mut self) -> Result<(), RadioFault<R::Error>> {
        info!(
            "Starting end device 0x{:04X}, listening on downlink channel {}",
            self.config.address, self.config.downlink_channel
        );
        self.arbiter.start()
    }

    /// This device's address
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Gateway this device talks to
    pub fn gateway_address(&self) -> Address {
        self.gateway_address
    }

    /// Whether the gateway admitted this device
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Network found by the last scan
    pub fn identity(&self) -> Option<&NetworkIdentity> {
        self.identity.as_ref()
    }

    /// Reply type currently awaited
    pub fn awaiting(&self) -> Option<PacketType> {
        self.pending.map(|p| p.reply)
    }

    /// Most recent acknowledgment
    pub fn last_ack(&self) -> Option<&Ack> {
        self.last_ack.as_ref()
    }

    /// Entries the gateway reported still waiting after the last delivery
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// Messages delivered so far and not yet taken
    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// Take the oldest delivered message
    pub fn take_message(&mut self) -> Option<InboxMessage> {
        self.inbox.pop_front()
    }

    /// Channel arbiter
    pub fn arbiter(&self) -> &ChannelArbiter<R> {
        &self.arbiter
    }

    /// Look for a gateway on the configured uplink channel
    pub fn scan(&mut self) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let scan = Packet::Scan(Scan {
            uplink_channel: self.config.uplink_channel,
        });
        self.request(scan, PacketType::ScanResponse)
    }

    /// Ask the gateway to admit this device's address
    pub fn join(&mut self) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let join = Packet::JoinRequest(JoinRequest {
            source_address: self.config.address,
        });
        self.request(join, PacketType::JoinResponse)
    }

    /// Leave a message for `target` at the gateway
    pub fn send_data(
        &mut self,
        target: Address,
        app: App,
        payload: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let uplink = match DataUplink::new(target, self.config.address, app, payload) {
            Ok(uplink) => uplink,
            Err(e) => {
                warn!("Uplink to 0x{:04X} not sent: {}", target, e);
                return Ok(Outcome::Dropped(e));
            }
        };
        if !self.joined {
            debug!("Sending uplink before joining");
        }
        self.request(Packet::DataUplink(uplink), PacketType::Ack)
    }

    /// Fetch the oldest message waiting for this device
    pub fn request_data(&mut self) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let request = Packet::DataRequest(DataRequest {
            source_address: self.config.address,
        });
        self.request(request, PacketType::DataResponse)
    }

    fn request(
        &mut self,
        packet: Packet,
        reply: PacketType,
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        if let Some(pending) = self.pending {
            debug!("Abandoning wait for {:?}", pending.reply);
        }
        let packet_type = packet.packet_type();
        match self.arbiter.send(&packet)? {
            None => {
                self.pending = Some(Pending {
                    reply,
                    deadline: self.now + self.config.reply_timeout,
                });
                Ok(Outcome::Transmitted(packet_type))
            }
            Some(fault) => {
                self.pending = None;
                Ok(Outcome::TransmitFailed {
                    packet: packet_type,
                    fault,
                })
            }
        }
    }

    fn accept(&mut self, packet: Packet) {
        match packet {
            Packet::ScanResponse(response) => {
                let identity = response.identity;
                info!(
                    "Found network {:?} (uplink {}, downlink {})",
                    identity.name, identity.uplink_channel, identity.downlink_channel
                );
                self.identity = Some(identity);
            }
            Packet::JoinResponse(JoinResponse {
                resp,
                target_address,
                ..
            }) => {
                if resp.is_success() {
                    info!("Joined gateway 0x{:04X}", target_address);
                    self.joined = true;
                    self.gateway_address = target_address;
                } else {
                    warn!("Join refused by 0x{:04X}", target_address);
                }
            }
            Packet::Ack(ack) => {
                debug!(
                    "Ack {:?} for 0x{:04X}, {} queued",
                    ack.resp, ack.target_address, ack.packet_queue
                );
                self.last_ack = Some(ack);
            }
            Packet::DataResponse(DataResponse {
                resp,
                packet_queue,
                app,
                data,
            }) => {
                self.remaining = packet_queue;
                if !resp.is_success() {
                    debug!("No mail waiting");
                    return;
                }
                if self.inbox.is_full() {
                    warn!("Inbox full, oldest message dropped");
                    self.inbox.pop_front();
                }
                let _ = self.inbox.push_back(InboxMessage { app, payload: data });
                debug!("Mail received, {} more waiting", packet_queue);
            }
            _ => {}
        }
    }
}

impl<R: Radio> DeviceRole<R> for EndDevice<R> {
    fn role(&self) -> Role {
        Role::EndDevice
    }

    fn submit_received_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let packet = match Packet::from_bytes(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping malformed packet: {}", e);
                return Ok(Outcome::Dropped(e));
            }
        };
        let packet_type = packet.packet_type();

        if !packet_type.is_reply() {
            debug!("Ignoring {:?}, end devices only take replies", packet_type);
            return Ok(Outcome::Ignored(packet_type));
        }
        if self.awaiting() != Some(packet_type) {
            debug!("Ignoring unsolicited {:?}", packet_type);
            return Ok(Outcome::Ignored(packet_type));
        }
        if let Packet::JoinResponse(response) = &packet {
            if response.source_address != self.config.address {
                debug!(
                    "Ignoring join response for 0x{:04X}",
                    response.source_address
                );
                return Ok(Outcome::Ignored(packet_type));
            }
        }

        self.pending = None;
        self.accept(packet);
        Ok(Outcome::Accepted(packet_type))
    }

    fn user_transmit_request(
        &mut self,
        app: App,
        payload: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        if let Err(e) = payload_from_slice(payload) {
            return Ok(Outcome::Dropped(e));
        }
        let target = self.config.default_target.unwrap_or(self.gateway_address);
        self.send_data(target, app, payload)
    }

    fn tick(&mut self, now: Duration) {
        self.now = now;
        if let Some(pending) = self.pending {
            if now >= pending.deadline {
                warn!("No {:?} within {:?}", pending.reply, self.config.reply_timeout);
                self.pending = None;
            }
        }
    }

    fn button_message(&self) -> (App, &[u8]) {
        (self.config.button_app, &self.config.button_payload)
    }

    fn arbiter_mut(&mut self) -> &mut ChannelArbiter<R> {
        &mut self.arbiter
    }
}
