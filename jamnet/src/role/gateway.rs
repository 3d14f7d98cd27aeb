use core::time::Duration;

use log::{debug, info, trace, warn};

use super::{DeviceRole, Outcome};
use crate::config::device::{DeviceConfig, Role};
use crate::jamnet::{
    mailbox::{MailboxEntry, MailboxStore, StoreError, Stored},
    packet::{
        payload_from_slice, Ack, Address, App, DataRequest, DataResponse, DataUplink,
        JoinRequest, JoinResponse, NetworkIdentity, Packet, Resp, Scan, ScanResponse,
    },
    phy::{ChannelArbiter, RadioFault},
    registry::AddressRegistry,
};
use crate::radio::Radio;

/// Relay state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Waiting for a packet
    Listening,
    /// Decoding and classifying a packet
    Processing,
    /// Touching the registry or mailboxes
    Relaying,
    /// Sending the reply
    Replying,
}

/// Gateway counters, reported on every housekeeping interval
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStats {
    /// Frames handed to the gateway
    pub received: u32,
    /// Frames dropped without reply
    pub dropped: u32,
    /// Replies sent
    pub replies: u32,
    /// Replies that failed to send
    pub transmit_faults: u32,
    /// Joins admitted
    pub joins_admitted: u32,
    /// Joins rejected
    pub joins_rejected: u32,
    /// Mailbox entries stored
    pub mail_stored: u32,
    /// Mailbox entries delivered
    pub mail_delivered: u32,
}

/// Gateway: store-and-forward relay for end devices
pub struct Gateway<R: Radio> {
    arbiter: ChannelArbiter<R>,
    config: DeviceConfig,
    registry: AddressRegistry,
    mailbox: MailboxStore,
    state: RelayState,
    stats: GatewayStats,
    now: Duration,
    last_report: Duration,
}

impl<R: Radio> Gateway<R> {
    /// Create a gateway. Call [`Self::start`] before feeding it packets.
    pub fn new(radio: R, config: DeviceConfig) -> Self {
        let arbiter = ChannelArbiter::new(
            radio,
            Role::Gateway,
            config.channel_plan,
            config.uplink_channel,
            config.downlink_channel,
        );
        Self {
            arbiter,
            registry: AddressRegistry::new(config.address),
            mailbox: MailboxStore::new(config.address, config.mailbox_capacity),
            config,
            state: RelayState::Listening,
            stats: GatewayStats::default(),
            now: Duration::from_secs(0),
            last_report: Duration::from_secs(0),
        }
    }

    /// Tune to the uplink channel and start listening
    pub fn start(&mut self) -> Result<(), RadioFault<R::Error>> {
        info!(
            "Starting gateway 0x{:04X}, listening on uplink channel {}",
            self.config.address, self.config.uplink_channel
        );
        self.arbiter.start()
    }

    /// This gateway's address
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Identity advertised in scan responses
    pub fn identity(&self) -> NetworkIdentity {
        self.config.identity()
    }

    /// Current relay state
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Counters
    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    /// Admitted addresses
    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    /// Stored mail
    pub fn mailbox(&self) -> &MailboxStore {
        &self.mailbox
    }

    /// Channel arbiter
    pub fn arbiter(&self) -> &ChannelArbiter<R> {
        &self.arbiter
    }

    fn set_state(&mut self, state: RelayState) {
        trace!("Relay {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn handle_scan(&mut self, scan: Scan) -> Packet {
        if scan.uplink_channel != self.config.uplink_channel {
            debug!(
                "Scan names channel {}, we listen on {}",
                scan.uplink_channel, self.config.uplink_channel
            );
        }
        Packet::ScanResponse(ScanResponse {
            identity: self.identity(),
        })
    }

    fn handle_join(&mut self, request: JoinRequest) -> Packet {
        self.set_state(RelayState::Relaying);
        let address = request.source_address;
        let resp = match self.registry.try_join(address, self.now) {
            Ok(()) => {
                info!("Admitted 0x{:04X}", address);
                self.stats.joins_admitted += 1;
                Resp::Success
            }
            Err(e) => {
                warn!("Join from 0x{:04X} rejected: {}", address, e);
                self.stats.joins_rejected += 1;
                Resp::Failure
            }
        };
        Packet::JoinResponse(JoinResponse {
            resp,
            target_address: self.config.address,
            source_address: address,
        })
    }

    fn handle_uplink(&mut self, uplink: DataUplink) -> Packet {
        self.set_state(RelayState::Relaying);
        let target = uplink.target_address;
        let source = uplink.source_address;
        let entry = MailboxEntry {
            target,
            source,
            app: uplink.app,
            payload: uplink.data,
        };
        let (resp, depth) = match self.mailbox.enqueue(&self.registry, entry) {
            Ok(Stored::Queued { depth }) => {
                self.stats.mail_stored += 1;
                (Resp::Success, depth)
            }
            Ok(Stored::Probe) => {
                debug!("Liveness probe from 0x{:04X}", source);
                (Resp::Success, self.mailbox.depth(source))
            }
            Err(e) => {
                warn!("Uplink 0x{:04X} -> 0x{:04X} rejected: {}", source, target, e);
                (Resp::Failure, self.mailbox.depth(target))
            }
        };
        Packet::Ack(Ack {
            resp,
            packet_queue: queue_depth(depth),
            target_address: target,
        })
    }

    fn handle_data_request(&mut self, request: DataRequest) -> Packet {
        self.set_state(RelayState::Relaying);
        let address = request.source_address;
        match self.mailbox.peek_and_pop(address) {
            Some(entry) => {
                self.stats.mail_delivered += 1;
                let remaining = self.mailbox.depth(address);
                debug!(
                    "Delivering mail 0x{:04X} -> 0x{:04X}, {} left",
                    entry.source, address, remaining
                );
                Packet::DataResponse(DataResponse {
                    resp: Resp::Success,
                    packet_queue: queue_depth(remaining),
                    app: entry.app,
                    data: entry.payload,
                })
            }
            None => {
                debug!("No mail for 0x{:04X}", address);
                Packet::DataResponse(DataResponse::empty())
            }
        }
    }

    fn reply(&mut self, packet: Packet) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        self.set_state(RelayState::Replying);
        let packet_type = packet.packet_type();
        let sent = self.arbiter.send(&packet);
        self.set_state(RelayState::Listening);
        match sent? {
            None => {
                self.stats.replies += 1;
                Ok(Outcome::Replied(packet_type))
            }
            Some(fault) => {
                self.stats.transmit_faults += 1;
                Ok(Outcome::TransmitFailed {
                    packet: packet_type,
                    fault,
                })
            }
        }
    }
}

impl<R: Radio> DeviceRole<R> for Gateway<R> {
    fn role(&self) -> Role {
        Role::Gateway
    }

    fn submit_received_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        self.set_state(RelayState::Processing);
        self.stats.received += 1;

        let packet = match Packet::from_bytes(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping malformed packet: {}", e);
                self.stats.dropped += 1;
                self.set_state(RelayState::Listening);
                return Ok(Outcome::Dropped(e));
            }
        };
        debug!("Received {:?}", packet);

        let reply = match packet {
            Packet::Scan(scan) => self.handle_scan(scan),
            Packet::JoinRequest(request) => self.handle_join(request),
            Packet::DataUplink(uplink) => self.handle_uplink(uplink),
            Packet::DataRequest(request) => self.handle_data_request(request),
            other => {
                let packet_type = other.packet_type();
                warn!("Unexpected {:?} at gateway, dropped", packet_type);
                self.stats.dropped += 1;
                self.set_state(RelayState::Listening);
                return Ok(Outcome::Ignored(packet_type));
            }
        };
        self.reply(reply)
    }

    fn user_transmit_request(
        &mut self,
        app: App,
        payload: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let payload = match payload_from_slice(payload) {
            Ok(payload) => payload,
            Err(e) => return Ok(Outcome::Dropped(e)),
        };
        let target = match self.config.default_target {
            Some(target) => target,
            None => {
                warn!("No default target configured, message not stored");
                return Ok(Outcome::Rejected(StoreError::UnknownDestination));
            }
        };
        let entry = MailboxEntry {
            target,
            source: self.config.address,
            app,
            payload,
        };
        Ok(match self.mailbox.enqueue(&self.registry, entry) {
            Ok(Stored::Queued { depth }) => {
                self.stats.mail_stored += 1;
                Outcome::Queued { depth }
            }
            Ok(Stored::Probe) => Outcome::Queued { depth: 0 },
            Err(e) => {
                warn!("Message for 0x{:04X} rejected: {}", target, e);
                Outcome::Rejected(e)
            }
        })
    }

    fn tick(&mut self, now: Duration) {
        self.now = now;
        if now.saturating_sub(self.last_report) < self.config.housekeeping_interval {
            return;
        }
        self.last_report = now;
        info!(
            "{} devices, {} queued, {} rx, {} replies, {} dropped, {} tx faults",
            self.registry.len(),
            self.mailbox.total(),
            self.stats.received,
            self.stats.replies,
            self.stats.dropped,
            self.stats.transmit_faults
        );
    }

    fn button_message(&self) -> (App, &[u8]) {
        (self.config.button_app, &self.config.button_payload)
    }

    fn arbiter_mut(&mut self) -> &mut ChannelArbiter<R> {
        &mut self.arbiter
    }
}

fn queue_depth(depth: usize) -> u8 {
    depth.min(u8::MAX as usize) as u8
}
