//! JamNet device roles
//!
//! This module contains the two sides of the network:
//! - Gateway: admits joins, stores mail and answers every request
//! - End device: joins through the gateway and exchanges data only via it
//!
//! Both run the same single-threaded loop: pop one event, run it to
//! completion, repeat.

/// End device implementation
pub mod end_device;

/// Gateway relay implementation
pub mod gateway;

pub use end_device::EndDevice;
pub use gateway::Gateway;

use core::time::Duration;

use log::{debug, warn};

use crate::config::device::Role;
use crate::events::{Event, EventReceiver};
use crate::jamnet::packet::{App, DecodeError, PacketType, MAX_FRAME_SIZE};
use crate::jamnet::mailbox::StoreError;
use crate::jamnet::phy::{ChannelArbiter, RadioFault};
use crate::radio::traits::Radio;

/// Result of one processing cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<E> {
    /// Nothing to process
    Idle,
    /// Frame could not be decoded; dropped without reply
    Dropped(DecodeError),
    /// Packet type not meaningful here, or a reply nobody was waiting for
    Ignored(PacketType),
    /// Reception failed; logged and reception re-armed
    ReceiveFault(RadioFault<E>),
    /// Reply of this type was sent
    Replied(PacketType),
    /// Locally originated packet of this type was sent
    Transmitted(PacketType),
    /// Sending failed; the radio is listening again
    TransmitFailed {
        /// Packet that was being sent
        packet: PacketType,
        /// What went wrong
        fault: RadioFault<E>,
    },
    /// Awaited reply of this type was accepted
    Accepted(PacketType),
    /// Gateway stored a locally originated message
    Queued {
        /// Entries now waiting for the target
        depth: usize,
    },
    /// Gateway refused a locally originated message
    Rejected(StoreError),
}

impl<E> Outcome<E> {
    /// Whether this cycle keyed the transmitter
    pub fn transmitted(&self) -> bool {
        matches!(
            self,
            Outcome::Replied(_) | Outcome::Transmitted(_) | Outcome::TransmitFailed { .. }
        )
    }
}

/// Common interface of gateway and end device
pub trait DeviceRole<R: Radio> {
    /// Role of this device
    fn role(&self) -> Role;

    /// Process one received frame (type tag first)
    fn submit_received_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>>;

    /// Send (or, on a gateway, store) a user-triggered message
    ///
    /// A payload larger than the data slot is dropped with
    /// `Outcome::Dropped(DecodeError::PayloadOverflow { .. })`.
    fn user_transmit_request(
        &mut self,
        app: App,
        payload: &[u8],
    ) -> Result<Outcome<R::Error>, RadioFault<R::Error>>;

    /// Periodic housekeeping with the current monotonic time
    fn tick(&mut self, now: Duration);

    /// Message a button press sends
    fn button_message(&self) -> (App, &[u8]);

    /// Channel arbiter owning the radio
    fn arbiter_mut(&mut self) -> &mut ChannelArbiter<R>;

    /// Read the pending reception from the radio and process it
    fn receive_pending(&mut self) -> Result<Outcome<R::Error>, RadioFault<R::Error>> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let arbiter = self.arbiter_mut();
        let len = match arbiter.read_received(&mut buffer) {
            Ok(Some(len)) => len.min(buffer.len()),
            Ok(None) => {
                debug!("Packet-ready while not listening, ignored");
                return Ok(Outcome::Idle);
            }
            Err(fault) => {
                warn!("Reception failed: {}", fault);
                arbiter.rearm()?;
                return Ok(Outcome::ReceiveFault(fault));
            }
        };
        if let Some(rssi) = arbiter.rssi() {
            debug!("Received {} bytes, RSSI {} dBm", len, rssi);
        }

        let outcome = self.submit_received_bytes(&buffer[..len])?;
        if !outcome.transmitted() {
            self.arbiter_mut().rearm()?;
        }
        Ok(outcome)
    }

    /// Handle at most one event from `events`
    ///
    /// Returns `WouldBlock` when no event is waiting. After any transmission,
    /// packet-ready events queued meanwhile are discarded.
    fn poll<const N: usize>(
        &mut self,
        events: &mut EventReceiver<'_, N>,
    ) -> nb::Result<Outcome<R::Error>, RadioFault<R::Error>>
    where
        Self: Sized,
    {
        let event = events.next().ok_or(nb::Error::WouldBlock)?;
        let outcome = match event {
            Event::PacketReady => self.receive_pending()?,
            Event::ButtonPressed => {
                debug!("Button pressed");
                let mut payload = [0u8; MAX_FRAME_SIZE];
                let (app, message) = self.button_message();
                let len = message.len();
                payload[..len].copy_from_slice(message);
                self.user_transmit_request(app, &payload[..len])?
            }
        };
        if outcome.transmitted() {
            let dropped = events.invalidate_packet_ready();
            if dropped > 0 {
                debug!("Discarded {} stale packet-ready events", dropped);
            }
        }
        Ok(outcome)
    }
}
