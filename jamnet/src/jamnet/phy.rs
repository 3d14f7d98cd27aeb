//! Channel arbiter: the half-duplex tuning discipline
//!
//! The radio is either listening on the device's receive channel or
//! transmitting on its transmit channel, never both. A gateway listens on the
//! uplink and transmits on the downlink; an end device does the reverse.
//! Every transmit attempt must be followed by [`ChannelArbiter::resume_listen`],
//! on the error paths too, so the radio is never left parked on the transmit
//! channel.

use core::fmt;

use log::{error, trace};

use super::packet::Packet;
use super::region::ChannelPlan;
use crate::config::device::Role;
use crate::radio::{Radio, ReceiveError};

/// Radio fault surfaced by the arbiter
#[derive(Debug, Clone, PartialEq)]
pub enum RadioFault<E> {
    /// Channel outside the plan (`cause` is `None`) or the driver refused the frequency
    TuneFailure {
        /// Channel that was requested
        channel: u8,
        /// Driver error, if the driver was reached
        cause: Option<E>,
    },
    /// Driver failed or timed out while transmitting
    TransmitFailure(E),
    /// Reception window elapsed without a packet
    ReceiveTimeout,
    /// Received packet failed its CRC
    CrcMismatch,
    /// Driver failed to arm or read reception
    ReceiveFailure(E),
}

impl<E: fmt::Debug> fmt::Display for RadioFault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioFault::TuneFailure {
                channel,
                cause: None,
            } => write!(f, "channel {} is outside the channel plan", channel),
            RadioFault::TuneFailure {
                channel,
                cause: Some(e),
            } => write!(f, "tuning to channel {} failed: {:?}", channel, e),
            RadioFault::TransmitFailure(e) => write!(f, "transmit failed: {:?}", e),
            RadioFault::ReceiveTimeout => f.write_str("receive timeout"),
            RadioFault::CrcMismatch => f.write_str("CRC mismatch"),
            RadioFault::ReceiveFailure(e) => write!(f, "receive failed: {:?}", e),
        }
    }
}

impl<E> From<ReceiveError<E>> for RadioFault<E> {
    fn from(error: ReceiveError<E>) -> Self {
        match error {
            ReceiveError::Timeout => RadioFault::ReceiveTimeout,
            ReceiveError::CrcMismatch => RadioFault::CrcMismatch,
            ReceiveError::Driver(e) => RadioFault::ReceiveFailure(e),
        }
    }
}

/// Whether the radio is held for reception or transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Armed for reception on the receive channel
    Listening,
    /// Tuned (or tuning) for transmission
    Transmitting,
}

/// Which of the network's two channels the radio is tuned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tuning {
    /// End device to gateway channel
    Uplink,
    /// Gateway to end device channel
    Downlink,
}

/// Owner of the radio; enforces listen/transmit exclusivity
pub struct ChannelArbiter<R: Radio> {
    radio: R,
    role: Role,
    plan: ChannelPlan,
    uplink_channel: u8,
    downlink_channel: u8,
    mode: Mode,
    tuning: Option<Tuning>,
}

impl<R: Radio> ChannelArbiter<R> {
    /// Create an arbiter. The radio is not touched until [`Self::start`].
    pub fn new(
        radio: R,
        role: Role,
        plan: ChannelPlan,
        uplink_channel: u8,
        downlink_channel: u8,
    ) -> Self {
        Self {
            radio,
            role,
            plan,
            uplink_channel,
            downlink_channel,
            mode: Mode::Listening,
            tuning: None,
        }
    }

    /// Enter the initial state: listening on the receive channel
    pub fn start(&mut self) -> Result<(), RadioFault<R::Error>> {
        self.resume_listen()
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Channel the radio is tuned to, `None` before the first successful tune
    pub fn tuning(&self) -> Option<Tuning> {
        self.tuning
    }

    /// Role the channel swap is based on
    pub fn role(&self) -> Role {
        self.role
    }

    /// Channel plan in use
    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }

    /// Channel this device receives on
    pub fn receive_tuning(&self) -> Tuning {
        match self.role {
            Role::Gateway => Tuning::Uplink,
            Role::EndDevice => Tuning::Downlink,
        }
    }

    /// Channel this device transmits on
    pub fn transmit_tuning(&self) -> Tuning {
        match self.role {
            Role::Gateway => Tuning::Downlink,
            Role::EndDevice => Tuning::Uplink,
        }
    }

    /// Channel index for `tuning`
    pub fn channel(&self, tuning: Tuning) -> u8 {
        match tuning {
            Tuning::Uplink => self.uplink_channel,
            Tuning::Downlink => self.downlink_channel,
        }
    }

    /// Shared access to the driver
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Exclusive access to the driver
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Retune to the transmit channel. Any reception in progress is abandoned.
    pub fn prepare_transmit(&mut self) -> Result<(), RadioFault<R::Error>> {
        // Leave listening first so a half-received packet is never read back.
        self.mode = Mode::Transmitting;
        self.tune(self.transmit_tuning())
    }

    /// Hand an encoded frame to the driver
    pub fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioFault<R::Error>> {
        self.radio.transmit(frame).map_err(RadioFault::TransmitFailure)
    }

    /// Retune to the receive channel and re-arm reception
    pub fn resume_listen(&mut self) -> Result<(), RadioFault<R::Error>> {
        self.tune(self.receive_tuning())?;
        self.mode = Mode::Listening;
        self.rearm()
    }

    /// Re-arm reception after a packet has been read
    pub fn rearm(&mut self) -> Result<(), RadioFault<R::Error>> {
        self.radio.start_receive().map_err(|e| {
            error!("Starting reception failed: {:?}", e);
            RadioFault::ReceiveFailure(e)
        })
    }

    /// Read the pending reception into `buffer`
    ///
    /// Returns `Ok(None)` when the arbiter is not listening: whatever the
    /// driver holds was abandoned by a transmit.
    pub fn read_received(
        &mut self,
        buffer: &mut [u8],
    ) -> Result<Option<usize>, RadioFault<R::Error>> {
        if self.mode != Mode::Listening {
            return Ok(None);
        }
        let len = self.radio.read_received(buffer)?;
        Ok(Some(len))
    }

    /// RSSI of the last reception, if the driver can report it
    pub fn rssi(&mut self) -> Option<i16> {
        self.radio.get_rssi().ok()
    }

    /// Run one complete transmit cycle for `packet`:
    /// `prepare_transmit`, encode, transmit, `resume_listen`.
    ///
    /// `Ok(None)` means the packet went out, `Ok(Some(fault))` means the
    /// attempt failed but the radio is listening again. `Err` means the radio
    /// could not be returned to the receive channel.
    pub fn send(
        &mut self,
        packet: &Packet,
    ) -> Result<Option<RadioFault<R::Error>>, RadioFault<R::Error>> {
        let attempt = self.prepare_transmit().and_then(|_| {
            let frame = packet.encode();
            self.transmit(&frame)
        });
        if let Err(fault) = &attempt {
            error!("Sending {:?} failed: {}", packet.packet_type(), fault);
        }
        self.resume_listen()?;
        Ok(attempt.err())
    }

    fn tune(&mut self, tuning: Tuning) -> Result<(), RadioFault<R::Error>> {
        let channel = self.channel(tuning);
        let freq = self.plan.frequency(channel).ok_or(RadioFault::TuneFailure {
            channel,
            cause: None,
        })?;
        trace!("Switching to channel {}, freq {} Hz", channel, freq);
        self.radio
            .set_frequency(freq)
            .map_err(|e| RadioFault::TuneFailure {
                channel,
                cause: Some(e),
            })?;
        self.tuning = Some(tuning);
        Ok(())
    }
}
