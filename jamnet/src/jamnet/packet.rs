//! JamNet wire codec
//!
//! Every frame is a one-byte packet type tag followed by a fixed-layout
//! payload. Multi-byte integers are little-endian. Variable content (the
//! network name and application data) lives in fixed-capacity slots; for data
//! packets `packet_length` is the authoritative count of valid bytes.

use core::fmt;

use heapless::Vec;

use crate::config::device::ConfigError;

/// Device address, self-assigned by end devices
pub type Address = u16;

/// Capacity of the application data slot in bytes
pub const MAX_PAYLOAD_SIZE: usize = 240;

/// Largest frame the radio will carry
pub const MAX_FRAME_SIZE: usize = 255;

/// Size of the network name slot in bytes
pub const NETWORK_NAME_SIZE: usize = 16;

const DATA_UPLINK_HEADER_SIZE: usize = 6;
const DATA_RESPONSE_HEADER_SIZE: usize = 4;

const _: () = assert!(
    1 + DATA_UPLINK_HEADER_SIZE + MAX_PAYLOAD_SIZE <= MAX_FRAME_SIZE,
    "largest data uplink must fit in a frame"
);
const _: () = assert!(
    1 + DATA_RESPONSE_HEADER_SIZE + MAX_PAYLOAD_SIZE <= MAX_FRAME_SIZE,
    "largest data response must fit in a frame"
);

/// Application data carried by data packets
pub type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

/// Encoded frame, type tag included
pub type Frame = Vec<u8, MAX_FRAME_SIZE>;

/// Decoding failures. None of these are fatal; the frame is simply dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Fewer bytes than the layout requires
    TruncatedPacket {
        /// Bytes required by the layout
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },
    /// Declared `packet_length` exceeds the data slot capacity
    PayloadOverflow {
        /// Length declared on the wire
        declared: usize,
        /// Slot capacity
        capacity: usize,
    },
    /// Type tag is not a JamNet packet type
    UnknownType(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedPacket { expected, actual } => {
                write!(f, "truncated packet: need {} bytes, got {}", expected, actual)
            }
            DecodeError::PayloadOverflow { declared, capacity } => {
                write!(f, "payload of {} bytes exceeds slot of {}", declared, capacity)
            }
            DecodeError::UnknownType(tag) => write!(f, "unknown packet type 0x{:02X}", tag),
        }
    }
}

/// Packet type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// Probe for a network on a channel
    Scan = 0x01,
    /// Network details advertised by a gateway
    ScanResponse = 0x02,
    /// Request to join with a self-assigned address
    JoinRequest = 0x03,
    /// Join outcome
    JoinResponse = 0x04,
    /// Data to be stored for another device
    DataUplink = 0x05,
    /// Store outcome with queue depth
    Ack = 0x06,
    /// Request for stored data
    DataRequest = 0x07,
    /// Stored data, or none
    DataResponse = 0x08,
}

impl PacketType {
    /// Size of the fixed part of the layout, excluding the type tag and any
    /// application data
    pub fn expected_size(self) -> usize {
        match self {
            PacketType::Scan => 1,
            PacketType::ScanResponse => 2 + NETWORK_NAME_SIZE,
            PacketType::JoinRequest => 2,
            PacketType::JoinResponse => 5,
            PacketType::DataUplink => DATA_UPLINK_HEADER_SIZE,
            PacketType::Ack => 4,
            PacketType::DataRequest => 2,
            PacketType::DataResponse => DATA_RESPONSE_HEADER_SIZE,
        }
    }

    /// Whether this type is a reply sent by a gateway
    pub fn is_reply(self) -> bool {
        matches!(
            self,
            PacketType::ScanResponse
                | PacketType::JoinResponse
                | PacketType::Ack
                | PacketType::DataResponse
        )
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(PacketType::Scan),
            0x02 => Ok(PacketType::ScanResponse),
            0x03 => Ok(PacketType::JoinRequest),
            0x04 => Ok(PacketType::JoinResponse),
            0x05 => Ok(PacketType::DataUplink),
            0x06 => Ok(PacketType::Ack),
            0x07 => Ok(PacketType::DataRequest),
            0x08 => Ok(PacketType::DataResponse),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

/// Response code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resp {
    /// Request failed
    Failure,
    /// Request succeeded
    Success,
}

impl Resp {
    /// Whether the response reports success
    pub fn is_success(self) -> bool {
        self == Resp::Success
    }
}

impl From<u8> for Resp {
    fn from(byte: u8) -> Self {
        if byte == 1 {
            Resp::Success
        } else {
            Resp::Failure
        }
    }
}

impl From<Resp> for u8 {
    fn from(resp: Resp) -> Self {
        match resp {
            Resp::Success => 1,
            Resp::Failure => 0,
        }
    }
}

impl From<bool> for Resp {
    fn from(ok: bool) -> Self {
        if ok {
            Resp::Success
        } else {
            Resp::Failure
        }
    }
}

/// Application identifier carried with data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum App {
    /// Button press notification
    Button,
    /// Hello-world text
    HelloWorld,
    /// Application not known to this crate
    Other(u8),
}

impl From<u8> for App {
    fn from(byte: u8) -> Self {
        match byte {
            0 => App::Button,
            1 => App::HelloWorld,
            other => App::Other(other),
        }
    }
}

impl From<App> for u8 {
    fn from(app: App) -> Self {
        match app {
            App::Button => 0,
            App::HelloWorld => 1,
            App::Other(other) => other,
        }
    }
}

/// Fixed 16-byte network name slot
///
/// Copied verbatim off the wire; the printable part ends at the first NUL.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NetworkName([u8; NETWORK_NAME_SIZE]);

impl NetworkName {
    /// Create a name from printable ASCII of at most 16 bytes
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let bytes = name.as_bytes();
        if bytes.len() > NETWORK_NAME_SIZE
            || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
        {
            return Err(ConfigError::InvalidNetworkName);
        }
        let mut slot = [0u8; NETWORK_NAME_SIZE];
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(slot))
    }

    /// Wrap a raw slot without validation
    pub fn from_raw(slot: [u8; NETWORK_NAME_SIZE]) -> Self {
        Self(slot)
    }

    /// Raw slot contents
    pub fn as_bytes(&self) -> &[u8; NETWORK_NAME_SIZE] {
        &self.0
    }

    /// Name up to the first NUL, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(NETWORK_NAME_SIZE);
        core::str::from_utf8(&self.0[..end]).ok()
    }
}

impl fmt::Debug for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(name) => write!(f, "NetworkName({:?})", name),
            None => write!(f, "NetworkName({:02X?})", self.0),
        }
    }
}

/// What a gateway advertises in a scan response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    /// Channel end devices transmit on
    pub uplink_channel: u8,
    /// Channel the gateway transmits on
    pub downlink_channel: u8,
    /// Network name
    pub name: NetworkName,
}

/// SCAN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    /// Channel being scanned
    pub uplink_channel: u8,
}

/// SCAN_RESPONSE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResponse {
    /// Advertised network
    pub identity: NetworkIdentity,
}

/// JOIN_REQUEST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequest {
    /// Address the device wants to use
    pub source_address: Address,
}

/// JOIN_RESPONSE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResponse {
    /// Join outcome
    pub resp: Resp,
    /// Gateway address
    pub target_address: Address,
    /// Requested address
    pub source_address: Address,
}

/// DATA_UPLINK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUplink {
    /// Recipient
    pub target_address: Address,
    /// Sender
    pub source_address: Address,
    /// Application
    pub app: App,
    /// Application data
    pub data: Payload,
}

impl DataUplink {
    /// Build an uplink, rejecting data larger than the slot
    pub fn new(
        target_address: Address,
        source_address: Address,
        app: App,
        data: &[u8],
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            target_address,
            source_address,
            app,
            data: payload_from_slice(data)?,
        })
    }

    /// Declared payload length
    pub fn packet_length(&self) -> u8 {
        self.data.len() as u8
    }
}

/// ACK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Store outcome
    pub resp: Resp,
    /// Entries now queued for `target_address`
    pub packet_queue: u8,
    /// Recipient of the acknowledged uplink
    pub target_address: Address,
}

/// DATA_REQUEST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {
    /// Address whose mailbox is polled
    pub source_address: Address,
}

/// DATA_RESPONSE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataResponse {
    /// Success when `data` holds a delivered entry
    pub resp: Resp,
    /// Entries still queued after this one
    pub packet_queue: u8,
    /// Application
    pub app: App,
    /// Application data
    pub data: Payload,
}

impl DataResponse {
    /// Response for an empty mailbox
    pub fn empty() -> Self {
        Self {
            resp: Resp::Failure,
            packet_queue: 0,
            app: App::Button,
            data: Payload::new(),
        }
    }

    /// Declared payload length
    pub fn packet_length(&self) -> u8 {
        self.data.len() as u8
    }
}

/// A decoded JamNet packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// SCAN
    Scan(Scan),
    /// SCAN_RESPONSE
    ScanResponse(ScanResponse),
    /// JOIN_REQUEST
    JoinRequest(JoinRequest),
    /// JOIN_RESPONSE
    JoinResponse(JoinResponse),
    /// DATA_UPLINK
    DataUplink(DataUplink),
    /// ACK
    Ack(Ack),
    /// DATA_REQUEST
    DataRequest(DataRequest),
    /// DATA_RESPONSE
    DataResponse(DataResponse),
}

impl Packet {
    /// Type tag of this packet
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Scan(_) => PacketType::Scan,
            Packet::ScanResponse(_) => PacketType::ScanResponse,
            Packet::JoinRequest(_) => PacketType::JoinRequest,
            Packet::JoinResponse(_) => PacketType::JoinResponse,
            Packet::DataUplink(_) => PacketType::DataUplink,
            Packet::Ack(_) => PacketType::Ack,
            Packet::DataRequest(_) => PacketType::DataRequest,
            Packet::DataResponse(_) => PacketType::DataResponse,
        }
    }

    /// Decode a whole frame: type tag followed by the payload
    pub fn from_bytes(frame: &[u8]) -> Result<Self, DecodeError> {
        match frame.split_first() {
            Some((tag, rest)) => decode(*tag, rest),
            None => Err(DecodeError::TruncatedPacket {
                expected: 1,
                actual: 0,
            }),
        }
    }

    /// Encode into a frame, type tag first
    pub fn encode(&self) -> Frame {
        let mut w = Writer::new(self.packet_type());
        match self {
            Packet::Scan(p) => {
                w.u8(p.uplink_channel);
            }
            Packet::ScanResponse(p) => {
                w.u8(p.identity.uplink_channel);
                w.u8(p.identity.downlink_channel);
                w.bytes(p.identity.name.as_bytes());
            }
            Packet::JoinRequest(p) => {
                w.u16(p.source_address);
            }
            Packet::JoinResponse(p) => {
                w.u8(p.resp.into());
                w.u16(p.target_address);
                w.u16(p.source_address);
            }
            Packet::DataUplink(p) => {
                w.u8(p.packet_length());
                w.u16(p.target_address);
                w.u16(p.source_address);
                w.u8(p.app.into());
                w.bytes(&p.data);
            }
            Packet::Ack(p) => {
                w.u8(p.resp.into());
                w.u8(p.packet_queue);
                w.u16(p.target_address);
            }
            Packet::DataRequest(p) => {
                w.u16(p.source_address);
            }
            Packet::DataResponse(p) => {
                w.u8(p.resp.into());
                w.u8(p.packet_queue);
                w.u8(p.packet_length());
                w.u8(p.app.into());
                w.bytes(&p.data);
            }
        }
        w.frame
    }
}

/// Decode the payload that followed type tag `tag`
///
/// The fixed part of the layout is length-checked before any field is read.
pub fn decode(tag: u8, bytes: &[u8]) -> Result<Packet, DecodeError> {
    let packet_type = PacketType::try_from(tag)?;
    let expected = packet_type.expected_size();
    if bytes.len() < expected {
        return Err(DecodeError::TruncatedPacket {
            expected,
            actual: bytes.len(),
        });
    }

    let mut r = Reader::new(bytes);
    let packet = match packet_type {
        PacketType::Scan => Packet::Scan(Scan {
            uplink_channel: r.u8()?,
        }),
        PacketType::ScanResponse => {
            let uplink_channel = r.u8()?;
            let downlink_channel = r.u8()?;
            let mut slot = [0u8; NETWORK_NAME_SIZE];
            slot.copy_from_slice(r.take(NETWORK_NAME_SIZE)?);
            Packet::ScanResponse(ScanResponse {
                identity: NetworkIdentity {
                    uplink_channel,
                    downlink_channel,
                    name: NetworkName::from_raw(slot),
                },
            })
        }
        PacketType::JoinRequest => Packet::JoinRequest(JoinRequest {
            source_address: r.u16()?,
        }),
        PacketType::JoinResponse => Packet::JoinResponse(JoinResponse {
            resp: Resp::from(r.u8()?),
            target_address: r.u16()?,
            source_address: r.u16()?,
        }),
        PacketType::DataUplink => {
            let packet_length = r.u8()?;
            let target_address = r.u16()?;
            let source_address = r.u16()?;
            let app = App::from(r.u8()?);
            let data = r.payload(packet_length)?;
            Packet::DataUplink(DataUplink {
                target_address,
                source_address,
                app,
                data,
            })
        }
        PacketType::Ack => Packet::Ack(Ack {
            resp: Resp::from(r.u8()?),
            packet_queue: r.u8()?,
            target_address: r.u16()?,
        }),
        PacketType::DataRequest => Packet::DataRequest(DataRequest {
            source_address: r.u16()?,
        }),
        PacketType::DataResponse => {
            let resp = Resp::from(r.u8()?);
            let packet_queue = r.u8()?;
            let packet_length = r.u8()?;
            let app = App::from(r.u8()?);
            let data = r.payload(packet_length)?;
            Packet::DataResponse(DataResponse {
                resp,
                packet_queue,
                app,
                data,
            })
        }
    };
    Ok(packet)
}

/// Encode a packet into a frame
pub fn encode(packet: &Packet) -> Frame {
    packet.encode()
}

pub(crate) fn payload_from_slice(data: &[u8]) -> Result<Payload, DecodeError> {
    Payload::from_slice(data).map_err(|_| DecodeError::PayloadOverflow {
        declared: data.len(),
        capacity: MAX_PAYLOAD_SIZE,
    })
}

/// Bounds-checked cursor over a received payload
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + n;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::TruncatedPacket {
                expected: end,
                actual: self.bytes.len(),
            })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let raw = self.take(2)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn payload(&mut self, packet_length: u8) -> Result<Payload, DecodeError> {
        let declared = packet_length as usize;
        if declared > MAX_PAYLOAD_SIZE {
            return Err(DecodeError::PayloadOverflow {
                declared,
                capacity: MAX_PAYLOAD_SIZE,
            });
        }
        payload_from_slice(self.take(declared)?)
    }
}

/// Frame builder; every layout fits `MAX_FRAME_SIZE` (checked at compile time
/// above), so pushes cannot fail.
struct Writer {
    frame: Frame,
}

impl Writer {
    fn new(packet_type: PacketType) -> Self {
        let mut w = Self { frame: Frame::new() };
        w.u8(packet_type as u8);
        w
    }

    fn u8(&mut self, value: u8) {
        let _ = self.frame.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    fn bytes(&mut self, bytes: &[u8]) {
        let _ = self.frame.extend_from_slice(bytes);
    }
}
