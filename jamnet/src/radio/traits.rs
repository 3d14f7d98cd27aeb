/// Reasons a reception can fail once the driver has signalled packet-ready
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReceiveError<E> {
    /// Reception window elapsed without a complete packet
    Timeout,
    /// Packet arrived but its CRC did not match
    CrcMismatch,
    /// Any other driver error
    Driver(E),
}

/// Half-duplex radio transceiver driver
///
/// The driver is owned by the channel arbiter; nothing else in the crate talks
/// to it directly.
pub trait Radio {
    /// Error type for radio operations
    type Error: core::fmt::Debug;

    /// Set the radio frequency in Hz
    fn set_frequency(&mut self, freq: u32) -> Result<(), Self::Error>;

    /// Transmit data, blocking until the driver reports completion or timeout
    fn transmit(&mut self, buffer: &[u8]) -> Result<(), Self::Error>;

    /// Arm continuous reception on the current frequency
    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Read the packet that triggered the last packet-ready signal
    /// Returns the number of bytes written into `buffer`
    fn read_received(&mut self, buffer: &mut [u8]) -> Result<usize, ReceiveError<Self::Error>>;

    /// Get the last packet's RSSI (Received Signal Strength Indicator)
    fn get_rssi(&mut self) -> Result<i16, Self::Error>;
}
