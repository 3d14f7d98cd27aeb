use core::fmt;
use core::time::Duration;

use heapless::FnvIndexMap;

use super::packet::Address;

/// Maximum number of addresses a gateway admits (power of two)
pub const MAX_DEVICES: usize = 16;

/// Join rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdmissionError {
    /// Address already registered or reserved
    Conflict,
    /// No room for another address
    RegistryFull,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::Conflict => f.write_str("address already in use"),
            AdmissionError::RegistryFull => f.write_str("registry full"),
        }
    }
}

/// Liveness marker for an admitted address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Monotonic time of admission
    pub joined_at: Duration,
}

/// Addresses admitted by this gateway
///
/// Entries are never removed: an address stays registered for the lifetime of
/// the gateway.
pub struct AddressRegistry {
    reserved: Address,
    entries: FnvIndexMap<Address, RegistryEntry, MAX_DEVICES>,
}

impl AddressRegistry {
    /// Create an empty registry. `reserved` (the gateway's own address) can
    /// never be joined.
    pub fn new(reserved: Address) -> Self {
        Self {
            reserved,
            entries: FnvIndexMap::new(),
        }
    }

    /// Admit `address` unless it already has an entry
    ///
    /// A repeated join is a conflict, not a no-op; what the device does about
    /// it is up to the device.
    pub fn try_join(&mut self, address: Address, now: Duration) -> Result<(), AdmissionError> {
        if address == self.reserved || self.entries.contains_key(&address) {
            return Err(AdmissionError::Conflict);
        }
        self.entries
            .insert(address, RegistryEntry { joined_at: now })
            .map_err(|_| AdmissionError::RegistryFull)?;
        Ok(())
    }

    /// Whether `address` has joined
    pub fn contains(&self, address: Address) -> bool {
        self.entries.contains_key(&address)
    }

    /// Entry for `address`
    pub fn get(&self, address: Address) -> Option<&RegistryEntry> {
        self.entries.get(&address)
    }

    /// Number of admitted addresses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has joined yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Admitted addresses in admission order
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.keys().copied()
    }
}
