use core::fmt;

use heapless::{Deque, FnvIndexMap};
use log::debug;

use super::packet::{Address, App, Payload};
use super::registry::{AddressRegistry, MAX_DEVICES};

/// Compile-time ceiling for the per-address mailbox capacity
pub const MAX_MAILBOX_DEPTH: usize = 8;

/// Default per-address mailbox capacity
pub const DEFAULT_MAILBOX_CAPACITY: usize = 4;

/// Store rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Target has not joined
    UnknownDestination,
    /// Target's mailbox is at capacity; the entry was dropped
    MailboxFull,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownDestination => f.write_str("unknown destination"),
            StoreError::MailboxFull => f.write_str("mailbox full"),
        }
    }
}

/// A payload waiting for its recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    /// Recipient
    pub target: Address,
    /// Sender
    pub source: Address,
    /// Application tag
    pub app: App,
    /// Payload bytes
    pub payload: Payload,
}

/// Successful store outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    /// Entry queued; `depth` is the recipient's queue length including it
    Queued {
        /// Entries now waiting for the target
        depth: usize,
    },
    /// Addressed to the gateway itself: acknowledged, nothing stored
    Probe,
}

type Mailbox = Deque<MailboxEntry, MAX_MAILBOX_DEPTH>;

/// Per-address FIFO mailboxes held by the gateway
pub struct MailboxStore {
    gateway_address: Address,
    capacity: usize,
    mailboxes: FnvIndexMap<Address, Mailbox, MAX_DEVICES>,
}

impl MailboxStore {
    /// Create an empty store. `capacity` is clamped to `1..=MAX_MAILBOX_DEPTH`.
    pub fn new(gateway_address: Address, capacity: usize) -> Self {
        Self {
            gateway_address,
            capacity: capacity.clamp(1, MAX_MAILBOX_DEPTH),
            mailboxes: FnvIndexMap::new(),
        }
    }

    /// Per-address capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue `entry` for `entry.target`
    ///
    /// Entries for the gateway's own address are probes: always accepted,
    /// never stored.
    pub fn enqueue(
        &mut self,
        registry: &AddressRegistry,
        entry: MailboxEntry,
    ) -> Result<Stored, StoreError> {
        let target = entry.target;
        if target == self.gateway_address {
            return Ok(Stored::Probe);
        }
        if !registry.contains(target) {
            return Err(StoreError::UnknownDestination);
        }

        if !self.mailboxes.contains_key(&target) {
            // Keys are a subset of the registry, which has the same bound.
            self.mailboxes
                .insert(target, Mailbox::new())
                .map_err(|_| StoreError::MailboxFull)?;
        }
        let mailbox = self
            .mailboxes
            .get_mut(&target)
            .ok_or(StoreError::UnknownDestination)?;
        if mailbox.len() >= self.capacity {
            return Err(StoreError::MailboxFull);
        }
        mailbox
            .push_back(entry)
            .map_err(|_| StoreError::MailboxFull)?;

        let depth = mailbox.len();
        debug!("Stored mail for 0x{:04X}, {} waiting", target, depth);
        Ok(Stored::Queued { depth })
    }

    /// Remove and return the oldest entry for `address`
    pub fn peek_and_pop(&mut self, address: Address) -> Option<MailboxEntry> {
        self.mailboxes.get_mut(&address)?.pop_front()
    }

    /// Entries currently waiting for `address`
    pub fn depth(&self, address: Address) -> usize {
        self.mailboxes.get(&address).map_or(0, |m| m.len())
    }

    /// Entries waiting across all mailboxes
    pub fn total(&self) -> usize {
        self.mailboxes.values().map(|m| m.len()).sum()
    }
}
