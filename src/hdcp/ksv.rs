//! Key selection vectors and downstream topology

use crate::driver::error::Result;
use crate::internal::constants::{HDCP14_MAX_DEVICES, KSV_LEN};

/// Capacity of a [`KsvList`] (protocol device limit)
pub const KSV_LIST_CAPACITY: usize = HDCP14_MAX_DEVICES as usize;

/// HDCP1.4 key selection vector, least-significant byte first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ksv(pub [u8; KSV_LEN]);

impl Ksv {
    /// Bytes 0..=3 as a little-endian word (FIFO low register)
    #[inline]
    pub const fn low_word(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Byte 4 (FIFO high register)
    #[inline]
    pub const fn high_byte(&self) -> u8 {
        self.0[4]
    }
}

/// Fixed-capacity list of downstream KSVs
#[derive(Debug, Clone)]
pub struct KsvList {
    entries: [Ksv; KSV_LIST_CAPACITY],
    len: usize,
}

impl KsvList {
    /// Empty list
    pub const fn new() -> Self {
        Self {
            entries: [Ksv([0; KSV_LEN]); KSV_LIST_CAPACITY],
            len: 0,
        }
    }

    /// Append a KSV; returns `false` once the list is full
    pub fn push(&mut self, ksv: Ksv) -> bool {
        let Some(slot) = self.entries.get_mut(self.len) else {
            return false;
        };
        *slot = ksv;
        self.len += 1;
        true
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries in position order
    pub fn as_slice(&self) -> &[Ksv] {
        &self.entries[..self.len]
    }
}

impl Default for KsvList {
    fn default() -> Self {
        Self::new()
    }
}

/// Downstream topology as reported by the transmitter side
///
/// The numeric fields are raw; clamping to protocol maxima happens when the
/// list is written upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Topology {
    /// Downstream device count
    pub device_count: u16,
    /// Downstream cascade depth
    pub depth: u8,
    /// Downstream already reported MAX_DEVS_EXCEEDED
    pub max_devs_exceeded: bool,
    /// Downstream already reported MAX_CASCADE_EXCEEDED
    pub max_cascade_exceeded: bool,
}

/// Downstream (transmitter-side) collaborator of a repeater
pub trait Downstream {
    /// 5V present on the downstream connector
    fn power_present(&mut self) -> bool;

    /// Fill `ksvs` with the downstream KSV list and return the topology
    fn topology(&mut self, ksvs: &mut KsvList) -> Result<Topology>;
}
