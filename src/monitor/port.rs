//! Port & power monitor
//!
//! Debounces the per-port 5V sense bitmask. A new mask is accepted only
//! after it has been read unchanged for the configured number of
//! consecutive samples; glitches shorter than that are discarded.

use crate::driver::error::Result;
use crate::hal::regs::{Reg, RegisterBus};

/// Accepted 5V transition on the active port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerChange {
    /// 5V removed
    Lost,
    /// 5V applied
    Restored,
}

/// Per-port 5V debouncer
#[derive(Debug, Clone)]
pub struct PortMonitor {
    debounce: u8,
    port_mask: u32,
    accepted: u32,
    candidate: u32,
    count: u8,
}

impl PortMonitor {
    /// Create a monitor for `port_count` ports; nothing is considered
    /// powered until the first mask is accepted.
    pub const fn new(debounce: u8, port_count: u8) -> Self {
        let port_mask = if port_count >= 32 {
            u32::MAX
        } else {
            (1u32 << port_count) - 1
        };
        Self {
            debounce,
            port_mask,
            accepted: 0,
            candidate: 0,
            count: 0,
        }
    }

    /// Sample the sense lines once.
    ///
    /// Returns a [`PowerChange`] only when a debounced mask flips the bit of
    /// `active_port`. Changes on other ports are tracked silently.
    pub fn sample<B: RegisterBus>(
        &mut self,
        bus: &mut B,
        active_port: u8,
    ) -> Result<Option<PowerChange>> {
        let raw = bus.read(Reg::PowerPresent)? & self.port_mask;

        if raw == self.accepted {
            self.candidate = raw;
            self.count = 0;
            return Ok(None);
        }

        if raw == self.candidate {
            self.count = self.count.saturating_add(1);
        } else {
            self.candidate = raw;
            self.count = 1;
        }

        if self.count < self.debounce {
            return Ok(None);
        }

        let previous = self.accepted;
        self.accepted = raw;
        self.count = 0;

        let bit = 1u32 << active_port;
        Ok(match (previous & bit != 0, raw & bit != 0) {
            (true, false) => Some(PowerChange::Lost),
            (false, true) => Some(PowerChange::Restored),
            _ => None,
        })
    }

    /// Debounced 5V state of a port
    #[inline]
    pub fn is_present(&self, port: u8) -> bool {
        self.accepted & (1u32 << port) != 0
    }

    /// Debounced 5V mask
    #[inline]
    pub fn mask(&self) -> u32 {
        self.accepted
    }
}
