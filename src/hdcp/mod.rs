//! HDCP
//!
//! HDCP1.4 state decoding, KSV and topology types, and the
//! [`RepeaterAuthenticator`] that forwards the downstream KSV list upstream.
//! HDCP2.2 is driven by an external authenticator; the core only records
//! that it started and shares the "authentication in progress" flag with it
//! (see [`crate::sync::AuthFlags`]).

mod ksv;
mod repeater;

pub use ksv::{Downstream, KSV_LIST_CAPACITY, Ksv, KsvList, Topology};
pub use repeater::{RepeaterAuthenticator, RepeaterOutcome, RepeaterState};

use crate::internal::constants::{
    KSV_BLOCK_COUNT, KSV_FIFO_POLL_US, KSV_FIFO_POLLS, KSV_POLL_MS, KSV_TIMEOUT_COUNT,
    VPRIME_POLL_US, VPRIME_POLLS,
};

/// HDCP generation observed on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HdcpVersion {
    /// No authentication seen
    #[default]
    None,
    /// HDCP1.4
    V14,
    /// HDCP2.2
    V22,
}

/// HDCP1.4 engine authentication status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hdcp14Status {
    /// Not authenticating
    Idle,
    /// AKSV written, Ri not yet computed
    AksvReceived,
    /// Session keys being derived
    Computing,
    /// Authenticated
    Authenticated,
}

impl Hdcp14Status {
    /// Decode the status field (values above 3 read as `Computing`)
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Hdcp14Status::Idle,
            1 => Hdcp14Status::AksvReceived,
            3 => Hdcp14Status::Authenticated,
            _ => Hdcp14Status::Computing,
        }
    }

    /// Neither idle nor finished
    #[inline]
    pub const fn is_intermediate(self) -> bool {
        matches!(self, Hdcp14Status::AksvReceived | Hdcp14Status::Computing)
    }
}

/// HDCP1.4 repeater timing and poll budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HdcpConfig {
    /// Waiting-for-KSV polls done in one call before yielding
    pub ksv_block_count: u32,
    /// Waiting-for-KSV polls before the list fetch times out
    pub ksv_timeout_count: u32,
    /// Sleep between blocking waiting-for-KSV polls (milliseconds)
    pub ksv_poll_ms: u32,
    /// FIFO status polls per entry
    pub fifo_polls: u32,
    /// Interval between FIFO status polls (microseconds)
    pub fifo_poll_us: u32,
    /// V' ready polls
    pub vprime_polls: u32,
    /// Interval between V' ready polls (microseconds)
    pub vprime_poll_us: u32,
}

impl HdcpConfig {
    /// Default budgets
    pub const fn new() -> Self {
        Self {
            ksv_block_count: KSV_BLOCK_COUNT,
            ksv_timeout_count: KSV_TIMEOUT_COUNT,
            ksv_poll_ms: KSV_POLL_MS,
            fifo_polls: KSV_FIFO_POLLS,
            fifo_poll_us: KSV_FIFO_POLL_US,
            vprime_polls: VPRIME_POLLS,
            vprime_poll_us: VPRIME_POLL_US,
        }
    }

    /// Set the waiting-for-KSV thresholds
    pub const fn with_ksv_wait(mut self, block_count: u32, timeout_count: u32) -> Self {
        self.ksv_block_count = block_count;
        self.ksv_timeout_count = timeout_count;
        self
    }

    /// Set the FIFO poll budget
    pub const fn with_fifo_poll(mut self, polls: u32, interval_us: u32) -> Self {
        self.fifo_polls = polls;
        self.fifo_poll_us = interval_us;
        self
    }

    /// Set the V' poll budget
    pub const fn with_vprime_poll(mut self, polls: u32, interval_us: u32) -> Self {
        self.vprime_polls = polls;
        self.vprime_poll_us = interval_us;
        self
    }

    /// Check internal consistency
    pub const fn is_valid(&self) -> bool {
        self.ksv_block_count < self.ksv_timeout_count
            && self.fifo_polls > 0
            && self.vprime_polls > 0
    }
}

impl Default for HdcpConfig {
    fn default() -> Self {
        Self::new()
    }
}
