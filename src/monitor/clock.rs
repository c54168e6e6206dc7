//! Clock stability detector and lock debouncing
//!
//! The PHY exposes two boolean indications that the acquisition FSM waits
//! on: clock-valid and TMDS PLL lock. Both are debounced the same way by a
//! [`LockCounter`]: a run of consecutive good samples passes the gate, and
//! a bounded count of bad samples exhausts it.

use crate::driver::error::Result;
use crate::hal::regs::{Reg, RegisterBus};

/// PHY clock-valid indication
pub fn is_stable<B: RegisterBus>(bus: &mut B) -> Result<bool> {
    bus.is_set(Reg::ClockValid)
}

/// TMDS PLL lock indication
pub fn is_pll_locked<B: RegisterBus>(bus: &mut B) -> Result<bool> {
    bus.is_set(Reg::PllLock)
}

/// Outcome of one debounced sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockProgress {
    /// Keep waiting
    Pending,
    /// Required consecutive good samples reached
    Passed,
    /// Bad-sample budget exceeded
    Exhausted,
}

/// Consecutive-good / total-bad sample counter
///
/// The bad counter only grows while its owner keeps sampling; it is cleared
/// exclusively by [`LockCounter::reset`], which the FSM calls on entry to
/// the owning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockCounter {
    stable: u16,
    unstable: u16,
}

impl LockCounter {
    /// Zeroed counter
    pub const fn new() -> Self {
        Self {
            stable: 0,
            unstable: 0,
        }
    }

    /// Clear both counts
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record one sample against `need` consecutive good samples and a
    /// budget of `max_bad` bad ones.
    pub fn record(&mut self, good: bool, need: u16, max_bad: u16) -> LockProgress {
        if good {
            self.stable = self.stable.saturating_add(1);
            if self.stable >= need {
                return LockProgress::Passed;
            }
        } else {
            self.stable = 0;
            self.unstable = self.unstable.saturating_add(1);
            if self.unstable > max_bad {
                return LockProgress::Exhausted;
            }
        }
        LockProgress::Pending
    }

    /// Consecutive good samples
    #[inline]
    pub fn stable(&self) -> u16 {
        self.stable
    }

    /// Bad samples since the last reset
    #[inline]
    pub fn unstable(&self) -> u16 {
        self.unstable
    }
}
