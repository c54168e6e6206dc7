//! Acquisition states and the transition table
//!
//! Every legal edge of the acquisition FSM is a fact in [`transition`].
//! The receiver decides *which* trigger fires each tick; this table decides
//! *where* it leads. Pairs not listed are ignored.

/// Acquisition state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// No 5V on the active port
    #[default]
    PowerLost,
    /// Reset counters and de-assert hot-plug
    Init,
    /// Hot-plug held low
    HotplugLow,
    /// Hot-plug asserted, letting the source start up
    HotplugHigh,
    /// Debouncing the PHY clock-valid indication
    WaitClockStable,
    /// Requesting an equalizer run
    EqualizeStart,
    /// Waiting for the equalizer worker
    WaitEqualizeDone,
    /// Debouncing TMDS PLL lock
    WaitPhyLock,
    /// Settling after the soft reset
    WaitTimingStable,
    /// Sampling timing until it holds steady
    TimingStable,
    /// Video locked
    SignalReady,
}

impl RxState {
    /// Successor on the linear acquisition chain
    pub const fn next(self) -> Option<RxState> {
        match self {
            RxState::Init => Some(RxState::HotplugLow),
            RxState::HotplugLow => Some(RxState::HotplugHigh),
            RxState::HotplugHigh => Some(RxState::WaitClockStable),
            RxState::WaitClockStable => Some(RxState::EqualizeStart),
            RxState::EqualizeStart => Some(RxState::WaitEqualizeDone),
            RxState::WaitEqualizeDone => Some(RxState::WaitPhyLock),
            RxState::WaitPhyLock => Some(RxState::WaitTimingStable),
            RxState::WaitTimingStable => Some(RxState::TimingStable),
            RxState::TimingStable => Some(RxState::SignalReady),
            RxState::PowerLost | RxState::SignalReady => None,
        }
    }

    /// Short name for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            RxState::PowerLost => "power-lost",
            RxState::Init => "init",
            RxState::HotplugLow => "hpd-low",
            RxState::HotplugHigh => "hpd-high",
            RxState::WaitClockStable => "wait-clk",
            RxState::EqualizeStart => "eq-start",
            RxState::WaitEqualizeDone => "wait-eq",
            RxState::WaitPhyLock => "wait-pll",
            RxState::WaitTimingStable => "settle",
            RxState::TimingStable => "timing",
            RxState::SignalReady => "ready",
        }
    }
}

impl core::fmt::Display for RxState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Debounced 5V removal on the active port
    PowerLost,
    /// Debounced 5V arrival on the active port
    PowerRestored,
    /// Restart acquisition from `Init` (forced, EDID update, port change)
    Restart,
    /// Current stage finished
    Proceed,
    /// Equalizer run was cancelled; request a new one
    Retry,
    /// Recovery escalation: toggle hot-plug
    HotplugReset,
    /// PLL dropped while sampling timing
    Relock,
    /// `SignalReady` lost the signal for too long
    Unwind,
}

/// The transition table.
pub const fn transition(state: RxState, trigger: Trigger) -> Option<RxState> {
    match (state, trigger) {
        (RxState::PowerLost, Trigger::PowerRestored) => Some(RxState::Init),
        (RxState::PowerLost, _) => None,
        (_, Trigger::PowerLost) => Some(RxState::PowerLost),
        (_, Trigger::Restart) => Some(RxState::Init),
        (_, Trigger::Proceed) => state.next(),
        (RxState::WaitEqualizeDone, Trigger::Retry) => Some(RxState::EqualizeStart),
        (
            RxState::WaitClockStable | RxState::WaitPhyLock | RxState::TimingStable,
            Trigger::HotplugReset,
        ) => Some(RxState::HotplugLow),
        (RxState::TimingStable, Trigger::Relock) => Some(RxState::WaitPhyLock),
        (RxState::SignalReady, Trigger::Unwind) => Some(RxState::WaitClockStable),
        _ => None,
    }
}
