//! Centralized Constants
//!
//! Single source of truth for the field-tuned thresholds used by the
//! acquisition loop. Every value here is a *default*; the configuration
//! structs in [`crate::driver::config`], [`crate::phy::EqConfig`] and
//! [`crate::hdcp::HdcpConfig`] can override them.
//!
//! # Organization
//!
//! - **Ports**: port count limits and power-sense debounce
//! - **Acquisition budgets**: tick counts for each FSM wait state
//! - **Timing tolerances**: stability predicate limits
//! - **Equalizer**: sweep range, thresholds and poll budgets
//! - **HDCP**: repeater protocol limits and poll budgets
//!
//! Tick counts assume the nominal 100 Hz tick.

// =============================================================================
// Ports
// =============================================================================

/// Nominal FSM tick rate in Hz
pub const TICK_HZ: u32 = 100;

/// Maximum number of physical input ports (one bit each in the power mask)
pub const MAX_PORTS: u8 = 8;

/// Default number of input ports
pub const DEFAULT_PORT_COUNT: u8 = 4;

/// Consecutive samples a 5V change must persist before it is accepted
pub const POW5V_DEBOUNCE_COUNT: u8 = 3;

// =============================================================================
// Acquisition Budgets (ticks)
// =============================================================================

/// Hot-plug low hold time
pub const HPD_LOW_TICKS: u16 = 20;

/// Multiplier applied to the hot-plug low hold on EDID update or first boot
pub const HPD_EXTEND_FACTOR: u16 = 10;

/// Settle time after hot-plug is asserted high
pub const HPD_HIGH_TICKS: u16 = 2;

/// Consecutive clock-valid samples required to leave `WaitClockStable`
pub const CLK_STABLE_COUNT: u16 = 3;

/// Unstable clock samples tolerated before the recovery policy runs
pub const CLK_UNSTABLE_MAX: u16 = 200;

/// Ticks the FSM waits for the equalizer before proceeding without it
pub const EQ_WAIT_MAX: u16 = 300;

/// Consecutive PLL-lock samples required to leave `WaitPhyLock`
pub const PLL_LOCK_COUNT: u16 = 3;

/// Unlocked PLL samples tolerated before the recovery policy runs
pub const PLL_UNLOCK_MAX: u16 = 100;

/// Settle delay after the PHY soft reset
pub const SETTLE_TICKS: u16 = 2;

/// Settle delay after the PHY soft reset while an EDID update is pending
pub const SETTLE_TICKS_EDID: u16 = 20;

/// Consecutive matching timing samples required for `SignalReady`
pub const TIMING_STABLE_COUNT: u16 = 10;

/// Mismatching timing samples tolerated before the recovery policy runs
pub const TIMING_UNSTABLE_MAX: u16 = 200;

/// Ticks spent waiting on an unsupported/DVI/incomplete-HDCP format
pub const UNNORMAL_WAIT_MAX: u16 = 50;

/// Invalid samples tolerated in `SignalReady` before unwinding
pub const UNREADY_MAX: u16 = 5;

/// Frames the video pipeline suppresses after `SignalReady` is reached
pub const SKIP_FRAMES: u16 = 6;

// =============================================================================
// Timing Tolerances
// =============================================================================

/// Allowed horizontal active/total drift in pixels
pub const PIXEL_TOLERANCE: u16 = 2;

/// Allowed vertical active/total drift in lines
pub const LINE_TOLERANCE: u16 = 2;

/// Allowed frame-rate drift in hundredths of a Hz
pub const FRAME_RATE_TOLERANCE: u16 = 100;

// =============================================================================
// Equalizer
// =============================================================================

/// Number of TMDS data channels
pub const EQ_CHANNELS: usize = 3;

/// Highest equalizer setting swept
pub const EQ_MAX_SETTING: u8 = 13;

/// Short-cable default setting
pub const EQ_SHORT_CABLE_SETTING: u8 = 4;

/// Fallback setting for undetermined/error cables
pub const EQ_ERROR_CABLE_SETTING: u8 = 7;

/// Cap applied to a long-cable candidate
pub const EQ_LONG_CABLE_MAX_SETTING: u8 = 12;

/// Early-arrival count below which a channel is considered equalized
pub const EQ_EQUALIZED_COUNT: u32 = 512;

/// Slope accumulator limit separating short and long cables
pub const EQ_ACC_LIMIT: u32 = 360;

/// Minimum final step for the secondary long-cable rule
pub const EQ_MIN_SLOPE: u32 = 50;

/// Maximum spread between the three chosen channel settings
pub const EQ_MAX_SPREAD: u8 = 4;

/// Sweep attempts before falling back to the error-cable setting
pub const EQ_MAX_ATTEMPTS: u8 = 3;

/// Polls for a TMDS-valid indication after each auto-calibration
pub const EQ_TMDS_VALID_POLLS: u32 = 10;

/// Interval between TMDS-valid polls in microseconds
pub const EQ_TMDS_POLL_US: u32 = 1_000;

/// Width of the auto-calibration and recalibration pulses in microseconds
pub const EQ_PULSE_US: u32 = 10;

/// Per-setting sample history depth (diagnostics only)
pub const EQ_HISTORY_LEN: usize = 16;

// =============================================================================
// HDCP 1.4 Repeater
// =============================================================================

/// Length of a key selection vector in bytes
pub const KSV_LEN: usize = 5;

/// Maximum downstream device count representable in BSTATUS
pub const HDCP14_MAX_DEVICES: u8 = 127;

/// Maximum cascade depth representable in BSTATUS
pub const HDCP14_MAX_CASCADE: u8 = 7;

/// "Waiting for KSV" polls that block the authenticator context
pub const KSV_BLOCK_COUNT: u32 = 10;

/// "Waiting for KSV" polls after which the list fetch times out
pub const KSV_TIMEOUT_COUNT: u32 = 500;

/// Sleep between blocking "waiting for KSV" polls in milliseconds
pub const KSV_POLL_MS: u32 = 10;

/// Polls of the KSV FIFO status before a write times out
pub const KSV_FIFO_POLLS: u32 = 100;

/// Interval between KSV FIFO polls in microseconds
pub const KSV_FIFO_POLL_US: u32 = 100;

/// Polls for the hardware V' value after the list is marked ready
pub const VPRIME_POLLS: u32 = 200;

/// Interval between V' polls in microseconds
pub const VPRIME_POLL_US: u32 = 500;

// =============================================================================
// Events
// =============================================================================

/// Capacity of the interrupt-to-tick event queue
pub const EVENT_QUEUE_LEN: usize = 16;
