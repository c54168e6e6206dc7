//! Register collaborator interface
//!
//! The receiver core never touches addresses. It reads and writes *named*
//! hardware fields through [`RegisterBus`], which a platform layer maps onto
//! the real register file. Host tests plug in a mock.
//!
//! Bounded hardware handshakes (TMDS-valid wait, KSV FIFO drain, V' ready)
//! go through [`poll_until`], which sleeps through an injected
//! [`DelayNs`] so tests can simulate latency without wall-clock sleeps.

use embedded_hal::delay::DelayNs;

use crate::driver::error::{IoError, Result};

// =============================================================================
// Named Fields
// =============================================================================

/// Named hardware field
///
/// Values are right-aligned and at most 32 bits wide. Single-bit fields read
/// as 0 or 1. Indexed variants carry a port or channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    // --- Power and hot-plug -------------------------------------------------
    /// 5V present bitmask, one bit per port (read-only)
    PowerPresent,
    /// Hot-plug detect output for a port
    Hotplug(u8),
    /// Active input port multiplexer
    PortSelect,

    // --- PHY ----------------------------------------------------------------
    /// PHY clock-valid indication (read-only)
    ClockValid,
    /// TMDS PLL lock indication (read-only)
    PllLock,
    /// PHY/controller soft reset (write 1 then 0)
    SoftReset,
    /// Equalizer setting applied to all channels during a sweep
    EqSweepSetting,
    /// Final equalizer setting for one channel
    EqChannelSetting(u8),
    /// Auto-calibration trigger (pulse)
    EqAutoCalibrate,
    /// Recalibration trigger after final settings are applied (pulse)
    EqRecalibrate,
    /// TMDS-valid bitmask, one bit per channel (read-only)
    TmdsValid,
    /// Early-arrival counter for one channel (read-only)
    EarlyCounter(u8),

    // --- Timing measurement ------------------------------------------------
    /// DVI (1) or HDMI (0) mode
    DviMode,
    /// Color space code (see [`crate::video::ColorSpace`])
    ColorSpace,
    /// Color depth in bits per component
    ColorDepth,
    /// Interlaced scan flag
    Interlaced,
    /// Horizontal active pixels
    HActive,
    /// Vertical active lines
    VActive,
    /// Horizontal total pixels
    HTotal,
    /// Vertical total lines
    VTotal,
    /// Pixel repetition factor (0 = none)
    PixelRepeat,
    /// Frame rate in hundredths of a Hz
    FrameRate,

    // --- Packets -----------------------------------------------------------
    /// HDR static metadata present
    HdrActive,
    /// Dolby Vision vendor packet present
    DolbyVision,
    /// 3D structure (0 = 2D)
    Video3d,
    /// Audio sample rate in Hz
    AudioSampleRate,
    /// Audio coding type from the audio infoframe
    AudioCoding,

    // --- HDCP --------------------------------------------------------------
    /// HDCP1.4 engine enable
    Hdcp14Enable,
    /// HDCP1.4 authentication status (see [`crate::hdcp::Hdcp14Status`])
    Hdcp14Status,
    /// Low word of the transmitter AKSV latched by hardware
    Hdcp14Aksv,
    /// Low word of the receiver BKSV loaded from the key store
    Hdcp14Bksv,
    /// HDCP2.2 hardware ready flag
    Hdcp22Ready,
    /// Repeater mode enable
    RepeaterEnable,
    /// "Waiting for KSV list" flag (read-only)
    KsvWaiting,
    /// KSV list ready (BCAPS READY)
    KsvListReady,
    /// KSV list fetch timed out
    KsvTimeout,
    /// Lost authentication status
    LostAuth,
    /// BSTATUS cascade depth
    RepeaterDepth,
    /// BSTATUS device count
    RepeaterDeviceCount,
    /// BSTATUS MAX_CASCADE_EXCEEDED
    MaxCascadeExceeded,
    /// BSTATUS MAX_DEVS_EXCEEDED
    MaxDevsExceeded,
    /// KSV FIFO status (see [`ksv_fifo`])
    KsvFifoStatus,
    /// KSV FIFO bytes 0..=3 (little-endian)
    KsvFifoLow,
    /// KSV FIFO byte 4, commits the entry
    KsvFifoHigh,
    /// Hardware-computed V' available (read-only)
    VPrimeReady,
}

/// KSV FIFO status bits
pub mod ksv_fifo {
    /// FIFO cannot accept another entry
    pub const FULL: u32 = 1 << 0;
    /// FIFO has been drained by the hardware
    pub const EMPTY: u32 = 1 << 1;
}

// =============================================================================
// Register Bus Trait
// =============================================================================

/// Trait for register collaborator access
///
/// Mirrors an MDIO-style bus: one read or write per call. Implementations
/// shared between execution contexts must make [`RegisterBus::modify`]
/// atomic with respect to other accessors (see
/// [`crate::sync::SharedBus`]).
pub trait RegisterBus {
    /// Read a named field
    fn read(&mut self, reg: Reg) -> Result<u32>;

    /// Write a named field
    fn write(&mut self, reg: Reg, value: u32) -> Result<()>;

    /// Read-modify-write a named field
    fn modify<F>(&mut self, reg: Reg, f: F) -> Result<()>
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg)?;
        self.write(reg, f(value))
    }

    /// Read a single-bit field as a boolean
    fn is_set(&mut self, reg: Reg) -> Result<bool> {
        Ok(self.read(reg)? != 0)
    }

    /// Write a boolean to a single-bit field
    fn set_flag(&mut self, reg: Reg, on: bool) -> Result<()> {
        self.write(reg, u32::from(on))
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read(&mut self, reg: Reg) -> Result<u32> {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) -> Result<()> {
        (**self).write(reg, value)
    }

    fn modify<F>(&mut self, reg: Reg, f: F) -> Result<()>
    where
        F: FnOnce(u32) -> u32,
    {
        (**self).modify(reg, f)
    }
}

// =============================================================================
// Handshake Helpers
// =============================================================================

/// Write 1 then 0 to a trigger field, holding it for `width_us`
pub fn pulse<B: RegisterBus, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    reg: Reg,
    width_us: u32,
) -> Result<()> {
    bus.write(reg, 1)?;
    delay.delay_us(width_us);
    bus.write(reg, 0)
}

/// Poll a field until `done` accepts its value
///
/// Reads at most `polls` times, sleeping `interval_us` between reads.
/// Returns the accepted value, or [`IoError::Timeout`].
pub fn poll_until<B, D, F>(
    bus: &mut B,
    delay: &mut D,
    reg: Reg,
    polls: u32,
    interval_us: u32,
    mut done: F,
) -> Result<u32>
where
    B: RegisterBus,
    D: DelayNs,
    F: FnMut(u32) -> bool,
{
    for attempt in 0..polls {
        let value = bus.read(reg)?;
        if done(value) {
            return Ok(value);
        }
        if attempt + 1 < polls {
            delay.delay_us(interval_us);
        }
    }
    Err(IoError::Timeout.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBus, MockDelay};

    #[test]
    fn pulse_writes_one_then_zero() {
        let mut bus = MockBus::new();
        let mut delay = MockDelay::new();

        pulse(&mut bus, &mut delay, Reg::SoftReset, 5).unwrap();

        assert_eq!(bus.writes_to(Reg::SoftReset), [1, 0]);
        assert_eq!(delay.total_ns(), 5_000);
    }

    #[test]
    fn poll_until_returns_first_accepted_value() {
        let mut bus = MockBus::new();
        let mut delay = MockDelay::new();
        bus.queue_reads(Reg::VPrimeReady, &[0, 0, 1]);

        let value =
            poll_until(&mut bus, &mut delay, Reg::VPrimeReady, 10, 100, |v| v != 0).unwrap();

        assert_eq!(value, 1);
        assert_eq!(bus.read_count(Reg::VPrimeReady), 3);
        assert_eq!(delay.total_ns(), 200_000);
    }

    #[test]
    fn poll_until_times_out_after_budget() {
        let mut bus = MockBus::new();
        let mut delay = MockDelay::new();

        let result = poll_until(&mut bus, &mut delay, Reg::VPrimeReady, 4, 100, |v| v != 0);

        assert_eq!(result, Err(IoError::Timeout.into()));
        assert_eq!(bus.read_count(Reg::VPrimeReady), 4);
    }

    #[test]
    fn modify_default_is_read_then_write() {
        let mut bus = MockBus::new();
        bus.set(Reg::PortSelect, 0b0101);

        bus.modify(Reg::PortSelect, |v| v | 0b0010).unwrap();

        assert_eq!(bus.get(Reg::PortSelect), 0b0111);
    }

    #[test]
    fn bus_through_mut_reference() {
        fn read_clock<B: RegisterBus>(mut bus: B) -> bool {
            bus.is_set(Reg::ClockValid).unwrap()
        }

        let mut bus = MockBus::new();
        bus.set(Reg::ClockValid, 1);
        assert!(read_clock(&mut bus));
    }
}
