//! Configuration types for the HDMI receiver core
//!
//! Every threshold the acquisition loop uses lives here. Defaults come from
//! the internal constants module and match field-tuned values; the `with_*`
//! builders exist mostly so tests can shrink windows and budgets.

use super::error::{ConfigError, ConfigResult};
use crate::hdcp::HdcpConfig;
use crate::internal::constants::{
    CLK_STABLE_COUNT, CLK_UNSTABLE_MAX, DEFAULT_PORT_COUNT, EQ_WAIT_MAX, HPD_EXTEND_FACTOR,
    HPD_HIGH_TICKS, HPD_LOW_TICKS, MAX_PORTS, PLL_LOCK_COUNT, PLL_UNLOCK_MAX, POW5V_DEBOUNCE_COUNT,
    SETTLE_TICKS, SETTLE_TICKS_EDID, SKIP_FRAMES, TIMING_STABLE_COUNT, TIMING_UNSTABLE_MAX,
    UNNORMAL_WAIT_MAX, UNREADY_MAX,
};
use crate::phy::EqConfig;
use crate::video::StabilityTolerance;

/// Receiver configuration
///
/// All windows and budgets are counted in acquisition ticks (about 100 Hz).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxConfig {
    /// Number of physical input ports
    pub port_count: u8,
    /// Consecutive samples needed to accept a 5V change
    pub pow5v_debounce: u8,
    /// Hot-plug low window
    pub hpd_low_ticks: u16,
    /// Multiplier applied to the low window on boot or pending EDID update
    pub hpd_extend_factor: u16,
    /// Wait after asserting hot-plug before sampling the clock
    pub hpd_high_ticks: u16,
    /// Consecutive clock-valid samples required
    pub clk_stable_count: u16,
    /// Clock-invalid samples tolerated before escalating
    pub clk_unstable_max: u16,
    /// Ticks to wait for the equalizer before proceeding without it
    pub eq_wait_max: u16,
    /// Consecutive PLL-lock samples required
    pub pll_lock_count: u16,
    /// PLL-unlock samples tolerated before escalating
    pub pll_unlock_max: u16,
    /// Settle delay after the soft reset
    pub settle_ticks: u16,
    /// Settle delay after the soft reset when an EDID update is pending
    pub settle_ticks_edid: u16,
    /// Consecutive stable timing samples required
    pub timing_stable_count: u16,
    /// Unstable timing samples tolerated before escalating
    pub timing_unstable_max: u16,
    /// Ticks an unsupported/DVI/unauthenticated format is held back
    pub unnormal_wait_max: u16,
    /// Bad samples tolerated in `SignalReady` before unwinding
    pub unready_max: u16,
    /// Frames suppressed after reaching `SignalReady`
    pub skip_frames: u16,
    /// Hardware has an HDCP2.2 block whose ready flag `Init` clears
    pub hdcp22_present: bool,
    /// Timing comparison tolerances
    pub tolerance: StabilityTolerance,
    /// Equalizer thresholds
    pub eq: EqConfig,
    /// Repeater budgets
    pub hdcp: HdcpConfig,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RxConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            port_count: DEFAULT_PORT_COUNT,
            pow5v_debounce: POW5V_DEBOUNCE_COUNT,
            hpd_low_ticks: HPD_LOW_TICKS,
            hpd_extend_factor: HPD_EXTEND_FACTOR,
            hpd_high_ticks: HPD_HIGH_TICKS,
            clk_stable_count: CLK_STABLE_COUNT,
            clk_unstable_max: CLK_UNSTABLE_MAX,
            eq_wait_max: EQ_WAIT_MAX,
            pll_lock_count: PLL_LOCK_COUNT,
            pll_unlock_max: PLL_UNLOCK_MAX,
            settle_ticks: SETTLE_TICKS,
            settle_ticks_edid: SETTLE_TICKS_EDID,
            timing_stable_count: TIMING_STABLE_COUNT,
            timing_unstable_max: TIMING_UNSTABLE_MAX,
            unnormal_wait_max: UNNORMAL_WAIT_MAX,
            unready_max: UNREADY_MAX,
            skip_frames: SKIP_FRAMES,
            hdcp22_present: false,
            tolerance: StabilityTolerance::new(),
            eq: EqConfig::new(),
            hdcp: HdcpConfig::new(),
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the number of input ports
    #[must_use]
    pub const fn with_port_count(mut self, port_count: u8) -> Self {
        self.port_count = port_count;
        self
    }

    /// Set the 5V debounce count
    #[must_use]
    pub const fn with_pow5v_debounce(mut self, count: u8) -> Self {
        self.pow5v_debounce = count;
        self
    }

    /// Set the hot-plug low and high windows
    #[must_use]
    pub const fn with_hotplug(mut self, low_ticks: u16, high_ticks: u16) -> Self {
        self.hpd_low_ticks = low_ticks;
        self.hpd_high_ticks = high_ticks;
        self
    }

    /// Set the low-window multiplier used on boot or pending EDID update
    #[must_use]
    pub const fn with_hotplug_extend(mut self, factor: u16) -> Self {
        self.hpd_extend_factor = factor;
        self
    }

    /// Set the clock debounce count and unstable budget
    #[must_use]
    pub const fn with_clock_budget(mut self, stable: u16, unstable_max: u16) -> Self {
        self.clk_stable_count = stable;
        self.clk_unstable_max = unstable_max;
        self
    }

    /// Set the PLL debounce count and unlock budget
    #[must_use]
    pub const fn with_pll_budget(mut self, lock: u16, unlock_max: u16) -> Self {
        self.pll_lock_count = lock;
        self.pll_unlock_max = unlock_max;
        self
    }

    /// Set the timing debounce count and unstable budget
    #[must_use]
    pub const fn with_timing_budget(mut self, stable: u16, unstable_max: u16) -> Self {
        self.timing_stable_count = stable;
        self.timing_unstable_max = unstable_max;
        self
    }

    /// Set the post-reset settle windows
    #[must_use]
    pub const fn with_settle(mut self, ticks: u16, edid_ticks: u16) -> Self {
        self.settle_ticks = ticks;
        self.settle_ticks_edid = edid_ticks;
        self
    }

    /// Set the equalizer wait budget
    #[must_use]
    pub const fn with_eq_wait_max(mut self, ticks: u16) -> Self {
        self.eq_wait_max = ticks;
        self
    }

    /// Set the unsupported-format hold-back
    #[must_use]
    pub const fn with_unnormal_wait_max(mut self, ticks: u16) -> Self {
        self.unnormal_wait_max = ticks;
        self
    }

    /// Set the `SignalReady` bad-sample budget
    #[must_use]
    pub const fn with_unready_max(mut self, count: u16) -> Self {
        self.unready_max = count;
        self
    }

    /// Set the number of frames suppressed after lock
    #[must_use]
    pub const fn with_skip_frames(mut self, frames: u16) -> Self {
        self.skip_frames = frames;
        self
    }

    /// Declare the HDCP2.2 block present
    #[must_use]
    pub const fn with_hdcp22(mut self, present: bool) -> Self {
        self.hdcp22_present = present;
        self
    }

    /// Set the timing tolerances
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: StabilityTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the equalizer thresholds
    #[must_use]
    pub const fn with_eq(mut self, eq: EqConfig) -> Self {
        self.eq = eq;
        self
    }

    /// Set the repeater budgets
    #[must_use]
    pub const fn with_hdcp(mut self, hdcp: HdcpConfig) -> Self {
        self.hdcp = hdcp;
        self
    }

    /// Reject configurations the acquisition loop cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let ports_ok = self.port_count > 0 && self.port_count <= MAX_PORTS;
        let debounce_ok = self.pow5v_debounce > 0
            && self.clk_stable_count > 0
            && self.pll_lock_count > 0
            && self.timing_stable_count > 0;

        if ports_ok
            && debounce_ok
            && self.hpd_extend_factor > 0
            && self.eq.is_valid()
            && self.hdcp.is_valid()
        {
            Ok(())
        } else {
            Err(ConfigError::InvalidConfig)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(RxConfig::new().validate(), Ok(()));
        assert_eq!(RxConfig::default(), RxConfig::new());
    }

    #[test]
    fn builders_set_fields() {
        let cfg = RxConfig::new()
            .with_port_count(2)
            .with_hotplug(5, 1)
            .with_clock_budget(4, 40)
            .with_hdcp22(true);

        assert_eq!(cfg.port_count, 2);
        assert_eq!(cfg.hpd_low_ticks, 5);
        assert_eq!(cfg.hpd_high_ticks, 1);
        assert_eq!(cfg.clk_stable_count, 4);
        assert_eq!(cfg.clk_unstable_max, 40);
        assert!(cfg.hdcp22_present);
    }

    #[test]
    fn port_count_bounds() {
        assert!(RxConfig::new().with_port_count(0).validate().is_err());
        assert!(RxConfig::new().with_port_count(MAX_PORTS).validate().is_ok());
        assert!(RxConfig::new().with_port_count(MAX_PORTS + 1).validate().is_err());
    }

    #[test]
    fn zero_debounce_rejected() {
        assert_eq!(
            RxConfig::new().with_clock_budget(0, 10).validate(),
            Err(ConfigError::InvalidConfig)
        );
        assert!(RxConfig::new().with_pow5v_debounce(0).validate().is_err());
    }

    #[test]
    fn nested_configs_checked() {
        let eq = EqConfig::new().with_short_setting(30);
        assert!(RxConfig::new().with_eq(eq).validate().is_err());
    }
}
