//! Equalizer calibration engine
//!
//! For each of the three TMDS channels the engine sweeps the PHY
//! equalization setting upward from 0 and watches the early-arrival counter.
//! A cable that needs little equalization shows a low count from the start
//! (short cable); a lossy cable shows a count that falls steeply as the
//! setting compensates for it (long cable). Channels that fit neither
//! pattern get a fixed fallback setting (error cable).
//!
//! Runs execute on a deferred-work context. The acquisition tick requests a
//! run through [`crate::sync::EqHandoff`] and reads the outcome on a later
//! tick; [`EqualizerEngine::service`] is the worker side of that handoff.
//!
//! # Example
//!
//! ```ignore
//! // equalizer work item
//! let mut eq = EqualizerEngine::new(EqConfig::new());
//! loop {
//!     wait_for_work();
//!     eq.service(&mut BUS.handle(), &mut delay, &SHARED)?;
//! }
//! ```

use embedded_hal::delay::DelayNs;

use crate::driver::error::{Error, IoError, Result};
use crate::hal::regs::{Reg, RegisterBus, poll_until, pulse};
use crate::internal::constants::{
    EQ_ACC_LIMIT, EQ_CHANNELS, EQ_EQUALIZED_COUNT, EQ_ERROR_CABLE_SETTING, EQ_HISTORY_LEN,
    EQ_LONG_CABLE_MAX_SETTING, EQ_MAX_ATTEMPTS, EQ_MAX_SETTING, EQ_MAX_SPREAD, EQ_MIN_SLOPE,
    EQ_PULSE_US, EQ_SHORT_CABLE_SETTING, EQ_TMDS_POLL_US, EQ_TMDS_VALID_POLLS,
};
use crate::internal::trace::{rx_debug, rx_info, rx_warn};
use crate::sync::{EqStatus, Shared};

/// Mask of the TMDS-valid bits the engine cares about
const TMDS_MASK: u32 = (1 << EQ_CHANNELS) - 1;

// =============================================================================
// Configuration
// =============================================================================

/// Equalizer thresholds
///
/// Defaults are field-tuned; tests override them to shrink sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EqConfig {
    /// Highest setting swept
    pub max_setting: u8,
    /// Short-cable default setting
    pub short_setting: u8,
    /// Fallback setting for undetermined channels
    pub error_setting: u8,
    /// Cap applied to long-cable settings
    pub long_cap: u8,
    /// Early-arrival count below which a channel counts as equalized
    pub equalized_count: u32,
    /// Accumulated-slope limit separating short from long cables
    pub acc_limit: u32,
    /// Minimum step-to-step slope for the secondary long-cable rule
    pub min_slope: u32,
    /// Largest allowed spread between channel settings
    pub max_spread: u8,
    /// Sweeps attempted before falling back to the error setting
    pub max_attempts: u8,
    /// TMDS-valid polls per setting
    pub tmds_polls: u32,
    /// Interval between TMDS-valid polls (microseconds)
    pub tmds_poll_us: u32,
    /// Trigger pulse width (microseconds)
    pub pulse_us: u32,
}

impl EqConfig {
    /// Default thresholds
    pub const fn new() -> Self {
        Self {
            max_setting: EQ_MAX_SETTING,
            short_setting: EQ_SHORT_CABLE_SETTING,
            error_setting: EQ_ERROR_CABLE_SETTING,
            long_cap: EQ_LONG_CABLE_MAX_SETTING,
            equalized_count: EQ_EQUALIZED_COUNT,
            acc_limit: EQ_ACC_LIMIT,
            min_slope: EQ_MIN_SLOPE,
            max_spread: EQ_MAX_SPREAD,
            max_attempts: EQ_MAX_ATTEMPTS,
            tmds_polls: EQ_TMDS_VALID_POLLS,
            tmds_poll_us: EQ_TMDS_POLL_US,
            pulse_us: EQ_PULSE_US,
        }
    }

    /// Set the highest swept setting
    pub const fn with_max_setting(mut self, max_setting: u8) -> Self {
        self.max_setting = max_setting;
        self
    }

    /// Set the short-cable default
    pub const fn with_short_setting(mut self, short_setting: u8) -> Self {
        self.short_setting = short_setting;
        self
    }

    /// Set the error-cable fallback
    pub const fn with_error_setting(mut self, error_setting: u8) -> Self {
        self.error_setting = error_setting;
        self
    }

    /// Set the long-cable cap
    pub const fn with_long_cap(mut self, long_cap: u8) -> Self {
        self.long_cap = long_cap;
        self
    }

    /// Set the equalized-count threshold
    pub const fn with_equalized_count(mut self, count: u32) -> Self {
        self.equalized_count = count;
        self
    }

    /// Set the slope limits
    pub const fn with_slope(mut self, acc_limit: u32, min_slope: u32) -> Self {
        self.acc_limit = acc_limit;
        self.min_slope = min_slope;
        self
    }

    /// Set the maximum inter-channel spread
    pub const fn with_max_spread(mut self, max_spread: u8) -> Self {
        self.max_spread = max_spread;
        self
    }

    /// Set the attempt budget
    pub const fn with_max_attempts(mut self, max_attempts: u8) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the TMDS-valid poll budget
    pub const fn with_tmds_poll(mut self, polls: u32, interval_us: u32) -> Self {
        self.tmds_polls = polls;
        self.tmds_poll_us = interval_us;
        self
    }

    /// Check internal consistency
    pub const fn is_valid(&self) -> bool {
        (self.max_setting as usize) < EQ_HISTORY_LEN
            && self.short_setting <= self.max_setting
            && self.error_setting <= self.max_setting
            && self.long_cap <= self.max_setting
            && self.max_attempts > 0
            && self.tmds_polls > 0
    }
}

impl Default for EqConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Verdicts and Report
// =============================================================================

/// Cable classification of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CableClass {
    /// Little attenuation; short-cable setting used
    Short,
    /// Significant attenuation; long-cable candidate used
    Long,
    /// No consistent pattern; fallback setting used
    #[default]
    Error,
}

/// Outcome of a full run (all attempts)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EqOutcome {
    /// Consistent settings found and applied
    Calibrated([u8; EQ_CHANNELS]),
    /// Attempts exhausted; error-cable settings applied
    Degraded([u8; EQ_CHANNELS]),
}

impl EqOutcome {
    /// Settings that were programmed
    pub const fn settings(&self) -> [u8; EQ_CHANNELS] {
        match self {
            EqOutcome::Calibrated(s) | EqOutcome::Degraded(s) => *s,
        }
    }
}

/// Diagnostics of one channel from the last sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelReport {
    /// Verdict
    pub class: CableClass,
    /// Setting chosen by the verdict
    pub setting: u8,
    /// Accumulated slope
    pub slope: u32,
    /// Early-arrival count per setting (0 where TMDS was not valid)
    pub history: [u32; EQ_HISTORY_LEN],
}

/// Diagnostics of the last run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EqReport {
    /// Per-channel verdicts of the last sweep
    pub channels: [ChannelReport; EQ_CHANNELS],
    /// Sweeps performed
    pub attempts: u8,
    /// Settings stepped through by the last sweep
    pub iterations: u8,
    /// Fallback settings were applied
    pub degraded: bool,
    /// Settings programmed into the PHY
    pub settings: [u8; EQ_CHANNELS],
}

// =============================================================================
// Per-channel Classification
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    best_short: u8,
    best_long: u8,
    short_valid: bool,
    long_valid: bool,
    acc: u32,
    step: u32,
    last_acq: u32,
    acq: u32,
    sampled: bool,
    tmds_valid: bool,
    history: [u32; EQ_HISTORY_LEN],
    verdict: Option<(CableClass, u8)>,
}

impl ChannelState {
    fn new(cfg: &EqConfig) -> Self {
        Self {
            best_short: cfg.short_setting,
            best_long: cfg.short_setting,
            short_valid: false,
            long_valid: false,
            acc: 0,
            step: 0,
            last_acq: 0,
            acq: 0,
            sampled: false,
            tmds_valid: false,
            history: [0; EQ_HISTORY_LEN],
            verdict: None,
        }
    }

    fn observe(&mut self, setting: u8, count: Option<u32>, cfg: &EqConfig) {
        self.step = 0;
        self.tmds_valid = count.is_some();
        let Some(acq) = count else {
            return;
        };

        if let Some(slot) = self.history.get_mut(setting as usize) {
            *slot = acq;
        }
        self.last_acq = self.acq;
        self.acq = acq;

        if self.sampled && acq < self.last_acq {
            self.step = self.last_acq - acq;
            self.acc = self.acc.saturating_add(self.step);
            if !self.long_valid && acq < cfg.equalized_count {
                self.best_long = setting;
                self.long_valid = true;
            }
        }
        self.sampled = true;

        if !self.short_valid {
            if setting + 1 == cfg.short_setting && acq < cfg.equalized_count {
                // equalized one step early: the default over-equalizes
                self.best_short = setting;
                self.short_valid = true;
            } else if setting == cfg.short_setting {
                self.best_short = cfg.short_setting;
                self.short_valid = true;
            }
        }
    }

    fn judge(&self, setting: u8, cfg: &EqConfig) -> Option<(CableClass, u8)> {
        let long = (CableClass::Long, self.best_long.min(cfg.long_cap));

        if self.long_valid && self.acc > cfg.acc_limit {
            return Some(long);
        }
        if setting < cfg.max_setting {
            return None;
        }

        if self.acc < cfg.acc_limit && self.short_valid {
            Some((CableClass::Short, self.best_short))
        } else if self.tmds_valid && self.acc > cfg.acc_limit && self.step > cfg.min_slope {
            Some(long)
        } else {
            Some((CableClass::Error, cfg.error_setting))
        }
    }

    fn report(&self, cfg: &EqConfig) -> ChannelReport {
        let (class, setting) = self
            .verdict
            .unwrap_or((CableClass::Error, cfg.error_setting));
        ChannelReport {
            class,
            setting,
            slope: self.acc,
            history: self.history,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Equalizer calibration engine
pub struct EqualizerEngine {
    cfg: EqConfig,
    report: EqReport,
}

impl EqualizerEngine {
    /// Create an engine
    pub const fn new(cfg: EqConfig) -> Self {
        Self {
            cfg,
            report: EqReport {
                channels: [ChannelReport {
                    class: CableClass::Error,
                    setting: 0,
                    slope: 0,
                    history: [0; EQ_HISTORY_LEN],
                }; EQ_CHANNELS],
                attempts: 0,
                iterations: 0,
                degraded: false,
                settings: [0; EQ_CHANNELS],
            },
        }
    }

    /// Thresholds in use
    pub fn config(&self) -> &EqConfig {
        &self.cfg
    }

    /// Diagnostics of the last run
    pub fn report(&self) -> &EqReport {
        &self.report
    }

    /// Worker side of the equalizer handoff.
    ///
    /// Runs only if the acquisition tick has requested a run. Publishes the
    /// outcome (settings and status) before returning it.
    ///
    /// On a bus failure the error-cable settings are programmed and published
    /// as [`EqStatus::Degraded`]. If programming them fails too, nothing
    /// trustworthy is in the PHY and the run is published as
    /// [`EqStatus::Cancelled`]. The original error is propagated either way.
    pub fn service<B, D>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        shared: &Shared,
    ) -> Result<Option<EqStatus>>
    where
        B: RegisterBus,
        D: DelayNs,
    {
        if !shared.eq.take_request() {
            return Ok(None);
        }

        let fallback = [self.cfg.error_setting; EQ_CHANNELS];
        let (status, settings) = match self.run(bus, delay, shared) {
            Ok(EqOutcome::Calibrated(s)) => (EqStatus::Done, s),
            Ok(EqOutcome::Degraded(s)) => (EqStatus::Degraded, s),
            Err(Error::Io(IoError::Cancelled)) => (EqStatus::Cancelled, fallback),
            Err(e) => {
                rx_warn!("eq: run failed ({:?}), applying fallback", e);
                self.report.degraded = true;
                let status = match self.apply(bus, delay, fallback) {
                    Ok(()) => EqStatus::Degraded,
                    Err(_) => EqStatus::Cancelled,
                };
                shared.eq.complete(status, fallback);
                return Err(e);
            }
        };

        shared.eq.complete(status, settings);
        Ok(Some(status))
    }

    /// Run a complete calibration: up to `max_attempts` sweeps, then program
    /// the chosen settings and trigger recalibration.
    ///
    /// Returns [`IoError::Cancelled`] if hot-plug is de-asserted or the
    /// acquisition tick withdraws the request mid-run; nothing is programmed
    /// in that case.
    pub fn run<B, D>(&mut self, bus: &mut B, delay: &mut D, shared: &Shared) -> Result<EqOutcome>
    where
        B: RegisterBus,
        D: DelayNs,
    {
        self.report.degraded = false;

        for attempt in 1..=self.cfg.max_attempts {
            self.report.attempts = attempt;
            let channels = self.sweep(bus, delay, shared)?;

            if let Some(settings) = self.consistent(&channels) {
                Self::check_cancel(shared)?;
                self.apply(bus, delay, settings)?;
                rx_info!("eq: calibrated {:?} after {} attempt(s)", settings, attempt);
                return Ok(EqOutcome::Calibrated(settings));
            }
            rx_debug!("eq: attempt {} inconsistent", attempt);
        }

        Self::check_cancel(shared)?;
        let settings = [self.cfg.error_setting; EQ_CHANNELS];
        self.report.degraded = true;
        self.apply(bus, delay, settings)?;
        rx_warn!("eq: attempts exhausted, using error-cable setting {}", self.cfg.error_setting);
        Ok(EqOutcome::Degraded(settings))
    }

    fn sweep<B, D>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        shared: &Shared,
    ) -> Result<[ChannelState; EQ_CHANNELS]>
    where
        B: RegisterBus,
        D: DelayNs,
    {
        let cfg = self.cfg;
        let mut channels = [ChannelState::new(&cfg); EQ_CHANNELS];
        self.report.iterations = 0;

        for setting in 0..=cfg.max_setting {
            if let Err(e) = Self::check_cancel(shared) {
                rx_debug!("eq: cancelled at setting {}", setting);
                return Err(e);
            }
            self.report.iterations += 1;

            bus.write(Reg::EqSweepSetting, u32::from(setting))?;
            pulse(bus, delay, Reg::EqAutoCalibrate, cfg.pulse_us)?;

            let valid = match poll_until(
                bus,
                delay,
                Reg::TmdsValid,
                cfg.tmds_polls,
                cfg.tmds_poll_us,
                |mask| mask & TMDS_MASK != 0,
            ) {
                Ok(mask) => mask,
                Err(Error::Io(IoError::Timeout)) => 0,
                Err(e) => return Err(e),
            };

            for (ch, state) in channels.iter_mut().enumerate() {
                if state.verdict.is_some() {
                    continue;
                }
                let count = if valid & (1 << ch) != 0 {
                    Some(bus.read(Reg::EarlyCounter(ch as u8))?)
                } else {
                    None
                };
                state.observe(setting, count, &cfg);
                state.verdict = state.judge(setting, &cfg);
            }

            if channels.iter().all(|c| c.verdict.is_some()) {
                break;
            }
        }

        for (report, state) in self.report.channels.iter_mut().zip(&channels) {
            *report = state.report(&cfg);
        }
        Ok(channels)
    }

    fn check_cancel(shared: &Shared) -> Result<()> {
        if shared.hotplug_asserted() && !shared.eq.cancel_requested() {
            Ok(())
        } else {
            Err(IoError::Cancelled.into())
        }
    }

    /// Settings of a sweep if every channel has a usable verdict and the
    /// spread is within bounds.
    fn consistent(&self, channels: &[ChannelState; EQ_CHANNELS]) -> Option<[u8; EQ_CHANNELS]> {
        let mut settings = [0u8; EQ_CHANNELS];
        for (out, state) in settings.iter_mut().zip(channels) {
            match state.verdict {
                Some((CableClass::Short | CableClass::Long, setting)) => *out = setting,
                _ => return None,
            }
        }

        let max = settings.iter().copied().max().unwrap_or(0);
        let min = settings.iter().copied().min().unwrap_or(0);
        (max - min <= self.cfg.max_spread).then_some(settings)
    }

    fn apply<B, D>(&mut self, bus: &mut B, delay: &mut D, settings: [u8; EQ_CHANNELS]) -> Result<()>
    where
        B: RegisterBus,
        D: DelayNs,
    {
        for (ch, setting) in settings.iter().enumerate() {
            bus.write(Reg::EqChannelSetting(ch as u8), u32::from(*setting))?;
        }
        pulse(bus, delay, Reg::EqRecalibrate, self.cfg.pulse_us)?;
        self.report.settings = settings;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
