//! Receiver: the acquisition state machine
//!
//! [`Receiver::tick`] is called at about 100 Hz. Each call:
//!
//! 1. drains the interrupt events posted since the previous tick,
//! 2. samples the 5V sense lines,
//! 3. runs one non-blocking step of the current state,
//! 4. applies at most one transition through the transition table,
//!    running the entry actions of the new state.
//!
//! The tick never blocks. Equalization and the repeater handshake run on
//! their own contexts and are coordinated through [`Shared`].
//!
//! # Example
//!
//! ```ignore
//! use ph_hdmirx::{Receiver, RxConfig, Shared, SharedBus};
//!
//! static SHARED: Shared = Shared::new();
//! static BUS: SharedBus<PlatformRegs> = SharedBus::new(PlatformRegs::new());
//!
//! let mut rx = Receiver::new(RxConfig::new())?;
//! rx.open(&mut BUS.handle(), 0)?;
//!
//! // 100 Hz timer
//! rx.tick(&mut BUS.handle(), &SHARED, &mut ())?;
//! ```

use super::config::RxConfig;
use super::context::{AcquisitionContext, AudioInfo, PacketFlags};
use super::decoder::DecoderState;
use super::error::{ConfigResult, ErrorCode, Result};
use super::observer::RxObserver;
use super::recovery::{Escalation, RecoveryPolicy};
use super::state::{RxState, Trigger, transition};
use crate::hal::regs::{Reg, RegisterBus};
use crate::hdcp::{Hdcp14Status, HdcpVersion};
use crate::internal::trace::{rx_debug, rx_info, rx_warn};
use crate::monitor::{LockProgress, PortMonitor, PowerChange, clock};
use crate::sync::{EqStatus, RxEvent, Shared};
use crate::video::{TimingSnapshot, VIC_UNKNOWN};

/// HDMI receiver core
pub struct Receiver {
    pub(crate) cfg: RxConfig,
    pub(crate) ctx: AcquisitionContext,
    pub(crate) ports: PortMonitor,
    pub(crate) decoder: DecoderState,
    pub(crate) pending: Option<Trigger>,
    recovery: RecoveryPolicy,
}

impl Receiver {
    /// Create a receiver in `PowerLost`, waiting for 5V on port 0.
    pub fn new(cfg: RxConfig) -> ConfigResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            ctx: AcquisitionContext::new(),
            ports: PortMonitor::new(cfg.pow5v_debounce, cfg.port_count),
            decoder: DecoderState::new(),
            pending: None,
            recovery: RecoveryPolicy::new(),
        })
    }

    /// Configuration in use
    #[inline]
    pub fn config(&self) -> &RxConfig {
        &self.cfg
    }

    /// Acquisition context (read-only)
    #[inline]
    pub fn context(&self) -> &AcquisitionContext {
        &self.ctx
    }

    /// Current FSM state
    #[inline]
    pub fn state(&self) -> RxState {
        self.ctx.state
    }

    /// Sticky advisory error
    #[inline]
    pub fn error(&self) -> ErrorCode {
        self.ctx.error
    }

    /// Debounced 5V mask of all ports
    #[inline]
    pub fn power_mask(&self) -> u32 {
        self.ports.mask()
    }

    /// Hot-plug escalation still available
    #[inline]
    pub fn can_escalate(&self) -> bool {
        self.recovery.can_reset()
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance the acquisition loop by one tick.
    ///
    /// Returns the state after the tick. A register failure leaves the
    /// state unchanged so the next tick retries.
    pub fn tick<B, O>(&mut self, bus: &mut B, shared: &Shared, observer: &mut O) -> Result<RxState>
    where
        B: RegisterBus,
        O: RxObserver,
    {
        self.ctx.ticks = self.ctx.ticks.wrapping_add(1);
        self.ctx.state_ticks = self.ctx.state_ticks.saturating_add(1);

        self.drain_events(bus, shared)?;

        let trigger = match self.ports.sample(bus, self.ctx.port)? {
            Some(change) => {
                self.pending = None;
                Some(match change {
                    PowerChange::Lost => Trigger::PowerLost,
                    PowerChange::Restored => Trigger::PowerRestored,
                })
            }
            None => match self.pending.take() {
                Some(trigger) => Some(trigger),
                None => self.step(bus, shared, observer)?,
            },
        };

        if let Some(trigger) = trigger {
            self.apply(trigger, bus, shared, observer)?;
        }
        Ok(self.ctx.state)
    }

    fn drain_events<B: RegisterBus>(&mut self, bus: &mut B, shared: &Shared) -> Result<()> {
        while let Some(event) = shared.events.pop() {
            match event {
                RxEvent::PacketReady => self.ctx.packets = PacketFlags::read(bus)?,
                RxEvent::PowerChanged => rx_debug!("event: 5V changed"),
                RxEvent::AksvReceived => {
                    self.ctx.hdcp_version = HdcpVersion::V14;
                    if shared.repeater.is_enabled() {
                        shared.repeater.request_start();
                    }
                }
                RxEvent::Hdcp22Started => self.ctx.hdcp_version = HdcpVersion::V22,
                RxEvent::EdidUpdated => {
                    self.ctx.edid_pending = true;
                    self.pending = Some(Trigger::Restart);
                }
            }
        }
        Ok(())
    }

    fn apply<B, O>(
        &mut self,
        trigger: Trigger,
        bus: &mut B,
        shared: &Shared,
        observer: &mut O,
    ) -> Result<()>
    where
        B: RegisterBus,
        O: RxObserver,
    {
        let Some(next) = transition(self.ctx.state, trigger) else {
            rx_debug!("fsm: {:?} ignored in {}", trigger, self.ctx.state.as_str());
            return Ok(());
        };

        let from = self.ctx.state;
        self.ctx.prev_state = from;
        self.ctx.state = next;
        self.ctx.state_ticks = 0;
        rx_info!("fsm: {} -> {}", from.as_str(), next.as_str());
        observer.state_changed(from, next);

        match next {
            RxState::PowerLost => {
                self.ctx.clock.reset();
                self.ctx.pll.reset();
                self.ctx.timing.reset();
                self.ctx.unnormal = 0;
                self.ctx.unready = 0;
                self.ctx.skip_frames = 0;
                self.raise(ErrorCode::PowerLost, observer);
                self.hotplug(bus, shared, false)?;
            }
            RxState::HotplugLow => self.hotplug(bus, shared, false)?,
            RxState::WaitClockStable => self.ctx.clock.reset(),
            RxState::WaitPhyLock => self.ctx.pll.reset(),
            RxState::TimingStable => {
                self.ctx.timing.reset();
                self.ctx.unnormal = 0;
            }
            RxState::SignalReady => {
                self.ctx.skip_frames = self.cfg.skip_frames;
                self.ctx.audio = AudioInfo::default();
                self.ctx.unready = 0;
                self.ctx.ready_at = Some(self.ctx.ticks);
                self.ctx.boot = false;
                rx_info!("fsm: signal ready, vic {}", self.ctx.previous.vic);
            }
            _ => {}
        }
        Ok(())
    }

    fn step<B, O>(&mut self, bus: &mut B, shared: &Shared, observer: &mut O) -> Result<Option<Trigger>>
    where
        B: RegisterBus,
        O: RxObserver,
    {
        let cfg = self.cfg;
        let ticks = self.ctx.state_ticks;

        match self.ctx.state {
            RxState::PowerLost => Ok(None),
            RxState::Init => {
                self.init(bus, shared)?;
                Ok(Some(Trigger::Proceed))
            }
            RxState::HotplugLow => {
                let mut window = cfg.hpd_low_ticks;
                if self.ctx.edid_pending || self.ctx.boot {
                    window = window.saturating_mul(cfg.hpd_extend_factor);
                }
                if ticks < window {
                    return Ok(None);
                }
                self.hotplug(bus, shared, true)?;
                Ok(Some(Trigger::Proceed))
            }
            RxState::HotplugHigh => Ok((ticks >= cfg.hpd_high_ticks).then_some(Trigger::Proceed)),
            RxState::WaitClockStable => {
                let stable = clock::is_stable(bus)?;
                let progress =
                    self.ctx
                        .clock
                        .record(stable, cfg.clk_stable_count, cfg.clk_unstable_max);
                Ok(match progress {
                    LockProgress::Passed => Some(Trigger::Proceed),
                    LockProgress::Exhausted => self.escalate(ErrorCode::ClockUnstable, observer),
                    LockProgress::Pending => None,
                })
            }
            RxState::EqualizeStart => {
                shared.eq.acknowledge();
                Ok(shared.eq.request().then_some(Trigger::Proceed))
            }
            RxState::WaitEqualizeDone => Ok(self.wait_equalizer(shared)),
            RxState::WaitPhyLock => {
                let locked = clock::is_pll_locked(bus)?;
                match self.ctx.pll.record(locked, cfg.pll_lock_count, cfg.pll_unlock_max) {
                    LockProgress::Passed => {
                        bus.write(Reg::SoftReset, 1)?;
                        bus.write(Reg::SoftReset, 0)?;
                        Ok(Some(Trigger::Proceed))
                    }
                    LockProgress::Exhausted => Ok(self.escalate(ErrorCode::PhyUnlock, observer)),
                    LockProgress::Pending => Ok(None),
                }
            }
            RxState::WaitTimingStable => {
                let settle = if self.ctx.edid_pending {
                    cfg.settle_ticks_edid
                } else {
                    cfg.settle_ticks
                };
                if ticks < settle {
                    return Ok(None);
                }
                let snap = TimingSnapshot::read(bus)?;
                self.ctx.previous = snap;
                self.ctx.current = snap;
                self.ctx.edid_pending = false;
                Ok(Some(Trigger::Proceed))
            }
            RxState::TimingStable => self.sample_timing(bus, observer),
            RxState::SignalReady => self.monitor_ready(bus, observer),
        }
    }

    /// `Init` entry work. Running it twice leaves the same state as once.
    pub(crate) fn init<B: RegisterBus>(&mut self, bus: &mut B, shared: &Shared) -> Result<()> {
        self.ctx.reset_counters();
        self.recovery.rearm();
        self.hotplug(bus, shared, false)?;
        if self.cfg.hdcp22_present {
            bus.write(Reg::Hdcp22Ready, 0)?;
        }
        Ok(())
    }

    fn wait_equalizer(&mut self, shared: &Shared) -> Option<Trigger> {
        match shared.eq.status() {
            status @ (EqStatus::Done | EqStatus::Degraded) => {
                self.ctx.eq_settings = shared.eq.settings();
                self.ctx.eq_degraded = status == EqStatus::Degraded;
                shared.eq.acknowledge();
                if self.ctx.eq_degraded {
                    rx_warn!("fsm: equalizer degraded, proceeding");
                }
                Some(Trigger::Proceed)
            }
            EqStatus::Cancelled | EqStatus::Idle => {
                shared.eq.acknowledge();
                Some(Trigger::Retry)
            }
            EqStatus::Requested | EqStatus::Running => {
                if self.ctx.state_ticks <= self.cfg.eq_wait_max {
                    return None;
                }
                rx_warn!("fsm: equalizer overdue, proceeding without it");
                shared.eq.cancel();
                self.ctx.eq_degraded = true;
                Some(Trigger::Proceed)
            }
        }
    }

    fn sample_timing<B, O>(&mut self, bus: &mut B, observer: &mut O) -> Result<Option<Trigger>>
    where
        B: RegisterBus,
        O: RxObserver,
    {
        let cfg = self.cfg;
        if !clock::is_pll_locked(bus)? {
            return Ok(Some(Trigger::Relock));
        }

        let snap = TimingSnapshot::read(bus)?;
        self.ctx.current = snap;
        let hdcp_incomplete = self.check_hdcp14(bus, observer)?;

        if !snap.matches(&self.ctx.previous, &cfg.tolerance) {
            self.ctx.previous = snap;
            let progress =
                self.ctx
                    .timing
                    .record(false, cfg.timing_stable_count, cfg.timing_unstable_max);
            return Ok(match progress {
                LockProgress::Exhausted => self.escalate(ErrorCode::TimingUnstable, observer),
                _ => None,
            });
        }

        let progress = self
            .ctx
            .timing
            .record(true, cfg.timing_stable_count, cfg.timing_unstable_max);
        if progress != LockProgress::Passed {
            return Ok(None);
        }

        let unnormal = snap.vic == VIC_UNKNOWN || snap.dvi || hdcp_incomplete;
        if unnormal {
            if self.ctx.unnormal < cfg.unnormal_wait_max {
                self.ctx.unnormal += 1;
                return Ok(None);
            }
            rx_warn!("fsm: unusual format (vic {}, dvi {}), proceeding", snap.vic, snap.dvi);
        }
        Ok(Some(Trigger::Proceed))
    }

    fn monitor_ready<B, O>(&mut self, bus: &mut B, observer: &mut O) -> Result<Option<Trigger>>
    where
        B: RegisterBus,
        O: RxObserver,
    {
        let cfg = self.cfg;
        self.ctx.skip_frames = self.ctx.skip_frames.saturating_sub(1);

        let locked = clock::is_pll_locked(bus)?;
        let snap = TimingSnapshot::read(bus)?;
        self.ctx.current = snap;
        self.check_hdcp14(bus, observer)?;

        if locked && snap.matches(&self.ctx.previous, &cfg.tolerance) {
            self.ctx.unready = 0;
            let audio = AudioInfo::read(bus)?;
            if audio != self.ctx.audio {
                self.ctx.audio = audio;
                rx_debug!("fsm: audio {} Hz, coding {}", audio.sample_rate, audio.coding);
                observer.audio_changed(audio);
            }
            return Ok(None);
        }

        self.raise(ErrorCode::TimingChanged, observer);
        self.ctx.unready = self.ctx.unready.saturating_add(1);
        if self.ctx.unready > cfg.unready_max {
            return Ok(Some(Trigger::Unwind));
        }
        Ok(None)
    }

    /// Returns whether HDCP1.4 is mid-authentication. Reports a missing key
    /// once if it is stuck there with both KSV registers zero.
    fn check_hdcp14<B, O>(&mut self, bus: &mut B, observer: &mut O) -> Result<bool>
    where
        B: RegisterBus,
        O: RxObserver,
    {
        let status = Hdcp14Status::from_raw(bus.read(Reg::Hdcp14Status)?);
        if !status.is_intermediate() {
            return Ok(false);
        }
        if !self.ctx.missing_key_reported {
            let aksv = bus.read(Reg::Hdcp14Aksv)?;
            let bksv = bus.read(Reg::Hdcp14Bksv)?;
            if aksv == 0 && bksv == 0 {
                self.ctx.missing_key_reported = true;
                self.raise(ErrorCode::MissingKey, observer);
            }
        }
        Ok(true)
    }

    fn escalate<O: RxObserver>(&mut self, code: ErrorCode, observer: &mut O) -> Option<Trigger> {
        match self.recovery.escalate() {
            Escalation::HotplugReset => {
                rx_warn!("fsm: {} in {}, toggling hot-plug", code.as_str(), self.ctx.state.as_str());
                Some(Trigger::HotplugReset)
            }
            Escalation::Sticky => {
                self.raise(code, observer);
                None
            }
        }
    }

    fn raise<O: RxObserver>(&mut self, code: ErrorCode, observer: &mut O) {
        if self.ctx.error == code {
            return;
        }
        self.ctx.error = code;
        rx_warn!("fsm: error {}", code.as_str());
        observer.error_raised(code);
    }

    fn hotplug<B: RegisterBus>(&mut self, bus: &mut B, shared: &Shared, on: bool) -> Result<()> {
        bus.set_flag(Reg::Hotplug(self.ctx.port), on)?;
        shared.set_hotplug(on);
        Ok(())
    }

    // =========================================================================
    // Authentication Control
    // =========================================================================

    /// Enable the HDCP1.4 engine
    pub fn enable_hdcp<B: RegisterBus>(&mut self, bus: &mut B) -> Result<()> {
        bus.write(Reg::Hdcp14Enable, 1)
    }

    /// Disable the HDCP1.4 engine and forget the observed version
    pub fn disable_hdcp<B: RegisterBus>(&mut self, bus: &mut B) -> Result<()> {
        bus.write(Reg::Hdcp14Enable, 0)?;
        self.ctx.hdcp_version = HdcpVersion::None;
        Ok(())
    }

    /// Enable or disable repeater mode
    pub fn set_repeater<B: RegisterBus>(
        &mut self,
        bus: &mut B,
        shared: &Shared,
        enabled: bool,
    ) -> Result<()> {
        bus.set_flag(Reg::RepeaterEnable, enabled)?;
        shared.repeater.set_enabled(enabled);
        Ok(())
    }

    /// Restart acquisition from `Init` on the next tick
    pub fn force_restart(&mut self) {
        self.pending = Some(Trigger::Restart);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
