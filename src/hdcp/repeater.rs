//! HDCP1.4 repeater authenticator
//!
//! When the receiver acts as a repeater the upstream source expects the
//! aggregated downstream KSV list before it finishes the second part of
//! authentication. The authenticator is re-armed every time an AKSV is
//! observed while repeater mode is enabled, waits for the hardware to ask
//! for the list, then writes topology, KSVs and the READY flag.
//!
//! It runs on a deferred-work context and only blocks that context (bounded
//! sleeps), never the acquisition tick.

use embedded_hal::delay::DelayNs;

use super::HdcpConfig;
use super::ksv::{Downstream, KsvList, Topology};
use crate::driver::error::{Error, IoError, Result};
use crate::hal::regs::{Reg, RegisterBus, ksv_fifo, poll_until};
use crate::internal::constants::{HDCP14_MAX_CASCADE, HDCP14_MAX_DEVICES};
use crate::internal::trace::{rx_debug, rx_info, rx_warn};
use crate::sync::{AuthKind, Shared};

/// Repeater sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RepeaterState {
    /// Settled until the next AKSV
    #[default]
    Idle = 0,
    /// Clearing stale list/topology flags
    Start = 1,
    /// Waiting for the hardware to request the KSV list
    WaitKsv = 2,
    /// Reserved for an HDCP2.2 acknowledgment stage
    WaitAck = 3,
}

impl RepeaterState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RepeaterState::Start,
            2 => RepeaterState::WaitKsv,
            3 => RepeaterState::WaitAck,
            _ => RepeaterState::Idle,
        }
    }

    /// Authentication is in progress in this state
    #[inline]
    pub const fn is_busy(self) -> bool {
        matches!(self, RepeaterState::Start | RepeaterState::WaitKsv)
    }
}

/// How the last attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RepeaterOutcome {
    /// List written and READY asserted
    ListReady,
    /// List written but device count or depth was zero; READY not asserted
    EmptyTopology,
    /// Hardware kept waiting for the list past the timeout threshold
    Timeout,
    /// Downstream 5V disappeared
    DownstreamLost,
    /// A FIFO, drain or V' poll expired, or register access failed
    Failed,
}

/// HDCP1.4 repeater state machine
pub struct RepeaterAuthenticator {
    cfg: HdcpConfig,
    state: RepeaterState,
    delay_count: u32,
    topology: Topology,
    ksvs: KsvList,
    outcome: Option<RepeaterOutcome>,
}

impl RepeaterAuthenticator {
    /// Create an idle authenticator
    pub const fn new(cfg: HdcpConfig) -> Self {
        Self {
            cfg,
            state: RepeaterState::Idle,
            delay_count: 0,
            topology: Topology {
                device_count: 0,
                depth: 0,
                max_devs_exceeded: false,
                max_cascade_exceeded: false,
            },
            ksvs: KsvList::new(),
            outcome: None,
        }
    }

    /// Current sub-state
    #[inline]
    pub fn state(&self) -> RepeaterState {
        self.state
    }

    /// Outcome of the last finished attempt
    #[inline]
    pub fn outcome(&self) -> Option<RepeaterOutcome> {
        self.outcome
    }

    /// Waiting-for-KSV polls counted in the current attempt
    #[inline]
    pub fn delay_count(&self) -> u32 {
        self.delay_count
    }

    /// Topology read in the current attempt
    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// KSVs read in the current attempt
    #[inline]
    pub fn ksvs(&self) -> &KsvList {
        &self.ksvs
    }

    /// Begin a fresh attempt
    pub fn arm(&mut self) {
        self.clear();
        self.state = RepeaterState::Start;
    }

    /// Drop the current attempt and settle in `Idle`
    pub fn reset(&mut self) {
        self.clear();
        self.state = RepeaterState::Idle;
    }

    fn clear(&mut self) {
        self.delay_count = 0;
        self.topology = Topology::default();
        self.ksvs.clear();
    }

    /// Advance the authenticator once.
    ///
    /// Consumes a pending re-arm from the shared link, runs the current
    /// sub-state and publishes the resulting state and the HDCP1.4
    /// "authentication in progress" flag. A register failure ends the
    /// attempt as [`RepeaterOutcome::Failed`] and is then returned.
    pub fn service<B, D, S>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        shared: &Shared,
        downstream: &mut S,
    ) -> Result<RepeaterState>
    where
        B: RegisterBus,
        D: DelayNs,
        S: Downstream,
    {
        let enabled = shared.repeater.is_enabled();
        if shared.repeater.take_start() && enabled {
            rx_debug!("repeater: armed");
            self.arm();
        }
        if !enabled && self.state != RepeaterState::Idle {
            self.reset();
        }

        let result = self.step(bus, delay, downstream);
        if result.is_err() {
            self.finish(RepeaterOutcome::Failed);
        }

        shared.repeater.publish(self.state);
        shared.auth.set(AuthKind::Hdcp14, self.state.is_busy());
        result.map(|()| self.state)
    }

    fn step<B, D, S>(&mut self, bus: &mut B, delay: &mut D, downstream: &mut S) -> Result<()>
    where
        B: RegisterBus,
        D: DelayNs,
        S: Downstream,
    {
        if self.state == RepeaterState::Start {
            for reg in [
                Reg::KsvListReady,
                Reg::KsvTimeout,
                Reg::LostAuth,
                Reg::MaxDevsExceeded,
                Reg::MaxCascadeExceeded,
            ] {
                bus.write(reg, 0)?;
            }
            self.state = RepeaterState::WaitKsv;
        }

        if self.state == RepeaterState::WaitKsv {
            self.wait_ksv(bus, delay, downstream)?;
        }
        Ok(())
    }

    fn wait_ksv<B, D, S>(&mut self, bus: &mut B, delay: &mut D, downstream: &mut S) -> Result<()>
    where
        B: RegisterBus,
        D: DelayNs,
        S: Downstream,
    {
        loop {
            if !downstream.power_present() {
                self.finish(RepeaterOutcome::DownstreamLost);
                return Ok(());
            }
            if !bus.is_set(Reg::KsvWaiting)? {
                break;
            }

            self.delay_count += 1;
            if self.delay_count > self.cfg.ksv_timeout_count {
                bus.write(Reg::KsvTimeout, 1)?;
                self.finish(RepeaterOutcome::Timeout);
                return Ok(());
            }
            if self.delay_count > self.cfg.ksv_block_count {
                // keep polling on later calls, one poll each
                return Ok(());
            }
            delay.delay_ms(self.cfg.ksv_poll_ms);
        }

        self.topology = downstream.topology(&mut self.ksvs)?;
        let outcome = match self.write_ksv_list(bus, delay) {
            Ok(true) => RepeaterOutcome::ListReady,
            Ok(false) => RepeaterOutcome::EmptyTopology,
            Err(Error::Io(IoError::Timeout)) => RepeaterOutcome::Failed,
            Err(e) => return Err(e),
        };
        self.finish(outcome);
        Ok(())
    }

    /// Program BSTATUS and push the list through the KSV FIFO.
    ///
    /// Returns whether READY was asserted.
    fn write_ksv_list<B, D>(&mut self, bus: &mut B, delay: &mut D) -> Result<bool>
    where
        B: RegisterBus,
        D: DelayNs,
    {
        let topo = self.topology;
        let devs_exceeded =
            topo.max_devs_exceeded || topo.device_count > u16::from(HDCP14_MAX_DEVICES);
        let cascade_exceeded = topo.max_cascade_exceeded || topo.depth > HDCP14_MAX_CASCADE;
        let count = topo.device_count.min(u16::from(HDCP14_MAX_DEVICES));
        let depth = topo.depth.min(HDCP14_MAX_CASCADE);

        bus.write(Reg::RepeaterDeviceCount, u32::from(count))?;
        bus.set_flag(Reg::MaxDevsExceeded, devs_exceeded)?;
        bus.write(Reg::RepeaterDepth, u32::from(depth))?;
        bus.set_flag(Reg::MaxCascadeExceeded, cascade_exceeded)?;

        let cfg = self.cfg;
        for ksv in self.ksvs.as_slice() {
            poll_until(bus, delay, Reg::KsvFifoStatus, cfg.fifo_polls, cfg.fifo_poll_us, |s| {
                s & ksv_fifo::FULL == 0
            })?;
            bus.write(Reg::KsvFifoLow, ksv.low_word())?;
            bus.write(Reg::KsvFifoHigh, u32::from(ksv.high_byte()))?;
        }
        poll_until(bus, delay, Reg::KsvFifoStatus, cfg.fifo_polls, cfg.fifo_poll_us, |s| {
            s & ksv_fifo::EMPTY != 0
        })?;

        let ready = count != 0 && depth != 0;
        if ready {
            bus.write(Reg::KsvListReady, 1)?;
            poll_until(bus, delay, Reg::VPrimeReady, cfg.vprime_polls, cfg.vprime_poll_us, |v| {
                v != 0
            })?;
        }
        Ok(ready)
    }

    fn finish(&mut self, outcome: RepeaterOutcome) {
        match outcome {
            RepeaterOutcome::ListReady => {
                rx_info!("repeater: list ready, {} device(s)", self.ksvs.len());
            }
            _ => rx_warn!("repeater: attempt ended: {:?}", outcome),
        }
        self.outcome = Some(outcome);
        self.state = RepeaterState::Idle;
    }
}
