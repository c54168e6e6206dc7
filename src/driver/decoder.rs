//! Decoder lifecycle and signal queries
//!
//! The video pipeline drives the receiver through open / start / stop /
//! close and asks, once per captured frame, whether that frame should be
//! used. Lifecycle misuse is reported as [`ConfigError`]; it never touches
//! the acquisition state.

use super::context::SignalInfo;
use super::error::{ConfigError, Result};
use super::receiver::Receiver;
use super::state::{RxState, Trigger};
use crate::hal::regs::{Reg, RegisterBus};
use crate::internal::trace::rx_info;
use crate::video::VIC_UNKNOWN;

/// Verdict for one captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeStatus {
    /// Deliver the frame
    Ok,
    /// Drop the frame, the signal is still settling
    Skip,
    /// No usable signal, or the format does not match
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Open,
    Started,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecoderState {
    phase: Phase,
    format: u8,
    last_frame: Option<u32>,
}

impl DecoderState {
    pub(crate) const fn new() -> Self {
        Self {
            phase: Phase::Closed,
            format: VIC_UNKNOWN,
            last_frame: None,
        }
    }
}

impl Receiver {
    /// Open the decoder on `port`.
    ///
    /// Switching to a different port restarts acquisition on the next tick,
    /// or drops to `PowerLost` if the new port has no 5V.
    pub fn open<B: RegisterBus>(&mut self, bus: &mut B, port: u8) -> Result<()> {
        if self.decoder.phase != Phase::Closed {
            return Err(ConfigError::AlreadyOpen.into());
        }
        if port >= self.cfg.port_count {
            return Err(ConfigError::InvalidPort.into());
        }

        bus.write(Reg::PortSelect, u32::from(port))?;
        if port != self.ctx.port {
            self.ctx.port = port;
            self.pending = Some(if !self.ports.is_present(port) {
                Trigger::PowerLost
            } else if self.ctx.state == RxState::PowerLost {
                Trigger::PowerRestored
            } else {
                Trigger::Restart
            });
        }

        self.decoder.phase = Phase::Open;
        rx_info!("decoder: open on port {}", port);
        Ok(())
    }

    /// Start delivering frames of `format` (a VIC, 0 accepts any timing).
    pub fn start(&mut self, format: u8) -> Result<()> {
        if self.decoder.phase == Phase::Closed {
            return Err(ConfigError::NotOpen.into());
        }
        self.decoder.phase = Phase::Started;
        self.decoder.format = format;
        self.decoder.last_frame = None;
        Ok(())
    }

    /// Stop delivering frames; the decoder stays open.
    pub fn stop(&mut self) -> Result<()> {
        if self.decoder.phase == Phase::Closed {
            return Err(ConfigError::NotOpen.into());
        }
        self.decoder.phase = Phase::Open;
        Ok(())
    }

    /// Close the decoder. Acquisition keeps running on the current port.
    pub fn close(&mut self) -> Result<()> {
        if self.decoder.phase == Phase::Closed {
            return Err(ConfigError::NotOpen.into());
        }
        self.decoder = DecoderState::new();
        rx_info!("decoder: closed");
        Ok(())
    }

    /// Decoder is open (started or not)
    #[inline]
    pub fn is_open(&self) -> bool {
        self.decoder.phase != Phase::Closed
    }

    /// Decoder is delivering frames
    #[inline]
    pub fn is_started(&self) -> bool {
        self.decoder.phase == Phase::Started
    }

    /// Active port
    #[inline]
    pub fn port(&self) -> u8 {
        self.ctx.port
    }

    /// Per-frame decision, callable from the capture interrupt.
    ///
    /// A frame index equal to the previous one is a duplicate and skipped.
    pub fn decode_isr(&mut self, frame: u32) -> DecodeStatus {
        if self.decoder.phase != Phase::Started || self.ctx.state != RxState::SignalReady {
            return DecodeStatus::Error;
        }
        let vic = self.ctx.previous.vic;
        if self.decoder.format != VIC_UNKNOWN && self.decoder.format != vic {
            return DecodeStatus::Error;
        }

        let duplicate = self.decoder.last_frame == Some(frame);
        self.decoder.last_frame = Some(frame);
        if duplicate || self.ctx.skip_frames > 0 {
            DecodeStatus::Skip
        } else {
            DecodeStatus::Ok
        }
    }

    /// Frames should be dropped right now
    pub fn check_frame_skip(&self) -> bool {
        self.ctx.state != RxState::SignalReady || self.ctx.skip_frames > 0
    }

    /// Properties of the locked signal, `None` unless `SignalReady`
    pub fn signal_info(&self) -> Option<SignalInfo> {
        (self.ctx.state == RxState::SignalReady).then(|| self.ctx.signal_info())
    }
}
