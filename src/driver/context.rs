//! Acquisition context
//!
//! Everything the acquisition FSM knows about the link. It is owned by the
//! [`super::Receiver`] and written only from the tick; other contexts learn
//! about it through [`crate::sync::Shared`] and the observer hook.

use super::error::{ErrorCode, Result};
use super::state::RxState;
use crate::hal::regs::{Reg, RegisterBus};
use crate::hdcp::HdcpVersion;
use crate::internal::constants::EQ_CHANNELS;
use crate::monitor::LockCounter;
use crate::video::{ColorSpace, TimingSnapshot};

/// Audio format forwarded while the signal is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioInfo {
    /// Sample rate in Hz (0 = no audio)
    pub sample_rate: u32,
    /// Coding type from the audio infoframe
    pub coding: u8,
}

impl AudioInfo {
    pub(crate) fn read<B: RegisterBus>(bus: &mut B) -> Result<Self> {
        Ok(Self {
            sample_rate: bus.read(Reg::AudioSampleRate)?,
            coding: bus.read(Reg::AudioCoding)? as u8,
        })
    }
}

/// Flags refreshed from infoframes/vendor packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketFlags {
    /// HDR static metadata present
    pub hdr: bool,
    /// Dolby Vision vendor packet present
    pub dolby_vision: bool,
    /// 3D structure (0 = 2D)
    pub video_3d: u8,
}

impl PacketFlags {
    pub(crate) fn read<B: RegisterBus>(bus: &mut B) -> Result<Self> {
        Ok(Self {
            hdr: bus.is_set(Reg::HdrActive)?,
            dolby_vision: bus.is_set(Reg::DolbyVision)?,
            video_3d: bus.read(Reg::Video3d)? as u8,
        })
    }
}

/// Signal properties reported while the signal is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalInfo {
    /// Active width
    pub width: u16,
    /// Active height
    pub height: u16,
    /// Interlaced scan
    pub interlaced: bool,
    /// DVI source
    pub dvi: bool,
    /// Color space
    pub color_space: ColorSpace,
    /// Bits per component
    pub color_depth: u8,
    /// Frame rate in hundredths of a Hz
    pub frame_rate: u32,
    /// Video identification code (0 = unknown)
    pub vic: u8,
    /// HDR static metadata present
    pub hdr: bool,
    /// Dolby Vision present
    pub dolby_vision: bool,
    /// 3D structure
    pub video_3d: u8,
    /// HDCP generation in use
    pub hdcp: HdcpVersion,
}

/// State owned by the acquisition FSM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionContext {
    pub(crate) state: RxState,
    pub(crate) prev_state: RxState,
    pub(crate) error: ErrorCode,
    pub(crate) port: u8,
    pub(crate) boot: bool,
    pub(crate) edid_pending: bool,
    pub(crate) ticks: u32,
    pub(crate) state_ticks: u16,
    pub(crate) skip_frames: u16,
    pub(crate) previous: TimingSnapshot,
    pub(crate) current: TimingSnapshot,
    pub(crate) clock: LockCounter,
    pub(crate) pll: LockCounter,
    pub(crate) timing: LockCounter,
    pub(crate) unnormal: u16,
    pub(crate) unready: u16,
    pub(crate) ready_at: Option<u32>,
    pub(crate) hdcp_version: HdcpVersion,
    pub(crate) missing_key_reported: bool,
    pub(crate) audio: AudioInfo,
    pub(crate) packets: PacketFlags,
    pub(crate) eq_settings: [u8; EQ_CHANNELS],
    pub(crate) eq_degraded: bool,
}

impl AcquisitionContext {
    pub(crate) const fn new() -> Self {
        Self {
            state: RxState::PowerLost,
            prev_state: RxState::PowerLost,
            error: ErrorCode::None,
            port: 0,
            boot: true,
            edid_pending: false,
            ticks: 0,
            state_ticks: 0,
            skip_frames: 0,
            previous: TimingSnapshot::EMPTY,
            current: TimingSnapshot::EMPTY,
            clock: LockCounter::new(),
            pll: LockCounter::new(),
            timing: LockCounter::new(),
            unnormal: 0,
            unready: 0,
            ready_at: None,
            hdcp_version: HdcpVersion::None,
            missing_key_reported: false,
            audio: AudioInfo {
                sample_rate: 0,
                coding: 0,
            },
            packets: PacketFlags {
                hdr: false,
                dolby_vision: false,
                video_3d: 0,
            },
            eq_settings: [0; EQ_CHANNELS],
            eq_degraded: false,
        }
    }

    /// Reset everything `Init` owns. Port, boot and EDID-pending state,
    /// the tick clock and the FSM position survive.
    pub(crate) fn reset_counters(&mut self) {
        self.state_ticks = 0;
        self.skip_frames = 0;
        self.previous = TimingSnapshot::EMPTY;
        self.current = TimingSnapshot::EMPTY;
        self.clock.reset();
        self.pll.reset();
        self.timing.reset();
        self.unnormal = 0;
        self.unready = 0;
        self.hdcp_version = HdcpVersion::None;
        self.missing_key_reported = false;
        self.error = ErrorCode::None;
        self.audio = AudioInfo::default();
        self.packets = PacketFlags::default();
    }

    /// Current FSM state
    #[inline]
    pub fn state(&self) -> RxState {
        self.state
    }

    /// State before the last transition
    #[inline]
    pub fn previous_state(&self) -> RxState {
        self.prev_state
    }

    /// Sticky advisory error
    #[inline]
    pub fn error(&self) -> ErrorCode {
        self.error
    }

    /// Active port
    #[inline]
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Ticks since creation
    #[inline]
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Frames still to be suppressed
    #[inline]
    pub fn skip_frames(&self) -> u16 {
        self.skip_frames
    }

    /// Last timing judged stable
    #[inline]
    pub fn previous_timing(&self) -> &TimingSnapshot {
        &self.previous
    }

    /// Latest timing reading
    #[inline]
    pub fn current_timing(&self) -> &TimingSnapshot {
        &self.current
    }

    /// Clock debounce counters
    #[inline]
    pub fn clock_counter(&self) -> &LockCounter {
        &self.clock
    }

    /// PLL debounce counters
    #[inline]
    pub fn pll_counter(&self) -> &LockCounter {
        &self.pll
    }

    /// Timing debounce counters
    #[inline]
    pub fn timing_counter(&self) -> &LockCounter {
        &self.timing
    }

    /// Tick at which `SignalReady` was last entered
    #[inline]
    pub fn ready_at(&self) -> Option<u32> {
        self.ready_at
    }

    /// HDCP generation observed
    #[inline]
    pub fn hdcp_version(&self) -> HdcpVersion {
        self.hdcp_version
    }

    /// Last audio format forwarded
    #[inline]
    pub fn audio(&self) -> AudioInfo {
        self.audio
    }

    /// Packet-derived flags
    #[inline]
    pub fn packets(&self) -> PacketFlags {
        self.packets
    }

    /// Equalizer settings reported by the last run, and whether it degraded
    #[inline]
    pub fn equalizer(&self) -> ([u8; EQ_CHANNELS], bool) {
        (self.eq_settings, self.eq_degraded)
    }

    /// An EDID update is waiting to be picked up by the source
    #[inline]
    pub fn edid_pending(&self) -> bool {
        self.edid_pending
    }

    pub(crate) fn signal_info(&self) -> SignalInfo {
        let t = &self.previous;
        SignalInfo {
            width: t.h_active,
            height: t.v_active,
            interlaced: t.interlaced,
            dvi: t.dvi,
            color_space: t.color_space,
            color_depth: t.color_depth,
            frame_rate: t.frame_rate,
            vic: t.vic,
            hdr: self.packets.hdr,
            dolby_vision: self.packets.dolby_vision,
            video_3d: self.packets.video_3d,
            hdcp: self.hdcp_version,
        }
    }
}

impl Default for AcquisitionContext {
    fn default() -> Self {
        Self::new()
    }
}
