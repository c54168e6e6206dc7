//! Measured input timing and the stability predicate

use super::vic;
use crate::driver::error::Result;
use crate::hal::regs::{Reg, RegisterBus};
use crate::internal::constants::{FRAME_RATE_TOLERANCE, LINE_TOLERANCE, PIXEL_TOLERANCE};

/// Input color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorSpace {
    /// RGB 4:4:4
    #[default]
    Rgb,
    /// YCbCr 4:2:2
    Yuv422,
    /// YCbCr 4:4:4
    Yuv444,
    /// YCbCr 4:2:0
    Yuv420,
}

impl ColorSpace {
    /// Decode the hardware color-space code (unknown codes read as RGB)
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ColorSpace::Yuv422,
            2 => ColorSpace::Yuv444,
            3 => ColorSpace::Yuv420,
            _ => ColorSpace::Rgb,
        }
    }
}

/// Per-field tolerances used when comparing two snapshots
///
/// The defaults are empirically tuned and may need adjusting per hardware
/// revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StabilityTolerance {
    /// Horizontal active/total difference allowed (pixels)
    pub pixel: u16,
    /// Vertical active/total difference allowed (lines)
    pub line: u16,
    /// Frame-rate difference allowed (hundredths of a Hz)
    pub frame_rate: u16,
}

impl StabilityTolerance {
    /// Default tolerances
    pub const fn new() -> Self {
        Self {
            pixel: PIXEL_TOLERANCE,
            line: LINE_TOLERANCE,
            frame_rate: FRAME_RATE_TOLERANCE,
        }
    }

    /// Set the pixel tolerance
    pub const fn with_pixel(mut self, pixel: u16) -> Self {
        self.pixel = pixel;
        self
    }

    /// Set the line tolerance
    pub const fn with_line(mut self, line: u16) -> Self {
        self.line = line;
        self
    }

    /// Set the frame-rate tolerance
    pub const fn with_frame_rate(mut self, frame_rate: u16) -> Self {
        self.frame_rate = frame_rate;
        self
    }
}

impl Default for StabilityTolerance {
    fn default() -> Self {
        Self::new()
    }
}

/// One reading of the timing measurement block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingSnapshot {
    /// DVI (no packets, no HDCP2.2) rather than HDMI
    pub dvi: bool,
    /// Color space
    pub color_space: ColorSpace,
    /// Bits per component
    pub color_depth: u8,
    /// Interlaced scan
    pub interlaced: bool,
    /// Horizontal active pixels
    pub h_active: u16,
    /// Vertical active lines
    pub v_active: u16,
    /// Horizontal total pixels
    pub h_total: u16,
    /// Vertical total lines
    pub v_total: u16,
    /// Pixel repetition factor (0 = none)
    pub pixel_repeat: u8,
    /// Frame rate in hundredths of a Hz
    pub frame_rate: u32,
    /// Derived video identification code (0 = unknown)
    pub vic: u8,
}

impl TimingSnapshot {
    /// All-zero snapshot
    pub const EMPTY: Self = Self {
        dvi: false,
        color_space: ColorSpace::Rgb,
        color_depth: 0,
        interlaced: false,
        h_active: 0,
        v_active: 0,
        h_total: 0,
        v_total: 0,
        pixel_repeat: 0,
        frame_rate: 0,
        vic: vic::VIC_UNKNOWN,
    };

    /// Read the measurement block and derive the VIC
    pub fn read<B: RegisterBus>(bus: &mut B) -> Result<Self> {
        let mut snap = Self {
            dvi: bus.is_set(Reg::DviMode)?,
            color_space: ColorSpace::from_raw(bus.read(Reg::ColorSpace)?),
            color_depth: bus.read(Reg::ColorDepth)? as u8,
            interlaced: bus.is_set(Reg::Interlaced)?,
            h_active: bus.read(Reg::HActive)? as u16,
            v_active: bus.read(Reg::VActive)? as u16,
            h_total: bus.read(Reg::HTotal)? as u16,
            v_total: bus.read(Reg::VTotal)? as u16,
            pixel_repeat: bus.read(Reg::PixelRepeat)? as u8,
            frame_rate: bus.read(Reg::FrameRate)?,
            vic: vic::VIC_UNKNOWN,
        };
        snap.vic = snap.classify();
        Ok(snap)
    }

    /// VIC for this timing (table lookup)
    pub fn classify(&self) -> u8 {
        vic::lookup(
            self.h_active,
            self.v_active,
            self.interlaced,
            self.is_yuv420(),
            self.frame_rate,
        )
    }

    /// 4:2:0 chroma subsampling
    #[inline]
    pub fn is_yuv420(&self) -> bool {
        self.color_space == ColorSpace::Yuv420
    }

    /// A measurement is usable once every geometry field is nonzero
    pub fn is_valid(&self) -> bool {
        self.h_active != 0 && self.v_active != 0 && self.h_total != 0 && self.v_total != 0
    }

    /// Stability predicate against a reference snapshot.
    ///
    /// Discrete fields must match exactly; geometry and frame rate may drift
    /// within `tol`. Invalid snapshots are never stable.
    pub fn matches(&self, other: &Self, tol: &StabilityTolerance) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }

        let discrete = self.dvi == other.dvi
            && self.color_space == other.color_space
            && self.color_depth == other.color_depth
            && self.interlaced == other.interlaced
            && self.pixel_repeat == other.pixel_repeat;

        discrete
            && self.h_active.abs_diff(other.h_active) <= tol.pixel
            && self.h_total.abs_diff(other.h_total) <= tol.pixel
            && self.v_active.abs_diff(other.v_active) <= tol.line
            && self.v_total.abs_diff(other.v_total) <= tol.line
            && self.frame_rate.abs_diff(other.frame_rate) <= u32::from(tol.frame_rate)
    }
}
