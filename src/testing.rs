//! Testing utilities and mock implementations
//!
//! Mock collaborators for exercising the receiver core on the host without
//! hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use std::collections::{HashMap, VecDeque};
use std::vec::Vec;

use crate::driver::context::AudioInfo;
use crate::driver::error::{ErrorCode, IoError, Result};
use crate::driver::RxObserver;
use crate::driver::state::RxState;
use crate::hal::regs::{Reg, RegisterBus, ksv_fifo};
use crate::hdcp::{Downstream, Ksv, KsvList, Topology};
use crate::internal::constants::EQ_CHANNELS;

/// Sweep settings covered by a synthetic equalizer curve
pub const CURVE_LEN: usize = 16;

/// Early-arrival count per sweep setting; `None` means TMDS not valid
pub type EqCurve = [Option<u32>; CURVE_LEN];

// =============================================================================
// Mock Register Bus
// =============================================================================

/// Mock register collaborator
///
/// Registers read back their last written (or `set`) value, default 0.
/// Per-register read queues override the stored value until drained.
///
/// With [`MockBus::set_eq_curves`], `TmdsValid` and `EarlyCounter(ch)` are
/// derived from the current `EqSweepSetting`, which lets equalizer runs be
/// driven by a synthetic attenuation curve.
///
/// Writes to `KsvFifoHigh` commit a KSV built from the last `KsvFifoLow`
/// word; committed entries are available through [`MockBus::fifo_entries`].
///
/// # Example
///
/// ```ignore
/// let mut bus = MockBus::new();
/// bus.set(Reg::ClockValid, 1);
/// bus.queue_reads(Reg::PllLock, &[0, 1, 1]);
/// ```
#[derive(Debug)]
pub struct MockBus {
    registers: HashMap<Reg, u32>,
    read_queues: HashMap<Reg, VecDeque<u32>>,
    read_counts: HashMap<Reg, usize>,
    write_log: Vec<(Reg, u32)>,
    eq_curves: Option<[EqCurve; EQ_CHANNELS]>,
    fifo_low: u32,
    fifo_entries: Vec<[u8; 5]>,
    failing: Option<Reg>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBus {
    /// Create a mock bus with an empty, drained KSV FIFO
    pub fn new() -> Self {
        let mut registers = HashMap::new();
        registers.insert(Reg::KsvFifoStatus, ksv_fifo::EMPTY);
        Self {
            registers,
            read_queues: HashMap::new(),
            read_counts: HashMap::new(),
            write_log: Vec::new(),
            eq_curves: None,
            fifo_low: 0,
            fifo_entries: Vec::new(),
            failing: None,
        }
    }

    /// Set a register value without logging a write
    pub fn set(&mut self, reg: Reg, value: u32) {
        self.registers.insert(reg, value);
    }

    /// Current stored value of a register
    pub fn get(&self, reg: Reg) -> u32 {
        self.registers.get(&reg).copied().unwrap_or(0)
    }

    /// Script the next reads of a register
    pub fn queue_reads(&mut self, reg: Reg, values: &[u32]) {
        self.read_queues
            .entry(reg)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Number of reads performed on a register
    pub fn read_count(&self, reg: Reg) -> usize {
        self.read_counts.get(&reg).copied().unwrap_or(0)
    }

    /// Values written to a register, in order
    pub fn writes_to(&self, reg: Reg) -> Vec<u32> {
        self.write_log
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .collect()
    }

    /// All writes, in order
    pub fn writes(&self) -> &[(Reg, u32)] {
        &self.write_log
    }

    /// Drive `TmdsValid`/`EarlyCounter` from synthetic per-channel curves
    pub fn set_eq_curves(&mut self, curves: [EqCurve; EQ_CHANNELS]) {
        self.eq_curves = Some(curves);
    }

    /// KSVs committed to the FIFO
    pub fn fifo_entries(&self) -> &[[u8; 5]] {
        &self.fifo_entries
    }

    /// Make every access to `reg` fail with a bus error
    pub fn fail_on(&mut self, reg: Reg) {
        self.failing = Some(reg);
    }

    fn curve_value(&self, channel: usize) -> Option<u32> {
        let curves = self.eq_curves.as_ref()?;
        let setting = self.get(Reg::EqSweepSetting) as usize;
        curves.get(channel)?.get(setting).copied().flatten()
    }

    fn derived(&self, reg: Reg) -> Option<u32> {
        self.eq_curves.as_ref()?;
        match reg {
            Reg::TmdsValid => Some(
                (0..EQ_CHANNELS)
                    .filter(|&ch| self.curve_value(ch).is_some())
                    .fold(0, |mask, ch| mask | (1 << ch)),
            ),
            Reg::EarlyCounter(ch) => Some(self.curve_value(ch as usize).unwrap_or(0)),
            _ => None,
        }
    }
}

impl RegisterBus for MockBus {
    fn read(&mut self, reg: Reg) -> Result<u32> {
        if self.failing == Some(reg) {
            return Err(IoError::Bus.into());
        }
        *self.read_counts.entry(reg).or_insert(0) += 1;

        if let Some(value) = self.read_queues.get_mut(&reg).and_then(VecDeque::pop_front) {
            return Ok(value);
        }
        if let Some(value) = self.derived(reg) {
            return Ok(value);
        }
        Ok(self.get(reg))
    }

    fn write(&mut self, reg: Reg, value: u32) -> Result<()> {
        if self.failing == Some(reg) {
            return Err(IoError::Bus.into());
        }
        self.write_log.push((reg, value));
        self.registers.insert(reg, value);

        match reg {
            Reg::KsvFifoLow => self.fifo_low = value,
            Reg::KsvFifoHigh => {
                let low = self.fifo_low.to_le_bytes();
                self.fifo_entries
                    .push([low[0], low[1], low[2], low[3], value as u8]);
            }
            _ => {}
        }
        Ok(())
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records requested delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }

    /// Total milliseconds that were "delayed"
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// =============================================================================
// Mock Downstream
// =============================================================================

/// Mock downstream (transmitter-side) topology source
#[derive(Debug, Clone)]
pub struct MockDownstream {
    pub power: bool,
    pub device_count: u16,
    pub depth: u8,
    pub max_devs_exceeded: bool,
    pub max_cascade_exceeded: bool,
    pub ksvs: Vec<[u8; 5]>,
    pub fail: bool,
    pub topology_reads: usize,
}

impl MockDownstream {
    /// Powered downstream with the given KSVs at depth 1
    pub fn with_ksvs(ksvs: &[[u8; 5]]) -> Self {
        Self {
            power: true,
            device_count: ksvs.len() as u16,
            depth: u8::from(!ksvs.is_empty()),
            max_devs_exceeded: false,
            max_cascade_exceeded: false,
            ksvs: ksvs.to_vec(),
            fail: false,
            topology_reads: 0,
        }
    }

    /// Downstream without 5V
    pub fn unpowered() -> Self {
        Self {
            power: false,
            ..Self::with_ksvs(&[])
        }
    }
}

impl Downstream for MockDownstream {
    fn power_present(&mut self) -> bool {
        self.power
    }

    fn topology(&mut self, ksvs: &mut KsvList) -> Result<Topology> {
        self.topology_reads += 1;
        if self.fail {
            return Err(IoError::Bus.into());
        }
        ksvs.clear();
        for bytes in &self.ksvs {
            ksvs.push(Ksv(*bytes));
        }
        Ok(Topology {
            device_count: self.device_count,
            depth: self.depth,
            max_devs_exceeded: self.max_devs_exceeded,
            max_cascade_exceeded: self.max_cascade_exceeded,
        })
    }
}

// =============================================================================
// Recording Observer
// =============================================================================

/// Observer that records every callback
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub transitions: Vec<(RxState, RxState)>,
    pub errors: Vec<ErrorCode>,
    pub audio: Vec<AudioInfo>,
}

impl RecordingObserver {
    /// Number of times `state` was entered
    pub fn entries(&self, state: RxState) -> usize {
        self.transitions.iter().filter(|(_, to)| *to == state).count()
    }

    /// States entered, in order
    pub fn path(&self) -> Vec<RxState> {
        self.transitions.iter().map(|(_, to)| *to).collect()
    }
}

impl RxObserver for RecordingObserver {
    fn state_changed(&mut self, from: RxState, to: RxState) {
        self.transitions.push((from, to));
    }

    fn error_raised(&mut self, code: ErrorCode) {
        self.errors.push(code);
    }

    fn audio_changed(&mut self, audio: AudioInfo) {
        self.audio.push(audio);
    }
}

// =============================================================================
// Curve Builders
// =============================================================================

/// Curve that is TMDS-valid at every setting, with the given counts
/// (settings past the slice repeat the last value).
pub fn curve(counts: &[u32]) -> EqCurve {
    let mut out = [None; CURVE_LEN];
    let last = counts.last().copied().unwrap_or(0);
    for (setting, slot) in out.iter_mut().enumerate() {
        *slot = Some(counts.get(setting).copied().unwrap_or(last));
    }
    out
}

/// Curve falling by `step` per setting from `start`
pub fn ramp(start: u32, step: u32) -> EqCurve {
    let mut out = [None; CURVE_LEN];
    for (setting, slot) in out.iter_mut().enumerate() {
        *slot = Some(start.saturating_sub(step * setting as u32));
    }
    out
}

/// Curve that never reports TMDS valid
pub fn dead_curve() -> EqCurve {
    [None; CURVE_LEN]
}
