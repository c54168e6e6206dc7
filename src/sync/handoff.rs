//! Cross-context handoffs.
//!
//! The acquisition tick, the equalizer worker and the repeater worker never
//! share a lock on their state. They exchange small status words instead,
//! written with `Release` and read with `Acquire` so that anything written
//! before a status store is visible to whoever observes that status.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::event::EventQueue;
use crate::hdcp::RepeaterState;
use crate::internal::constants::EQ_CHANNELS;

// =============================================================================
// Equalizer Handoff
// =============================================================================

/// Equalizer run status as seen by the acquisition tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EqStatus {
    /// No run requested
    Idle = 0,
    /// Run requested, worker has not picked it up
    Requested = 1,
    /// Worker is sweeping
    Running = 2,
    /// Run finished with consistent settings
    Done = 3,
    /// Run exhausted its attempts; error-cable settings applied
    Degraded = 4,
    /// Run aborted (hot-plug de-asserted or request withdrawn) or its
    /// settings could not be programmed
    Cancelled = 5,
}

impl EqStatus {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => EqStatus::Requested,
            2 => EqStatus::Running,
            3 => EqStatus::Done,
            4 => EqStatus::Degraded,
            5 => EqStatus::Cancelled,
            _ => EqStatus::Idle,
        }
    }

    /// True while a run is queued or executing
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, EqStatus::Requested | EqStatus::Running)
    }

    /// True once a run has produced a result the tick has not consumed
    #[inline]
    pub const fn is_finished(self) -> bool {
        matches!(self, EqStatus::Done | EqStatus::Degraded | EqStatus::Cancelled)
    }
}

/// Request/complete handoff between the tick and the equalizer worker
pub struct EqHandoff {
    status: AtomicU8,
    cancel: AtomicBool,
    settings: [AtomicU8; EQ_CHANNELS],
}

impl EqHandoff {
    /// Create an idle handoff
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(EqStatus::Idle as u8),
            cancel: AtomicBool::new(false),
            settings: [const { AtomicU8::new(0) }; EQ_CHANNELS],
        }
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> EqStatus {
        EqStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Ask the worker for a run.
    ///
    /// Returns `false` without changing anything while a previous run is
    /// still queued or executing.
    pub fn request(&self) -> bool {
        if self.status().is_active() {
            return false;
        }
        self.cancel.store(false, Ordering::Release);
        self.status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                if EqStatus::from_u8(raw).is_active() {
                    None
                } else {
                    Some(EqStatus::Requested as u8)
                }
            })
            .is_ok()
    }

    /// Tick side: withdraw the current request.
    ///
    /// A request the worker has not claimed yet finishes as `Cancelled`
    /// straight away. A running sweep sees the flag at its next setting and
    /// stops without programming anything.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        let _ = self.status.compare_exchange(
            EqStatus::Requested as u8,
            EqStatus::Cancelled as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Worker side: the tick has withdrawn the request being served
    #[inline]
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Worker side: claim a pending request.
    pub fn take_request(&self) -> bool {
        self.status
            .compare_exchange(
                EqStatus::Requested as u8,
                EqStatus::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Worker side: publish the chosen settings and the final status.
    pub fn complete(&self, status: EqStatus, settings: [u8; EQ_CHANNELS]) {
        for (slot, value) in self.settings.iter().zip(settings) {
            slot.store(value, Ordering::Relaxed);
        }
        self.status.store(status as u8, Ordering::Release);
    }

    /// Settings published by the last completed run
    pub fn settings(&self) -> [u8; EQ_CHANNELS] {
        let mut out = [0u8; EQ_CHANNELS];
        for (value, slot) in out.iter_mut().zip(&self.settings) {
            *value = slot.load(Ordering::Relaxed);
        }
        out
    }

    /// Tick side: consume a finished result, returning the handoff to idle.
    pub fn acknowledge(&self) -> bool {
        self.status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                if EqStatus::from_u8(raw).is_finished() {
                    Some(EqStatus::Idle as u8)
                } else {
                    None
                }
            })
            .is_ok()
    }
}

impl Default for EqHandoff {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Repeater Link
// =============================================================================

/// Handoff between the tick/interrupt path and the repeater worker
pub struct RepeaterLink {
    enabled: AtomicBool,
    start: AtomicBool,
    state: AtomicU8,
}

impl RepeaterLink {
    /// Create a disabled link
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            start: AtomicBool::new(false),
            state: AtomicU8::new(RepeaterState::Idle as u8),
        }
    }

    /// Enable or disable repeater mode
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.start.store(false, Ordering::Release);
        }
    }

    /// Repeater mode enabled
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Re-arm the authenticator (a fresh AKSV was observed)
    pub fn request_start(&self) {
        self.start.store(true, Ordering::Release);
    }

    /// Worker side: consume a pending re-arm
    pub fn take_start(&self) -> bool {
        self.start.swap(false, Ordering::AcqRel)
    }

    /// Worker side: publish the current sub-state
    pub fn publish(&self, state: RepeaterState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Last published sub-state
    pub fn state(&self) -> RepeaterState {
        RepeaterState::from_u8(self.state.load(Ordering::Acquire))
    }
}

impl Default for RepeaterLink {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Authentication Flags
// =============================================================================

/// Authentication generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AuthKind {
    /// HDCP1.4 (including repeater KSV list handling)
    Hdcp14 = 1 << 0,
    /// HDCP2.2, driven by an external authenticator
    Hdcp22 = 1 << 1,
}

/// "Authentication in progress" bitmask shared by HDCP1.4 and HDCP2.2
pub struct AuthFlags {
    bits: AtomicU8,
}

impl AuthFlags {
    /// Create with nothing in progress
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Mark one authenticator busy or idle
    pub fn set(&self, kind: AuthKind, busy: bool) {
        if busy {
            self.bits.fetch_or(kind as u8, Ordering::AcqRel);
        } else {
            self.bits.fetch_and(!(kind as u8), Ordering::AcqRel);
        }
    }

    /// True if the given authenticator is busy
    pub fn is_busy(&self, kind: AuthKind) -> bool {
        self.bits.load(Ordering::Acquire) & kind as u8 != 0
    }

    /// True if any authenticator is busy
    pub fn in_progress(&self) -> bool {
        self.bits.load(Ordering::Acquire) != 0
    }
}

impl Default for AuthFlags {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Shared Block
// =============================================================================

/// Everything the acquisition tick, the interrupt bridge and the deferred
/// workers exchange.
///
/// ```ignore
/// static SHARED: Shared = Shared::new();
///
/// // interrupt bridge
/// SHARED.events.post(RxEvent::AksvReceived);
/// ```
pub struct Shared {
    /// Interrupt-to-tick events
    pub events: EventQueue,
    /// Equalizer request/completion
    pub eq: EqHandoff,
    /// Repeater enable/re-arm
    pub repeater: RepeaterLink,
    /// Authentication in progress
    pub auth: AuthFlags,
    hotplug: AtomicBool,
}

impl Shared {
    /// Create the shared block (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            events: EventQueue::new(),
            eq: EqHandoff::new(),
            repeater: RepeaterLink::new(),
            auth: AuthFlags::new(),
            hotplug: AtomicBool::new(false),
        }
    }

    /// Publish the hot-plug line level (cancellation signal)
    pub fn set_hotplug(&self, asserted: bool) {
        self.hotplug.store(asserted, Ordering::Release);
    }

    /// Hot-plug currently asserted
    #[inline]
    pub fn hotplug_asserted(&self) -> bool {
        self.hotplug.load(Ordering::Acquire)
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}
