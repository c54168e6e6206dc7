//! Observer hook
//!
//! The acquisition FSM reports transitions, newly raised error codes and
//! audio changes through [`RxObserver`]. All methods default to no-ops, and
//! `()` is the do-nothing observer.

use super::context::AudioInfo;
use super::error::ErrorCode;
use super::state::RxState;

/// Receiver event sink
pub trait RxObserver {
    /// The FSM moved from `from` to `to`
    fn state_changed(&mut self, from: RxState, to: RxState) {
        let _ = (from, to);
    }

    /// A different error code became active
    fn error_raised(&mut self, code: ErrorCode) {
        let _ = code;
    }

    /// Audio format or sample rate changed while the signal is ready
    fn audio_changed(&mut self, audio: AudioInfo) {
        let _ = audio;
    }
}

impl RxObserver for () {}
