//! HDMI Receiver Signal-Acquisition Core
//!
//! A `no_std`, `no_alloc` Rust implementation of the control core of an HDMI
//! receiver: it takes a physical input from "cable plugged in" to "video
//! locked and ready to capture", and keeps it there.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! 1. **Driver** ([`driver`]): the acquisition FSM ([`Receiver`]), its
//!    recovery policy, decoder lifecycle and authentication control
//! 2. **Monitors** ([`monitor`]): 5V debouncing and clock/PLL lock counters
//! 3. **PHY** ([`phy`]): equalizer calibration
//! 4. **HDCP** ([`hdcp`]): HDCP1.4 repeater KSV-list forwarding
//! 5. **HAL** ([`hal`]): the [`RegisterBus`] seam every register access uses
//!
//! Concurrency lives in [`sync`]: interrupt events, the equalizer and
//! repeater handoffs and the shared auth flags, all usable from `static`s.
//!
//! ## Execution Contexts
//!
//! | Context            | Entry point                          | Blocks? |
//! |--------------------|--------------------------------------|---------|
//! | 100 Hz tick        | [`Receiver::tick`]                   | never   |
//! | Equalizer worker   | [`EqualizerEngine::service`]         | bounded |
//! | Repeater worker    | [`RepeaterAuthenticator::service`]   | bounded |
//! | Interrupt handlers | [`sync::EventQueue::post`]           | never   |
//! | Capture interrupt  | [`Receiver::decode_isr`]             | never   |
//!
//! # Features
//!
//! - `defmt`: Log through defmt and derive `defmt::Format` on public types
//! - `log`: Log through the `log` facade
//!
//! # Example
//!
//! ```ignore
//! use ph_hdmirx::{EqConfig, EqualizerEngine, Receiver, RxConfig, Shared, SharedBus};
//!
//! static SHARED: Shared = Shared::new();
//! static BUS: SharedBus<PlatformRegs> = SharedBus::new(PlatformRegs::new());
//!
//! let mut rx = Receiver::new(RxConfig::new().with_port_count(2))?;
//! rx.open(&mut BUS.handle(), 0)?;
//! rx.start(0)?;
//!
//! // 100 Hz timer
//! rx.tick(&mut BUS.handle(), &SHARED, &mut ())?;
//!
//! // equalizer worker
//! let mut eq = EqualizerEngine::new(EqConfig::new());
//! eq.service(&mut BUS.handle(), &mut delay, &SHARED)?;
//!
//! // capture interrupt
//! if rx.decode_isr(frame) == DecodeStatus::Ok {
//!     deliver(frame);
//! }
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in clippy.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;
pub mod hdcp;
pub mod monitor;
pub mod phy;
pub mod sync;
pub mod video;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// End-to-end acquisition scenarios
#[cfg(test)]
mod scenarios;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::{
    AcquisitionContext, AudioInfo, ConfigError, ConfigResult, DecodeStatus, Error, ErrorCode,
    IoError, IoResult, PacketFlags, Receiver, Result, RxConfig, RxObserver, RxState, SignalInfo,
};
pub use hal::{Reg, RegisterBus};
pub use hdcp::{
    Downstream, HdcpConfig, HdcpVersion, Ksv, KsvList, RepeaterAuthenticator, RepeaterOutcome,
    RepeaterState, Topology,
};
pub use phy::{EqConfig, EqOutcome, EqualizerEngine};
pub use sync::{EventQueue, RxEvent, Shared, SharedBus};
pub use video::{ColorSpace, StabilityTolerance, TimingSnapshot};

/// Default budgets and limits.
///
/// Every value here is the default of a field in [`RxConfig`],
/// [`EqConfig`] or [`HdcpConfig`].
pub mod constants {
    pub use crate::internal::constants::{
        // Hot-plug
        HPD_EXTEND_FACTOR,
        HPD_HIGH_TICKS,
        HPD_LOW_TICKS,
        // Ports
        MAX_PORTS,
        POW5V_DEBOUNCE_COUNT,
        // Lock budgets
        CLK_STABLE_COUNT,
        CLK_UNSTABLE_MAX,
        PLL_LOCK_COUNT,
        PLL_UNLOCK_MAX,
        TIMING_STABLE_COUNT,
        TIMING_UNSTABLE_MAX,
        // Tick rate
        TICK_HZ,
        // HDCP
        HDCP14_MAX_CASCADE,
        HDCP14_MAX_DEVICES,
        KSV_LEN,
    };
}
