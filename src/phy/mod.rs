//! PHY calibration
//!
//! The PHY's clock and PLL indications are read by [`crate::monitor::clock`].
//! This module holds the part that actively drives the PHY: the
//! [`EqualizerEngine`] that picks a per-channel equalization setting for the
//! attached cable.
//!
//! # Architecture
//!
//! The engine is independent of the acquisition FSM. It talks to the PHY
//! only through [`crate::hal::RegisterBus`] and to the FSM only through
//! [`crate::sync::EqHandoff`], which allows:
//!
//! - Running it on a worker or deferred-work context
//! - Testing it against synthetic attenuation curves

mod eq;

pub use eq::{CableClass, ChannelReport, EqConfig, EqOutcome, EqReport, EqualizerEngine};
