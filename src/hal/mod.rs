//! Hardware Abstraction Layer
//!
//! The core never touches memory-mapped registers directly. Every access goes
//! through [`RegisterBus`] using the named fields of [`Reg`]; the platform
//! supplies the implementation.
//!
//! # Delay Integration
//!
//! Bounded polls and pulses use `embedded_hal::delay::DelayNs` directly.
//! Pass any delay implementation from your HAL.

pub mod regs;

pub use regs::{Reg, RegisterBus, ksv_fifo, poll_until, pulse};
