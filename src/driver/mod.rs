//! Receiver driver
//!
//! - [`config`] - Configuration types and builders
//! - [`error`] - Error types, result aliases and the advisory [`ErrorCode`]
//! - [`state`] - Acquisition states and the transition table
//! - [`Receiver`] - The acquisition FSM, decoder lifecycle and auth control
//!
//! # Example
//!
//! ```ignore
//! use ph_hdmirx::driver::{Receiver, RxConfig, RxState};
//!
//! let config = RxConfig::new()
//!     .with_port_count(2)
//!     .with_hdcp22(true);
//! let mut rx = Receiver::new(config)?;
//! ```

// Submodules
pub mod config;
pub mod context;
mod decoder;
pub mod error;
mod observer;
mod receiver;
mod recovery;
pub mod state;

// Re-exports for convenience
pub use config::RxConfig;
pub use context::{AcquisitionContext, AudioInfo, PacketFlags, SignalInfo};
pub use decoder::DecodeStatus;
pub use error::{ConfigError, ConfigResult, Error, ErrorCode, IoError, IoResult, Result};
pub use observer::RxObserver;
pub use receiver::Receiver;
pub use recovery::{Escalation, RecoveryPolicy};
pub use state::{RxState, Trigger};
