//! Tick-driven monitors
//!
//! - [`PortMonitor`]: debounced 5V sensing per port
//! - [`clock`]: clock-valid / PLL-lock indications and the [`LockCounter`]
//!   the wait states debounce them with

pub mod clock;
mod port;

pub use clock::{LockCounter, LockProgress};
pub use port::{PortMonitor, PowerChange};
