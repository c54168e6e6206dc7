//! Video timing
//!
//! [`TimingSnapshot`] is one reading of the timing measurement block. The
//! acquisition FSM keeps two of them (the last stable one and the latest)
//! and only passes its stability gate when [`TimingSnapshot::matches`] holds
//! for enough consecutive ticks. [`vic::lookup`] names the format once it
//! has settled.

mod timing;
pub mod vic;

pub use timing::{ColorSpace, StabilityTolerance, TimingSnapshot};
pub use vic::VIC_UNKNOWN;
