//! Synchronization and Concurrency Support
//!
//! Three schedulers cooperate without a lock on the high-level state: the
//! periodic tick (acquisition FSM and monitors), the interrupt bridge, and the
//! deferred-work contexts running the equalizer and the repeater
//! authenticator. This module provides what they share:
//!
//! - **Primitives** (`primitives`): [`CriticalSectionCell`]
//! - **Shared bus** (`shared`): [`SharedBus`] serializing register access
//! - **Events** (`event`): [`EventQueue`] of typed [`RxEvent`]s
//! - **Handoffs** (`handoff`): acquire/release status words
//!   ([`EqHandoff`], [`RepeaterLink`], [`AuthFlags`]) bundled in [`Shared`]
//!
//! # Example
//!
//! ```ignore
//! use ph_hdmirx::sync::{RxEvent, Shared, SharedBus};
//!
//! static SHARED: Shared = Shared::new();
//!
//! #[interrupt]
//! fn HDMIRX_IRQ() {
//!     SHARED.events.post(RxEvent::AksvReceived);
//! }
//! ```

mod event;
mod handoff;
mod primitives;
mod shared;

pub use event::{EventQueue, RxEvent};
pub use handoff::{AuthFlags, AuthKind, EqHandoff, EqStatus, RepeaterLink, Shared};
pub use primitives::CriticalSectionCell;
pub use shared::{BusHandle, SharedBus};
