//! Serialized register bus.
//!
//! The register collaborator is the one mutable resource every context
//! touches. [`SharedBus`] owns it inside a [`CriticalSectionCell`] and hands
//! out [`BusHandle`]s. Every read, write and read-modify-write performed
//! through a handle runs inside a single critical section, so an
//! address+data pair is never interleaved with another context's access.
//!
//! Touching a handle from inside [`SharedBus::with`] on the same bus is a
//! re-entrant access and fails with [`IoError::InvalidState`].

use super::primitives::CriticalSectionCell;
use crate::driver::error::{IoError, Result};
use crate::hal::regs::{Reg, RegisterBus};

/// ISR-safe wrapper around a register collaborator.
///
/// # Example
///
/// ```ignore
/// static BUS: SharedBus<PlatformRegs> = SharedBus::new(PlatformRegs::new());
///
/// // Tick context
/// rx.tick(&mut BUS.handle(), &SHARED, &mut ())?;
///
/// // Equalizer deferred-work context
/// eq.service(&mut BUS.handle(), &mut delay, &SHARED)?;
/// ```
pub struct SharedBus<B> {
    inner: CriticalSectionCell<B>,
}

impl<B> SharedBus<B> {
    /// Create a new shared bus (const, suitable for static initialization).
    pub const fn new(bus: B) -> Self {
        Self {
            inner: CriticalSectionCell::new(bus),
        }
    }

    /// Get an access handle for one execution context.
    #[inline]
    pub fn handle(&self) -> BusHandle<'_, B> {
        BusHandle { shared: self }
    }

    /// Execute a closure with exclusive access to the underlying bus.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut B) -> R,
    {
        self.inner.lock(f)
    }
}

/// Per-context access handle to a [`SharedBus`].
pub struct BusHandle<'a, B> {
    shared: &'a SharedBus<B>,
}

impl<B> BusHandle<'_, B> {
    fn access<R>(&self, f: impl FnOnce(&mut B) -> Result<R>) -> Result<R> {
        self.shared
            .inner
            .try_lock(f)
            .unwrap_or(Err(IoError::InvalidState.into()))
    }
}

impl<B: RegisterBus> RegisterBus for BusHandle<'_, B> {
    fn read(&mut self, reg: Reg) -> Result<u32> {
        self.access(|bus| bus.read(reg))
    }

    fn write(&mut self, reg: Reg, value: u32) -> Result<()> {
        self.access(|bus| bus.write(reg, value))
    }

    fn modify<F>(&mut self, reg: Reg, f: F) -> Result<()>
    where
        F: FnOnce(u32) -> u32,
    {
        self.access(|bus| {
            let value = bus.read(reg)?;
            bus.write(reg, f(value))
        })
    }
}
