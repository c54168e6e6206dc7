//! Critical-section cell
//!
//! The one locking primitive in the crate. The register bus and the event
//! queue sit inside it so the tick, interrupt handlers and deferred-work
//! contexts can all reach them from `static`s.

use core::cell::RefCell;
use critical_section::Mutex;

/// `RefCell` guarded by a critical section
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Wrap `value` (const, for statics)
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access, interrupts masked.
    ///
    /// Panics if called from inside another `lock` on the same cell.
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Like [`lock`](Self::lock), but yields `None` instead of panicking
    /// when the cell is already held further up the stack.
    #[inline]
    pub fn try_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut guard = self.inner.borrow(cs).try_borrow_mut().ok()?;
            Some(f(&mut guard))
        })
    }
}

// SAFETY: every access goes through a critical section, and `T: Send` lets
// the value be reached from whichever context enters it.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}
