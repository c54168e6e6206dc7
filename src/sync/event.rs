//! Interrupt-to-tick event queue.
//!
//! The interrupt bridge posts typed [`RxEvent`]s; the acquisition tick drains
//! them once per tick. The queue is a fixed-capacity ring protected by a
//! critical section, so posting from an ISR never races the drain.

use super::primitives::CriticalSectionCell;
use crate::internal::constants::EVENT_QUEUE_LEN;

/// Event raised by the interrupt bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// New infoframe/vendor packets are available
    PacketReady,
    /// The 5V sense lines changed (the port monitor confirms on its next sample)
    PowerChanged,
    /// An HDCP1.4 AKSV write was observed
    AksvReceived,
    /// An HDCP2.2 authentication started
    Hdcp22Started,
    /// The EDID presented to the source was replaced
    EdidUpdated,
}

struct Ring {
    buf: [Option<RxEvent>; EVENT_QUEUE_LEN],
    head: usize,
    len: usize,
    dropped: u32,
}

impl Ring {
    const fn new() -> Self {
        Self {
            buf: [None; EVENT_QUEUE_LEN],
            head: 0,
            len: 0,
            dropped: 0,
        }
    }
}

/// Fixed-capacity ISR-safe event queue
pub struct EventQueue {
    ring: CriticalSectionCell<Ring>,
}

impl EventQueue {
    /// Create an empty queue (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            ring: CriticalSectionCell::new(Ring::new()),
        }
    }

    /// Post an event.
    ///
    /// Returns `false` and counts a drop when the queue is full.
    pub fn post(&self, event: RxEvent) -> bool {
        self.ring.lock(|ring| {
            if ring.len == EVENT_QUEUE_LEN {
                ring.dropped = ring.dropped.wrapping_add(1);
                return false;
            }
            let tail = (ring.head + ring.len) % EVENT_QUEUE_LEN;
            ring.buf[tail] = Some(event);
            ring.len += 1;
            true
        })
    }

    /// Take the oldest event.
    pub fn pop(&self) -> Option<RxEvent> {
        self.ring.lock(|ring| {
            if ring.len == 0 {
                return None;
            }
            let event = ring.buf[ring.head].take();
            ring.head = (ring.head + 1) % EVENT_QUEUE_LEN;
            ring.len -= 1;
            event
        })
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.ring.lock(|ring| ring.len)
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events lost because the queue was full
    pub fn dropped(&self) -> u32 {
        self.ring.lock(|ring| ring.dropped)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
