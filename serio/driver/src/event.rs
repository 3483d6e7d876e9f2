//! Completion events and the interrupt-context callback.

use core::fmt;
use core::ops::BitOr;

/// Bitmask of completion events reported by a driver.
///
/// Drivers may coalesce several events into one callback invocation, so
/// handlers test with [`contains`](Self::contains) /
/// [`intersects`](Self::intersects) rather than matching exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(u32);

impl EventMask {
    /// The armed receive transfer filled its buffer.
    pub const RECEIVE_COMPLETE: EventMask = EventMask(1 << 0);
    /// A framing error was detected on the line.
    pub const RX_FRAMING_ERROR: EventMask = EventMask(1 << 1);
    /// The line went idle with a partially filled receive transfer.
    pub const RX_TIMEOUT: EventMask = EventMask(1 << 2);
    /// The in-flight send transfer finished.
    pub const TRANSMIT_COMPLETE: EventMask = EventMask(1 << 3);

    pub const fn empty() -> Self {
        EventMask(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every event in `other` is set.
    pub const fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when at least one event in `other` is set.
    pub const fn intersects(self, other: EventMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventMask({:#06b})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EventMask {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "EventMask({=u32:#x})", self.0);
    }
}

/// Completion callback: a plain function pointer plus an opaque context
/// pointer, the classic trampoline from interrupt context back to the
/// device instance that registered it.
///
/// The driver invokes [`raise`](Self::raise) from interrupt context; the
/// handler must not block.
#[derive(Clone, Copy)]
pub struct EventCallback {
    handler: fn(*mut (), EventMask),
    context: *mut (),
}

impl EventCallback {
    /// Build a callback targeting `context`.
    ///
    /// # Safety
    ///
    /// `context` must point to a value that outlives every `raise` call and
    /// is safe to access concurrently from interrupt context (the handler
    /// typically reconstructs a shared reference from it). The target must
    /// not move in memory while the callback is registered.
    pub unsafe fn new(handler: fn(*mut (), EventMask), context: *mut ()) -> Self {
        Self { handler, context }
    }

    /// Forward `events` to the registered handler.
    pub fn raise(&self, events: EventMask) {
        (self.handler)(self.context, events);
    }
}

// The context pointer is only dereferenced by the handler, whose safety
// contract (see `new`) requires the target to be interrupt-shareable.
unsafe impl Send for EventCallback {}
unsafe impl Sync for EventCallback {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_set_operations() {
        let mask = EventMask::RECEIVE_COMPLETE | EventMask::RX_TIMEOUT;
        assert!(mask.contains(EventMask::RECEIVE_COMPLETE));
        assert!(!mask.contains(EventMask::TRANSMIT_COMPLETE));
        assert!(mask.intersects(EventMask::RX_TIMEOUT | EventMask::RX_FRAMING_ERROR));
        assert!(!mask.intersects(EventMask::TRANSMIT_COMPLETE));
        assert!(!EventMask::empty().intersects(mask));
    }

    #[test]
    fn callback_forwards_to_context() {
        fn bump(ctx: *mut (), events: EventMask) {
            let hits = unsafe { &mut *(ctx as *mut u32) };
            *hits += events.bits();
        }

        let mut hits: u32 = 0;
        let cb = unsafe { EventCallback::new(bump, &mut hits as *mut u32 as *mut ()) };
        cb.raise(EventMask::RECEIVE_COMPLETE);
        cb.raise(EventMask::TRANSMIT_COMPLETE);
        assert_eq!(hits, EventMask::RECEIVE_COMPLETE.bits() + EventMask::TRANSMIT_COMPLETE.bits());
    }
}
