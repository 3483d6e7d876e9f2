#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # Serio Sync
//!
//! Wake signals for thread/interrupt handoff.
//!
//! A wake signal is a binary semaphore used purely for notification, never
//! for mutual exclusion: the interrupt side releases it after committing
//! data, the thread side blocks on it when it finds nothing to do. Both
//! sides follow the optimistic check → wait → recheck pattern, so a release
//! that races with the check degrades to a safe spurious wake rather than a
//! lost wakeup.

/// Binary wake signal.
///
/// `release` must be safe to call from interrupt context and is idempotent:
/// repeated releases collapse into a single pending wake, which the next
/// waiter consumes. `wait` blocks the calling thread indefinitely; there is
/// no timeout or cancellation.
pub trait WakeSignal: Send + Sync {
    /// Create a signal with no pending wake; the first `wait` blocks.
    fn new() -> Self;

    /// Post a wake. Never blocks; callable from interrupt context.
    fn release(&self);

    /// Block until a wake is pending, then consume it.
    fn wait(&self);

    /// Drop any pending wake.
    fn reset(&self);
}

/// Spin-waiting signal for bare-metal targets without an RTOS.
///
/// `wait` burns cycles with a spin-loop hint until released. Ports with a
/// real scheduler should provide their own `WakeSignal` instead.
pub struct SpinSignal {
    pending: core::sync::atomic::AtomicBool,
}

impl WakeSignal for SpinSignal {
    fn new() -> Self {
        Self {
            pending: core::sync::atomic::AtomicBool::new(false),
        }
    }

    fn release(&self) {
        self.pending.store(true, core::sync::atomic::Ordering::Release);
    }

    fn wait(&self) {
        use core::sync::atomic::Ordering;
        while !self.pending.swap(false, Ordering::AcqRel) {
            core::hint::spin_loop();
        }
    }

    fn reset(&self) {
        self.pending.store(false, core::sync::atomic::Ordering::Release);
    }
}

/// Blocking signal backed by a mutex and condition variable.
#[cfg(feature = "std")]
pub struct StdSignal {
    pending: std::sync::Mutex<bool>,
    wakeup: std::sync::Condvar,
}

#[cfg(feature = "std")]
impl WakeSignal for StdSignal {
    fn new() -> Self {
        Self {
            pending: std::sync::Mutex::new(false),
            wakeup: std::sync::Condvar::new(),
        }
    }

    fn release(&self) {
        let mut pending = self.pending.lock().unwrap();
        *pending = true;
        self.wakeup.notify_one();
    }

    fn wait(&self) {
        let mut pending = self.pending.lock().unwrap();
        while !*pending {
            pending = self.wakeup.wait(pending).unwrap();
        }
        *pending = false;
    }

    fn reset(&self) {
        *self.pending.lock().unwrap() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_signal_latches_release() {
        let sig = SpinSignal::new();
        sig.release();
        sig.release(); // idempotent
        sig.wait(); // consumes the single pending wake without spinning
        sig.release();
        sig.reset();
        // After reset nothing is pending; verify via the raw flag path.
        sig.release();
        sig.wait();
    }

    #[cfg(feature = "std")]
    mod std_signal {
        use super::super::*;
        use std::sync::Arc;

        #[test]
        fn release_before_wait_is_not_lost() {
            let sig = StdSignal::new();
            sig.release();
            sig.wait(); // returns immediately
        }

        #[test]
        fn wakes_blocked_waiter() {
            let sig = Arc::new(StdSignal::new());
            let waiter = {
                let sig = Arc::clone(&sig);
                std::thread::spawn(move || sig.wait())
            };
            // Give the waiter a chance to block first.
            std::thread::sleep(std::time::Duration::from_millis(10));
            sig.release();
            waiter.join().unwrap();
        }

        #[test]
        fn reset_discards_pending_wake() {
            let sig = Arc::new(StdSignal::new());
            sig.release();
            sig.reset();

            let waiter = {
                let sig = Arc::clone(&sig);
                std::thread::spawn(move || sig.wait())
            };
            std::thread::sleep(std::time::Duration::from_millis(10));
            sig.release();
            waiter.join().unwrap();
        }
    }
}
