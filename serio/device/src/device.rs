//! The buffered serial device.

use core::cell::RefCell;
use core::cmp::min;

use critical_section::Mutex;
use serio_driver::{
    ControlOp, DriverResult, EventCallback, EventMask, PowerState, SerialConfig, SerialDriver,
};
use serio_ring::ByteRing;
use serio_sync::WakeSignal;

use crate::error::{SerialError, SerialResult};

/// A ring buffer shared between thread and interrupt context.
///
/// Both sides only touch the ring inside short `critical_section::with`
/// regions; neither ever holds one across a blocking wait.
pub type SharedRing<'a> = Mutex<RefCell<ByteRing<'a>>>;

/// Wrap a ring for sharing with interrupt context.
pub fn shared(ring: ByteRing<'_>) -> SharedRing<'_> {
    Mutex::new(RefCell::new(ring))
}

/// State mutated from both thread and interrupt context.
struct Shared {
    open: bool,
    /// Last observed value of the driver's receive counter.
    rx_seen: usize,
    /// Software transmit-in-flight flag. The driver's own busy flag can
    /// drop between back-to-back transfers, so the device keeps its own.
    tx_busy: bool,
}

/// Buffered serial device: mediates between a [`SerialDriver`] and a pair
/// of ring buffers, one per direction.
///
/// One blocking reader thread and one blocking writer thread may use an
/// open device concurrently; the driver's completion callback runs in
/// interrupt context and never blocks. Concurrent readers (or writers) on
/// the same instance are outside the contract.
///
/// Without a tx ring the device runs in unbuffered mode: `write` sends
/// directly from the caller's buffer and blocks until the transfer
/// completes.
///
/// While open, the driver holds a context pointer back to this instance
/// for the completion trampoline, so the device must stay at a fixed
/// address from `open` until `close` (dropping the device closes it).
pub struct BufferedSerial<'a, D: SerialDriver, S: WakeSignal> {
    driver: D,
    rx_ring: &'a SharedRing<'a>,
    tx_ring: Option<&'a SharedRing<'a>>,
    rx_signal: S,
    tx_signal: S,
    shared: Mutex<RefCell<Shared>>,
}

impl<'a, D: SerialDriver, S: WakeSignal> BufferedSerial<'a, D, S> {
    /// Create a closed device over an already constructed driver and
    /// caller-owned ring buffers. `tx_ring: None` selects unbuffered
    /// direct-send mode.
    ///
    /// The rings outlive the device and may be reused by another instance
    /// afterwards, never concurrently.
    pub fn new(driver: D, rx_ring: &'a SharedRing<'a>, tx_ring: Option<&'a SharedRing<'a>>) -> Self {
        Self {
            driver,
            rx_ring,
            tx_ring,
            rx_signal: S::new(),
            tx_signal: S::new(),
            shared: Mutex::new(RefCell::new(Shared {
                open: false,
                rx_seen: 0,
                tx_busy: false,
            })),
        }
    }

    pub fn is_open(&self) -> bool {
        critical_section::with(|cs| self.shared.borrow_ref(cs).open)
    }

    /// Open the device: clear both rings, bring the driver up with the
    /// default line configuration and arm the first receive.
    ///
    /// Fails with [`SerialError::AlreadyOpen`] on an open device, leaving
    /// the running session untouched. Any driver failure rolls the
    /// sequence back (power off, uninitialize) and reports
    /// [`SerialError::DriverInit`].
    pub fn open(&self) -> SerialResult<()> {
        if self.is_open() {
            return Err(SerialError::AlreadyOpen);
        }

        // Start with no pending wakes; the first wait must block.
        self.rx_signal.reset();
        self.tx_signal.reset();

        critical_section::with(|cs| {
            self.rx_ring.borrow_ref_mut(cs).clear();
            if let Some(tx) = self.tx_ring {
                tx.borrow_ref_mut(cs).clear();
            }
            let mut shared = self.shared.borrow_ref_mut(cs);
            shared.rx_seen = 0;
            shared.tx_busy = false;
        });

        if self.bring_up().is_err() {
            // Roll back; no partial-open state stays observable.
            let _ = self.driver.power(PowerState::Off);
            let _ = self.driver.uninitialize();
            return Err(SerialError::DriverInit);
        }

        critical_section::with(|cs| self.shared.borrow_ref_mut(cs).open = true);
        #[cfg(feature = "defmt")]
        defmt::trace!("serial device open");
        Ok(())
    }

    fn bring_up(&self) -> DriverResult<()> {
        // Safety: the device outlives the registration; `close` (reached
        // from `Drop` at the latest) uninitializes the driver before the
        // device goes away, and all handler state is interrupt-shared.
        let callback = unsafe {
            EventCallback::new(Self::forward_event, self as *const Self as *mut ())
        };
        self.driver.initialize(callback)?;
        self.driver.power(PowerState::Full)?;
        self.driver.configure(&SerialConfig::default())?;
        self.driver.control(ControlOp::EnableTx)?;
        self.driver.control(ControlOp::EnableRx)?;

        // Arm the first receive into the rx ring's free run.
        let (buf, len) = critical_section::with(|cs| {
            let mut ring = self.rx_ring.borrow_ref_mut(cs);
            let seg = ring.back_contiguous();
            (seg.as_mut_ptr(), seg.len())
        });
        unsafe { self.driver.receive(buf, len) }
    }

    /// Close the device: disable both paths, power the driver off and
    /// uninitialize it. A closed device may be reopened; closing a closed
    /// device is a no-op.
    pub fn close(&self) -> SerialResult<()> {
        let was_open = critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            core::mem::replace(&mut shared.open, false)
        });
        if !was_open {
            return Ok(());
        }

        self.rx_signal.reset();
        self.tx_signal.reset();

        let _ = self.driver.control(ControlOp::DisableTx);
        let _ = self.driver.control(ControlOp::DisableRx);
        self.driver.power(PowerState::Off).map_err(|_| SerialError::Io)?;
        self.driver.uninitialize().map_err(|_| SerialError::Io)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("serial device closed");
        Ok(())
    }

    /// Blocking read.
    ///
    /// Returns as soon as at least one byte is available; partial reads
    /// are the norm of a byte stream. Blocks indefinitely while the rx
    /// ring is empty — there is no timeout or cancellation.
    pub fn read(&self, buf: &mut [u8]) -> SerialResult<usize> {
        if !self.is_open() {
            return Err(SerialError::NotOpen);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let count = critical_section::with(|cs| {
                self.rx_ring.borrow_ref_mut(cs).pop_front(buf)
            });
            if count > 0 {
                return Ok(count);
            }
            // Nothing buffered; park until the completion handler commits
            // bytes, then recheck.
            self.rx_signal.wait();
        }
    }

    /// Blocking write.
    ///
    /// Buffered mode: returns once all of `data` has been admitted into
    /// the tx ring — a queuing operation, not a flush. Unbuffered mode:
    /// sends directly from `data` and returns the driver's transferred
    /// count after completion.
    pub fn write(&self, data: &[u8]) -> SerialResult<usize> {
        if !self.is_open() {
            return Err(SerialError::NotOpen);
        }
        if data.is_empty() {
            return Ok(0);
        }
        match self.tx_ring {
            Some(ring) => self.write_buffered(ring, data),
            None => self.write_direct(data),
        }
    }

    fn write_buffered(&self, ring: &'a SharedRing<'a>, data: &[u8]) -> SerialResult<usize> {
        // Fast path: admit one burst, bounded by the high watermark so a
        // single writer cannot monopolize the ring.
        let mut accepted = critical_section::with(|cs| {
            let mut ring = ring.borrow_ref_mut(cs);
            if ring.is_below_high_watermark() {
                let room = ring.high_watermark() - ring.len();
                ring.push_back(&data[..min(room, data.len())])
            } else {
                0
            }
        });

        loop {
            let tx_busy = critical_section::with(|cs| self.shared.borrow_ref(cs).tx_busy);
            if !tx_busy {
                let (front, len) = critical_section::with(|cs| {
                    let ring = ring.borrow_ref(cs);
                    let seg = ring.front_contiguous();
                    (seg.as_ptr(), seg.len())
                });
                if len > 0 {
                    if unsafe { self.driver.send(front, len) }.is_err() {
                        // Bytes already admitted stay queued; the caller
                        // still sees a failed write.
                        return Err(SerialError::Io);
                    }
                    critical_section::with(|cs| self.shared.borrow_ref_mut(cs).tx_busy = true);
                }
            }

            if accepted == data.len() {
                return Ok(accepted);
            }

            // Wait for the completion handler to drain below the low
            // watermark, then top the ring up with the remainder.
            self.tx_signal.wait();
            accepted += critical_section::with(|cs| {
                ring.borrow_ref_mut(cs).push_back(&data[accepted..])
            });
        }
    }

    fn write_direct(&self, data: &[u8]) -> SerialResult<usize> {
        if self.driver.status().tx_busy {
            self.tx_signal.wait();
        }
        if unsafe { self.driver.send(data.as_ptr(), data.len()) }.is_err() {
            return Err(SerialError::Io);
        }
        self.tx_signal.wait();
        Ok(self.driver.tx_count())
    }

    /// Completion handler; runs in interrupt context and never blocks.
    ///
    /// Normally reached through the trampoline registered at `open`;
    /// public so simulations can drive it directly.
    pub fn on_event(&self, events: EventMask) {
        if events.intersects(
            EventMask::RECEIVE_COMPLETE | EventMask::RX_FRAMING_ERROR | EventMask::RX_TIMEOUT,
        ) {
            self.on_rx_event(events);
        }
        if events.contains(EventMask::TRANSMIT_COMPLETE) {
            self.on_tx_complete();
        }
    }

    fn on_rx_event(&self, events: EventMask) {
        // Framing errors and timeouts deliver their partial counts through
        // the same path as completions; differentiated error handling is a
        // known gap.
        let total = self.driver.rx_count();
        let fresh = critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let fresh = total - shared.rx_seen;
            shared.rx_seen = total;
            let committed = self.rx_ring.borrow_ref_mut(cs).advance_back(fresh);
            // A short commit means ring and hardware bookkeeping have
            // diverged; continuing would corrupt the stream.
            assert!(committed == fresh, "rx ring out of sync with driver");
            fresh
        });

        if events.contains(EventMask::RECEIVE_COMPLETE) {
            // Re-arm immediately; the receiver must never stop listening.
            let (buf, len) = critical_section::with(|cs| {
                let mut ring = self.rx_ring.borrow_ref_mut(cs);
                if ring.back_contiguous().is_empty() {
                    // Ring momentarily full: sacrifice the newest queued
                    // byte to keep a nonzero landing zone.
                    ring.retreat_back();
                }
                let seg = ring.back_contiguous();
                (seg.as_mut_ptr(), seg.len())
            });
            let armed = unsafe { self.driver.receive(buf, len) };
            assert!(armed.is_ok(), "receive re-arm failed");
            // The new transfer counts from zero.
            critical_section::with(|cs| self.shared.borrow_ref_mut(cs).rx_seen = 0);
        }

        if fresh > 0 {
            // Level-style wake: safe with no waiter, the next one sees
            // data and returns without blocking.
            self.rx_signal.release();
        }
    }

    fn on_tx_complete(&self) {
        let Some(ring) = self.tx_ring else {
            // Unbuffered mode: wake the writer parked in `write`.
            self.tx_signal.release();
            return;
        };

        let sent = self.driver.tx_count();
        let (front, len, below_low) = critical_section::with(|cs| {
            let mut ring = ring.borrow_ref_mut(cs);
            let committed = ring.advance_front(sent);
            assert!(committed == sent, "tx ring out of sync with driver");
            let below_low = ring.is_below_low_watermark();
            let seg = ring.front_contiguous();
            (seg.as_ptr(), seg.len(), below_low)
        });

        if len > 0 {
            // More queued data: keep the transmitter saturated.
            let issued = unsafe { self.driver.send(front, len) };
            assert!(issued.is_ok(), "send re-issue failed");
        } else {
            critical_section::with(|cs| self.shared.borrow_ref_mut(cs).tx_busy = false);
        }

        if below_low {
            // Hysteresis: only wake the writer once a meaningful amount
            // of space opened up.
            self.tx_signal.release();
        }
    }

    fn forward_event(context: *mut (), events: EventMask) {
        let device = unsafe { &*(context as *const Self) };
        device.on_event(events);
    }
}

impl<'a, D: SerialDriver, S: WakeSignal> Drop for BufferedSerial<'a, D, S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
