//! Simulated serial driver for host-side tests and demos.
//!
//! `SimSerial` implements [`SerialDriver`] with plain host memory standing
//! in for the wire. Tests play the hardware role: [`SimSerial::deliver`]
//! feeds received bytes into whatever receive transfer the device armed,
//! and [`SimSerial::complete_tx`] finishes the in-flight send, both firing
//! the registered completion callback the way a real interrupt would.
//!
//! The handle is a cheap clone; the device owns one clone while the test
//! keeps another to drive and inspect the "hardware".

use std::cmp::min;
use std::sync::{Arc, Mutex};

use serio_driver::{
    ControlOp, DriverError, DriverResult, EventCallback, EventMask, PowerState, SerialConfig,
    SerialDriver, SerialStatus,
};

/// Which driver entry points should fail, for open-rollback and error-path
/// tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailPlan {
    pub initialize: bool,
    pub power_up: bool,
    pub configure: bool,
    pub control: bool,
    pub send: bool,
    pub receive: bool,
}

#[derive(Default)]
struct SimState {
    callback: Option<EventCallback>,
    initialized: bool,
    powered: bool,
    tx_enabled: bool,
    rx_enabled: bool,
    config: Option<SerialConfig>,

    // Armed receive transfer. Pointers are stored as usize so the state
    // stays Send; they originate from ring segments the device handed out.
    rx_armed: bool,
    rx_dst: usize,
    rx_cap: usize,
    rx_filled: usize,
    rx_arms: usize,

    // In-flight send transfer.
    tx_busy: bool,
    tx_src: usize,
    tx_len: usize,
    tx_done: usize,

    wire: Vec<u8>,
    send_lens: Vec<usize>,
    initialize_calls: usize,

    fail: FailPlan,
}

/// Cloneable handle to a simulated serial peripheral.
#[derive(Clone, Default)]
pub struct SimSerial {
    inner: Arc<Mutex<SimState>>,
}

impl SimSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the failure plan.
    pub fn set_fail_plan(&self, plan: FailPlan) {
        self.inner.lock().unwrap().fail = plan;
    }

    /// Feed bytes as if the hardware receiver collected them off the line.
    ///
    /// Fills the armed receive transfer, raising `RECEIVE_COMPLETE` each
    /// time a transfer fills (after which the device is expected to re-arm)
    /// and `RX_TIMEOUT` for a trailing partial fill. Returns the number of
    /// completed transfers.
    ///
    /// Panics if no receive is armed — a device following the
    /// always-listening protocol never lets that happen.
    pub fn deliver(&self, data: &[u8]) -> usize {
        let mut completions = 0;
        let mut offset = 0;
        while offset < data.len() {
            let (dst, step, complete, callback) = {
                let mut state = self.inner.lock().unwrap();
                assert!(state.rx_armed, "deliver with no receive armed");
                let room = state.rx_cap - state.rx_filled;
                let step = min(room, data.len() - offset);
                let dst = (state.rx_dst + state.rx_filled) as *mut u8;
                state.rx_filled += step;
                let complete = state.rx_filled == state.rx_cap;
                if complete {
                    state.rx_armed = false;
                }
                let callback = state.callback.expect("no callback registered");
                (dst, step, complete, callback)
            };
            // The armed region is reserved for the "hardware" until the
            // completion event commits it, so this write cannot race the
            // device's own ring accesses.
            unsafe {
                std::ptr::copy_nonoverlapping(data[offset..].as_ptr(), dst, step);
            }
            offset += step;
            if complete {
                completions += 1;
                callback.raise(EventMask::RECEIVE_COMPLETE);
            } else {
                callback.raise(EventMask::RX_TIMEOUT);
            }
        }
        completions
    }

    /// Finish the in-flight send transfer, moving its bytes onto the wire
    /// and raising `TRANSMIT_COMPLETE`. Returns false when no send is in
    /// flight.
    pub fn complete_tx(&self) -> bool {
        let (src, len, callback) = {
            let mut state = self.inner.lock().unwrap();
            if !state.tx_busy {
                return false;
            }
            state.tx_busy = false;
            state.tx_done = state.tx_len;
            let callback = state.callback.expect("no callback registered");
            (state.tx_src as *const u8, state.tx_len, callback)
        };
        // Capture the payload before raising: the completion handler frees
        // the region and a blocked writer may refill it immediately.
        let mut payload = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(src, payload.as_mut_ptr(), len);
        }
        self.inner.lock().unwrap().wire.extend_from_slice(&payload);
        callback.raise(EventMask::TRANSMIT_COMPLETE);
        true
    }

    /// Everything transmitted so far, in order.
    pub fn wire(&self) -> Vec<u8> {
        self.inner.lock().unwrap().wire.clone()
    }

    /// Length of every send transfer initiated, in order.
    pub fn send_lens(&self) -> Vec<usize> {
        self.inner.lock().unwrap().send_lens.clone()
    }

    /// How many receive transfers have been armed.
    pub fn rx_arms(&self) -> usize {
        self.inner.lock().unwrap().rx_arms
    }

    pub fn initialize_calls(&self) -> usize {
        self.inner.lock().unwrap().initialize_calls
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().unwrap().initialized
    }

    pub fn is_powered(&self) -> bool {
        self.inner.lock().unwrap().powered
    }

    pub fn configured(&self) -> Option<SerialConfig> {
        self.inner.lock().unwrap().config.clone()
    }

    pub fn is_tx_enabled(&self) -> bool {
        self.inner.lock().unwrap().tx_enabled
    }

    pub fn is_rx_enabled(&self) -> bool {
        self.inner.lock().unwrap().rx_enabled
    }
}

impl SerialDriver for SimSerial {
    fn initialize(&self, callback: EventCallback) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        state.initialize_calls += 1;
        if state.fail.initialize {
            return Err(DriverError::Hardware);
        }
        state.callback = Some(callback);
        state.initialized = true;
        Ok(())
    }

    fn uninitialize(&self) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        state.callback = None;
        state.initialized = false;
        state.rx_armed = false;
        state.tx_busy = false;
        Ok(())
    }

    fn power(&self, power: PowerState) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        match power {
            PowerState::Full => {
                if state.fail.power_up {
                    return Err(DriverError::Hardware);
                }
                state.powered = true;
            }
            PowerState::Off => state.powered = false,
        }
        Ok(())
    }

    fn configure(&self, config: &SerialConfig) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail.configure {
            return Err(DriverError::Unsupported);
        }
        state.config = Some(config.clone());
        Ok(())
    }

    fn control(&self, op: ControlOp) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail.control {
            return Err(DriverError::Hardware);
        }
        match op {
            ControlOp::EnableTx => state.tx_enabled = true,
            ControlOp::DisableTx => state.tx_enabled = false,
            ControlOp::EnableRx => state.rx_enabled = true,
            ControlOp::DisableRx => state.rx_enabled = false,
        }
        Ok(())
    }

    unsafe fn send(&self, data: *const u8, len: usize) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail.send {
            return Err(DriverError::Hardware);
        }
        if state.tx_busy {
            return Err(DriverError::Busy);
        }
        state.tx_busy = true;
        state.tx_src = data as usize;
        state.tx_len = len;
        state.tx_done = 0;
        state.send_lens.push(len);
        Ok(())
    }

    unsafe fn receive(&self, buf: *mut u8, len: usize) -> DriverResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail.receive {
            return Err(DriverError::Hardware);
        }
        state.rx_armed = true;
        state.rx_dst = buf as usize;
        state.rx_cap = len;
        state.rx_filled = 0;
        state.rx_arms += 1;
        Ok(())
    }

    fn status(&self) -> SerialStatus {
        let state = self.inner.lock().unwrap();
        SerialStatus {
            tx_busy: state.tx_busy,
            rx_busy: state.rx_armed,
        }
    }

    fn rx_count(&self) -> usize {
        self.inner.lock().unwrap().rx_filled
    }

    fn tx_count(&self) -> usize {
        self.inner.lock().unwrap().tx_done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record_events(ctx: *mut (), events: EventMask) {
        let seen = unsafe { &*(ctx as *const AtomicU32) };
        seen.fetch_or(events.bits(), Ordering::SeqCst);
    }

    #[test]
    fn deliver_fills_armed_transfer_and_fires_events() {
        static SEEN: AtomicU32 = AtomicU32::new(0);
        let sim = SimSerial::new();
        let callback = unsafe {
            EventCallback::new(record_events, &SEEN as *const AtomicU32 as *mut ())
        };
        sim.initialize(callback).unwrap();

        let mut landing = [0u8; 4];
        unsafe { sim.receive(landing.as_mut_ptr(), landing.len()).unwrap() };

        // Partial fill raises a timeout, not a completion.
        assert_eq!(sim.deliver(b"ab"), 0);
        assert_eq!(SEEN.load(Ordering::SeqCst), EventMask::RX_TIMEOUT.bits());
        assert_eq!(sim.rx_count(), 2);

        // Filling the rest completes the transfer. No re-arm happens here
        // (no device behind the callback), so stop at the boundary.
        assert_eq!(sim.deliver(b"cd"), 1);
        assert!(SEEN.load(Ordering::SeqCst) & EventMask::RECEIVE_COMPLETE.bits() != 0);
        assert_eq!(&landing, b"abcd");
    }

    #[test]
    fn complete_tx_copies_payload_to_wire() {
        static SEEN: AtomicU32 = AtomicU32::new(0);
        let sim = SimSerial::new();
        let callback = unsafe {
            EventCallback::new(record_events, &SEEN as *const AtomicU32 as *mut ())
        };
        sim.initialize(callback).unwrap();

        assert!(!sim.complete_tx());

        let payload = *b"ping";
        unsafe { sim.send(payload.as_ptr(), payload.len()).unwrap() };
        assert!(sim.status().tx_busy);
        // A second send while busy is rejected.
        assert_eq!(
            unsafe { sim.send(payload.as_ptr(), payload.len()) },
            Err(DriverError::Busy)
        );

        assert!(sim.complete_tx());
        assert_eq!(sim.wire(), b"ping");
        assert_eq!(sim.tx_count(), 4);
        assert_eq!(SEEN.load(Ordering::SeqCst) & EventMask::TRANSMIT_COMPLETE.bits(), EventMask::TRANSMIT_COMPLETE.bits());
    }
}
