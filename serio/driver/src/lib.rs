#![cfg_attr(not(feature = "std"), no_std)]

//! # Serio Driver
//!
//! The serial driver capability: the interface boundary between the
//! buffered device layer and a concrete hardware driver (USART, USB CDC
//! ACM, ...). Modeled after CMSIS-style drivers: an initialize / power /
//! configure / transfer / status surface with completion reported through
//! an asynchronous callback running in interrupt context.
//!
//! This crate only defines the contract; hardware crates (and the
//! host-side simulator) implement it.

pub mod config;
pub mod error;
pub mod event;

pub use config::{DataBits, FlowControl, Parity, SerialConfig, StopBits};
pub use error::{DriverError, DriverResult};
pub use event::{EventCallback, EventMask};

/// Driver power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    Full,
}

/// Control operations on the transmit/receive paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    EnableTx,
    DisableTx,
    EnableRx,
    DisableRx,
}

/// Instantaneous driver status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialStatus {
    /// A send transfer is in flight.
    pub tx_busy: bool,
    /// A receive transfer is armed.
    pub rx_busy: bool,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SerialStatus {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "SerialStatus {{ tx_busy: {}, rx_busy: {} }}", self.tx_busy, self.rx_busy);
    }
}

/// Serial driver capability.
///
/// Implementations are interrupt-shared singletons: every method takes
/// `&self` and must tolerate being entered from a thread while the
/// completion callback runs in interrupt context.
///
/// The transfer counters follow CMSIS semantics: [`rx_count`] and
/// [`tx_count`] report the bytes moved by the *current* transfer and reset
/// when a new transfer is armed with [`receive`]/[`send`].
///
/// [`rx_count`]: Self::rx_count
/// [`tx_count`]: Self::tx_count
/// [`receive`]: Self::receive
/// [`send`]: Self::send
pub trait SerialDriver: Send + Sync {
    /// Bring the driver up and register the completion callback.
    fn initialize(&self, callback: EventCallback) -> DriverResult<()>;

    /// Tear the driver down; the callback is unregistered.
    fn uninitialize(&self) -> DriverResult<()>;

    /// Switch the peripheral power state.
    fn power(&self, state: PowerState) -> DriverResult<()>;

    /// Apply line parameters.
    fn configure(&self, config: &SerialConfig) -> DriverResult<()>;

    /// Enable or disable one direction of the link.
    fn control(&self, op: ControlOp) -> DriverResult<()>;

    /// Start an asynchronous send of `len` bytes from `data`.
    ///
    /// # Safety
    ///
    /// `data..data+len` must stay valid and unmodified until the driver
    /// reports [`EventMask::TRANSMIT_COMPLETE`] for this transfer.
    unsafe fn send(&self, data: *const u8, len: usize) -> DriverResult<()>;

    /// Arm an asynchronous receive of up to `len` bytes into `buf`.
    ///
    /// # Safety
    ///
    /// `buf..buf+len` must stay valid and must not be read or written by
    /// anything but the driver until a receive-related event reports the
    /// transferred count.
    unsafe fn receive(&self, buf: *mut u8, len: usize) -> DriverResult<()>;

    /// Instantaneous transfer status.
    fn status(&self) -> SerialStatus;

    /// Bytes received so far by the current receive transfer.
    fn rx_count(&self) -> usize;

    /// Bytes transmitted so far by the current send transfer.
    fn tx_count(&self) -> usize;
}
