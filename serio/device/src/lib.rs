#![cfg_attr(not(feature = "std"), no_std)]

//! # Serio Device
//!
//! Buffered, interrupt-driven serial device over a
//! [`SerialDriver`](serio_driver::SerialDriver) capability.
//!
//! The device mediates between the driver and two
//! [`ByteRing`](serio_ring::ByteRing) buffers, one per direction:
//! application threads block in `read`/`write` while the driver's
//! completion callback, running in interrupt context, moves bytes through
//! the rings with zero-copy segment commits and keeps the receiver
//! continuously armed.
//!
//! ## Known sharp edges
//!
//! - A send-initiation failure mid-write reports [`SerialError::Io`] even
//!   though a prefix of the data was already admitted into the tx ring
//!   (buffered mode) or the wire. Callers cannot tell which bytes made it.
//! - When the rx ring fills, the newest queued byte is overwritten so the
//!   hardware receiver always has somewhere to write; reception never
//!   stalls, at the price of silent loss under sustained overrun.
//! - No link-state detection, no flow control beyond the watermarks, no
//!   read/write cancellation, no timeouts.

pub mod device;
pub mod error;

pub use device::{shared, BufferedSerial, SharedRing};
pub use error::{SerialError, SerialResult};
