//! Error type for the device surface.

use core::fmt;

/// Errors reported by [`BufferedSerial`](crate::BufferedSerial)
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// `open` on a device that is already open. No state was mutated; the
    /// existing session is intact.
    AlreadyOpen,
    /// A step of the open sequence failed. The driver was powered off and
    /// uninitialized before this was returned; no partial-open state
    /// remains.
    DriverInit,
    /// `read`/`write` on a device that is not open.
    NotOpen,
    /// A transfer initiation failed. For a buffered write, bytes admitted
    /// into the tx buffer before the failure stay queued and may still be
    /// sent; see the crate docs for this sharp edge.
    Io,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyOpen => write!(f, "device already open"),
            Self::DriverInit => write!(f, "driver initialization failed"),
            Self::NotOpen => write!(f, "device not open"),
            Self::Io => write!(f, "i/o error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SerialError {}

#[cfg(feature = "defmt")]
impl defmt::Format for SerialError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::AlreadyOpen => defmt::write!(fmt, "AlreadyOpen"),
            Self::DriverInit => defmt::write!(fmt, "DriverInit"),
            Self::NotOpen => defmt::write!(fmt, "NotOpen"),
            Self::Io => defmt::write!(fmt, "Io"),
        }
    }
}

/// Result type for device operations.
pub type SerialResult<T> = Result<T, SerialError>;
