//! Error type for driver capability operations.

use core::fmt;

/// Errors reported by a [`SerialDriver`](crate::SerialDriver)
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// A transfer is already in progress.
    Busy,
    /// Operation not supported by this implementation.
    Unsupported,
    /// Invalid parameter provided.
    InvalidParameter,
    /// Hardware error occurred.
    Hardware,
    /// Vendor-specific error code.
    Vendor(i32),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "transfer in progress"),
            Self::Unsupported => write!(f, "operation not supported"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::Hardware => write!(f, "hardware error"),
            Self::Vendor(code) => write!(f, "vendor error code: {}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

#[cfg(feature = "defmt")]
impl defmt::Format for DriverError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Busy => defmt::write!(fmt, "Busy"),
            Self::Unsupported => defmt::write!(fmt, "Unsupported"),
            Self::InvalidParameter => defmt::write!(fmt, "InvalidParameter"),
            Self::Hardware => defmt::write!(fmt, "Hardware"),
            Self::Vendor(code) => defmt::write!(fmt, "Vendor({})", code),
        }
    }
}

/// Result type for driver capability operations.
pub type DriverResult<T> = Result<T, DriverError>;
