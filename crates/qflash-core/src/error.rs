//! Error types for qflash-core
//!
//! This module provides no_std compatible error types that are used
//! throughout the crate.

use core::fmt;

/// Transport failure reported by a [`FlashBus`](crate::bus::FlashBus)
/// implementation.
///
/// The engine never interprets these - they are wrapped and handed back to
/// the caller, since their cause lives below the bus abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The bus transaction could not be completed
    Transfer,
    /// The bus itself timed out (distinct from the device staying busy)
    Timeout,
    /// The bus implementation cannot express this command
    Unsupported,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "bus transfer failed"),
            Self::Timeout => write!(f, "bus transaction timed out"),
            Self::Unsupported => write!(f, "command not supported by bus"),
        }
    }
}

/// Failure to resolve a [`DeviceProfile`](crate::profile::DeviceProfile).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionError {
    /// A caller-supplied static profile violates the geometry invariants
    InvalidStaticProfile,
    /// The discovery table header signature does not match the expected constant
    SignatureMismatch {
        /// The signature value actually read
        found: u32,
    },
    /// The parameter table declares a revision the parser does not understand
    UnsupportedTableRevision {
        /// Major revision from the table header
        major: u8,
        /// Minor revision from the table header
        minor: u8,
    },
    /// Declared table lengths are inconsistent with the minimum required
    /// header+body size, or the table content is unusable
    MalformedTable,
    /// Transport failure while reading the parameter table
    Bus(BusError),
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStaticProfile => write!(f, "static profile failed validation"),
            Self::SignatureMismatch { found } => {
                write!(f, "parameter table signature mismatch (read 0x{:08X})", found)
            }
            Self::UnsupportedTableRevision { major, minor } => {
                write!(f, "unsupported parameter table revision {}.{}", major, minor)
            }
            Self::MalformedTable => write!(f, "malformed parameter table"),
            Self::Bus(e) => write!(f, "discovery read failed: {}", e),
        }
    }
}

impl From<BusError> for ResolutionError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

/// Failure of one erase/program/read operation.
///
/// Validation variants (`UnalignedRange`, `RangeOutOfBounds`, `SizeMismatch`)
/// are raised before any bus transaction. The remaining variants carry the
/// number of bytes whose completion the device had already confirmed, so a
/// caller can tell how far a partially-completed operation got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Erase range is not aligned to the erase-block size
    UnalignedRange,
    /// Range end exceeds the device size
    RangeOutOfBounds,
    /// Data or buffer length disagrees with the range length
    SizeMismatch {
        /// Length demanded by the range
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },
    /// The device busy flag did not clear within the poll budget
    DeviceTimeout {
        /// Bytes confirmed complete before the timeout
        bytes_transferred: usize,
    },
    /// Transport failure mid-operation
    Bus {
        /// The underlying bus failure
        source: BusError,
        /// Bytes confirmed complete before the failure
        bytes_transferred: usize,
    },
    /// Read-back verification found a byte that differs from the expected data
    VerifyMismatch {
        /// Device offset of the first mismatching byte
        offset: u32,
        /// Byte value expected at that offset
        expected: u8,
        /// Byte value actually read
        found: u8,
    },
}

impl OperationError {
    /// Bytes confirmed complete before the failure (zero for validation
    /// errors, which occur before any bus activity).
    pub fn bytes_transferred(&self) -> usize {
        match self {
            Self::DeviceTimeout { bytes_transferred } | Self::Bus { bytes_transferred, .. } => {
                *bytes_transferred
            }
            _ => 0,
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnalignedRange => write!(f, "range not aligned to erase-block size"),
            Self::RangeOutOfBounds => write!(f, "range exceeds device size"),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "length mismatch: range is {} bytes, got {}", expected, actual)
            }
            Self::DeviceTimeout { bytes_transferred } => {
                write!(
                    f,
                    "device busy timeout after {} bytes completed",
                    bytes_transferred
                )
            }
            Self::Bus {
                source,
                bytes_transferred,
            } => {
                write!(f, "{} after {} bytes completed", source, bytes_transferred)
            }
            Self::VerifyMismatch {
                offset,
                expected,
                found,
            } => {
                write!(
                    f,
                    "verify failed at 0x{:08X}: expected 0x{:02X}, found 0x{:02X}",
                    offset, expected, found
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BusError {}

#[cfg(feature = "std")]
impl std::error::Error for ResolutionError {}

#[cfg(feature = "std")]
impl std::error::Error for OperationError {}
