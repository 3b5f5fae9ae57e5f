//! Unified error types for the ClockClock sync firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they can
//! be passed through the state machine and event sink without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bus frame could not be decoded.
    Protocol(FrameError),
    /// The persistent store rejected a read, write or commit.
    Storage(crate::app::ports::StorageError),
    /// A radio subsystem (access point, station, time fetch) failed.
    Comms(crate::app::ports::ConnectivityError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

/// Why a command frame was discarded.  Never reported to the bus master;
/// only used for debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame shorter than 2 or longer than 6 bytes.
    BadLength(usize),
    /// Trailing byte does not match the additive checksum.
    BadChecksum { expected: u8, found: u8 },
    /// First byte is not a known command id.
    UnknownCommand(u8),
    /// Known command id but wrong total length for it.
    PayloadMismatch { id: u8, len: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(len) => write!(f, "frame length {len} outside 2..=6"),
            Self::BadChecksum { expected, found } => {
                write!(f, "checksum mismatch (expected 0x{expected:02x}, found 0x{found:02x})")
            }
            Self::UnknownCommand(id) => write!(f, "unknown command id {id}"),
            Self::PayloadMismatch { id, len } => {
                write!(f, "command {id} does not take a {len}-byte frame")
            }
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Protocol(e)
    }
}

impl From<crate::app::ports::StorageError> for Error {
    fn from(e: crate::app::ports::StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<crate::app::ports::ConnectivityError> for Error {
    fn from(e: crate::app::ports::ConnectivityError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
