//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (access point, station, SNTP, RTC, EEPROM, event sinks)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches the radio
//! or flash directly.
//!
//! None of these calls may block: every long-running operation is started
//! here and then polled to completion one control tick at a time.

use crate::feedback::FeedbackState;
use crate::provisioning::{CredentialSubmission, ProvisioningError};

// ───────────────────────────────────────────────────────────────
// Access point + request server
// ───────────────────────────────────────────────────────────────

/// Soft-AP plus the local request server that hosts the provisioning page.
pub trait AccessPointPort {
    /// Bring up the access point and start serving requests.
    fn start(&mut self) -> Result<(), ConnectivityError>;

    /// Tear down the request server and the access point.
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    /// Take the most recent credential submission, if one arrived.
    fn take_submission(&mut self) -> Option<CredentialSubmission>;

    /// Tell the request server how the last submission was handled.
    fn report_submission(&mut self, result: Result<(), ProvisioningError>);

    /// Publish the latest feedback for read-only display.
    fn publish_feedback(&mut self, feedback: &FeedbackState);
}

// ───────────────────────────────────────────────────────────────
// Network join (WiFi station)
// ───────────────────────────────────────────────────────────────

pub trait NetworkJoinPort {
    /// Start joining `ssid`.  `passphrase` is `None` for open networks.
    fn start(&mut self, ssid: &str, passphrase: Option<&str>) -> Result<(), ConnectivityError>;

    fn disconnect(&mut self);

    fn is_joined(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Time fetch (SNTP)
// ───────────────────────────────────────────────────────────────

pub trait TimeFetchPort {
    /// Start the time-fetch client against the given server hints.
    fn start(&mut self, servers: &[&str]) -> Result<(), ConnectivityError>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Hardware clock
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Current wall-clock time as UTC epoch seconds.
    fn read_utc_epoch(&self) -> i64;

    /// Overwrite the wall clock.
    fn adjust(&mut self, epoch: i64);

    /// Monotonic seconds since boot.  Never jumps when the wall clock is set.
    fn uptime_secs(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Persistent store (byte-addressable, EEPROM-like)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable persistent store.
///
/// Writes are staged until [`commit`](Self::commit); only a successful
/// commit makes them durable.  The store itself gives no torn-write
/// guarantee, which is why the settings layer keeps two shadow slots.
pub trait PersistentStore {
    /// Total addressable size in bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Stage `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Make all staged writes durable.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// Radio driver refused the mode change.
    RadioUnavailable,
    /// SSID empty or not printable ASCII.
    InvalidSsid,
    /// Passphrase rejected by the driver.
    InvalidPassword,
    /// Request server could not be started.
    ServerFailed,
    /// Time-fetch client could not be started.
    SntpFailed,
}

impl core::fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RadioUnavailable => write!(f, "radio unavailable"),
            Self::InvalidSsid => write!(f, "SSID invalid (1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "passphrase rejected"),
            Self::ServerFailed => write!(f, "request server failed to start"),
            Self::SntpFailed => write!(f, "SNTP client failed to start"),
        }
    }
}

/// Errors from [`PersistentStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access outside `0..capacity()`.
    OutOfBounds,
    /// Generic I/O error from the backing flash.
    IoError,
    /// Staged writes could not be made durable.
    CommitFailed,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::IoError => write!(f, "I/O error"),
            Self::CommitFailed => write!(f, "commit failed"),
        }
    }
}
