//! Inbound commands to the application service.
//!
//! These are produced by the bus decoder in the frame-arrival context and
//! handed to the [`AppService`](super::service::AppService) through the
//! single-slot mailbox.  They are applied once per control tick, never
//! inside the decoder.

/// Lower bound for both sync timeout and validity window, in seconds.
pub const MIN_SYNC_SECS: u16 = 1;
/// Upper bound for the sync timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u16 = 1800;
/// Upper bound for the time-validity window, in seconds.
pub const MAX_VALIDITY_SECS: u16 = 3600;

/// Commands the host controller can send over the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open (`true`) or close (`false`) the provisioning access point.
    /// `false` also cancels a running sync.
    EnableProvisioning { enable: bool },

    /// Join the configured network and fetch the time.
    PollTime {
        timeout_secs: u16,
        validity_secs: u16,
    },

    /// Restore and persist the compiled-in default settings.
    ResetSettings,
}

impl Command {
    /// Build a `PollTime` with both fields clamped into their documented
    /// ranges.  Out-of-range requests are never rejected.
    pub fn poll_time(timeout_secs: u16, validity_secs: u16) -> Self {
        Self::PollTime {
            timeout_secs: timeout_secs.clamp(MIN_SYNC_SECS, MAX_TIMEOUT_SECS),
            validity_secs: validity_secs.clamp(MIN_SYNC_SECS, MAX_VALIDITY_SECS),
        }
    }
}
