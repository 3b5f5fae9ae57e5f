//! System configuration parameters
//!
//! Compiled-in constants for the sync module.  Identity strings are plain
//! constants; the numeric tunables live in [`SystemConfig`] so tests can
//! shorten them.

use serde::{Deserialize, Serialize};

// --- Factory settings ---
pub const DEFAULT_SSID: &str = "Wifi";
pub const DEFAULT_PASSPHRASE: &str = "12345678";
pub const DEFAULT_PROTECTED: bool = false;

// --- Provisioning access point ---
pub const AP_SSID: &str = "ClockClock";
pub const AP_PASSWORD: &str = "vierundzwanzig";

// --- Station ---
pub const STATION_HOSTNAME: &str = "ClockClockNTPService";
pub const TIME_SERVERS: [&str; 2] = ["pool.ntp.org", "time.nist.gov"];

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Task watchdog timeout (seconds)
    pub watchdog_timeout_secs: u32,

    // --- Clock ---
    /// Value the hardware clock is set to at boot and at the start of
    /// every sync session (2010-01-01T00:00:00Z).
    pub boot_epoch: i64,
    /// A clock later than this has been set by a real fetch
    /// (2020-01-01T00:00:00Z).
    pub known_valid_epoch: i64,

    // --- Access point ---
    /// Address of the access point and its request server.
    pub access_point_ip: [u8; 4],
    pub access_point_channel: u8,
    pub access_point_max_clients: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            control_loop_interval_ms: 10,
            watchdog_timeout_secs: 10,

            boot_epoch: 1_262_304_000,
            known_valid_epoch: 1_577_836_800,

            access_point_ip: [172, 217, 28, 1],
            access_point_channel: 1,
            access_point_max_clients: 4,
        }
    }
}
