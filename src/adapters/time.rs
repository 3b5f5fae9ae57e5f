//! System clock adapter.
//!
//! Implements [`ClockPort`]: wall-clock reads and writes plus monotonic
//! uptime.
//!
//! - **`target_os = "espidf"`**: `gettimeofday` / `settimeofday` for the
//!   wall clock (the SNTP client writes the same clock) and
//!   `esp_timer_get_time()` for uptime.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for uptime and
//!   a wall clock kept as an offset from it, so `adjust` never disturbs
//!   uptime.

use crate::app::ports::ClockPort;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Wall-clock epoch at `start`.
    #[cfg(not(target_os = "espidf"))]
    epoch_at_start: i64,
    /// Extra uptime injected by tests.
    #[cfg(not(target_os = "espidf"))]
    skew_secs: u64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            epoch_at_start: 0,
            #[cfg(not(target_os = "espidf"))]
            skew_secs: 0,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SystemClock {
    /// Move simulated time forward without sleeping.
    pub fn advance(&mut self, secs: u64) {
        self.skew_secs += secs;
    }
}

#[cfg(target_os = "espidf")]
impl ClockPort for SystemClock {
    fn read_utc_epoch(&self) -> i64 {
        let mut tv = esp_idf_sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid out-pointer; a null timezone is allowed.
        if unsafe { esp_idf_sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    fn adjust(&mut self, epoch: i64) {
        let tv = esp_idf_sys::timeval {
            tv_sec: epoch as esp_idf_sys::time_t,
            tv_usec: 0,
        };
        // SAFETY: tv outlives the call; a null timezone is allowed.
        if unsafe { esp_idf_sys::settimeofday(&tv, core::ptr::null()) } != 0 {
            log::warn!("SystemClock: settimeofday({}) failed", epoch);
        }
    }

    fn uptime_secs(&self) -> u64 {
        (unsafe { esp_idf_sys::esp_timer_get_time() }) as u64 / 1_000_000
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockPort for SystemClock {
    fn read_utc_epoch(&self) -> i64 {
        self.epoch_at_start + self.uptime_secs() as i64
    }

    fn adjust(&mut self, epoch: i64) {
        self.epoch_at_start = epoch - self.uptime_secs() as i64;
    }

    fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs() + self.skew_secs
    }
}
