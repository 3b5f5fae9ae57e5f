//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the control loop stops calling [`Watchdog::feed`]
//! for longer than the configured timeout.  The I²C pump thread is not
//! subscribed; a stalled control loop is what matters, since a dead pump
//! only costs the host a stale status byte.

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

use log::info;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    timeout_secs: u32,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_secs: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: timeout_secs.saturating_mul(1000),
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // SAFETY: called once from the control task during startup.
            let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
            if ret != ESP_OK {
                log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
            }

            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!("Watchdog: subscribed ({}s timeout, panic on trigger)", timeout_secs);
            } else {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
            }

            Self {
                subscribed,
                timeout_secs,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {}s timeout, no-op", timeout_secs);
            Self { timeout_secs }
        }
    }

    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    /// Feed the watchdog.  Called once per control tick.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: only called from the subscribed task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
