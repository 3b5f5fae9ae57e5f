//! SNTP client adapter.
//!
//! Implements [`TimeFetchPort`].  On ESP-IDF the client writes the system
//! clock itself once a server answers; the FSM notices through the clock
//! reading, never through this adapter.
//!
//! The simulation backend holds a reference time that the board adapter
//! copies into the clock once the station is up.

use log::info;

use crate::app::ports::{ConnectivityError, TimeFetchPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sntp::{EspSntp, SntpConf};

pub struct SntpClient {
    #[cfg(target_os = "espidf")]
    sntp: Option<EspSntp<'static>>,
    #[cfg(not(target_os = "espidf"))]
    running: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_reference: Option<i64>,
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SntpClient {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            sntp: None,
            #[cfg(not(target_os = "espidf"))]
            running: false,
            #[cfg(not(target_os = "espidf"))]
            sim_reference: None,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SntpClient {
    /// Time the simulated servers will hand out.  `None` makes them silent.
    pub fn sim_set_reference(&mut self, epoch: Option<i64>) {
        self.sim_reference = epoch;
    }

    /// The answer a server would give right now, if the client is running.
    pub fn sim_sample(&self) -> Option<i64> {
        self.sim_reference.filter(|_| self.running)
    }
}

/// Copy server hints into the client's fixed slots, in priority order.
/// Hints beyond the slot count are dropped.  Returns how many were used.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
pub(crate) fn fill_server_slots<'a>(slots: &mut [&'a str], servers: &[&'a str]) -> usize {
    let used = slots.len().min(servers.len());
    slots[..used].copy_from_slice(&servers[..used]);
    used
}

#[cfg(target_os = "espidf")]
impl TimeFetchPort for SntpClient {
    fn start(&mut self, servers: &[&str]) -> Result<(), ConnectivityError> {
        if self.sntp.is_some() {
            return Ok(());
        }
        let mut conf = SntpConf::default();
        if fill_server_slots(&mut conf.servers, servers) == 0 {
            return Err(ConnectivityError::SntpFailed);
        }
        let sntp = EspSntp::new(&conf).map_err(|e| {
            log::warn!("SNTP: start failed: {}", e);
            ConnectivityError::SntpFailed
        })?;
        self.sntp = Some(sntp);
        info!("SNTP: started ({} servers)", servers.len());
        Ok(())
    }

    fn stop(&mut self) {
        if self.sntp.take().is_some() {
            info!("SNTP: stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.sntp.is_some()
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimeFetchPort for SntpClient {
    fn start(&mut self, servers: &[&str]) -> Result<(), ConnectivityError> {
        if servers.is_empty() {
            return Err(ConnectivityError::SntpFailed);
        }
        if !self.running {
            self.running = true;
            info!("SNTP(sim): started against {}", servers[0]);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("SNTP(sim): stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
