//! Board adapter: bridges the radio, request server, SNTP client and
//! clock to the domain port traits.
//!
//! The service takes one `hw` value that satisfies every collaborator
//! port; this is it.  Each port call is delegated to the adapter that owns
//! the resource.  On non-espidf targets every part runs its simulation
//! backend, and the SNTP simulation writes the clock as soon as a fetch
//! starts over a joined link.

use log::warn;

use crate::app::ports::{
    AccessPointPort, ClockPort, ConnectivityError, NetworkJoinPort, TimeFetchPort,
};
use crate::config::SystemConfig;
use crate::feedback::FeedbackState;
use crate::provisioning::{CredentialSubmission, ProvisioningError};

use super::portal::ProvisioningPortal;
use super::sntp::SntpClient;
use super::time::SystemClock;
use super::wifi::{RadioMode, WifiRadio};

/// Concrete adapter that combines all collaborators behind port traits.
pub struct BoardAdapter {
    wifi: WifiRadio,
    portal: ProvisioningPortal,
    sntp: SntpClient,
    clock: SystemClock,
    config: SystemConfig,
}

impl BoardAdapter {
    pub fn new(
        wifi: WifiRadio,
        portal: ProvisioningPortal,
        sntp: SntpClient,
        clock: SystemClock,
        config: SystemConfig,
    ) -> Self {
        Self {
            wifi,
            portal,
            sntp,
            clock,
            config,
        }
    }

    pub fn wifi(&self) -> &WifiRadio {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut WifiRadio {
        &mut self.wifi
    }

    pub fn portal_mut(&mut self) -> &mut ProvisioningPortal {
        &mut self.portal
    }

    pub fn sntp_mut(&mut self) -> &mut SntpClient {
        &mut self.sntp
    }

    pub fn clock_mut(&mut self) -> &mut SystemClock {
        &mut self.clock
    }
}

// ── AccessPointPort implementation ────────────────────────────

impl AccessPointPort for BoardAdapter {
    fn start(&mut self) -> Result<(), ConnectivityError> {
        self.wifi.start_access_point(&self.config)?;
        if let Err(e) = self.portal.start() {
            warn!("Board: request server failed: {:#}", e);
            self.wifi.stop_access_point();
            return Err(ConnectivityError::ServerFailed);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.portal.stop();
        self.wifi.stop_access_point();
    }

    fn is_active(&self) -> bool {
        self.wifi.mode() == RadioMode::AccessPoint && self.portal.is_serving()
    }

    fn take_submission(&mut self) -> Option<CredentialSubmission> {
        self.portal.take_submission()
    }

    fn report_submission(&mut self, result: Result<(), ProvisioningError>) {
        self.portal.report(result);
    }

    fn publish_feedback(&mut self, feedback: &FeedbackState) {
        self.portal.publish_feedback(feedback);
    }
}

// ── NetworkJoinPort implementation ────────────────────────────

impl NetworkJoinPort for BoardAdapter {
    fn start(&mut self, ssid: &str, passphrase: Option<&str>) -> Result<(), ConnectivityError> {
        NetworkJoinPort::start(&mut self.wifi, ssid, passphrase)
    }

    fn disconnect(&mut self) {
        self.wifi.disconnect();
    }

    fn is_joined(&self) -> bool {
        self.wifi.is_joined()
    }
}

// ── TimeFetchPort implementation ──────────────────────────────

impl TimeFetchPort for BoardAdapter {
    fn start(&mut self, servers: &[&str]) -> Result<(), ConnectivityError> {
        TimeFetchPort::start(&mut self.sntp, servers)?;
        #[cfg(not(target_os = "espidf"))]
        if self.wifi.is_joined() {
            if let Some(epoch) = self.sntp.sim_sample() {
                self.clock.adjust(epoch);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        TimeFetchPort::stop(&mut self.sntp);
    }

    fn is_running(&self) -> bool {
        self.sntp.is_running()
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl ClockPort for BoardAdapter {
    fn read_utc_epoch(&self) -> i64 {
        self.clock.read_utc_epoch()
    }

    fn adjust(&mut self, epoch: i64) {
        self.clock.adjust(epoch);
    }

    fn uptime_secs(&self) -> u64 {
        self.clock.uptime_secs()
    }
}
