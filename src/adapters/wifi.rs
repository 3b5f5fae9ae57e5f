//! WiFi radio adapter.
//!
//! Owns the single radio and switches it between the provisioning access
//! point and station mode.  Implements [`NetworkJoinPort`]; the access
//! point half is driven by [`BoardAdapter`](super::hardware::BoardAdapter)
//! together with the request server.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation with a configurable reachable network.
//!
//! The radio cannot run both modes at once.  Starting one while the other
//! is up is refused, so a missing teardown shows up as an error instead of
//! a silent mode switch.

use log::{info, warn};

use crate::app::ports::{ConnectivityError, NetworkJoinPort};
use crate::config::{AP_PASSWORD, AP_SSID, STATION_HOSTNAME, SystemConfig};
use crate::provisioning::is_printable_ascii;
use crate::settings::MAX_CREDENTIAL_LEN;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    ipv4::{Configuration as IpConfiguration, Mask, RouterConfiguration, Subnet},
    netif::{EspNetif, NetifConfiguration},
    nvs::EspDefaultNvsPartition,
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Radio mode
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Off,
    AccessPoint,
    Station,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > MAX_CREDENTIAL_LEN || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_passphrase(passphrase: Option<&str>) -> Result<(), ConnectivityError> {
    match passphrase {
        Some(p) if p.len() < 8 || p.len() > MAX_CREDENTIAL_LEN => {
            Err(ConnectivityError::InvalidPassword)
        }
        _ => Ok(()),
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi radio
// ───────────────────────────────────────────────────────────────

pub struct WifiRadio {
    mode: RadioMode,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    /// Simulation: the one network in range, with its passphrase.
    #[cfg(not(target_os = "espidf"))]
    sim_network: Option<(heapless::String<32>, Option<heapless::String<32>>)>,
    #[cfg(not(target_os = "espidf"))]
    sim_joined: bool,
}

#[cfg(target_os = "espidf")]
impl WifiRadio {
    /// Bring up the driver with the access-point interface on the
    /// configured address.  The radio stays off until a mode is started.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        config: &SystemConfig,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs))?;

        let [a, b, c, d] = config.access_point_ip;
        let gateway = core::net::Ipv4Addr::new(a, b, c, d);
        let ap_netif = EspNetif::new_with_conf(&NetifConfiguration {
            ip_configuration: Some(IpConfiguration::Router(RouterConfiguration {
                subnet: Subnet {
                    gateway,
                    mask: Mask(24),
                },
                dhcp_enabled: true,
                dns: Some(gateway),
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        })?;
        wifi.swap_netif_ap(ap_netif)?;
        wifi.sta_netif_mut().set_hostname(STATION_HOSTNAME)?;

        info!("WiFi: driver ready, AP address {}", gateway);
        Ok(Self {
            mode: RadioMode::Off,
            wifi,
        })
    }

    fn platform_start_ap(&mut self, config: &SystemConfig) -> Result<(), ConnectivityError> {
        let ap = AccessPointConfiguration {
            ssid: AP_SSID.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: AP_PASSWORD
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: AuthMethod::WPA2Personal,
            channel: config.access_point_channel,
            max_connections: config.access_point_max_clients,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::AccessPoint(ap))
            .and_then(|()| self.wifi.start())
            .map_err(|e| {
                warn!("WiFi: AP start failed: {}", e);
                ConnectivityError::RadioUnavailable
            })
    }

    fn platform_start_station(
        &mut self,
        ssid: &str,
        passphrase: Option<&str>,
    ) -> Result<(), ConnectivityError> {
        let client = ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: passphrase
                .unwrap_or("")
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if passphrase.is_some() {
                AuthMethod::WPA2Personal
            } else {
                AuthMethod::None
            },
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .and_then(|()| self.wifi.start())
            .and_then(|()| self.wifi.connect())
            .map_err(|e| {
                warn!("WiFi: station start failed: {}", e);
                ConnectivityError::RadioUnavailable
            })
    }

    fn platform_stop(&mut self) {
        if self.mode == RadioMode::Station {
            let _ = self.wifi.disconnect();
        }
        if let Err(e) = self.wifi.stop() {
            warn!("WiFi: stop failed: {}", e);
        }
    }

    fn platform_is_joined(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiRadio {
    pub fn new(config: &SystemConfig) -> Self {
        let [a, b, c, d] = config.access_point_ip;
        info!("WiFi(sim): radio ready, AP address {}.{}.{}.{}", a, b, c, d);
        Self {
            mode: RadioMode::Off,
            sim_network: None,
            sim_joined: false,
        }
    }

    /// Put a network in range.  `passphrase` is `None` for an open one.
    pub fn sim_set_network(&mut self, ssid: &str, passphrase: Option<&str>) {
        self.sim_network = Some((
            crate::settings::bounded(ssid),
            passphrase.map(crate::settings::bounded),
        ));
    }

    /// Take every network out of range.
    pub fn sim_clear_network(&mut self) {
        self.sim_network = None;
        self.sim_joined = false;
    }

    fn platform_start_ap(&mut self, _config: &SystemConfig) -> Result<(), ConnectivityError> {
        info!("WiFi(sim): AP '{}' up ({} byte password)", AP_SSID, AP_PASSWORD.len());
        Ok(())
    }

    fn platform_start_station(
        &mut self,
        ssid: &str,
        passphrase: Option<&str>,
    ) -> Result<(), ConnectivityError> {
        self.sim_joined = matches!(
            &self.sim_network,
            Some((net, pass)) if net.as_str() == ssid && pass.as_deref() == passphrase
        );
        info!(
            "WiFi(sim): station '{}' as '{}' {}",
            ssid,
            STATION_HOSTNAME,
            if self.sim_joined { "joined" } else { "searching" }
        );
        Ok(())
    }

    fn platform_stop(&mut self) {
        self.sim_joined = false;
    }

    fn platform_is_joined(&self) -> bool {
        self.sim_joined
    }
}

impl WifiRadio {
    pub fn mode(&self) -> RadioMode {
        self.mode
    }

    /// Switch the radio into access-point mode.
    pub fn start_access_point(&mut self, config: &SystemConfig) -> Result<(), ConnectivityError> {
        match self.mode {
            RadioMode::AccessPoint => return Ok(()),
            RadioMode::Station => {
                warn!("WiFi: AP requested while station active");
                return Err(ConnectivityError::RadioUnavailable);
            }
            RadioMode::Off => {}
        }
        self.platform_start_ap(config)?;
        self.mode = RadioMode::AccessPoint;
        info!("WiFi: access point '{}' started", AP_SSID);
        Ok(())
    }

    pub fn stop_access_point(&mut self) {
        if self.mode == RadioMode::AccessPoint {
            self.platform_stop();
            self.mode = RadioMode::Off;
            info!("WiFi: access point stopped");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkJoinPort
// ───────────────────────────────────────────────────────────────

impl NetworkJoinPort for WifiRadio {
    fn start(&mut self, ssid: &str, passphrase: Option<&str>) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_passphrase(passphrase)?;
        match self.mode {
            RadioMode::AccessPoint => {
                warn!("WiFi: join requested while access point active");
                return Err(ConnectivityError::RadioUnavailable);
            }
            RadioMode::Station => self.platform_stop(),
            RadioMode::Off => {}
        }

        info!(
            "WiFi: joining '{}' ({})",
            ssid,
            if passphrase.is_some() { "protected" } else { "open" }
        );
        // Mode is claimed even on failure so disconnect() releases the radio.
        self.mode = RadioMode::Station;
        self.platform_start_station(ssid, passphrase)
    }

    fn disconnect(&mut self) {
        if self.mode == RadioMode::Station {
            self.platform_stop();
            self.mode = RadioMode::Off;
            info!("WiFi: disconnected");
        }
    }

    fn is_joined(&self) -> bool {
        self.mode == RadioMode::Station && self.platform_is_joined()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
