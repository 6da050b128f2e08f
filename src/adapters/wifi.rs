//! WiFi station bring-up and SNTP time sync.
//!
//! The device only needs the network for a few seconds per wake: long
//! enough to set the wall clock and exchange MQTT messages. Every failure
//! here is non-fatal; without a synced clock the scheduler falls back to
//! blind sleep.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` plus `EspSntp`.
//! - **all other targets**: a simulated link that only validates
//!   credentials, for host-side tests.

use core::fmt;
use log::{info, warn};

use crate::config::NetworkConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    sntp::{EspSntp, SyncStatus},
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

/// Connect attempts before the wake continues offline.
pub const WIFI_CONNECT_ATTEMPTS: u32 = 3;
const WIFI_RETRY_DELAY_MS: u32 = 1_000;
/// How long to wait for the first SNTP response.
pub const SNTP_TIMEOUT_MS: u32 = 10_000;
const SNTP_POLL_MS: u32 = 100;

// ───────────────────────────────────────────────────────────────
// Credential validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Check baked-in or stored credentials before touching the radio.
pub fn validate_credentials(net: &NetworkConfig) -> Result<(), CredentialError> {
    let ssid = net.wifi_ssid.as_str();
    if ssid.is_empty() {
        return Err(CredentialError::NoCredentials);
    }
    if !is_printable_ascii(ssid) {
        return Err(CredentialError::InvalidSsid);
    }
    let password = net.wifi_password.as_str();
    if !password.is_empty() && password.len() < 8 {
        return Err(CredentialError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Link (ESP-IDF)
// ───────────────────────────────────────────────────────────────

/// An up WiFi station. Dropping it tears the connection down.
#[cfg(target_os = "espidf")]
pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    sntp: Option<EspSntp<'static>>,
}

#[cfg(target_os = "espidf")]
impl WifiLink {
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        net: &NetworkConfig,
    ) -> Result<Self, CommsError> {
        if let Err(e) = validate_credentials(net) {
            warn!("WiFi: {}", e);
            return Err(CommsError::WifiConnectFailed);
        }

        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
            warn!("WiFi: driver init failed: {:?}", e);
            CommsError::WifiConnectFailed
        })?;
        let mut wifi =
            BlockingWifi::wrap(esp_wifi, sysloop).map_err(|_| CommsError::WifiConnectFailed)?;

        let auth_method = if net.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: net
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            password: net
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            auth_method,
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|_| CommsError::WifiConnectFailed)?;
        wifi.start().map_err(|_| CommsError::WifiConnectFailed)?;
        info!("WiFi: connecting to '{}'", net.wifi_ssid);

        for attempt in 1..=WIFI_CONNECT_ATTEMPTS {
            match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                Ok(()) => {
                    info!("WiFi: connected on attempt {}", attempt);
                    return Ok(Self { wifi, sntp: None });
                }
                Err(e) => {
                    warn!("WiFi: attempt {}/{} failed: {:?}", attempt, WIFI_CONNECT_ATTEMPTS, e);
                    let _ = wifi.disconnect();
                    esp_idf_hal::delay::FreeRtos::delay_ms(WIFI_RETRY_DELAY_MS);
                }
            }
        }

        let _ = wifi.stop();
        Err(CommsError::WifiConnectFailed)
    }

    /// Start SNTP and block until the first sync or `SNTP_TIMEOUT_MS`.
    pub fn sync_time(&mut self) -> Result<(), CommsError> {
        let sntp = EspSntp::new_default().map_err(|e| {
            warn!("SNTP: start failed: {:?}", e);
            CommsError::TimeSyncFailed
        })?;

        let mut waited = 0;
        while sntp.get_sync_status() != SyncStatus::Completed {
            if waited >= SNTP_TIMEOUT_MS {
                warn!("SNTP: no response after {}ms", waited);
                return Err(CommsError::TimeSyncFailed);
            }
            esp_idf_hal::delay::FreeRtos::delay_ms(SNTP_POLL_MS);
            waited += SNTP_POLL_MS;
        }
        info!("SNTP: synced after {}ms", waited);
        self.sntp = Some(sntp);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    pub fn disconnect(mut self) {
        self.sntp = None;
        let _ = self.wifi.disconnect();
        let _ = self.wifi.stop();
        info!("WiFi: down");
    }
}

// ───────────────────────────────────────────────────────────────
// Link (simulation)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct WifiLink {
    ssid: heapless::String<32>,
    synced: bool,
}

#[cfg(not(target_os = "espidf"))]
impl WifiLink {
    pub fn connect(net: &NetworkConfig) -> Result<Self, CommsError> {
        if let Err(e) = validate_credentials(net) {
            warn!("WiFi(sim): {}", e);
            return Err(CommsError::WifiConnectFailed);
        }
        info!("WiFi(sim): connected to '{}'", net.wifi_ssid);
        Ok(Self {
            ssid: net.wifi_ssid.clone(),
            synced: false,
        })
    }

    /// The simulated clock is set directly through the time adapter.
    pub fn sync_time(&mut self) -> Result<(), CommsError> {
        self.synced = true;
        info!("SNTP(sim): '{}' reports time synced", self.ssid);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        true
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn disconnect(self) {
        info!("WiFi(sim): down");
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn net(ssid: &str, password: &str) -> NetworkConfig {
        let mut n = NetworkConfig::default();
        n.wifi_ssid = heapless::String::try_from(ssid).unwrap();
        n.wifi_password = heapless::String::try_from(password).unwrap();
        n
    }

    #[test]
    fn empty_ssid_means_offline() {
        assert_eq!(
            validate_credentials(&net("", "password123")),
            Err(CredentialError::NoCredentials)
        );
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(
            validate_credentials(&net("MyNet", "short")),
            Err(CredentialError::InvalidPassword)
        );
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(
            validate_credentials(&net("bad\nnet", "password123")),
            Err(CredentialError::InvalidSsid)
        );
    }

    #[test]
    fn accepts_open_network() {
        assert!(validate_credentials(&net("OpenCafe", "")).is_ok());
    }

    #[test]
    fn sim_link_connects_and_syncs() {
        let mut link = WifiLink::connect(&net("HomeWiFi", "mysecret8")).unwrap();
        assert!(link.is_connected());
        assert!(!link.is_synced());
        link.sync_time().unwrap();
        assert!(link.is_synced());
        link.disconnect();
    }

    #[test]
    fn sim_link_without_credentials_fails() {
        assert_eq!(
            WifiLink::connect(&net("", "")).err(),
            Some(CommsError::WifiConnectFailed)
        );
    }
}
