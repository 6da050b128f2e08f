//! System configuration parameters
//!
//! Compile-time device constants plus the tunable [`SystemConfig`].
//! Tunables can be overridden via NVS (see [`ConfigPort`](crate::app::ports::ConfigPort)).

use serde::{Deserialize, Serialize};

/// Number of physical pumps / plant slots on the board.
pub const NUMBER_OF_PUMPS: usize = 4;

/// Hard ceiling for a single topic string (root + device + pump + command).
pub const MAX_TOPIC_LEN: usize = 64;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Messaging ---
    /// First topic segment, e.g. `plant-nanny`.
    pub topic_root: heapless::String<24>,
    /// Second topic segment identifying this device, e.g. `1`.
    pub device_id: heapless::String<8>,

    // --- Timing ---
    /// Seconds added to every hour-aligned timer wake-up.
    /// The RTC slow clock runs fast; without this the device wakes at :59.
    pub timer_drift_compensation_secs: u32,
    /// Seconds after hh:00:00 still accepted as "on the hour boundary".
    pub boundary_tolerance_secs: u8,
    /// Sleep length when no wall clock is available (degraded mode).
    pub blind_sleep_secs: u32,
    /// Seconds without user input before the wake cycle ends.
    pub inactivity_threshold_secs: u32,

    // --- Pumps ---
    /// Pause between consecutive pump slots (inrush on shared supply).
    pub pump_settle_ms: u32,

    // --- Network ---
    pub network: NetworkConfig,
}

/// WiFi station and MQTT broker credentials.
///
/// Defaults are baked in at build time from `PLANTNANNY_*` environment
/// variables; an empty SSID disables networking and the device runs on
/// blind sleeps only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// e.g. `mqtt://192.168.1.10:1883`
    pub mqtt_url: heapless::String<64>,
    pub mqtt_user: heapless::String<32>,
    pub mqtt_password: heapless::String<64>,
    /// POSIX TZ string used for the local wall clock.
    pub timezone: heapless::String<48>,
}

impl NetworkConfig {
    pub fn wifi_enabled(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }

    pub fn mqtt_enabled(&self) -> bool {
        self.wifi_enabled() && !self.mqtt_url.is_empty()
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: build_time(option_env!("PLANTNANNY_WIFI_SSID")),
            wifi_password: build_time(option_env!("PLANTNANNY_WIFI_PASSWORD")),
            mqtt_url: build_time(option_env!("PLANTNANNY_MQTT_URL")),
            mqtt_user: build_time(option_env!("PLANTNANNY_MQTT_USER")),
            mqtt_password: build_time(option_env!("PLANTNANNY_MQTT_PASSWORD")),
            // Europe/Berlin
            timezone: build_time(Some("CET-1CEST,M3.5.0,M10.5.0/3")),
        }
    }
}

/// Copy a build-time string, dropping it if it does not fit.
fn build_time<const N: usize>(value: Option<&str>) -> heapless::String<N> {
    let mut out = heapless::String::new();
    if let Some(v) = value {
        if out.push_str(v).is_err() {
            out.clear();
        }
    }
    out
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut topic_root = heapless::String::new();
        let _ = topic_root.push_str("plant-nanny");
        let mut device_id = heapless::String::new();
        let _ = device_id.push_str("1");

        Self {
            topic_root,
            device_id,

            // Timing
            timer_drift_compensation_secs: 27,
            boundary_tolerance_secs: 59,
            blind_sleep_secs: 3600,
            inactivity_threshold_secs: 15,

            // Pumps
            pump_settle_ms: 1000,

            network: NetworkConfig::default(),
        }
    }
}
