//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to              |
//! |------------|--------------------|--------------------------|
//! | `hardware` | ActuatorPort       | Pump GPIOs (active-low)  |
//! |            | BatteryPort        | ESP32 ADC1               |
//! | `log_sink` | EventSink          | Serial log output        |
//! | `mqtt`     | EventSink          | Telemetry publishes      |
//! |            | (event producer)   | Command subscriptions    |
//! | `nvs`      | ConfigPort         | NVS / in-memory store    |
//! |            | StoragePort        |                          |
//! | `time`     | ClockPort          | SNTP-set RTC, local TZ   |
//! | `wifi`     | —                  | ESP-IDF WiFi STA + SNTP  |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
