//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, publish over MQTT.

use crate::battery::BatteryLevel;
use crate::config::NUMBER_OF_PUMPS;
use crate::error::CommandError;
use crate::schedule::{Activation, Projection};

use super::commands::AppCommand;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Wake cycle started with this state loaded from NVS.
    Started { remaining_ml: i32, active_pumps: usize },

    /// Snapshot published once per wake.
    Telemetry(TelemetryData),

    /// An hour boundary was handled.
    HourTick { epoch_hour: u64 },

    /// No wall clock this wake; countdowns were left alone.
    ClockUnavailable,

    /// A due pump ran.
    PumpActivated(Activation),

    /// Evaluation skipped because the reservoir is estimated empty.
    WaterEmpty { remaining_ml: i32 },

    /// Remaining water after an evaluation pass.
    WaterLevel { remaining_ml: i32 },

    /// An inbound command was validated and written through.
    CommandApplied(AppCommand),

    /// An inbound command was rejected; state unchanged.
    CommandRejected(CommandError),

    /// The wake cycle is over.
    Sleeping { secs: u32 },
}

/// Per-pump part of a [`TelemetryData`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpStatus {
    pub frequency_category: u8,
    pub hours_until_due: i32,
    pub amount_category: u8,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub battery_volts: f32,
    pub battery_level: BatteryLevel,
    pub remaining_ml: i32,
    pub container_size_category: u8,
    pub pumps: [PumpStatus; NUMBER_OF_PUMPS],
    pub days_left: Projection,
}
