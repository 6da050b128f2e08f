//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production). The MQTT
//! adapter implements the same trait for the network side.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { remaining_ml, active_pumps } => {
                info!("START | water={}mL active_pumps={}", remaining_ml, active_pumps);
            }
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | battery={:.2}V ({}) | water={}mL container={} | days_left={} | \
                     due={:?}",
                    t.battery_volts,
                    t.battery_level,
                    t.remaining_ml,
                    t.container_size_category,
                    t.days_left,
                    t.pumps.map(|p| p.hours_until_due),
                );
            }
            AppEvent::HourTick { epoch_hour } => {
                info!("TICK  | epoch_hour={}", epoch_hour);
            }
            AppEvent::ClockUnavailable => {
                warn!("TICK  | no wall clock, countdowns untouched");
            }
            AppEvent::PumpActivated(a) => {
                info!(
                    "PUMP  | pump={} ran {}ms ({}mL)",
                    a.pump + 1,
                    a.duration_ms,
                    a.volume_ml
                );
            }
            AppEvent::WaterEmpty { remaining_ml } => {
                warn!("WATER | empty ({}mL), watering skipped", remaining_ml);
            }
            AppEvent::WaterLevel { remaining_ml } => {
                info!("WATER | {}mL left", remaining_ml);
            }
            AppEvent::CommandApplied(cmd) => {
                info!("CMD   | applied {:?}", cmd);
            }
            AppEvent::CommandRejected(e) => {
                warn!("CMD   | rejected: {}", e);
            }
            AppEvent::Sleeping { secs } => {
                info!("SLEEP | {}s", secs);
            }
        }
    }
}
