//! Plant Nanny Firmware — Main Entry Point
//!
//! One wake cycle per boot: the device wakes from deep sleep (timer or
//! button), runs at most one hourly watering pass, applies any queued
//! commands, publishes telemetry and powers down until the next hour.
//! The hourly pass runs off the RTC before the radio comes up.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (Actuator+Batt)   (EventSink)    (Config+KV)  (ClockPort)     │
//! │  WifiLink          MqttAdapter                                 │
//! │  (STA + SNTP)      (EventSink + command ingestion)             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  HourlyScheduler · Evaluator · Commands · Projector    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  CycleStep::Sleep(secs) ──▶ power::enter_deep_sleep            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

mod esp_link_shims;

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use plantnanny::adapters::hardware::HardwareAdapter;
use plantnanny::adapters::log_sink::LogEventSink;
use plantnanny::adapters::mqtt::MqttAdapter;
use plantnanny::adapters::nvs::NvsAdapter;
use plantnanny::adapters::time::Esp32TimeAdapter;
use plantnanny::adapters::wifi::WifiLink;
use plantnanny::app::events::AppEvent;
use plantnanny::app::ports::{ClockPort, ConfigPort, EventSink};
use plantnanny::app::service::{AppService, CycleStep};
use plantnanny::config::SystemConfig;
use plantnanny::drivers;
use plantnanny::drivers::button::{self, ButtonDriver};
use plantnanny::events::{Event, EventQueue};
use plantnanny::power::{self, WakeReason};

/// Loop period while waiting for commands or the inactivity timeout.
const POLL_INTERVAL_MS: u32 = 50;
/// Grace period for queued MQTT publishes before the radio powers down.
const PUBLISH_FLUSH_MS: u32 = 500;
/// Time for retained command messages to arrive after subscribing.
const RETAINED_GRACE_MS: u32 = 500;

// ── Event fan-out ─────────────────────────────────────────────
//
// Every domain event goes to the serial log; when the broker is reachable
// the MQTT adapter also turns it into telemetry publishes.

struct FanoutSink {
    log: LogEventSink,
    mqtt: Option<MqttAdapter>,
}

impl EventSink for FanoutSink {
    fn emit(&mut self, event: &AppEvent) {
        self.log.emit(event);
        if let Some(mqtt) = self.mqtt.as_mut() {
            mqtt.emit(event);
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Plant Nanny v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Pumps off before anything else ─────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Pumps may be floating; sleeping is the safest state left.
        error!("HAL init failed: {}, sleeping one hour", e);
        power::enter_deep_sleep(3_600);
    }
    let mut hw = HardwareAdapter::default();

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Wake reason ────────────────────────────────────────
    let wake_reason = power::wake_reason();
    info!("Boot: {:?}", wake_reason);

    let clock = Esp32TimeAdapter::new();
    clock.set_timezone(config.network.timezone.as_str());

    let queue = Arc::new(EventQueue::new());
    if wake_reason == WakeReason::Button {
        queue.push(Event::UserActivity);
    }

    // ── 5. Construct app service ──────────────────────────────
    let mut sink = FanoutSink {
        log: LogEventSink::new(),
        mqtt: None,
    };
    let mut app = AppService::new(config, &nvs, clock.uptime_ms());
    match app.provision(&mut nvs) {
        Ok(true) => info!("First boot: defaults written to NVS"),
        Ok(false) => {}
        Err(e) => warn!("Provisioning NVS failed ({}), continuing", e),
    }
    app.start(&mut sink);

    // ── 6. Hour boundary before the radio ─────────────────────
    // The RTC keeps wall time through deep sleep; a timer wake lands
    // inside the boundary window and must not wait for the network.
    let mut step = CycleStep::Continue;
    if clock.now().is_some() {
        step = app.poll(clock.uptime_ms(), &queue, &clock, &mut hw, &mut nvs, &mut sink);
    }

    // ── 7. Network (best effort) ──────────────────────────────
    let mut link = None;
    if step == CycleStep::Continue {
        let radio = match (
            Peripherals::take(),
            EspSystemEventLoop::take(),
            EspDefaultNvsPartition::take(),
        ) {
            (Ok(p), Ok(sysloop), Ok(part)) => Some((p.modem, sysloop, part)),
            _ => {
                warn!("Radio peripherals unavailable, running offline");
                None
            }
        };

        let network = &app.config().network;
        match radio {
            Some((modem, sysloop, part)) if network.wifi_enabled() => {
                match WifiLink::connect(modem, sysloop, part, network) {
                    Ok(mut l) => {
                        if let Err(e) = l.sync_time() {
                            warn!("Time sync failed ({}), keeping RTC time", e);
                        }
                        if network.mqtt_enabled() {
                            match MqttAdapter::connect(app.config(), Arc::clone(&queue)) {
                                Ok(m) => {
                                    sink.mqtt = Some(m);
                                    // Retained commands follow the SUBACK.
                                    esp_idf_svc::hal::delay::FreeRtos::delay_ms(RETAINED_GRACE_MS);
                                }
                                Err(e) => {
                                    warn!("MQTT unavailable ({}), commands wait for next wake", e);
                                }
                            }
                        }
                        link = Some(l);
                    }
                    Err(e) => warn!("WiFi unavailable ({}), running offline", e),
                }
            }
            _ => info!("No WiFi credentials, running offline"),
        }

        app.extend_wake(clock.uptime_ms());
        app.publish_telemetry(&mut hw, &mut sink);
    }

    info!("System ready. Entering wake loop.");

    // ── 8. Wake loop ──────────────────────────────────────────
    let mut menu_button = ButtonDriver::new();
    let sleep_secs = loop {
        if let CycleStep::Sleep(secs) = step {
            break secs;
        }
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(POLL_INTERVAL_MS);

        let now_ms = clock.uptime_ms();
        if let Some(gesture) = menu_button.tick(now_ms, button::is_pressed()) {
            info!("Button: {:?}", gesture);
            queue.push(gesture.into_event());
        }
        step = app.poll(now_ms, &queue, &clock, &mut hw, &mut nvs, &mut sink);
    };

    // ── 9. Power down ─────────────────────────────────────────
    app.publish_telemetry(&mut hw, &mut sink);
    if sink.mqtt.is_some() {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(PUBLISH_FLUSH_MS);
    }
    drop(sink);
    if let Some(l) = link {
        l.disconnect();
    }
    power::enter_deep_sleep(sleep_secs)
}
