//! MQTT adapter — command ingestion and telemetry publishing.
//!
//! Implements [`EventSink`] by translating domain events into telemetry
//! publishes, and feeds every message received on a command topic into the
//! shared [`EventQueue`] as a raw [`InboundMessage`]. Parsing happens in
//! the service, on the wake-loop thread.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with a receive thread.
//! - **all other targets**: records every publish and lets tests inject
//!   inbound messages.

use core::fmt::Write;
use std::sync::Arc;

use log::{info, warn};

use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::EventSink;
use crate::config::{NUMBER_OF_PUMPS, SystemConfig};
use crate::error::CommsError;
use crate::events::{Event, EventQueue, InboundMessage};
use crate::schedule::Projection;
use crate::topics::{self, Topic};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};

/// Payload text of one telemetry value.
pub type Payload = heapless::String<16>;

/// Most publishes a single event turns into (full telemetry snapshot).
pub const MAX_OUTBOUND: usize = 4 + 2 * NUMBER_OF_PUMPS;

/// How long `connect` waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub topic: Topic,
    pub payload: Payload,
}

// ───────────────────────────────────────────────────────────────
// Event → publish translation
// ───────────────────────────────────────────────────────────────

fn outbound(topic: Topic, value: impl core::fmt::Display) -> Outbound {
    let mut payload = Payload::new();
    let _ = write!(payload, "{}", value);
    Outbound { topic, payload }
}

/// Days as an integer, `-1` when the water never runs out.
fn days_left_value(p: Projection) -> i64 {
    match p {
        Projection::Days(d) => i64::from(d),
        Projection::Indefinite => -1,
    }
}

fn telemetry_messages(
    config: &SystemConfig,
    t: &TelemetryData,
    out: &mut heapless::Vec<Outbound, MAX_OUTBOUND>,
) {
    let battery = outbound(
        topics::device_topic(config, topics::TELEM_BATTERY),
        format_args!("{:.2}", t.battery_volts),
    );
    let _ = out.push(battery);
    let _ = out.push(outbound(
        topics::device_topic(config, topics::TELEM_WATER),
        t.remaining_ml,
    ));
    let _ = out.push(outbound(
        topics::device_topic(config, topics::TELEM_CONTAINER),
        t.container_size_category,
    ));
    let _ = out.push(outbound(
        topics::device_topic(config, topics::TELEM_DAYS_LEFT),
        days_left_value(t.days_left),
    ));
    for (index, pump) in t.pumps.iter().enumerate() {
        let _ = out.push(outbound(
            topics::pump_topic(config, index, topics::TELEM_FREQUENCY),
            pump.frequency_category,
        ));
        let _ = out.push(outbound(
            topics::pump_topic(config, index, topics::TELEM_WAIT),
            pump.hours_until_due,
        ));
    }
}

/// The publishes an event maps to. Most events publish nothing.
pub fn outbound_messages(
    config: &SystemConfig,
    event: &AppEvent,
) -> heapless::Vec<Outbound, MAX_OUTBOUND> {
    let mut out = heapless::Vec::new();
    match event {
        AppEvent::Telemetry(t) => telemetry_messages(config, t, &mut out),
        AppEvent::WaterLevel { remaining_ml } | AppEvent::WaterEmpty { remaining_ml } => {
            let _ = out.push(outbound(
                topics::device_topic(config, topics::TELEM_WATER),
                remaining_ml,
            ));
        }
        _ => {}
    }
    out
}

/// Queue a received message for the wake loop.
fn ingest(queue: &EventQueue, topic: &str, payload: &[u8]) -> bool {
    match InboundMessage::new(topic, payload) {
        Some(msg) => queue.push(Event::Message(msg)),
        None => {
            warn!("MQTT: dropping message on over-long topic '{}'", topic);
            false
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttAdapter {
    client: EspMqttClient<'static>,
    config: SystemConfig,
    connected: Arc<AtomicBool>,
}

#[cfg(target_os = "espidf")]
impl MqttAdapter {
    /// Connect, start the receive thread and subscribe to every command
    /// topic. Retained commands arrive right after subscribing.
    pub fn connect(config: &SystemConfig, queue: Arc<EventQueue>) -> Result<Self, CommsError> {
        let net = &config.network;
        let conf = MqttClientConfiguration {
            client_id: Some(config.device_id.as_str()),
            username: (!net.mqtt_user.is_empty()).then_some(net.mqtt_user.as_str()),
            password: (!net.mqtt_password.is_empty()).then_some(net.mqtt_password.as_str()),
            ..Default::default()
        };

        let (client, mut conn) = EspMqttClient::new(net.mqtt_url.as_str(), &conf).map_err(|e| {
            warn!("MQTT: client init failed: {:?}", e);
            CommsError::MqttConnectFailed
        })?;

        let connected = Arc::new(AtomicBool::new(false));
        let rx_connected = Arc::clone(&connected);
        std::thread::Builder::new()
            .name("mqtt-rx".into())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = conn.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => {
                            rx_connected.store(true, Ordering::Release);
                        }
                        EventPayload::Disconnected => {
                            rx_connected.store(false, Ordering::Release);
                        }
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            details: Details::Complete,
                            ..
                        } => {
                            ingest(&queue, topic, data);
                        }
                        _ => {}
                    }
                }
                info!("MQTT: receive loop ended");
            })
            .map_err(|_| CommsError::MqttConnectFailed)?;

        let mut waited = 0;
        while !connected.load(Ordering::Acquire) {
            if waited >= CONNECT_TIMEOUT_MS {
                warn!("MQTT: no CONNACK from '{}' after {}ms", net.mqtt_url, waited);
                return Err(CommsError::MqttConnectFailed);
            }
            esp_idf_hal::delay::FreeRtos::delay_ms(50);
            waited += 50;
        }

        let mut adapter = Self {
            client,
            config: config.clone(),
            connected,
        };
        for topic in topics::subscriptions(config) {
            if let Err(e) = adapter.client.subscribe(topic.as_str(), QoS::AtMostOnce) {
                warn!("MQTT: subscribe '{}' failed: {:?}", topic, e);
            }
        }
        info!("MQTT: connected to '{}'", net.mqtt_url);
        Ok(adapter)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn publish(&mut self, msg: &Outbound) -> Result<(), CommsError> {
        self.client
            .enqueue(msg.topic.as_str(), QoS::AtLeastOnce, true, msg.payload.as_bytes())
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter (simulation)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct MqttAdapter {
    config: SystemConfig,
    queue: Arc<EventQueue>,
    published: Vec<Outbound>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    pub fn connect(config: &SystemConfig, queue: Arc<EventQueue>) -> Result<Self, CommsError> {
        if !config.network.mqtt_enabled() {
            return Err(CommsError::MqttConnectFailed);
        }
        info!(
            "MQTT(sim): connected, {} subscription(s)",
            topics::subscriptions(config).len()
        );
        Ok(Self {
            config: config.clone(),
            queue,
            published: Vec::new(),
        })
    }

    pub fn is_connected(&self) -> bool {
        true
    }

    /// Inject a message as if the broker had delivered it.
    pub fn sim_deliver(&self, topic: &str, payload: &[u8]) -> bool {
        ingest(&self.queue, topic, payload)
    }

    pub fn published(&self) -> &[Outbound] {
        &self.published
    }

    fn publish(&mut self, msg: &Outbound) -> Result<(), CommsError> {
        info!("MQTT(sim): {} = {}", msg.topic, msg.payload);
        self.published.push(msg.clone());
        Ok(())
    }
}

impl EventSink for MqttAdapter {
    fn emit(&mut self, event: &AppEvent) {
        if !self.is_connected() {
            return;
        }
        for msg in outbound_messages(&self.config, event) {
            if let Err(e) = self.publish(&msg) {
                warn!("MQTT: publish '{}' failed: {}", msg.topic, e);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
