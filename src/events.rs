//! Inbound event queue.
//!
//! Events are produced by:
//! - the MQTT client callback (raw command messages)
//! - the local menu (button presses, refill)
//!
//! and consumed by the wake-cycle loop, which drains the queue once per
//! iteration in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT client │────▶│              │     │              │
//! │ callback    │     │  EventQueue  │────▶│  Wake loop   │
//! │ Local menu  │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Backed by an `embassy-sync` channel behind a critical-section mutex, so
//! producers on other FreeRTOS tasks can push without extra locking.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::AppCommand;
use crate::topics::Topic;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Longest payload kept from an inbound message. Commands carry one
/// integer, anything longer is cut.
pub const MAX_PAYLOAD_LEN: usize = 16;

/// A raw message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// Copy topic and payload. Returns `None` if the topic does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = Topic::new();
        t.push_str(topic).ok()?;
        let keep = payload.len().min(MAX_PAYLOAD_LEN);
        let payload = heapless::Vec::from_slice(&payload[..keep]).ok()?;
        Some(Self { topic: t, payload })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Command-channel message, not yet parsed.
    Message(InboundMessage),
    /// Already-typed command from the local menu.
    Command(AppCommand),
    /// Any user interaction; restarts the inactivity timer.
    UserActivity,
}

pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push an event. Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("EventQueue: full, event dropped");
                false
            }
        }
    }

    /// Pop the next event, `None` if empty.
    pub fn pop(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}
