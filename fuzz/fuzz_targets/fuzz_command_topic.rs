//! Fuzz target: `topics::parse_command`
//!
//! Splits the input into a topic and a payload and drives both through
//! the command parser. The parser must never panic, and every topic it
//! accepts must start with this device's prefix.
//!
//! cargo fuzz run fuzz_command_topic

#![no_main]

use critical_section as _;
use libfuzzer_sys::fuzz_target;
use plantnanny::config::SystemConfig;
use plantnanny::events::InboundMessage;
use plantnanny::topics::{device_topic, parse_command};

fuzz_target!(|data: &[u8]| {
    let config = SystemConfig::default();

    // First NUL separates topic from payload.
    let (topic, payload) = match data.iter().position(|b| *b == 0) {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &[][..]),
    };
    let Ok(topic) = core::str::from_utf8(topic) else {
        return;
    };

    if parse_command(&config, topic, payload).is_ok() {
        let prefix = device_topic(&config, "");
        assert!(topic.starts_with(prefix.as_str()), "accepted foreign topic {topic:?}");
    }

    // The truncating copy used by the MQTT receive path must agree.
    if let Some(msg) = InboundMessage::new(topic, payload) {
        assert!(msg.payload.len() <= payload.len());
        let _ = parse_command(&config, &msg.topic, &msg.payload);
    }
});
