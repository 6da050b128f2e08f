//! Command and telemetry topic layout.
//!
//! ```text
//!   <root>/<device>/<command>            global command / telemetry
//!   <root>/<device>/<pump>/<command>     pump-scoped (pump is 1-based)
//! ```
//!
//! Inbound payloads are plain decimal text. Parsing is lenient: leading
//! whitespace and one sign are accepted, parsing stops at the first
//! non-digit, and a payload without any digit reads as 0.

use core::fmt::Write as _;

use crate::app::commands::AppCommand;
use crate::config::{MAX_TOPIC_LEN, NUMBER_OF_PUMPS, SystemConfig};
use crate::error::CommandError;

pub type Topic = heapless::String<MAX_TOPIC_LEN>;

// Command leaves.
pub const CMD_CONTAINER: &str = "command-container";
pub const CMD_WATER: &str = "command-water";
pub const CMD_FREQUENCY: &str = "command-freq";
pub const CMD_WAIT: &str = "command-wait";
pub const CMD_AMOUNT: &str = "command-amount";

// Telemetry leaves.
pub const TELEM_BATTERY: &str = "battery-value";
pub const TELEM_WATER: &str = "water-level";
pub const TELEM_CONTAINER: &str = "container-size";
pub const TELEM_DAYS_LEFT: &str = "days-left";
pub const TELEM_FREQUENCY: &str = "watering-frequency";
pub const TELEM_WAIT: &str = "watering-wait";

const GLOBAL_COMMANDS: [&str; 2] = [CMD_CONTAINER, CMD_WATER];
const PUMP_COMMANDS: [&str; 3] = [CMD_FREQUENCY, CMD_WAIT, CMD_AMOUNT];

/// Number of topics the device subscribes to.
pub const SUBSCRIPTION_COUNT: usize = GLOBAL_COMMANDS.len() + PUMP_COMMANDS.len() * NUMBER_OF_PUMPS;

// ───────────────────────────────────────────────────────────────
// Formatting
// ───────────────────────────────────────────────────────────────

/// `<root>/<device>/<leaf>`. Truncated topics come back empty.
pub fn device_topic(config: &SystemConfig, leaf: &str) -> Topic {
    let mut t = Topic::new();
    if write!(t, "{}/{}/{}", config.topic_root, config.device_id, leaf).is_err() {
        t.clear();
    }
    t
}

/// `<root>/<device>/<pump>/<leaf>` with a 0-based `index`.
pub fn pump_topic(config: &SystemConfig, index: usize, leaf: &str) -> Topic {
    let mut t = Topic::new();
    if write!(t, "{}/{}/{}/{}", config.topic_root, config.device_id, index + 1, leaf).is_err() {
        t.clear();
    }
    t
}

/// Every command topic for this device.
pub fn subscriptions(config: &SystemConfig) -> heapless::Vec<Topic, SUBSCRIPTION_COUNT> {
    let mut out = heapless::Vec::new();
    for leaf in GLOBAL_COMMANDS {
        let _ = out.push(device_topic(config, leaf));
    }
    for index in 0..NUMBER_OF_PUMPS {
        for leaf in PUMP_COMMANDS {
            let _ = out.push(pump_topic(config, index, leaf));
        }
    }
    out
}

// ───────────────────────────────────────────────────────────────
// Parsing
// ───────────────────────────────────────────────────────────────

/// Translate one inbound message into a command.
///
/// Only the topic shape is checked here; pump index and category ranges
/// are validated by the service so the rejection can be reported.
pub fn parse_command(
    config: &SystemConfig,
    topic: &str,
    payload: &[u8],
) -> Result<AppCommand, CommandError> {
    let rest = topic
        .strip_prefix(config.topic_root.as_str())
        .and_then(|r| r.strip_prefix('/'))
        .and_then(|r| r.strip_prefix(config.device_id.as_str()))
        .and_then(|r| r.strip_prefix('/'))
        .ok_or(CommandError::UnknownTopic)?;

    let value = parse_lenient_int(payload);

    match rest.split_once('/') {
        None => match rest {
            CMD_CONTAINER => Ok(AppCommand::SetContainerSize(value)),
            CMD_WATER => Ok(AppCommand::SetRemainingWater(value)),
            _ => Err(CommandError::UnknownTopic),
        },
        Some((pump, leaf)) => {
            let pump = parse_lenient_int(pump.as_bytes());
            match leaf {
                CMD_FREQUENCY => Ok(AppCommand::SetFrequency { pump, category: value }),
                CMD_WAIT => Ok(AppCommand::SetNextDue { pump, hours: value }),
                CMD_AMOUNT => Ok(AppCommand::SetAmount { pump, category: value }),
                _ => Err(CommandError::UnknownTopic),
            }
        }
    }
}

/// Leading-integer parse. Saturates at the `i32` bounds.
pub fn parse_lenient_int(bytes: &[u8]) -> i32 {
    let mut iter = bytes
        .iter()
        .copied()
        .skip_while(u8::is_ascii_whitespace)
        .peekable();

    let negative = match iter.peek() {
        Some(b'-') => {
            iter.next();
            true
        }
        Some(b'+') => {
            iter.next();
            false
        }
        _ => false,
    };

    let mut acc: i64 = 0;
    for b in iter.take_while(u8::is_ascii_digit) {
        acc = (acc * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        acc = -acc;
    }
    acc.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SystemConfig {
        SystemConfig::default()
    }

    #[test]
    fn lenient_int() {
        assert_eq!(parse_lenient_int(b"42"), 42);
        assert_eq!(parse_lenient_int(b"  -7"), -7);
        assert_eq!(parse_lenient_int(b"+3abc"), 3);
        assert_eq!(parse_lenient_int(b"12.5"), 12);
        assert_eq!(parse_lenient_int(b"abc"), 0);
        assert_eq!(parse_lenient_int(b""), 0);
        assert_eq!(parse_lenient_int(b"-"), 0);
        assert_eq!(parse_lenient_int(b"99999999999"), i32::MAX);
        assert_eq!(parse_lenient_int(b"-99999999999"), i32::MIN);
        assert_eq!(parse_lenient_int(b"-2147483648"), i32::MIN);
    }

    #[test]
    fn global_commands() {
        assert_eq!(
            parse_command(&cfg(), "plant-nanny/1/command-container", b"3"),
            Ok(AppCommand::SetContainerSize(3))
        );
        assert_eq!(
            parse_command(&cfg(), "plant-nanny/1/command-water", b"1500"),
            Ok(AppCommand::SetRemainingWater(1500))
        );
    }

    #[test]
    fn pump_commands() {
        assert_eq!(
            parse_command(&cfg(), "plant-nanny/1/2/command-freq", b"4"),
            Ok(AppCommand::SetFrequency { pump: 2, category: 4 })
        );
        assert_eq!(
            parse_command(&cfg(), "plant-nanny/1/4/command-wait", b"-2"),
            Ok(AppCommand::SetNextDue { pump: 4, hours: -2 })
        );
        assert_eq!(
            parse_command(&cfg(), "plant-nanny/1/1/command-amount", b"x"),
            Ok(AppCommand::SetAmount { pump: 1, category: 0 })
        );
    }

    #[test]
    fn pump_index_is_passed_through_unchecked() {
        assert_eq!(
            parse_command(&cfg(), "plant-nanny/1/5/command-freq", b"1"),
            Ok(AppCommand::SetFrequency { pump: 5, category: 1 })
        );
    }

    #[test]
    fn foreign_topics_are_unknown() {
        for topic in [
            "plant-nanny/2/command-water",
            "other/1/command-water",
            "plant-nanny/1/command-hour",
            "plant-nanny/1/1/command-hour",
            "plant-nanny/1",
            "plant-nanny/1/water-level",
        ] {
            assert_eq!(
                parse_command(&cfg(), topic, b"1"),
                Err(CommandError::UnknownTopic),
                "{topic}"
            );
        }
    }

    #[test]
    fn topic_formatting() {
        assert_eq!(device_topic(&cfg(), TELEM_WATER).as_str(), "plant-nanny/1/water-level");
        assert_eq!(pump_topic(&cfg(), 0, TELEM_WAIT).as_str(), "plant-nanny/1/1/watering-wait");
    }

    #[test]
    fn subscriptions_round_trip_through_parser() {
        let subs = subscriptions(&cfg());
        assert_eq!(subs.len(), SUBSCRIPTION_COUNT);
        for topic in &subs {
            assert!(parse_command(&cfg(), topic, b"1").is_ok(), "{topic}");
        }
    }
}
