//! Mock adapters for integration tests.
//!
//! Records every actuator call, storage write and emitted event so tests
//! can assert on the full history without touching real GPIO or flash.

use std::cell::Cell;
use std::collections::HashMap;

use plantnanny::app::events::AppEvent;
use plantnanny::app::ports::{
    ActuatorPort, BatteryPort, ClockPort, EventSink, StorageError, StoragePort,
};
use plantnanny::scheduler::WallClock;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    PumpOn(usize),
    PumpOff(usize),
    AllOff,
    Delay(u32),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    pub battery_raw: u16,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            battery_raw: 3100,
        }
    }

    pub fn pumps_started(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::PumpOn(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Whether any pump is still energised after the recorded history.
    pub fn any_pump_on(&self) -> bool {
        let mut on = [false; 4];
        for call in &self.calls {
            match call {
                ActuatorCall::PumpOn(i) => on[*i] = true,
                ActuatorCall::PumpOff(i) => on[*i] = false,
                ActuatorCall::AllOff => on = [false; 4],
                ActuatorCall::Delay(_) => {}
            }
        }
        on.iter().any(|p| *p)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn pump_on(&mut self, index: usize) {
        self.calls.push(ActuatorCall::PumpOn(index));
    }

    fn pump_off(&mut self, index: usize) {
        self.calls.push(ActuatorCall::PumpOff(index));
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ActuatorCall::Delay(ms));
    }
}

impl BatteryPort for MockHardware {
    fn read_raw(&mut self) -> u16 {
        self.battery_raw
    }
}

// ── MockStore ─────────────────────────────────────────────────

pub struct MockStore {
    pub values: HashMap<String, u32>,
    pub writes: usize,
    /// When set, every write fails with `IoError`.
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            writes: 0,
            fail_writes: false,
        }
    }

    pub fn with(entries: &[(&str, u32)]) -> Self {
        let mut s = Self::new();
        for (k, v) in entries {
            s.values.insert((*k).to_string(), *v);
        }
        s
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.values.get(key).copied()
    }

    pub fn get_signed(&self, key: &str) -> Option<i32> {
        self.get(key).map(|v| v as i32)
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MockStore {
    fn read_u32(&self, key: &str) -> Result<u32, StorageError> {
        self.values.get(key).copied().ok_or(StorageError::NotFound)
    }

    fn write_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

// ── FixedClock ────────────────────────────────────────────────

pub struct FixedClock {
    now: Cell<Option<WallClock>>,
}

#[allow(dead_code)]
impl FixedClock {
    /// Clock at `hour:minute:second` on 2024-01-01 (UTC == local).
    pub fn at(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            now: Cell::new(Some(wall_clock(hour, minute, second))),
        }
    }

    pub fn unsynced() -> Self {
        Self {
            now: Cell::new(None),
        }
    }

    pub fn set(&self, now: Option<WallClock>) {
        self.now.set(now);
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> Option<WallClock> {
        self.now.get()
    }
}

/// 2024-01-01 00:00:00 UTC.
pub const JAN_1_2024: u64 = 1_704_067_200;

pub fn wall_clock(hour: u8, minute: u8, second: u8) -> WallClock {
    WallClock {
        epoch_secs: JAN_1_2024
            + u64::from(hour) * 3600
            + u64::from(minute) * 60
            + u64::from(second),
        hour,
        minute,
        second,
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
