//! Persisted watering state: four pump slots plus the water budget.
//!
//! The struct is loaded once per wake cycle from the [`StoragePort`],
//! mutated in place by the hourly tick, the evaluator and command
//! ingestion, and written back key by key. Every value lives in NVS as a
//! `u32`; the two signed quantities (countdown, remaining water) are
//! stored as their two's-complement bit pattern so negative values
//! survive a power cycle unchanged.

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::config::NUMBER_OF_PUMPS;

use super::tables::{self, Amount, Frequency};

// ---------------------------------------------------------------------------
// NVS keys (≤ 15 bytes each)
// ---------------------------------------------------------------------------

pub const KEY_CONTAINER_SIZE: &str = "cont-size";
pub const KEY_REMAINING_WATER: &str = "water-ml";
pub const KEY_LAST_TICK: &str = "last-tick";

pub const KEY_FREQUENCY: [&str; NUMBER_OF_PUMPS] = ["p1-freq", "p2-freq", "p3-freq", "p4-freq"];
pub const KEY_HOURS_UNTIL_DUE: [&str; NUMBER_OF_PUMPS] = ["p1-due", "p2-due", "p3-due", "p4-due"];
pub const KEY_AMOUNT: [&str; NUMBER_OF_PUMPS] = ["p1-amount", "p2-amount", "p3-amount", "p4-amount"];

// First-boot defaults: smallest box, every pump off until configured.
const DEFAULT_CONTAINER_CATEGORY: u8 = 1;
const DEFAULT_FREQUENCY_CATEGORY: u8 = 0;
const DEFAULT_AMOUNT_CATEGORY: u8 = 1;

// ---------------------------------------------------------------------------
// PumpSlot
// ---------------------------------------------------------------------------

/// Configuration and countdown of one pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSlot {
    /// 0 = disabled, 1..=4 = increasing frequency.
    pub frequency_category: u8,
    /// Hours until the next watering. ≤ 0 means due.
    pub hours_until_due: i32,
    /// 1..=4, see [`tables::translate_amount`].
    pub amount_category: u8,
}

impl Default for PumpSlot {
    fn default() -> Self {
        Self {
            frequency_category: DEFAULT_FREQUENCY_CATEGORY,
            hours_until_due: 0,
            amount_category: DEFAULT_AMOUNT_CATEGORY,
        }
    }
}

impl PumpSlot {
    pub fn frequency(&self) -> Frequency {
        tables::translate_frequency(self.frequency_category)
    }

    pub fn amount(&self) -> Amount {
        tables::translate_amount(self.amount_category)
    }

    pub fn is_disabled(&self) -> bool {
        self.frequency().is_disabled()
    }

    /// Enabled and the countdown has run out (possibly overshot).
    pub fn is_due(&self) -> bool {
        !self.is_disabled() && self.hours_until_due <= 0
    }

    /// One hour has passed. Disabled slots do not count down.
    pub fn advance_hour(&mut self) {
        if !self.is_disabled() {
            self.hours_until_due = self.hours_until_due.saturating_sub(1);
        }
    }

    /// Restart the countdown from the configured interval.
    pub fn rearm(&mut self) {
        if let Frequency::Every(hours) = self.frequency() {
            self.hours_until_due = i32::try_from(hours).unwrap_or(i32::MAX);
        }
    }
}

// ---------------------------------------------------------------------------
// WaterBudget
// ---------------------------------------------------------------------------

/// Software estimate of what is left in the reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterBudget {
    pub container_size_category: u8,
    /// May go negative; anything ≤ 0 is "empty".
    pub remaining_water_ml: i32,
}

impl Default for WaterBudget {
    fn default() -> Self {
        Self {
            container_size_category: DEFAULT_CONTAINER_CATEGORY,
            remaining_water_ml: tables::translate_container_size(DEFAULT_CONTAINER_CATEGORY) as i32,
        }
    }
}

impl WaterBudget {
    pub fn capacity_ml(&self) -> u32 {
        tables::translate_container_size(self.container_size_category)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_water_ml <= 0
    }

    pub fn deduct(&mut self, volume_ml: u32) {
        let volume = i32::try_from(volume_ml).unwrap_or(i32::MAX);
        self.remaining_water_ml = self.remaining_water_ml.saturating_sub(volume);
    }

    /// Container was topped up to the brim.
    pub fn refill(&mut self) {
        self.remaining_water_ml = i32::try_from(self.capacity_ml()).unwrap_or(i32::MAX);
    }
}

// ---------------------------------------------------------------------------
// ScheduleState
// ---------------------------------------------------------------------------

/// Everything the scheduler needs to resume after deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleState {
    pub budget: WaterBudget,
    pub pumps: [PumpSlot; NUMBER_OF_PUMPS],
}

impl ScheduleState {
    /// Load from the store, falling back to first-boot defaults key by key.
    pub fn load(store: &impl StoragePort) -> Self {
        let defaults = Self::default();
        let mut state = defaults;

        state.budget.container_size_category = read_category(
            store,
            KEY_CONTAINER_SIZE,
            defaults.budget.container_size_category,
        );
        state.budget.remaining_water_ml =
            read_signed(store, KEY_REMAINING_WATER, defaults.budget.remaining_water_ml);

        for (i, slot) in state.pumps.iter_mut().enumerate() {
            slot.frequency_category =
                read_category(store, KEY_FREQUENCY[i], DEFAULT_FREQUENCY_CATEGORY);
            slot.hours_until_due = read_signed(store, KEY_HOURS_UNTIL_DUE[i], 0);
            slot.amount_category = read_category(store, KEY_AMOUNT[i], DEFAULT_AMOUNT_CATEGORY);
        }

        info!(
            "ScheduleState: loaded water={}mL container={} due={:?}",
            state.budget.remaining_water_ml,
            state.budget.container_size_category,
            state.pumps.map(|p| p.hours_until_due),
        );
        state
    }

    /// Number of slots that are not disabled.
    pub fn active_pumps(&self) -> usize {
        self.pumps.iter().filter(|p| !p.is_disabled()).count()
    }

    /// Grouped write of the values the hourly run changes.
    pub fn persist_progress(&self, store: &mut impl StoragePort) -> Result<(), StorageError> {
        let mut entries: heapless::Vec<(&str, u32), { NUMBER_OF_PUMPS + 1 }> = heapless::Vec::new();
        for (i, slot) in self.pumps.iter().enumerate() {
            let _ = entries.push((KEY_HOURS_UNTIL_DUE[i], encode_signed(slot.hours_until_due)));
        }
        let _ = entries.push((KEY_REMAINING_WATER, encode_signed(self.budget.remaining_water_ml)));
        store.write_batch(&entries)
    }

    /// Write every persisted field (first boot, factory reset).
    pub fn persist_all(&self, store: &mut impl StoragePort) -> Result<(), StorageError> {
        let mut entries: heapless::Vec<(&str, u32), { 3 * NUMBER_OF_PUMPS + 2 }> =
            heapless::Vec::new();
        let _ = entries.push((KEY_CONTAINER_SIZE, u32::from(self.budget.container_size_category)));
        let _ = entries.push((KEY_REMAINING_WATER, encode_signed(self.budget.remaining_water_ml)));
        for (i, slot) in self.pumps.iter().enumerate() {
            let _ = entries.push((KEY_FREQUENCY[i], u32::from(slot.frequency_category)));
            let _ = entries.push((KEY_HOURS_UNTIL_DUE[i], encode_signed(slot.hours_until_due)));
            let _ = entries.push((KEY_AMOUNT[i], u32::from(slot.amount_category)));
        }
        store.write_batch(&entries)
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Signed → stored bit pattern.
pub fn encode_signed(value: i32) -> u32 {
    value as u32
}

/// Stored bit pattern → signed.
pub fn decode_signed(raw: u32) -> i32 {
    raw as i32
}

fn read_signed(store: &impl StoragePort, key: &str, default: i32) -> i32 {
    match store.read_u32(key) {
        Ok(raw) => decode_signed(raw),
        Err(StorageError::NotFound) => default,
        Err(e) => {
            warn!("ScheduleState: reading '{}' failed ({}), using {}", key, e, default);
            default
        }
    }
}

/// Categories are a byte wide; anything larger is kept as an
/// out-of-range marker so the tables apply their fallback.
fn read_category(store: &impl StoragePort, key: &str, default: u8) -> u8 {
    match store.read_u32(key) {
        Ok(raw) => u8::try_from(raw).unwrap_or(u8::MAX),
        Err(StorageError::NotFound) => default,
        Err(e) => {
            warn!("ScheduleState: reading '{}' failed ({}), using {}", key, e, default);
            default
        }
    }
}
