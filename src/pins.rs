//! GPIO / peripheral pin assignments for the Plant Nanny board (ESP32).
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

use crate::config::NUMBER_OF_PUMPS;

// ---------------------------------------------------------------------------
// Pumps (one MOSFET/relay channel each, active LOW)
// ---------------------------------------------------------------------------

/// Pump outputs, indexed by 0-based pump slot. LOW = pump running.
pub const PUMP_GPIOS: [i32; NUMBER_OF_PUMPS] = [22, 17, 2, 15];

// ---------------------------------------------------------------------------
// Menu button (active LOW, external pull-up)
// ---------------------------------------------------------------------------

/// BOOT button. GPIO 0 is RTC_GPIO11, so it can serve as the ext0 wake pin.
pub const BUTTON_GPIO: i32 = 0;

// ---------------------------------------------------------------------------
// Battery sense (1:2 divider)
// ---------------------------------------------------------------------------

/// Battery divider tap.
pub const BATTERY_ADC_GPIO: i32 = 34;
/// GPIO 34 is ADC1 channel 6 on the ESP32.
pub const BATTERY_ADC_CHANNEL: u32 = 6;
