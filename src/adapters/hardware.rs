//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`PumpBank`] and the battery ADC, exposing them through
//! [`ActuatorPort`] and [`BatteryPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets, the
//! underlying drivers use cfg-gated simulation stubs.

use log::info;

use crate::app::ports::{ActuatorPort, BatteryPort};
use crate::drivers::hw_init;
use crate::drivers::pump::PumpBank;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    pumps: PumpBank,
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new(PumpBank::new())
    }
}

impl HardwareAdapter {
    pub fn new(pumps: PumpBank) -> Self {
        Self { pumps }
    }

    pub fn pumps(&self) -> &PumpBank {
        &self.pumps
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn pump_on(&mut self, index: usize) {
        info!("HW: pump {} ON", index + 1);
        self.pumps.start(index);
    }

    fn pump_off(&mut self, index: usize) {
        self.pumps.stop(index);
        info!("HW: pump {} OFF", index + 1);
    }

    fn all_off(&mut self) {
        self.pumps.stop_all();
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

// ── BatteryPort implementation ────────────────────────────────

impl BatteryPort for HardwareAdapter {
    fn read_raw(&mut self) -> u16 {
        hw_init::battery_adc_read()
    }
}
