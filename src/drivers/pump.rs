//! Pump bank driver: four timer-driven pumps on active-low outputs.
//!
//! ## Safety contract
//!
//! Only one pump runs at a time and every pump is forced off before deep
//! sleep. The scheduler enforces the first; this driver is a dumb actuator.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIOs via hw_init helpers.
//! On host/test: tracks state in-memory only.

use log::warn;

use crate::config::NUMBER_OF_PUMPS;
use crate::drivers::hw_init;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Stopped,
    Running,
}

pub struct PumpBank {
    states: [PumpState; NUMBER_OF_PUMPS],
}

impl Default for PumpBank {
    fn default() -> Self {
        Self::new()
    }
}

impl PumpBank {
    pub fn new() -> Self {
        Self {
            states: [PumpState::Stopped; NUMBER_OF_PUMPS],
        }
    }

    pub fn start(&mut self, index: usize) {
        let Some(&gpio) = pins::PUMP_GPIOS.get(index) else {
            warn!("PumpBank: no pump {}", index);
            return;
        };
        // Active low: LOW energises the pump.
        hw_init::gpio_write(gpio, false);
        self.states[index] = PumpState::Running;
    }

    pub fn stop(&mut self, index: usize) {
        let Some(&gpio) = pins::PUMP_GPIOS.get(index) else {
            warn!("PumpBank: no pump {}", index);
            return;
        };
        hw_init::gpio_write(gpio, true);
        self.states[index] = PumpState::Stopped;
    }

    pub fn stop_all(&mut self) {
        for index in 0..NUMBER_OF_PUMPS {
            self.stop(index);
        }
    }

    pub fn state(&self, index: usize) -> Option<PumpState> {
        self.states.get(index).copied()
    }

    pub fn any_running(&self) -> bool {
        self.states.iter().any(|s| *s == PumpState::Running)
    }
}
