//! Battery voltage monitor.
//!
//! The LiPo cell feeds GPIO 34 through a 1:2 resistive divider. A single
//! ADC conversion is noisy, so each reading averages a burst of samples
//! taken through the [`BatteryPort`]. The averaged raw value is classified
//! into a coarse [`BatteryLevel`] for the display and converted to volts
//! for telemetry.

use core::fmt;

use crate::app::ports::BatteryPort;

/// Conversions averaged per reading.
pub const SAMPLES_PER_READING: u32 = 20;

/// Raw thresholds (12-bit, after the divider). Below the first is critical.
const LOW_THRESHOLD: u16 = 2000;
const MEDIUM_THRESHOLD: u16 = 2500;
const GOOD_THRESHOLD: u16 = 3000;

const ADC_FULL_SCALE: f32 = 4095.0;
const ADC_REFERENCE_V: f32 = 3.3;
const DIVIDER_RATIO: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BatteryLevel {
    Critical,
    Low,
    Medium,
    Good,
}

impl BatteryLevel {
    pub fn from_raw(raw: u16) -> Self {
        if raw >= GOOD_THRESHOLD {
            Self::Good
        } else if raw >= MEDIUM_THRESHOLD {
            Self::Medium
        } else if raw >= LOW_THRESHOLD {
            Self::Low
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Good => "good",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    /// Averaged raw ADC value.
    pub raw: u16,
    pub volts: f32,
    pub level: BatteryLevel,
}

/// Average [`SAMPLES_PER_READING`] conversions and classify the result.
pub fn read_battery(adc: &mut impl BatteryPort) -> BatteryReading {
    let sum: u32 = (0..SAMPLES_PER_READING)
        .map(|_| u32::from(adc.read_raw()))
        .sum();
    let raw = (sum / SAMPLES_PER_READING) as u16;

    BatteryReading {
        raw,
        volts: raw_to_volts(raw),
        level: BatteryLevel::from_raw(raw),
    }
}

/// Cell voltage for an averaged raw value.
pub fn raw_to_volts(raw: u16) -> f32 {
    f32::from(raw) / ADC_FULL_SCALE * ADC_REFERENCE_V * DIVIDER_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sequence {
        values: Vec<u16>,
        next: usize,
    }

    impl BatteryPort for Sequence {
        fn read_raw(&mut self) -> u16 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }
    }

    #[test]
    fn averages_all_samples() {
        let mut adc = Sequence {
            values: vec![2400, 2600],
            next: 0,
        };
        let reading = read_battery(&mut adc);
        assert_eq!(adc.next, SAMPLES_PER_READING as usize);
        assert_eq!(reading.raw, 2500);
        assert_eq!(reading.level, BatteryLevel::Medium);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(BatteryLevel::from_raw(0), BatteryLevel::Critical);
        assert_eq!(BatteryLevel::from_raw(1999), BatteryLevel::Critical);
        assert_eq!(BatteryLevel::from_raw(2000), BatteryLevel::Low);
        assert_eq!(BatteryLevel::from_raw(2499), BatteryLevel::Low);
        assert_eq!(BatteryLevel::from_raw(2999), BatteryLevel::Medium);
        assert_eq!(BatteryLevel::from_raw(3000), BatteryLevel::Good);
        assert_eq!(BatteryLevel::from_raw(4095), BatteryLevel::Good);
    }

    #[test]
    fn full_scale_is_six_point_six_volts() {
        assert!((raw_to_volts(4095) - 6.6).abs() < 1e-4);
        assert!(raw_to_volts(0).abs() < f32::EPSILON);
    }
}
