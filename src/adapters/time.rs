//! ESP32 time adapter.
//!
//! Provides wall-clock and monotonic time for Plant Nanny.
//!
//! - **`target_os = "espidf"`** — wall clock from `gettimeofday()` +
//!   `localtime_r()` (set by SNTP, local zone from `TZ`); uptime from
//!   `esp_timer_get_time()`.
//! - **`not(target_os = "espidf")`** — a settable simulated wall clock and
//!   `std::time::Instant` for host-side testing and simulation.

use crate::app::ports::ClockPort;
use crate::scheduler::WallClock;

/// Anything before 2020-01-01 means the RTC was never synced.
#[cfg(target_os = "espidf")]
const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    sim_now: std::cell::Cell<Option<WallClock>>,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            sim_now: std::cell::Cell::new(None),
        }
    }

    /// Apply a POSIX TZ string to `localtime_r`.
    #[cfg(target_os = "espidf")]
    pub fn set_timezone(&self, tz: &str) {
        // SAFETY: called once from main before any other task reads the
        // environment; tzset only re-reads TZ.
        unsafe {
            std::env::set_var("TZ", tz);
            esp_idf_svc::sys::tzset();
        }
        log::info!("Time: timezone set to '{}'", tz);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_timezone(&self, tz: &str) {
        log::info!("Time(sim): timezone '{}' ignored", tz);
    }

    /// Set the simulated wall clock (`None` = never synced).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_now(&self, now: Option<WallClock>) {
        self.sim_now.set(now);
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl ClockPort for Esp32TimeAdapter {
    /// Local time of day. `None` if the wall clock is not synced (pre-SNTP).
    #[cfg(target_os = "espidf")]
    fn now(&self) -> Option<WallClock> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if !(0..=23).contains(&tm.tm_hour) || !(0..=59).contains(&tm.tm_min) {
            return None;
        }
        Some(WallClock {
            epoch_secs: tv.tv_sec as u64,
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            // tm_sec may be 60 on a leap second.
            second: tm.tm_sec.clamp(0, 59) as u8,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn now(&self) -> Option<WallClock> {
        self.sim_now.get()
    }
}
