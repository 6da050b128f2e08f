//! Power management: wake reason, inactivity timer, deep-sleep entry.
//!
//! The device spends almost all of its life in deep sleep. A wake cycle
//! ends either right after the hourly run or once the user has left the
//! menu alone for [`SystemConfig::inactivity_threshold_secs`]. Deep sleep
//! powers the CPU and RAM down; the next wake is a full reboot and
//! everything that must survive lives in NVS.
//!
//! [`SystemConfig::inactivity_threshold_secs`]: crate::config::SystemConfig::inactivity_threshold_secs

use log::info;

/// Why this boot happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Cold boot or reset.
    PowerOn,
    /// The RTC timer set before the last deep sleep fired.
    Timer,
    /// A wake-up pin (menu button).
    Button,
    Other,
}

#[cfg(target_os = "espidf")]
pub fn wake_reason() -> WakeReason {
    use esp_idf_svc::sys::{
        esp_sleep_get_wakeup_cause, esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT1, esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED,
    };
    // SAFETY: read-only query of the RTC wake-up cause register.
    let cause = unsafe { esp_sleep_get_wakeup_cause() };
    #[allow(non_upper_case_globals)]
    match cause {
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeReason::PowerOn,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeReason::Timer,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 | esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT1 => {
            WakeReason::Button
        }
        _ => WakeReason::Other,
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn wake_reason() -> WakeReason {
    WakeReason::PowerOn
}

// ───────────────────────────────────────────────────────────────
// Inactivity timer
// ───────────────────────────────────────────────────────────────

/// Tracks the time since the last user interaction.
#[derive(Debug, Clone, Copy)]
pub struct InactivityTimer {
    threshold_ms: u64,
    last_activity_ms: u64,
}

impl InactivityTimer {
    pub fn new(threshold_secs: u32, now_ms: u64) -> Self {
        Self {
            threshold_ms: u64::from(threshold_secs) * 1000,
            last_activity_ms: now_ms,
        }
    }

    /// Record user activity at `now_ms`.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_activity_ms) >= self.threshold_ms
    }

    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_ms)
    }
}

// ───────────────────────────────────────────────────────────────
// Deep sleep
// ───────────────────────────────────────────────────────────────

/// Arm the RTC timer for `secs` and the button wake pin, then power down.
/// Never returns.
#[cfg(target_os = "espidf")]
pub fn enter_deep_sleep(secs: u32) -> ! {
    info!("Power: deep sleep for {}s", secs);
    // SAFETY: both calls are plain ESP-IDF sleep APIs; all peripherals
    // were put into their safe state by the caller.
    unsafe {
        esp_idf_svc::sys::esp_sleep_enable_timer_wakeup(u64::from(secs) * 1_000_000);
        // Button pulls the pin LOW.
        let ret = esp_idf_svc::sys::esp_sleep_enable_ext0_wakeup(crate::pins::BUTTON_GPIO, 0);
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            log::warn!("Power: button wake unavailable (rc={}), timer only", ret);
        }
        esp_idf_svc::sys::esp_deep_sleep_start();
    }
}

/// Simulation: log and end the process, the same observable effect as
/// a real deep sleep (the next "wake" is a fresh start).
#[cfg(not(target_os = "espidf"))]
pub fn enter_deep_sleep(secs: u32) -> ! {
    info!("Power(sim): deep sleep for {}s, exiting", secs);
    std::process::exit(0)
}
